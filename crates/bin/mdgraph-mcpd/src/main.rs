//! Daemon entry point for the mdgraph MCP server.
//!
//! Loads configuration from the command line and environment, connects the
//! store, optionally imports the snapshot directory, and serves MCP over stdio
//! and/or streamable HTTP alongside the HTTP import server.

mod config;
mod db;

use std::error::Error;

use mdgraph_core::control::{CallScope, GraphControlPlane};
use mdgraph_ingest::{IngestServer, IngestServerConfig};
use mdgraph_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use mdgraph_mcp::{MdgraphMcp, ToolSettings};
use surrealdb::engine::any::Any;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, MdgraphConfig};

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // stdout carries the stdio transport, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = MdgraphConfig::from_args()?;
    let control = GraphControlPlane::new(db::connect(&config).await?);

    if config.import_only {
        return import_and_exit(&control, &config).await;
    }

    if config.import_on_start {
        import_on_start(&control, &config).await;
    }

    let server = MdgraphMcp::with_settings(
        control.clone(),
        ToolSettings {
            call_timeout: config.tool_timeout,
            snapshot_dir: config.snapshot_dir.clone(),
        },
    );

    let mut background: JoinSet<Result<(), BoxError>> = JoinSet::new();
    if config.ingest_serve {
        let ingest_config = IngestServerConfig::new(config.ingest_addr)
            .with_max_body_bytes(config.ingest_max_body_bytes)
            .with_request_timeout(config.ingest_timeout);
        background.spawn(IngestServer::new(control.clone(), ingest_config).serve());
    }
    if config.mcp_serve {
        background.spawn(serve_streamable_http(
            server.clone(),
            McpHttpServerConfig::new(config.mcp_http_addr),
        ));
    }

    if config.enable_stdio {
        tokio::select! {
            served = serve_stdio(server) => {
                served?;
                info!("stdio session closed, shutting down");
            }
            Some(joined) = background.join_next() => joined??,
        }
        return Ok(());
    }

    while let Some(joined) = background.join_next().await {
        joined??;
    }
    Ok(())
}

async fn import_and_exit(
    control: &GraphControlPlane<Any>,
    config: &MdgraphConfig,
) -> Result<(), BoxError> {
    let dir = config
        .snapshot_dir
        .clone()
        .ok_or(ConfigError::MissingSetting("MDGRAPH_SNAPSHOT_DIR"))?;
    info!(dir = %dir.display(), "importing snapshot");
    let report = control
        .import_snapshot_dir(&CallScope::unbounded(), dir)
        .await?;
    info!(
        config = %report.config_name,
        version = %report.config_version,
        objects = report.object_count,
        relations = report.relation_count,
        "import done"
    );
    Ok(())
}

async fn import_on_start(
    control: &GraphControlPlane<Any>,
    config: &MdgraphConfig,
) {
    let Some(dir) = config.snapshot_dir.clone() else {
        info!("no snapshot directory found, starting with the existing store contents");
        return;
    };
    match control
        .import_snapshot_dir_if_empty(&CallScope::unbounded(), &dir)
        .await
    {
        Ok(Some(report)) => info!(
            dir = %dir.display(),
            objects = report.object_count,
            relations = report.relation_count,
            "snapshot imported on start"
        ),
        Ok(None) => info!("store already holds a snapshot, skipping import on start"),
        Err(err) => warn!(dir = %dir.display(), error = %err, "snapshot import on start failed"),
    }
}
