use std::path::PathBuf;

use mdgraph_core::control::{CallScope, ImportReport};
use mdgraph_store::models::Meta;
use rmcp::{
    ErrorData,
    RoleServer,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    service::RequestContext,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;

use crate::MdgraphMcp;
use crate::helpers;

/// Parameters for importing a snapshot directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSnapshotParams {
    /// Directory holding meta.json, objects.json, and relations.json.
    /// Falls back to the server's configured snapshot directory.
    #[serde(default)]
    pub snapshot_dir: Option<String>,
}

/// Result of `structure_snapshot_info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfoResponse {
    pub loaded: bool,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    pub live_object_count: u64,
    pub live_relation_count: u64,
}

/// Result of `structure_import_snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSnapshotResponse {
    pub summary: String,
    #[serde(flatten)]
    pub report: ImportReport,
}

impl<C: Connection> MdgraphMcp<C> {
    pub(crate) async fn snapshot_info_response(
        &self,
        scope: &CallScope,
    ) -> Result<SnapshotInfoResponse, ErrorData> {
        let status = self
            .control
            .snapshot_status(scope)
            .await
            .map_err(helpers::map_err)?;
        if !status.loaded {
            return Ok(SnapshotInfoResponse {
                loaded: false,
                summary: "No snapshot loaded.".to_string(),
                meta: None,
                live_object_count: status.live_object_count,
                live_relation_count: status.live_relation_count,
            });
        }
        let meta = status.meta;
        Ok(SnapshotInfoResponse {
            loaded: true,
            summary: format!(
                "Snapshot {} {}, {} objects, exported at {}.",
                meta.config_name, meta.config_version, meta.object_count, meta.exported_at
            ),
            meta: Some(meta),
            live_object_count: status.live_object_count,
            live_relation_count: status.live_relation_count,
        })
    }

    pub(crate) async fn import_snapshot_response(
        &self,
        scope: &CallScope,
        params: &ImportSnapshotParams,
    ) -> Result<ImportSnapshotResponse, ErrorData> {
        let dir = params
            .snapshot_dir
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.settings.snapshot_dir.clone())
            .ok_or_else(|| {
                helpers::invalid_params(
                    "snapshotDir is required when no snapshot directory is configured",
                )
            })?;
        let report = self
            .control
            .import_snapshot_dir(scope, dir)
            .await
            .map_err(helpers::map_err)?;
        Ok(ImportSnapshotResponse {
            summary: format!(
                "Import finished: {} {}, {} objects, {} relations.",
                report.config_name, report.config_version, report.object_count, report.relation_count
            ),
            report,
        })
    }
}

#[tool_router(router = tool_router_snapshot, vis = "pub")]
impl<C: Connection> MdgraphMcp<C> {
    #[tool(description = "Describe the loaded snapshot: configuration name and version, export time, object count.")]
    async fn structure_snapshot_info(
        &self,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let scope = self.request_scope(&ctx);
        let info = self.snapshot_info_response(&scope).await?;
        Ok(CallToolResult::success(vec![Content::json(info)?]))
    }

    #[tool(description = "Load a snapshot directory (meta.json, objects.json, relations.json) into the store.")]
    async fn structure_import_snapshot(
        &self,
        Parameters(params): Parameters<ImportSnapshotParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let scope = self.request_scope(&ctx);
        let imported = self.import_snapshot_response(&scope, &params).await?;
        Ok(CallToolResult::success(vec![Content::json(imported)?]))
    }
}
