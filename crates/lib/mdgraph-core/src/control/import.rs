use std::path::PathBuf;

use chrono::Utc;
use mdgraph_store::models::Snapshot;
use serde::{Deserialize, Serialize};
use surrealdb::Connection;
use tracing::{debug, info};

use crate::snapshot::load_snapshot_async;

use super::{CallScope, ControlError, GraphControlPlane};

/// Summary of a completed import.
///
/// `relation_count` is the number of relations received; relations whose
/// endpoints are unknown are skipped without being reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub config_name: String,
    pub config_version: String,
    pub object_count: usize,
    pub relation_count: usize,
    pub imported_at: String,
}

impl<C: Connection> GraphControlPlane<C> {
    /// Imports a snapshot that is already in memory.
    ///
    /// # Errors
    /// Returns `ControlError` if a store write fails or the scope ends first.
    pub async fn import_snapshot(
        &self,
        scope: &CallScope,
        snapshot: Snapshot,
    ) -> Result<ImportReport, ControlError> {
        scope
            .run(async {
                let Snapshot {
                    meta,
                    objects,
                    relations,
                } = &snapshot;
                info!(
                    config = %meta.config_name,
                    version = %meta.config_version,
                    objects = objects.len(),
                    relations = relations.len(),
                    "importing snapshot"
                );
                self.store.import(meta, objects, relations).await?;
                let report = ImportReport {
                    config_name: meta.config_name.clone(),
                    config_version: meta.config_version.clone(),
                    object_count: objects.len(),
                    relation_count: relations.len(),
                    imported_at: Utc::now().to_rfc3339(),
                };
                info!(config = %report.config_name, "snapshot imported");
                Ok::<_, ControlError>(report)
            })
            .await
    }

    /// Loads a snapshot directory and imports it.
    ///
    /// Nothing is written unless all three snapshot files load.
    ///
    /// # Errors
    /// Returns `ControlError` if loading or importing fails or the scope ends first.
    pub async fn import_snapshot_dir(
        &self,
        scope: &CallScope,
        dir: impl Into<PathBuf>,
    ) -> Result<ImportReport, ControlError> {
        let dir = dir.into();
        if dir.as_os_str().is_empty() {
            return Err(ControlError::Validation(
                "snapshot directory is required".to_string(),
            ));
        }
        let snapshot = scope
            .run(async { Ok::<_, ControlError>(load_snapshot_async(dir).await?) })
            .await?;
        self.import_snapshot(scope, snapshot).await
    }

    /// Imports `dir` only into a store that holds no snapshot yet.
    ///
    /// Returns `None` without reading `dir` when a snapshot is already stored.
    ///
    /// # Errors
    /// Returns `ControlError` if the status check, loading, or importing fails.
    pub async fn import_snapshot_dir_if_empty(
        &self,
        scope: &CallScope,
        dir: impl Into<PathBuf>,
    ) -> Result<Option<ImportReport>, ControlError> {
        let status = self.snapshot_status(scope).await?;
        if status.loaded {
            debug!(
                objects = status.live_object_count,
                "store already holds a snapshot, skipping import"
            );
            return Ok(None);
        }
        self.import_snapshot_dir(scope, dir).await.map(Some)
    }
}
