use mdgraph_store::models::{Direction, Meta, Object, References, SearchPage, TypeCount};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;

use super::{CallScope, ControlError, GraphControlPlane, require_id};

/// Stored snapshot metadata alongside live table counts.
///
/// `meta.object_count` is fixed at import time; `live_object_count` reflects
/// the objects table as it is now. `loaded` is set once any meta key or
/// object has been written, even if the imported meta was blank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStatus {
    pub loaded: bool,
    pub meta: Meta,
    pub live_object_count: u64,
    pub live_relation_count: u64,
}

impl<C: Connection> GraphControlPlane<C> {
    /// Searches objects by name or synonym.
    ///
    /// # Errors
    /// Returns `ControlError` if the store query fails or the scope ends first.
    pub async fn search(
        &self,
        scope: &CallScope,
        query: &str,
        type_filter: &str,
        limit: i64,
        offset: i64,
    ) -> Result<SearchPage, ControlError> {
        scope
            .run(async {
                Ok::<_, ControlError>(
                    self.store.search(query, type_filter, limit, offset).await?,
                )
            })
            .await
    }

    /// Fetches an object by id; `None` when it does not exist.
    ///
    /// # Errors
    /// Returns `ControlError::Validation` for an empty id, or a store error.
    pub async fn get_object(
        &self,
        scope: &CallScope,
        id: &str,
    ) -> Result<Option<Object>, ControlError> {
        require_id(id, "objectId")?;
        scope
            .run(async { Ok::<_, ControlError>(self.store.get_object(id).await?) })
            .await
    }

    /// Lists incoming and/or outgoing relations of an object.
    ///
    /// # Errors
    /// Returns `ControlError::Validation` for an empty id, or a store error.
    pub async fn find_references(
        &self,
        scope: &CallScope,
        id: &str,
        direction: Direction,
        kind: &str,
        limit: i64,
    ) -> Result<References, ControlError> {
        require_id(id, "objectId")?;
        scope
            .run(async {
                Ok::<_, ControlError>(
                    self.store
                        .find_references(id, direction, kind.trim(), limit)
                        .await?,
                )
            })
            .await
    }

    /// Counts objects per type.
    ///
    /// # Errors
    /// Returns `ControlError` if the store query fails or the scope ends first.
    pub async fn list_types(&self, scope: &CallScope) -> Result<Vec<TypeCount>, ControlError> {
        scope
            .run(async { Ok::<_, ControlError>(self.store.list_types().await?) })
            .await
    }

    /// Returns the metadata of the last import.
    ///
    /// # Errors
    /// Returns `ControlError` if the store query fails or the scope ends first.
    pub async fn meta(&self, scope: &CallScope) -> Result<Meta, ControlError> {
        scope
            .run(async { Ok::<_, ControlError>(self.store.meta().await?) })
            .await
    }

    /// Returns the stored metadata together with live object and relation counts.
    ///
    /// # Errors
    /// Returns `ControlError` if a store query fails or the scope ends first.
    pub async fn snapshot_status(&self, scope: &CallScope) -> Result<SnapshotStatus, ControlError> {
        scope
            .run(async {
                let meta = self.store.stored_meta().await?;
                let live_object_count = self.store.count_objects().await?;
                let live_relation_count = self.store.count_relations().await?;
                Ok::<_, ControlError>(SnapshotStatus {
                    loaded: meta.is_some() || live_object_count > 0,
                    meta: meta.unwrap_or_default(),
                    live_object_count,
                    live_relation_count,
                })
            })
            .await
    }
}
