use std::{error::Error, fmt, sync::Arc};

use surrealdb::{Connection, Surreal};

use crate::snapshot::SnapshotError;
use crate::store::{StoreError, SurrealGraphStore};

pub mod import;
pub mod query;
pub mod scope;

pub use import::ImportReport;
pub use query::SnapshotStatus;
pub use scope::{CallScope, CancelToken};

#[derive(Debug)]
pub enum ControlError {
    Snapshot(SnapshotError),
    Store(StoreError),
    Validation(String),
    Canceled,
    DeadlineExceeded,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Validation(message) => write!(f, "{message}"),
            Self::Canceled => write!(f, "operation canceled"),
            Self::DeadlineExceeded => write!(f, "operation deadline exceeded"),
        }
    }
}

impl Error for ControlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Snapshot(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SnapshotError> for ControlError {
    fn from(err: SnapshotError) -> Self {
        Self::Snapshot(err)
    }
}

impl From<StoreError> for ControlError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Entry point for importing snapshots and querying the stored graph.
///
/// Holds only a store handle; construct one per database and share clones.
pub struct GraphControlPlane<C: Connection> {
    store: SurrealGraphStore<C>,
}

impl<C: Connection> Clone for GraphControlPlane<C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<C: Connection> GraphControlPlane<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            store: SurrealGraphStore::new(db),
        }
    }

    pub fn from_arc(db: Arc<Surreal<C>>) -> Self {
        Self {
            store: SurrealGraphStore::from_arc(db),
        }
    }

    pub const fn with_store(store: SurrealGraphStore<C>) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &SurrealGraphStore<C> {
        &self.store
    }
}

fn require_id(id: &str, field: &str) -> Result<(), ControlError> {
    if id.trim().is_empty() {
        return Err(ControlError::Validation(format!("{field} is required")));
    }
    Ok(())
}
