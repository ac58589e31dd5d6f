//! Snapshot loader.
//!
//! A snapshot directory holds three JSON documents: `meta.json` (object),
//! `objects.json` (array of objects), and `relations.json` (array of objects).
//! Entries given as positional arrays are parse errors. Every read is confined
//! to the resolved snapshot root; a file that resolves outside it (through a
//! symlink or traversal sequence) is rejected before it is read.

use std::path::{Path, PathBuf};
use std::{error::Error, fmt, fs, io};

use mdgraph_store::models::{Keyed, Meta, Object, Relation, Snapshot};
use mdgraph_store::schema::{SNAPSHOT_META_FILE, SNAPSHOT_OBJECTS_FILE, SNAPSHOT_RELATIONS_FILE};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Error type for snapshot loading failures.
#[derive(Debug)]
pub enum SnapshotError {
    NotFound { path: PathBuf },
    PathEscape { path: PathBuf, root: PathBuf },
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Join(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => write!(f, "snapshot file not found: {}", path.display()),
            Self::PathEscape { path, root } => write!(
                f,
                "path {} is outside snapshot root {}",
                path.display(),
                root.display()
            ),
            Self::Io { path, source } => write!(f, "failed to read {}: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "invalid JSON in {}: {source}", path.display())
            }
            Self::Join(message) => write!(f, "snapshot load task failed: {message}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for SnapshotError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}

/// Loads meta, objects, and relations from `root`.
///
/// Either all three documents load or an error is returned; no partial
/// snapshot is ever handed back. An empty `root` means the current directory.
///
/// # Errors
/// Returns `SnapshotError` if the root or any file is missing, escapes the
/// root, cannot be read, or is not valid JSON of the expected shape.
pub fn load_snapshot(root: impl AsRef<Path>) -> Result<Snapshot, SnapshotError> {
    let root = resolve_root(root.as_ref())?;
    let meta: Keyed<Meta> = read_snapshot_file(&root, SNAPSHOT_META_FILE)?;
    let objects: Vec<Keyed<Object>> = read_snapshot_file(&root, SNAPSHOT_OBJECTS_FILE)?;
    let relations: Vec<Keyed<Relation>> = read_snapshot_file(&root, SNAPSHOT_RELATIONS_FILE)?;
    let objects: Vec<Object> = objects.into_iter().map(Keyed::into_inner).collect();
    let relations: Vec<Relation> = relations.into_iter().map(Keyed::into_inner).collect();
    debug!(
        root = %root.display(),
        objects = objects.len(),
        relations = relations.len(),
        "loaded snapshot"
    );
    Ok(Snapshot {
        meta: meta.into_inner(),
        objects,
        relations,
    })
}

/// Loads a snapshot on a blocking task.
///
/// # Errors
/// Returns `SnapshotError` if loading fails or the task panics.
pub async fn load_snapshot_async(root: impl Into<PathBuf>) -> Result<Snapshot, SnapshotError> {
    let root = root.into();
    tokio::task::spawn_blocking(move || load_snapshot(&root)).await?
}

/// Reads and decodes a single JSON document named `file_name` under `root`.
///
/// # Errors
/// Returns `SnapshotError::PathEscape` if the file resolves outside the
/// resolved root, or another variant if it cannot be read or decoded.
pub fn read_snapshot_file<T: DeserializeOwned>(
    root: &Path,
    file_name: &str,
) -> Result<T, SnapshotError> {
    let root = resolve_root(root)?;
    let path = ensure_inside_root(&root, &root.join(file_name))?;
    let data = fs::read(&path).map_err(|err| io_error(&path, err))?;
    serde_json::from_slice(&data).map_err(|source| SnapshotError::Parse { path, source })
}

fn resolve_root(root: &Path) -> Result<PathBuf, SnapshotError> {
    let root = if root.as_os_str().is_empty() {
        Path::new(".")
    } else {
        root
    };
    fs::canonicalize(root).map_err(|err| io_error(root, err))
}

fn ensure_inside_root(root: &Path, path: &Path) -> Result<PathBuf, SnapshotError> {
    let resolved = fs::canonicalize(path).map_err(|err| io_error(path, err))?;
    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(SnapshotError::PathEscape {
            path: resolved,
            root: root.to_path_buf(),
        })
    }
}

fn io_error(path: &Path, err: io::Error) -> SnapshotError {
    if err.kind() == io::ErrorKind::NotFound {
        SnapshotError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        SnapshotError::Io {
            path: path.to_path_buf(),
            source: err,
        }
    }
}
