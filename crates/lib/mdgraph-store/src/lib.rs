//! Snapshot data model and identifier helpers for mdgraph.
//!
//! This crate defines the canonical types shared by the snapshot loader, the
//! graph store, and the MCP/HTTP surfaces, plus the identifier normalizer used
//! to reconcile long and abbreviated type prefixes.

pub mod ids;
pub mod models;
pub mod schema;

pub use ids::{KnownIds, normalize_id};
pub use models::*;
