//! Graph store backed by `SurrealDB`.
//!
//! The store persists snapshot metadata, objects, and relations in flat tables
//! and answers search, lookup, adjacency, and type-count queries.

pub mod surreal;

pub use surreal::{ImportTarget, StoreError, StoreResult, SurrealGraphStore};
