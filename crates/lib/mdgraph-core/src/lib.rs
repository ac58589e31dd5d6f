//! Core services for mdgraph.
//!
//! This crate loads snapshot dumps from disk, persists them into the
//! `SurrealDB`-backed graph store, and exposes a control plane that answers
//! search and reference queries under caller-supplied deadlines.

pub mod control;
pub mod snapshot;
pub mod store;
