//! MCP tool modules.
//!
//! Tools are grouped by domain: snapshot status and import, structure
//! queries, and contextual help.

pub mod context;
pub mod query;
pub mod snapshot;
