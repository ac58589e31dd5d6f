//! MCP server implementation for mdgraph.
//!
//! This crate wires the graph control plane into rmcp tool handlers and
//! exposes the read-only query surface plus snapshot import.

mod helpers;
mod tools;
pub mod server;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mdgraph_core::control::{CallScope, CancelToken, GraphControlPlane};
use rmcp::{
    ErrorData,
    RoleServer,
    ServerHandler,
    handler::server::tool::ToolRouter,
    service::RequestContext,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use surrealdb::Connection;

pub use tools::context::HelpCommands;
pub use tools::query::{
    FindReferencesParams,
    GetObjectParams,
    GetObjectResponse,
    ListTypesResponse,
    ReferencesResponse,
    SearchMatch,
    SearchParams,
    SearchResponse,
};
pub use tools::snapshot::{ImportSnapshotParams, ImportSnapshotResponse, SnapshotInfoResponse};

const SERVER_INSTRUCTIONS: &str = r"mdgraph answers questions about the metadata structure of a business-application configuration.

Workflow:
1. Call `structure_snapshot_info` to see which configuration snapshot is loaded.
   If nothing is loaded, call `structure_import_snapshot` (optionally with `snapshotDir`).
2. Find objects with `structure_search` (substring of name or synonym, optional `type`).
3. Inspect an object with `structure_get_object` using its `objectId` (e.g. `doc.SalesInvoice`).
4. Follow dependencies with `structure_find_references` (`direction`: incoming, outgoing, or both).
5. `structure_list_types` shows how many objects of each type exist.

Notes:
- Object ids look like `<type>.<Name>`. Long type prefixes are accepted: `Document.X` is `doc.X`,
  `Catalog.X` is `cat.X`, `CommonModule.X` is `commonmodule.X`.
- Use `help` for the command list and `snapshot_help` for the snapshot file layout.
- `health` returns `ok`.";

/// Settings shared by every tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolSettings {
    /// Upper bound for a single tool call; `None` means unbounded.
    pub call_timeout: Option<Duration>,
    /// Directory used by `structure_import_snapshot` when no `snapshotDir` is given.
    pub snapshot_dir: Option<PathBuf>,
}

/// MCP server wrapper around the graph control plane and tool routers.
pub struct MdgraphMcp<C: Connection> {
    tool_router: ToolRouter<Self>,
    control: GraphControlPlane<C>,
    settings: Arc<ToolSettings>,
}

impl<C: Connection> Clone for MdgraphMcp<C> {
    fn clone(&self) -> Self {
        Self {
            tool_router: self.tool_router.clone(),
            control: self.control.clone(),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<C: Connection> MdgraphMcp<C> {
    /// Creates a new server with default settings.
    #[must_use]
    pub fn new(control: GraphControlPlane<C>) -> Self {
        Self::with_settings(control, ToolSettings::default())
    }

    /// Creates a new server with explicit tool settings.
    #[must_use]
    pub fn with_settings(control: GraphControlPlane<C>, settings: ToolSettings) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_snapshot()
            + Self::tool_router_query()
            + Self::tool_router_context();
        Self {
            tool_router,
            control,
            settings: Arc::new(settings),
        }
    }

    #[must_use]
    pub const fn control(&self) -> &GraphControlPlane<C> {
        &self.control
    }

    #[must_use]
    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Builds the scope a single tool call runs under.
    pub(crate) fn call_scope(&self) -> CallScope {
        CallScope::from_timeout(self.settings.call_timeout)
    }

    /// Like [`Self::call_scope`], but also cancelled when the client cancels
    /// the request.
    pub(crate) fn request_scope(&self, ctx: &RequestContext<RoleServer>) -> CallScope {
        let cancelled = ctx.ct.clone().cancelled_owned();
        self.call_scope().with_cancel(CancelToken::linked(cancelled))
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl<C: Connection> MdgraphMcp<C> {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }
}

#[tool_handler]
impl<C: Connection> ServerHandler for MdgraphMcp<C> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
