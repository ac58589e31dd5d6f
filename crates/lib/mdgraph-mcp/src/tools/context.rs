use rmcp::{
    ErrorData,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;

use crate::MdgraphMcp;

/// Payload listing the MCP commands this server offers.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HelpCommands {
    pub commands: Vec<String>,
}

impl Default for HelpCommands {
    fn default() -> Self {
        Self {
            commands: vec![
                "help - List the MCP commands of this server.".to_string(),
                "snapshot_help - Describe the snapshot directory layout and how to import it."
                    .to_string(),
                "structure_snapshot_info - Show which configuration snapshot is loaded."
                    .to_string(),
                "structure_import_snapshot - Load a snapshot directory into the store."
                    .to_string(),
                "structure_search - Search objects by name or synonym, optionally by type."
                    .to_string(),
                "structure_get_object - Fetch one object with its attributes, tabular sections, forms, and modules."
                    .to_string(),
                "structure_find_references - List incoming and outgoing relations of an object."
                    .to_string(),
                "structure_list_types - Count objects per metadata type.".to_string(),
                "health - Returns ok.".to_string(),
            ],
        }
    }
}

#[tool_router(router = tool_router_context, vis = "pub")]
impl<C: Connection> MdgraphMcp<C> {
    #[tool(description = "List the MCP commands of this server.")]
    async fn help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::json(HelpCommands::default())?]))
    }

    #[tool(description = "Describes the snapshot directory layout and how snapshots are imported.")]
    async fn snapshot_help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text(
r#"
1.  A snapshot is a directory with three JSON files exported from the configuration designer:
        - meta.json: {"version", "configName", "configVersion", "exportedAt", "source", "objectCount", "indexVersion"}
        - objects.json: array of {"id", "type", "name", "synonym", "props", "tabularSections", "forms", "modules", "description"}
            - props: array of {"name", "type", "synonym"}
            - tabularSections: array of {"name", "props"}
        - relations.json: array of {"from", "to", "kind"}, e.g. kind `references` or `uses`.
    Missing fields are treated as empty.
2.  Import a snapshot with one of:
        - the `structure_import_snapshot` tool, optionally passing `snapshotDir`;
        - `POST /import` on the ingest HTTP server with the three documents as {"meta", "objects", "relations"};
        - `mdgraph-mcpd --import-only --snapshot-dir <dir>`.
3.  Objects are upserted by id. Relations are appended on every import, and relations whose
    endpoints are not objects of the same snapshot are skipped.
4.  Object ids are `<type>.<Name>`. Long type prefixes are normalized on lookup:
    Document -> doc, Catalog -> cat, CommonModule -> commonmodule, Report -> report,
    DataProcessor -> dataprocessor.
"#
        )]))
    }
}
