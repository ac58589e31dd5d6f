use mdgraph_core::control::CallScope;
use mdgraph_store::models::{Direction, Object, Relation, TypeCount};
use rmcp::{
    ErrorData,
    RoleServer,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    service::RequestContext,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;

use crate::MdgraphMcp;
use crate::helpers;

/// Parameters for searching objects by name or synonym.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    /// Case-insensitive substring of the object name or synonym.
    #[serde(default)]
    pub query: String,
    /// Exact object type, case-insensitive (e.g. `document`, `catalog`).
    #[serde(default, rename = "type")]
    pub object_type: Option<String>,
    /// Page size; defaults to 20, capped at 50.
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Parameters for fetching one object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetObjectParams {
    #[serde(default)]
    pub object_id: String,
}

/// Parameters for listing an object's relations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindReferencesParams {
    #[serde(default)]
    pub object_id: String,
    /// `incoming`, `outgoing`, or `both` (default).
    #[serde(default)]
    pub direction: Option<String>,
    /// Only relations of this kind, e.g. `references` or `uses`.
    #[serde(default)]
    pub kind: Option<String>,
    /// Per-direction limit; defaults to 50, capped at 100.
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Short form of an object returned by search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchMatch {
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: String,
    pub name: String,
    pub synonym: String,
}

impl From<Object> for SearchMatch {
    fn from(object: Object) -> Self {
        Self {
            id: object.id,
            object_type: object.object_type,
            name: object.name,
            synonym: object.synonym,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResponse {
    pub summary: String,
    pub total: u64,
    pub matches: Vec<SearchMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetObjectResponse {
    pub summary: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<Object>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferencesResponse {
    pub summary: String,
    pub incoming: Vec<Relation>,
    pub outgoing: Vec<Relation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListTypesResponse {
    pub summary: String,
    pub types: Vec<TypeCount>,
}

fn optional_text(value: Option<&str>) -> &str {
    value.map_or("", str::trim)
}

impl<C: Connection> MdgraphMcp<C> {
    pub(crate) async fn search_response(
        &self,
        scope: &CallScope,
        params: &SearchParams,
    ) -> Result<SearchResponse, ErrorData> {
        let query = params.query.trim();
        if query.is_empty() {
            return Err(helpers::invalid_params("query is required"));
        }
        let page = self
            .control
            .search(
                scope,
                query,
                optional_text(params.object_type.as_deref()),
                params.limit.unwrap_or_default(),
                params.offset.unwrap_or_default(),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(SearchResponse {
            summary: format!("Found {} objects.", page.total),
            total: page.total,
            matches: page.objects.into_iter().map(SearchMatch::from).collect(),
        })
    }

    pub(crate) async fn get_object_response(
        &self,
        scope: &CallScope,
        params: &GetObjectParams,
    ) -> Result<GetObjectResponse, ErrorData> {
        let object_id = params.object_id.trim();
        let object = self
            .control
            .get_object(scope, object_id)
            .await
            .map_err(helpers::map_err)?;
        Ok(match object {
            Some(object) => GetObjectResponse {
                summary: format!("Object {}.", object.name),
                found: true,
                object: Some(object),
            },
            None => GetObjectResponse {
                summary: format!("Object not found: {object_id}"),
                found: false,
                object: None,
            },
        })
    }

    pub(crate) async fn find_references_response(
        &self,
        scope: &CallScope,
        params: &FindReferencesParams,
    ) -> Result<ReferencesResponse, ErrorData> {
        let direction = optional_text(params.direction.as_deref())
            .parse::<Direction>()
            .map_err(|err| helpers::invalid_params(err.to_string()))?;
        let references = self
            .control
            .find_references(
                scope,
                params.object_id.trim(),
                direction,
                optional_text(params.kind.as_deref()),
                params.limit.unwrap_or_default(),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(ReferencesResponse {
            summary: format!(
                "Incoming: {}, outgoing: {}.",
                references.incoming.len(),
                references.outgoing.len()
            ),
            incoming: references.incoming,
            outgoing: references.outgoing,
        })
    }

    pub(crate) async fn list_types_response(
        &self,
        scope: &CallScope,
    ) -> Result<ListTypesResponse, ErrorData> {
        let types = self
            .control
            .list_types(scope)
            .await
            .map_err(helpers::map_err)?;
        Ok(ListTypesResponse {
            summary: format!("{} metadata types in the snapshot.", types.len()),
            types,
        })
    }
}

#[tool_router(router = tool_router_query, vis = "pub")]
impl<C: Connection> MdgraphMcp<C> {
    #[tool(description = "Search metadata objects by a substring of name or synonym, optionally filtered by type.")]
    async fn structure_search(
        &self,
        Parameters(params): Parameters<SearchParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let scope = self.request_scope(&ctx);
        let found = self.search_response(&scope, &params).await?;
        Ok(CallToolResult::success(vec![Content::json(found)?]))
    }

    #[tool(description = "Fetch a metadata object by id with its attributes, tabular sections, forms, and modules.")]
    async fn structure_get_object(
        &self,
        Parameters(params): Parameters<GetObjectParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let scope = self.request_scope(&ctx);
        let object = self.get_object_response(&scope, &params).await?;
        Ok(CallToolResult::success(vec![Content::json(object)?]))
    }

    #[tool(description = "List relations pointing to and/or from a metadata object.")]
    async fn structure_find_references(
        &self,
        Parameters(params): Parameters<FindReferencesParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let scope = self.request_scope(&ctx);
        let references = self.find_references_response(&scope, &params).await?;
        Ok(CallToolResult::success(vec![Content::json(references)?]))
    }

    #[tool(description = "Count metadata objects per type.")]
    async fn structure_list_types(
        &self,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let scope = self.request_scope(&ctx);
        let types = self.list_types_response(&scope).await?;
        Ok(CallToolResult::success(vec![Content::json(types)?]))
    }
}
