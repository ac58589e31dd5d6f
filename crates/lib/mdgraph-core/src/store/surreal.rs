use std::{error::Error, fmt, sync::Arc};

use mdgraph_store::ids::{KnownIds, normalize_id};
use mdgraph_store::models::{
    Direction,
    Meta,
    Object,
    Prop,
    References,
    Relation,
    SearchPage,
    TabularSection,
    TypeCount,
};
use mdgraph_store::schema::{
    META_CONFIG_NAME,
    META_CONFIG_VERSION,
    META_EXPORTED_AT,
    META_INDEX_VERSION,
    META_OBJECT_COUNT,
    META_SOURCE,
    META_VERSION,
    REFERENCES_DEFAULT_LIMIT,
    REFERENCES_MAX_LIMIT,
    SEARCH_DEFAULT_LIMIT,
    RELATION_BATCH_SIZE,
    SEARCH_MAX_LIMIT,
    TABLE_META,
    TABLE_OBJECTS,
    TABLE_RELATIONS,
    clamp_limit,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use surrealdb::{Connection, Surreal, types::SurrealValue};
use tracing::debug;

/// The write that failed during an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    Meta(String),
    Object(String),
    /// A batch of relations, named by its first edge.
    Relations { from: String, to: String, len: usize },
}

impl fmt::Display for ImportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meta(key) => write!(f, "meta key {key}"),
            Self::Object(id) => write!(f, "object {id}"),
            Self::Relations { from, to, len } => {
                write!(f, "batch of {len} relations starting with {from} -> {to}")
            }
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    Surreal(Box<surrealdb::Error>),
    InvalidInput(String),
    Corrupt {
        record: String,
        field: &'static str,
        message: String,
    },
    Import {
        target: ImportTarget,
        source: Box<Self>,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surreal(err) => write!(f, "SurrealDB error: {err}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
            Self::Corrupt {
                record,
                field,
                message,
            } => write!(f, "Corrupt {field} in stored record {record}: {message}"),
            Self::Import { target, source } => write!(f, "Import failed at {target}: {source}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Import { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        Self::Surreal(Box::new(err))
    }
}

impl StoreError {
    /// True when the failure was caused by the caller's data rather than the database.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Self::InvalidInput(_) => true,
            Self::Import { source, .. } => source.is_invalid_input(),
            Self::Surreal(_) | Self::Corrupt { .. } => false,
        }
    }

    fn import(target: ImportTarget, source: impl Into<Self>) -> Self {
        Self::Import {
            target,
            source: Box::new(source.into()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Graph store over three flat tables: `meta`, `objects`, and `relations`.
///
/// The store keeps no graph state in memory; every call goes to the database,
/// so clones can be shared freely between concurrent callers.
pub struct SurrealGraphStore<C: Connection> {
    db: Arc<Surreal<C>>,
}

impl<C: Connection> Clone for SurrealGraphStore<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealGraphStore<C> {
    #[must_use]
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db: Arc::new(db),
        }
    }

    #[must_use]
    pub const fn from_arc(db: Arc<Surreal<C>>) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn db(&self) -> &Surreal<C> {
        &self.db
    }

    /// Writes a snapshot into the store.
    ///
    /// Objects and meta keys are upserted, so repeating an import leaves them
    /// unchanged. Relations are appended in batches and never deduplicated; a
    /// relation is skipped unless both endpoints name a known object in raw or
    /// normalized form. Endpoints are stored normalized. Meta is written last,
    /// so it only changes once every object and relation is in place.
    ///
    /// # Errors
    /// Returns `StoreError::Import` naming the failing write. An object without
    /// an id is rejected before anything is written; writes made before any
    /// later failure are kept.
    pub async fn import(
        &self,
        meta: &Meta,
        objects: &[Object],
        relations: &[Relation],
    ) -> StoreResult<()> {
        if let Some(position) = objects.iter().position(|object| object.id.is_empty()) {
            return Err(StoreError::import(
                ImportTarget::Object(format!("#{position}")),
                StoreError::InvalidInput("object id is required".to_string()),
            ));
        }
        let known = KnownIds::from_objects(objects);

        for object in objects {
            self.upsert_object(object).await?;
        }

        let admitted: Vec<&Relation> = relations
            .iter()
            .filter(|relation| known.admits(&relation.from) && known.admits(&relation.to))
            .collect();
        for batch in admitted.chunks(RELATION_BATCH_SIZE) {
            self.insert_relations(batch).await?;
        }

        for (key, value) in meta_entries(meta, objects.len()) {
            self.put_meta(key, value).await?;
        }

        debug!(
            objects = objects.len(),
            relations = admitted.len(),
            skipped = relations.len() - admitted.len(),
            "snapshot written"
        );
        Ok(())
    }

    async fn put_meta(&self, key: &'static str, value: String) -> StoreResult<()> {
        let entry = MetaEntry {
            key: key.to_string(),
            value,
        };
        let _: Option<MetaEntry> = self
            .db
            .upsert((TABLE_META, key.to_string()))
            .content(entry)
            .await
            .map_err(|err| StoreError::import(ImportTarget::Meta(key.to_string()), err))?;
        Ok(())
    }

    async fn upsert_object(&self, object: &Object) -> StoreResult<()> {
        let target = || ImportTarget::Object(object.id.clone());
        let row = ObjectRow::encode(object).map_err(|err| StoreError::import(target(), err))?;
        let _: Option<ObjectRow> = self
            .db
            .upsert((TABLE_OBJECTS, object.id.clone()))
            .content(row)
            .await
            .map_err(|err| StoreError::import(target(), err))?;
        Ok(())
    }

    async fn insert_relations(&self, batch: &[&Relation]) -> StoreResult<()> {
        let Some(first) = batch.first() else {
            return Ok(());
        };
        let rows: Vec<RelationRow> = batch
            .iter()
            .map(|relation| RelationRow::from_relation(relation))
            .collect();
        let _: Vec<RelationRow> = self
            .db
            .insert(TABLE_RELATIONS)
            .content(rows)
            .await
            .map_err(|err| {
                StoreError::import(
                    ImportTarget::Relations {
                        from: first.from.clone(),
                        to: first.to.clone(),
                        len: batch.len(),
                    },
                    err,
                )
            })?;
        Ok(())
    }

    /// Searches objects by name or synonym substring, ignoring case.
    ///
    /// An empty query matches every object; a non-empty type filter must match
    /// the object type exactly (ignoring case). Results are ordered by name.
    ///
    /// # Errors
    /// Returns `StoreError` if the query fails or a stored row cannot be decoded.
    pub async fn search(
        &self,
        query: &str,
        type_filter: &str,
        limit: i64,
        offset: i64,
    ) -> StoreResult<SearchPage> {
        let limit = clamp_limit(limit, SEARCH_DEFAULT_LIMIT, SEARCH_MAX_LIMIT);
        let offset = offset.max(0);
        let query = query.trim().to_lowercase();
        let type_filter = type_filter.trim().to_lowercase();
        let statements = "SELECT count() AS total FROM objects WHERE ($query = '' OR string::lowercase(name) CONTAINS $query OR string::lowercase(synonym) CONTAINS $query) AND ($type_filter = '' OR string::lowercase(object_type) = $type_filter) GROUP ALL;
            SELECT * FROM objects WHERE ($query = '' OR string::lowercase(name) CONTAINS $query OR string::lowercase(synonym) CONTAINS $query) AND ($type_filter = '' OR string::lowercase(object_type) = $type_filter) ORDER BY name ASC LIMIT $limit START $offset;";
        let mut response = self
            .db
            .query(statements)
            .bind(("query", query))
            .bind(("type_filter", type_filter))
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await?;
        let totals: Vec<TotalRow> = response.take(0)?;
        let rows: Vec<ObjectRow> = response.take(1)?;
        let objects = rows
            .into_iter()
            .map(ObjectRow::decode)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(SearchPage {
            objects,
            total: first_total(&totals),
        })
    }

    /// Fetches an object by id.
    ///
    /// The normalized id is tried first; objects are keyed by the id they were
    /// imported with, so the raw id is tried when it differs.
    ///
    /// # Errors
    /// Returns `StoreError` if the query fails or the row cannot be decoded.
    pub async fn get_object(&self, id: &str) -> StoreResult<Option<Object>> {
        if id.is_empty() {
            return Ok(None);
        }
        let canonical = normalize_id(id);
        if let Some(object) = self.select_object(&canonical).await? {
            return Ok(Some(object));
        }
        if canonical == id {
            return Ok(None);
        }
        self.select_object(id).await
    }

    async fn select_object(&self, id: &str) -> StoreResult<Option<Object>> {
        let row: Option<ObjectRow> = self.db.select((TABLE_OBJECTS, id.to_string())).await?;
        row.map(ObjectRow::decode).transpose()
    }

    /// Lists relations pointing at (`incoming`) or leaving (`outgoing`) an
    /// object. The limit applies to each direction separately.
    ///
    /// # Errors
    /// Returns `StoreError` if a query fails.
    pub async fn find_references(
        &self,
        id: &str,
        direction: Direction,
        kind: &str,
        limit: i64,
    ) -> StoreResult<References> {
        let id = normalize_id(id);
        let limit = clamp_limit(limit, REFERENCES_DEFAULT_LIMIT, REFERENCES_MAX_LIMIT);
        let mut references = References::default();
        if direction.includes_incoming() {
            references.incoming = self
                .relations_where(
                    "SELECT from_id, to_id, kind FROM relations WHERE to_id = $id AND ($kind = '' OR kind = $kind) LIMIT $limit;",
                    &id,
                    kind,
                    limit,
                )
                .await?;
        }
        if direction.includes_outgoing() {
            references.outgoing = self
                .relations_where(
                    "SELECT from_id, to_id, kind FROM relations WHERE from_id = $id AND ($kind = '' OR kind = $kind) LIMIT $limit;",
                    &id,
                    kind,
                    limit,
                )
                .await?;
        }
        Ok(references)
    }

    async fn relations_where(
        &self,
        query: &'static str,
        id: &str,
        kind: &str,
        limit: i64,
    ) -> StoreResult<Vec<Relation>> {
        let mut response = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("kind", kind.to_string()))
            .bind(("limit", limit))
            .await?;
        let rows: Vec<RelationRow> = response.take(0)?;
        Ok(rows.into_iter().map(RelationRow::into_relation).collect())
    }

    /// Counts objects per type, ordered by type name.
    ///
    /// # Errors
    /// Returns `StoreError` if the query fails.
    pub async fn list_types(&self) -> StoreResult<Vec<TypeCount>> {
        let query = "SELECT object_type, count() AS count FROM objects GROUP BY object_type;";
        let mut response = self.db.query(query).await?;
        let rows: Vec<TypeRow> = response.take(0)?;
        let mut types: Vec<TypeCount> = rows
            .into_iter()
            .map(|row| TypeCount {
                object_type: row.object_type,
                count: row.count,
            })
            .collect();
        types.sort_by(|left, right| left.object_type.cmp(&right.object_type));
        Ok(types)
    }

    /// Returns the metadata of the last import, or an empty `Meta` if nothing
    /// has been imported.
    ///
    /// # Errors
    /// Returns `StoreError` if the query fails or a numeric field is corrupt.
    pub async fn meta(&self) -> StoreResult<Meta> {
        Ok(self.stored_meta().await?.unwrap_or_default())
    }

    /// Returns the metadata of the last import, or `None` if no meta key has
    /// ever been written.
    ///
    /// # Errors
    /// Returns `StoreError` if the query fails or a numeric field is corrupt.
    pub async fn stored_meta(&self) -> StoreResult<Option<Meta>> {
        let entries: Vec<MetaEntry> = self.db.select(TABLE_META).await?;
        if entries.is_empty() {
            return Ok(None);
        }
        let mut meta = Meta::default();
        for entry in entries {
            match entry.key.as_str() {
                META_VERSION => meta.version = entry.value,
                META_CONFIG_NAME => meta.config_name = entry.value,
                META_CONFIG_VERSION => meta.config_version = entry.value,
                META_EXPORTED_AT => meta.exported_at = entry.value,
                META_SOURCE => meta.source = entry.value,
                META_OBJECT_COUNT => meta.object_count = parse_meta_number(&entry)?,
                META_INDEX_VERSION => meta.index_version = parse_meta_number(&entry)?,
                _ => {}
            }
        }
        Ok(Some(meta))
    }

    /// Counts the objects currently stored.
    ///
    /// # Errors
    /// Returns `StoreError` if the query fails.
    pub async fn count_objects(&self) -> StoreResult<u64> {
        self.count("SELECT count() AS total FROM objects GROUP ALL;").await
    }

    /// Counts the relations currently stored.
    ///
    /// # Errors
    /// Returns `StoreError` if the query fails.
    pub async fn count_relations(&self) -> StoreResult<u64> {
        self.count("SELECT count() AS total FROM relations GROUP ALL;").await
    }

    async fn count(&self, query: &'static str) -> StoreResult<u64> {
        let mut response = self.db.query(query).await?;
        let totals: Vec<TotalRow> = response.take(0)?;
        Ok(first_total(&totals))
    }
}

fn meta_entries(meta: &Meta, object_count: usize) -> [(&'static str, String); 7] {
    [
        (META_VERSION, meta.version.clone()),
        (META_CONFIG_NAME, meta.config_name.clone()),
        (META_CONFIG_VERSION, meta.config_version.clone()),
        (META_EXPORTED_AT, meta.exported_at.clone()),
        (META_SOURCE, meta.source.clone()),
        (META_OBJECT_COUNT, object_count.to_string()),
        (META_INDEX_VERSION, meta.index_version.to_string()),
    ]
}

fn parse_meta_number<T: std::str::FromStr>(entry: &MetaEntry) -> StoreResult<T>
where
    T::Err: fmt::Display,
{
    let value = entry.value.trim();
    let value = if value.is_empty() { "0" } else { value };
    value.parse::<T>().map_err(|err| corrupt_meta(entry, &err))
}

fn corrupt_meta(entry: &MetaEntry, err: &impl fmt::Display) -> StoreError {
    StoreError::Corrupt {
        record: format!("{TABLE_META}:{}", entry.key),
        field: "value",
        message: err.to_string(),
    }
}

fn first_total(totals: &[TotalRow]) -> u64 {
    totals.first().map_or(0, |row| row.total)
}

#[derive(Debug, Clone, Serialize, Deserialize, SurrealValue)]
#[surreal(crate = "surrealdb::types")]
struct MetaEntry {
    key: String,
    value: String,
}

/// Persisted form of an object; structured fields are JSON strings.
#[derive(Debug, Clone, Serialize, Deserialize, SurrealValue)]
#[surreal(crate = "surrealdb::types")]
struct ObjectRow {
    object_id: String,
    object_type: String,
    name: String,
    synonym: String,
    props_json: String,
    tabular_sections_json: String,
    forms_json: String,
    modules_json: String,
    description: String,
}

impl ObjectRow {
    fn encode(object: &Object) -> StoreResult<Self> {
        Ok(Self {
            object_id: object.id.clone(),
            object_type: object.object_type.clone(),
            name: object.name.clone(),
            synonym: object.synonym.clone(),
            props_json: encode_json(&object.props)?,
            tabular_sections_json: encode_json(&object.tabular_sections)?,
            forms_json: encode_json(&object.forms)?,
            modules_json: encode_json(&object.modules)?,
            description: object.description.clone(),
        })
    }

    fn decode(self) -> StoreResult<Object> {
        let props: Vec<Prop> = decode_json(&self.object_id, "props_json", &self.props_json)?;
        let tabular_sections: Vec<TabularSection> = decode_json(
            &self.object_id,
            "tabular_sections_json",
            &self.tabular_sections_json,
        )?;
        let forms: Vec<String> = decode_json(&self.object_id, "forms_json", &self.forms_json)?;
        let modules: Vec<String> =
            decode_json(&self.object_id, "modules_json", &self.modules_json)?;
        Ok(Object {
            id: self.object_id,
            object_type: self.object_type,
            name: self.name,
            synonym: self.synonym,
            props,
            tabular_sections,
            forms,
            modules,
            description: self.description,
        })
    }
}

fn encode_json<T: Serialize>(value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|err| StoreError::InvalidInput(err.to_string()))
}

fn decode_json<T: DeserializeOwned + Default>(
    record: &str,
    field: &'static str,
    raw: &str,
) -> StoreResult<T> {
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(raw).map_err(|err| StoreError::Corrupt {
        record: record.to_string(),
        field,
        message: err.to_string(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, SurrealValue)]
#[surreal(crate = "surrealdb::types")]
struct RelationRow {
    from_id: String,
    to_id: String,
    kind: String,
}

impl RelationRow {
    fn from_relation(relation: &Relation) -> Self {
        Self {
            from_id: normalize_id(&relation.from),
            to_id: normalize_id(&relation.to),
            kind: relation.kind.clone(),
        }
    }

    fn into_relation(self) -> Relation {
        Relation {
            from: self.from_id,
            to: self.to_id,
            kind: self.kind,
        }
    }
}

#[derive(Deserialize, SurrealValue)]
#[surreal(crate = "surrealdb::types")]
struct TotalRow {
    total: u64,
}

#[derive(Deserialize, SurrealValue)]
#[surreal(crate = "surrealdb::types")]
struct TypeRow {
    object_type: String,
    count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_object() -> Object {
        Object {
            id: "doc.Invoice".to_string(),
            object_type: "document".to_string(),
            name: "Invoice".to_string(),
            synonym: "Customer invoice".to_string(),
            props: vec![Prop {
                name: "Partner".to_string(),
                prop_type: "CatalogRef.Partners".to_string(),
                synonym: "Partner".to_string(),
            }],
            tabular_sections: vec![TabularSection {
                name: "Goods".to_string(),
                props: vec![Prop {
                    name: "Quantity".to_string(),
                    prop_type: "Number".to_string(),
                    synonym: String::new(),
                }],
            }],
            forms: vec!["DocumentForm".to_string(), "ListForm".to_string()],
            modules: vec!["ObjectModule".to_string()],
            description: "Outgoing invoice".to_string(),
        }
    }

    #[test]
    fn invalid_input_is_seen_through_import_wrapper() {
        let err = StoreError::import(
            ImportTarget::Object(String::new()),
            StoreError::InvalidInput("object id is required".to_string()),
        );
        assert!(err.is_invalid_input());
        let corrupt = StoreError::Corrupt {
            record: "doc.Invoice".to_string(),
            field: "props_json",
            message: "bad".to_string(),
        };
        assert!(!corrupt.is_invalid_input());
    }

    #[test]
    fn object_row_roundtrip_keeps_structure() {
        let object = sample_object();
        let row = ObjectRow::encode(&object).expect("encode should succeed");
        assert!(row.props_json.starts_with('['));
        let decoded = row.decode().expect("decode should succeed");
        assert_eq!(decoded, object);
    }

    #[test]
    fn corrupt_blob_reports_field_and_record() {
        let mut row = ObjectRow::encode(&sample_object()).expect("encode should succeed");
        row.forms_json = "{not json".to_string();
        let err = row.decode().expect_err("decode should fail");
        match err {
            StoreError::Corrupt { record, field, .. } => {
                assert_eq!(record, "doc.Invoice");
                assert_eq!(field, "forms_json");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn meta_entries_use_argument_count() {
        let meta = Meta {
            object_count: 999,
            ..Meta::default()
        };
        let entries = meta_entries(&meta, 3);
        let count = entries
            .iter()
            .find(|(key, _)| *key == META_OBJECT_COUNT)
            .map(|(_, value)| value.as_str());
        assert_eq!(count, Some("3"));
    }

    #[test]
    fn import_target_names_the_failing_write() {
        let target = ImportTarget::Relations {
            from: "doc.A".to_string(),
            to: "cat.B".to_string(),
            len: 2,
        };
        assert_eq!(target.to_string(), "batch of 2 relations starting with doc.A -> cat.B");
        assert_eq!(ImportTarget::Object("doc.A".to_string()).to_string(), "object doc.A");
    }
}
