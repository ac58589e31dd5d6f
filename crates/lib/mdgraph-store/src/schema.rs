pub const TABLE_META: &str = "meta";
pub const TABLE_OBJECTS: &str = "objects";
pub const TABLE_RELATIONS: &str = "relations";

pub const META_VERSION: &str = "version";
pub const META_CONFIG_NAME: &str = "configName";
pub const META_CONFIG_VERSION: &str = "configVersion";
pub const META_EXPORTED_AT: &str = "exportedAt";
pub const META_SOURCE: &str = "source";
pub const META_OBJECT_COUNT: &str = "objectCount";
pub const META_INDEX_VERSION: &str = "indexVersion";

pub const SNAPSHOT_META_FILE: &str = "meta.json";
pub const SNAPSHOT_OBJECTS_FILE: &str = "objects.json";
pub const SNAPSHOT_RELATIONS_FILE: &str = "relations.json";

pub const SEARCH_DEFAULT_LIMIT: i64 = 20;
pub const SEARCH_MAX_LIMIT: i64 = 50;
pub const REFERENCES_DEFAULT_LIMIT: i64 = 50;
pub const REFERENCES_MAX_LIMIT: i64 = 100;

/// Relations written per insert statement during an import.
pub const RELATION_BATCH_SIZE: usize = 1000;

/// Clamps a caller-supplied page size: non-positive values fall back to
/// `default`, larger values are capped at `max`.
#[must_use]
pub const fn clamp_limit(limit: i64, default: i64, max: i64) -> i64 {
    if limit <= 0 {
        default
    } else if limit > max {
        max
    } else {
        limit
    }
}
