//! Object identifier normalization.
//!
//! Source data may spell type prefixes in long form (`Document.Invoice`) or in
//! abbreviated form (`doc.Invoice`). Both are reduced to one canonical spelling
//! so that relations and objects can be joined regardless of the convention.

use std::collections::HashSet;

use crate::models::Object;

/// Long-form type prefixes and their canonical short aliases.
const TYPE_ALIASES: &[(&str, &str)] = &[
    ("document", "doc"),
    ("catalog", "cat"),
    ("commonmodule", "commonmodule"),
    ("report", "report"),
    ("dataprocessor", "dataprocessor"),
];

/// Returns the canonical form of an object identifier.
///
/// The prefix before the first `.` is lower-cased and mapped to its short
/// alias when one exists; the remainder is kept verbatim. Identifiers without
/// a `.` are returned unchanged.
#[must_use]
pub fn normalize_id(id: &str) -> String {
    let Some((prefix, name)) = id.split_once('.') else {
        return id.to_string();
    };
    let prefix = prefix.to_lowercase();
    let canonical = TYPE_ALIASES
        .iter()
        .find(|(long, _)| *long == prefix)
        .map_or(prefix.as_str(), |(_, short)| *short);
    format!("{canonical}.{name}")
}

/// Object IDs known to an import, in both raw and normalized spelling.
#[derive(Debug, Clone, Default)]
pub struct KnownIds {
    ids: HashSet<String>,
}

impl KnownIds {
    #[must_use]
    pub fn from_objects(objects: &[Object]) -> Self {
        let mut ids = HashSet::with_capacity(objects.len() * 2);
        for object in objects {
            ids.insert(object.id.clone());
            ids.insert(normalize_id(&object.id));
        }
        Self { ids }
    }

    /// Returns true when either the raw or the normalized spelling of
    /// `endpoint` belongs to a known object.
    #[must_use]
    pub fn admits(&self, endpoint: &str) -> bool {
        self.ids.contains(endpoint) || self.ids.contains(&normalize_id(endpoint))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: &str) -> Object {
        Object {
            id: id.to_string(),
            ..Object::default()
        }
    }

    #[test]
    fn ids_without_separator_are_untouched() {
        for id in ["Invoice", "UPPER", "", "  spaced  ", "Документ"] {
            assert_eq!(normalize_id(id), id);
        }
    }

    #[test]
    fn long_prefixes_map_to_short_aliases() {
        assert_eq!(normalize_id("document.Foo"), "doc.Foo");
        assert_eq!(normalize_id("Document.Foo"), "doc.Foo");
        assert_eq!(normalize_id("CATALOG.Goods"), "cat.Goods");
        assert_eq!(normalize_id("CommonModule.Utils"), "commonmodule.Utils");
        assert_eq!(normalize_id("document.Foo"), normalize_id("doc.Foo"));
    }

    #[test]
    fn unknown_prefix_is_lowercased_and_suffix_kept() {
        assert_eq!(
            normalize_id("InformationRegister.Prices.Sub"),
            "informationregister.Prices.Sub"
        );
        assert_eq!(normalize_id(".Hidden"), ".Hidden");
    }

    #[test]
    fn normalization_is_idempotent() {
        for id in [
            "document.Foo",
            "doc.Foo",
            "Catalog.Bar",
            "Report.X.Y",
            "plain",
            "Enum.Status",
            "DataProcessor.Import",
        ] {
            let once = normalize_id(id);
            assert_eq!(normalize_id(&once), once, "not idempotent for {id}");
        }
    }

    #[test]
    fn known_ids_admit_raw_or_normalized_spelling() {
        let known = KnownIds::from_objects(&[object("Document.Invoice"), object("cat.Goods")]);
        assert!(known.admits("Document.Invoice"));
        assert!(known.admits("doc.Invoice"));
        assert!(known.admits("document.Invoice"));
        assert!(known.admits("Catalog.Goods"));
        assert!(!known.admits("cat.Partners"));
        assert_eq!(known.len(), 3);
    }
}
