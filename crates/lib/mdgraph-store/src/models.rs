use std::{error::Error, fmt, marker::PhantomData, str::FromStr};

use serde::de::value::MapAccessDeserializer;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Decodes `T` from a JSON object only.
///
/// Derived struct decoders also accept a sequence and fill fields by
/// position; snapshot documents must name their fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyed<T>(pub T);

impl<T> Keyed<T> {
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Keyed<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_map(KeyedVisitor(PhantomData))
            .map(Self)
    }
}

struct KeyedVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for KeyedVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<T, A::Error> {
        T::deserialize(MapAccessDeserializer::new(map))
    }
}

fn keyed<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Keyed::deserialize(deserializer).map(Keyed::into_inner)
}

fn keyed_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let entries: Vec<Keyed<T>> = Vec::deserialize(deserializer)?;
    Ok(entries.into_iter().map(Keyed::into_inner).collect())
}

/// Descriptive metadata for a snapshot; one per import.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Meta {
    pub version: String,
    pub config_name: String,
    pub config_version: String,
    pub exported_at: String,
    pub source: String,
    pub object_count: u64,
    pub index_version: u32,
}

/// Property (attribute) descriptor of an object or tabular section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Prop {
    pub name: String,
    #[serde(rename = "type")]
    pub prop_type: String,
    pub synonym: String,
}

/// Tabular section descriptor with its own ordered property list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TabularSection {
    pub name: String,
    #[serde(deserialize_with = "keyed_list")]
    pub props: Vec<Prop>,
}

/// A node of the metadata graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Object {
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: String,
    pub name: String,
    pub synonym: String,
    #[serde(deserialize_with = "keyed_list")]
    pub props: Vec<Prop>,
    #[serde(deserialize_with = "keyed_list")]
    pub tabular_sections: Vec<TabularSection>,
    pub forms: Vec<String>,
    pub modules: Vec<String>,
    pub description: String,
}

/// A directed, labelled edge between two objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Relation {
    pub from: String,
    pub to: String,
    pub kind: String,
}

/// Number of objects of one type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub object_type: String,
    pub count: u64,
}

/// A complete snapshot as exported by the source system.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Snapshot {
    #[serde(deserialize_with = "keyed")]
    pub meta: Meta,
    #[serde(deserialize_with = "keyed_list")]
    pub objects: Vec<Object>,
    #[serde(deserialize_with = "keyed_list")]
    pub relations: Vec<Relation>,
}

/// One page of search results together with the total match count.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchPage {
    pub objects: Vec<Object>,
    pub total: u64,
}

/// Relations touching an object, split by direction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct References {
    pub incoming: Vec<Relation>,
    pub outgoing: Vec<Relation>,
}

/// Which side of an object's relations to return.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
    #[default]
    Both,
}

impl Direction {
    #[must_use]
    pub const fn includes_incoming(self) -> bool {
        matches!(self, Self::Incoming | Self::Both)
    }

    #[must_use]
    pub const fn includes_outgoing(self) -> bool {
        matches!(self, Self::Outgoing | Self::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDirectionError(String);

impl fmt::Display for ParseDirectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown direction `{}` (expected incoming, outgoing, or both)",
            self.0
        )
    }
}

impl Error for ParseDirectionError {}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    /// Parses a direction; the empty string means both directions.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "both" => Ok(Self::Both),
            "incoming" => Ok(Self::Incoming),
            "outgoing" => Ok(Self::Outgoing),
            _ => Err(ParseDirectionError(value.to_string())),
        }
    }
}
