//! Parameter maps and parameter extraction.
//!
//! A [`ParameterMap`] is always derived from a [`Document`]; it is cached
//! next to version entries for display but never treated as ground truth.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::document::Document;

/// An ordered mapping from parameter name to numeric value.
///
/// Order is the order in which names were first inserted, which for an
/// extracted map is the order of appearance in the document. Inserting an
/// existing name updates its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMap {
    entries: Vec<(String, f64)>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates a parameter, keeping its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lists the parameters whose value differs from `previous`.
    ///
    /// Parameters present only in `previous` are not reported; a proposal
    /// summary is about what the candidate sets, not what it drops.
    pub fn changes_from(&self, previous: &ParameterMap) -> Vec<ParameterChange> {
        self.iter()
            .filter_map(|(name, new)| {
                let old = previous.get(name);
                if old == Some(new) {
                    None
                } else {
                    Some(ParameterChange {
                        name: name.to_string(),
                        old,
                        new,
                    })
                }
            })
            .collect()
    }
}

impl FromIterator<(String, f64)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut map = ParameterMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

impl Serialize for ParameterMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParameterMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParameterMapVisitor;

        impl<'de> Visitor<'de> for ParameterMapVisitor {
            type Value = ParameterMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameter names to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ParameterMap, A::Error> {
                let mut map = ParameterMap::new();
                while let Some((name, value)) = access.next_entry::<String, f64>()? {
                    map.insert(name, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(ParameterMapVisitor)
    }
}

/// One parameter whose value differs between two maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterChange {
    pub name: String,
    /// Value before the change, `None` if the parameter is new.
    pub old: Option<f64>,
    pub new: f64,
}

/// Formats a parameter value the way it is written into a document.
///
/// Whole numbers are written without a fractional part.
pub fn format_value(value: f64) -> String {
    value.to_string()
}

/// Derives a [`ParameterMap`] from a document.
///
/// Extraction is total: a document without recognizable parameters yields an
/// empty map, never an error.
pub trait ParameterExtractor: Send + Sync {
    fn extract(&self, document: &Document) -> ParameterMap;
}

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s*=\s*(\d+(?:\.\d+)?)\s*;").expect("assignment pattern is valid")
});

/// Extracts `name = <number>;` assignments from OpenSCAD-style sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexParameterExtractor;

impl RegexParameterExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ParameterExtractor for RegexParameterExtractor {
    fn extract(&self, document: &Document) -> ParameterMap {
        let mut params = ParameterMap::new();
        for caps in ASSIGNMENT.captures_iter(document.source()) {
            if let Ok(value) = caps[2].parse::<f64>() {
                params.insert(&caps[1], value);
            }
        }
        params
    }
}
