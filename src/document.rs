// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! Access to the normalized document tree.
//!
//! A TransXChange document is handed over as a tree of nested mappings and
//! lists named after the XML elements; attributes are keys prefixed with
//! `@` and the text of an element carrying attributes is under `#text`. An
//! element occurring once is a mapping, an element occurring several times
//! is a list of mappings, and an empty element is `null`.

use crate::objects::Date;
use serde_json::Value;
use thiserror::Error;

/// Structural problems found while reading a document.
#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    /// A key that must be present is missing.
    #[error("Failed to find a child '{key}' in element '{element}'")]
    MissingKey {
        /// Name of the missing key
        key: String,
        /// Name of the element that should contain the key
        element: String,
    },
    /// A date does not follow the `YYYY-MM-DD` format.
    #[error("Failed to parse '{value}' as a date in element '{element}'")]
    InvalidDate {
        /// Raw value of the date
        value: String,
        /// Name of the element holding the date
        element: String,
    },
    /// A coordinate is not a number.
    #[error("Failed to parse '{value}' as a '{key}' coordinate")]
    InvalidCoordinate {
        /// Raw value of the coordinate
        value: String,
        /// Name of the coordinate (`Longitude` or `Latitude`)
        key: String,
    },
}

/// Coerce a value which may be a single item or a list of items into a
/// list. `null` and absent values give an empty list, `null` items of a list
/// are dropped.
pub fn make_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter(|item| !item.is_null()).collect(),
        Some(item) => vec![item],
    }
}

/// Parse a `YYYY-MM-DD` date found in `element`.
pub fn parse_date(value: &str, element: &str) -> Result<Date, DocumentError> {
    Date::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| DocumentError::InvalidDate {
        value: value.to_string(),
        element: element.to_string(),
    })
}

/// Read the text of a leaf value.
pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(boolean) => Some(boolean.to_string()),
        Value::Object(map) => map.get("#text").and_then(text_of),
        Value::Null | Value::Array(_) => None,
    }
}

/// Navigation helpers over a node of the document tree, returning a
/// [DocumentError] when a required child is missing instead of an `Option`.
pub trait TryChild {
    /// Get a child which may be absent; `null` is treated as absent
    fn child(&self, key: &str) -> Option<&Value>;

    /// Try to get a child and fail if it is absent. `element` names the
    /// current node for the error message.
    fn try_child(&self, key: &str, element: &str) -> Result<&Value, DocumentError> {
        self.child(key).ok_or_else(|| DocumentError::MissingKey {
            key: key.to_string(),
            element: element.to_string(),
        })
    }

    /// Get all children under `key`, whether there is one or many
    fn children(&self, key: &str) -> Vec<&Value> {
        make_list(self.child(key))
    }

    /// Text content of a child, if any
    fn child_text(&self, key: &str) -> Option<String> {
        self.child(key).and_then(text_of)
    }

    /// Whether `key` is present, even as an empty element
    fn has_key(&self, key: &str) -> bool;

    /// Names of all the keys of the node
    fn key_names(&self) -> Vec<&str>;
}

impl TryChild for Value {
    fn child(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|value| !value.is_null())
    }

    fn has_key(&self, key: &str) -> bool {
        self.as_object()
            .map(|map| map.contains_key(key))
            .unwrap_or(false)
    }

    fn key_names(&self) -> Vec<&str> {
        self.as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
