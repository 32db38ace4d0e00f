//! Records and the collections that hold them.
//!
//! A [`Record`] is an opaque JSON object carrying a string `id`. Nothing else
//! about its shape is checked; foreign keys are plain string fields that name
//! the id of a record in another [`Collection`].

mod collection;

pub use collection::{Collection, Relation};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Key under which related records are attached.
pub const EXPAND_FIELD: &str = "expand";

/// Error raised when a JSON value cannot be treated as a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The value is not a JSON object.
    NotAnObject,
    /// The object has no string `id` field.
    MissingId,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::NotAnObject => write!(f, "record is not a JSON object"),
            RecordError::MissingId => write!(f, "record has no string id"),
        }
    }
}

impl std::error::Error for RecordError {}

/// An immutable record: a JSON object that always has a string `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Build a record from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(fields) => Self::try_from(fields),
            _ => Err(RecordError::NotAnObject),
        }
    }

    /// The record's unique identifier.
    pub fn id(&self) -> &str {
        // Checked at construction.
        self.fields
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// A string-valued field, e.g. a foreign key.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// The `expand` object, if the record carries one.
    pub fn expand(&self) -> Option<&Map<String, Value>> {
        self.fields.get(EXPAND_FIELD).and_then(Value::as_object)
    }

    /// The related record attached under `expand.<relation>`.
    ///
    /// Returns `None` both when nothing is attached and when the attachment is
    /// an explicit `null`.
    pub fn expanded(&self, relation: &str) -> Option<Record> {
        self.expand()
            .and_then(|expand| expand.get(relation))
            .and_then(|value| Record::from_value(value.clone()).ok())
    }

    /// Return a copy with `expand.<relation>` set to `related` (or `null`).
    ///
    /// Other entries already present under `expand` are kept.
    pub fn with_expanded(&self, relation: &str, related: Option<&Record>) -> Record {
        let mut fields = self.fields.clone();
        let mut expand = match fields.remove(EXPAND_FIELD) {
            Some(Value::Object(existing)) => existing,
            _ => Map::new(),
        };
        expand.insert(
            relation.to_string(),
            related.map_or(Value::Null, |r| Value::Object(r.fields.clone())),
        );
        fields.insert(EXPAND_FIELD.to_string(), Value::Object(expand));
        Record { fields }
    }
}

impl TryFrom<Map<String, Value>> for Record {
    type Error = RecordError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        match fields.get("id") {
            Some(Value::String(_)) => Ok(Record { fields }),
            _ => Err(RecordError::MissingId),
        }
    }
}

impl From<Record> for Map<String, Value> {
    fn from(record: Record) -> Self {
        record.fields
    }
}
