use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coerce;

/// One observed API request/response.
///
/// Only the timestamp, id and the two attribute maps are interpreted; every
/// other field is carried through to the stored document untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    pub id: String,
    /// Custom attributes stored as strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
    /// Custom attributes stored as numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrsint: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            id: id.into(),
            attrs: None,
            attrsint: None,
            fields: Map::new(),
        }
    }

    /// Normalize custom attributes in place: `attrs` values become strings,
    /// `attrsint` values become numbers. Absent maps stay absent.
    pub fn coerce_attributes(&mut self) {
        if let Some(attrs) = self.attrs.as_mut() {
            for value in attrs.values_mut() {
                *value = coerce::string_value(value);
            }
        }
        if let Some(attrsint) = self.attrsint.as_mut() {
            for value in attrsint.values_mut() {
                *value = coerce::number_value(value);
            }
        }
    }
}
