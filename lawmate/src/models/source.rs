//! Source citation attached to an assistant answer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A retrieved passage backing an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// The retrieved text.
    #[serde(rename = "page_content")]
    pub excerpt: String,
    /// Provenance (document, section, page, ...). Values may be any JSON shape.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Source {
    /// Create a source with no metadata.
    pub fn new(excerpt: impl Into<String>) -> Self {
        Self {
            excerpt: excerpt.into(),
            metadata: Map::new(),
        }
    }

    /// Look up a metadata value rendered as plain text.
    pub fn metadata_text(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
