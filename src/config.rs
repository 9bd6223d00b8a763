//! Typed section tree consumed from the config-format layer.
//!
//! The raw text parser for the engine's section-based serialization lives
//! outside this crate; it hands us a flat list of typed sections (a tag plus
//! header attributes plus body properties). Scene construction is built on
//! top of this shape and never tokenizes anything itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One `[tag key=value ...]` section with its body properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub tag: String,
    /// Attributes from the section header line.
    pub header: HashMap<String, Value>,
    /// Key/value pairs from the section body. Opaque to the scene layer.
    pub properties: HashMap<String, Value>,
}

impl Section {
    pub fn new(tag: &str) -> Self {
        Section {
            tag: tag.to_string(),
            ..Section::default()
        }
    }

    pub fn with_header(mut self, key: &str, value: Value) -> Self {
        self.header.insert(key.to_string(), value);
        self
    }

    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn header_str(&self, key: &str) -> Option<&str> {
        self.header.get(key).and_then(Value::as_str)
    }

    pub fn header_u32(&self, key: &str) -> Option<u32> {
        self.header
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }

    /// Reads a sub-resource reference attribute: the first positional argument
    /// of an `instance`/`script` reference, serialized either as `{"id": n}`
    /// or as a bare integer. An id of 0 is a valid id.
    pub fn resource_id(&self, key: &str) -> Option<u32> {
        let value = self.header.get(key)?;
        let id = match value {
            Value::Object(map) => map.get("id").and_then(Value::as_u64)?,
            Value::Number(n) => n.as_u64()?,
            _ => return None,
        };
        u32::try_from(id).ok()
    }
}

/// Parsed contents of one scene file, already split into sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub sections: Vec<Section>,
}

impl ConfigFile {
    pub fn new(sections: Vec<Section>) -> Self {
        ConfigFile { sections }
    }

    pub fn sections_of<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Section> {
        self.sections.iter().filter(move |s| s.tag == tag)
    }
}
