use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Stable key a component registers under. It is written to disk verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Component blobs keyed by id. Sorted so identical state encodes to identical bytes.
pub type ComponentBlobs = BTreeMap<ComponentId, Vec<u8>>;

/// Summary shown by slot pickers. Only written at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub display_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
    pub playtime_seconds: f64,
    pub location: String,
    pub completion_percent: f32,
    pub death_count: u32,
}

impl SaveMetadata {
    pub fn new(display_name: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            display_name: display_name.into(),
            created_at: now,
            modified_at: now,
            playtime_seconds: 0.0,
            location: String::new(),
            completion_percent: 0.0,
            death_count: 0,
        }
    }
}

/// The versioned record stored in a slot file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocument {
    pub schema_version: u32,
    pub metadata: SaveMetadata,
    pub component_blobs: ComponentBlobs,
}

impl SaveDocument {
    pub fn blob(&self, id: &str) -> Option<&[u8]> {
        self.component_blobs.get(id).map(Vec::as_slice)
    }
}
