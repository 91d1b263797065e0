//! Correlation metadata attached to a job.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque `string -> JSON value` mapping carried alongside a job.
///
/// Only ever logged; nothing downstream inspects it. `Display` renders compact
/// JSON so it can be attached to a structured log record as a single field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobMeta(Map<String, Value>);

impl JobMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for JobMeta {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for JobMeta {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("{}"),
        }
    }
}
