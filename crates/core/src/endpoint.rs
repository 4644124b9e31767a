// SPDX-License-Identifier: MIT

//! A named handler for one fully-qualified subject on the bus.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One subject/handler pair declared by a script's descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<IndexMap<String, Value>>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, subject: impl Into<String>) -> Self {
        Self { name: name.into(), subject: subject.into(), description: None, metadata: None }
    }

    /// Characters the bus permits in a subject: letters, digits, `.`, `-`, `_`.
    pub fn subject_is_well_formed(subject: &str) -> bool {
        !subject.is_empty()
            && subject.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    }

    /// Build the string→string metadata map the bus accepts.
    ///
    /// Non-string JSON values are serialized to their JSON text form.
    /// If `description` is present and `metadata` does not already carry a
    /// `description` key, it is promoted in.
    pub fn to_bus_metadata(&self) -> IndexMap<String, String> {
        let mut out: IndexMap<String, String> = IndexMap::new();
        if let Some(meta) = &self.metadata {
            for (k, v) in meta {
                let rendered = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out.insert(k.clone(), rendered);
            }
        }
        if let Some(desc) = &self.description {
            out.entry("description".to_string()).or_insert_with(|| desc.clone());
        }
        out
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
