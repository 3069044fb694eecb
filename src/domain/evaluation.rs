//! Process-wide evaluation collaborators: hooks and evaluation context.
//!
//! Both are opaque here. The evaluation layer reads them on every call;
//! this crate only stores them under reader/writer exclusion.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An interceptor run around flag evaluations by the layer above.
pub trait Hook: Send + Sync + fmt::Debug {
    /// Name used in diagnostics.
    fn name(&self) -> &str;
}

/// Targeting data shared by every evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Identifier of the subject being evaluated for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targeting_key: Option<String>,
    /// Free-form targeting attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl EvaluationContext {
    /// Creates a context for `targeting_key`.
    #[must_use]
    pub fn with_targeting_key(targeting_key: impl Into<String>) -> Self {
        Self {
            targeting_key: Some(targeting_key.into()),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds or replaces an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}
