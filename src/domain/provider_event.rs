//! Provider lifecycle events.
//!
//! Every readiness change, failure, staleness notice, or configuration
//! change travels through an [`super::EventBus`] as an [`EventKind`] plus
//! an immutable [`EventDetails`] payload.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Arbitrary provider-supplied metadata attached to an event.
pub type FlagMetadata = BTreeMap<String, serde_json::Value>;

/// The closed set of provider event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// The provider finished initializing and is serving.
    Ready,
    /// The provider's flag configuration changed.
    ConfigurationChanged,
    /// The provider failed to initialize, or reported an error.
    Error,
    /// The provider's cached configuration may be out of date.
    Stale,
}

impl EventKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Ready,
        Self::ConfigurationChanged,
        Self::Error,
        Self::Stale,
    ];

    /// Returns the kind as a static string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "PROVIDER_READY",
            Self::ConfigurationChanged => "PROVIDER_CONFIGURATION_CHANGED",
            Self::Error => "PROVIDER_ERROR",
            Self::Stale => "PROVIDER_STALE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable event payload.
///
/// `scope_name` is stamped by the bus that forwards or emits on behalf of
/// a scope; anything a provider sets there is overwritten on forwarding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Client name of the scope the event belongs to (`None` for default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_name: Option<String>,
    /// Keys of flags whose configuration changed, in provider order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags_changed: Option<Vec<String>>,
    /// Human-readable message, e.g. the initialization failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Provider-supplied metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_metadata: Option<FlagMetadata>,
}

impl EventDetails {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the changed flag keys.
    #[must_use]
    pub fn with_flags_changed<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags_changed = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the flag metadata.
    #[must_use]
    pub fn with_flag_metadata(mut self, metadata: FlagMetadata) -> Self {
        self.flag_metadata = Some(metadata);
        self
    }

    /// Returns a copy tagged with `scope_name`, replacing any prior tag.
    #[must_use]
    pub fn tagged(mut self, scope_name: Option<String>) -> Self {
        self.scope_name = scope_name;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_and_complete() {
        let names: std::collections::HashSet<&str> =
            EventKind::ALL.iter().map(EventKind::as_str).collect();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn tagging_overwrites_previous_tag() {
        let details = EventDetails::new().tagged(Some("inner".into()));
        let retagged = details.tagged(Some("outer".into()));
        assert_eq!(retagged.scope_name.as_deref(), Some("outer"));
        assert_eq!(retagged.tagged(None).scope_name, None);
    }

    #[test]
    fn builder_preserves_flag_order() {
        let details = EventDetails::new().with_flags_changed(["b", "a", "c"]);
        assert_eq!(
            details.flags_changed,
            Some(vec!["b".to_string(), "a".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn serializes_without_empty_fields() {
        let mut metadata = FlagMetadata::new();
        metadata.insert("version".into(), serde_json::json!(3));
        let details = EventDetails::new()
            .with_message("oh no")
            .with_flag_metadata(metadata)
            .tagged(Some("svc".into()));
        let json = serde_json::to_string(&details).unwrap_or_default();
        assert!(json.contains("\"scope_name\":\"svc\""));
        assert!(json.contains("\"version\":3"));
        assert!(!json.contains("flags_changed"));
        assert_eq!(
            serde_json::to_string(&EventKind::ConfigurationChanged).unwrap_or_default(),
            "\"CONFIGURATION_CHANGED\""
        );
    }
}
