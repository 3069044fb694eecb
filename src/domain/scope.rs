//! Provider binding scopes.

use std::fmt;

use serde::Serialize;

use crate::error::{Result, SwitchyardError};

/// The binding context for a provider: the process-wide default, or a
/// named client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", content = "name", rename_all = "snake_case")]
pub enum Scope {
    /// The default binding shared by every client without its own.
    Default,
    /// A binding owned by the client with this name.
    Named(String),
}

impl Scope {
    /// Builds a named scope, rejecting blank names.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchyardError::InvalidArgument`] if `name` is empty or
    /// only whitespace.
    pub fn named(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SwitchyardError::InvalidArgument(
                "client name cannot be empty".to_string(),
            ));
        }
        Ok(Self::Named(name))
    }

    /// Maps an optional client name to its scope.
    ///
    /// # Errors
    ///
    /// Same as [`Scope::named`] when `name` is `Some`.
    pub fn from_client_name(name: Option<&str>) -> Result<Self> {
        name.map_or(Ok(Self::Default), Self::named)
    }

    /// The tag stamped onto events for this scope (`None` for the default).
    #[must_use]
    pub fn tag(&self) -> Option<String> {
        match self {
            Self::Default => None,
            Self::Named(name) => Some(name.clone()),
        }
    }

    /// Returns the client name for named scopes.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Default => None,
            Self::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("<default>"),
            Self::Named(name) => f.write_str(name),
        }
    }
}
