//! Service configuration
//!
//! Configuration is loaded from environment variables with defaults suitable
//! for production; tests construct [`OrgConfig`] directly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Organization service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrgConfig {
    /// Maximum depth of the organization tree, counted in levels (a root is
    /// level 1).
    pub max_hierarchy_depth: usize,

    /// Serialize moves through an in-process advisory lock.
    pub serialize_moves: bool,

    /// Gate mutations and reads on the acting user's permissions.
    pub enforce_permissions: bool,
}

impl Default for OrgConfig {
    fn default() -> Self {
        Self {
            max_hierarchy_depth: 10,
            serialize_moves: true,
            enforce_permissions: true,
        }
    }
}

impl OrgConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ORG_MAX_HIERARCHY_DEPTH`: maximum tree depth in levels (default: 10)
    /// - `ORG_SERIALIZE_MOVES`: hold the advisory move lock (default: true)
    /// - `ORG_ENFORCE_PERMISSIONS`: gate operations on permissions (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let flag = |key: &str, fallback: bool| {
            lookup(key)
                .map(|s| s != "false" && s != "0")
                .unwrap_or(fallback)
        };

        Self {
            max_hierarchy_depth: lookup("ORG_MAX_HIERARCHY_DEPTH")
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_hierarchy_depth),
            serialize_moves: flag("ORG_SERIALIZE_MOVES", default.serialize_moves),
            enforce_permissions: flag("ORG_ENFORCE_PERMISSIONS", default.enforce_permissions),
        }
    }

    /// Same as the default, with permission gating disabled.
    pub fn without_permissions() -> Self {
        Self {
            enforce_permissions: false,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_hierarchy_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ORG_MAX_HIERARCHY_DEPTH".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
