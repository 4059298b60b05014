//! Store configuration
//!
//! `StoreConfig` carries the technical settings of a store instance and the
//! opt-in structural checks. It is deserializable so front ends can embed it
//! in their own configuration.

use serde::{Deserialize, Serialize};

/// Default SQLite busy timeout applied to every connection
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Settings for a `LibsqlTreeStore`.
///
/// Both structural checks are off by default: a bare store accepts moving a
/// node under its own descendant and deleting a node that still has children,
/// leaving those decisions to its callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// How long a connection waits on a locked database before failing
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Refuse moves that would make a node its own ancestor
    #[serde(default)]
    pub reject_cycles: bool,

    /// Refuse deleting a node that still has children
    #[serde(default)]
    pub reject_delete_with_children: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            reject_cycles: false,
            reject_delete_with_children: false,
        }
    }
}

impl StoreConfig {
    pub fn with_reject_cycles(mut self, reject: bool) -> Self {
        self.reject_cycles = reject;
        self
    }

    pub fn with_reject_delete_with_children(mut self, reject: bool) -> Self {
        self.reject_delete_with_children = reject;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_structural_checks_off() {
        let config = StoreConfig::default();
        assert_eq!(config.busy_timeout_ms, 5000);
        assert!(!config.reject_cycles);
        assert!(!config.reject_delete_with_children);
    }

    #[test]
    fn test_deserialize_fills_missing_fields() {
        let config: StoreConfig = serde_json::from_str(r#"{"reject_cycles": true}"#).unwrap();
        assert!(config.reject_cycles);
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
    }
}
