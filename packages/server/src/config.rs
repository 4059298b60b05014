//! Server configuration from environment variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ORDERTREE_DB_PATH` | `./data/ordertree.db` |
//! | `ORDERTREE_HOST` | `127.0.0.1` |
//! | `ORDERTREE_PORT` | `8080` |
//! | `ORDERTREE_REJECT_CYCLES` | `true` |
//! | `ORDERTREE_REJECT_DELETE_WITH_CHILDREN` | `false` |
//!
//! Unparsable values fall back to the default.

use ordertree_core::StoreConfig;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_DB_PATH: &str = "./data/ordertree.db";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub reject_cycles: bool,
    pub reject_delete_with_children: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            reject_cycles: true,
            reject_delete_with_children: false,
        }
    }
}

impl ServerConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, one call per variable
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            database_path: lookup("ORDERTREE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            host: lookup("ORDERTREE_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "ORDERTREE_PORT", defaults.port),
            reject_cycles: parse_or(&lookup, "ORDERTREE_REJECT_CYCLES", defaults.reject_cycles),
            reject_delete_with_children: parse_or(
                &lookup,
                "ORDERTREE_REJECT_DELETE_WITH_CHILDREN",
                defaults.reject_delete_with_children,
            ),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Store settings derived from this configuration
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default()
            .with_reject_cycles(self.reject_cycles)
            .with_reject_delete_with_children(self.reject_delete_with_children)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value {:?} for {}", raw, name);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert!(config.store_config().reject_cycles);
        assert!(!config.store_config().reject_delete_with_children);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("ORDERTREE_DB_PATH", "/tmp/tree.db"),
            ("ORDERTREE_HOST", "0.0.0.0"),
            ("ORDERTREE_PORT", "9090"),
            ("ORDERTREE_REJECT_CYCLES", "false"),
            ("ORDERTREE_REJECT_DELETE_WITH_CHILDREN", "true"),
        ]);

        assert_eq!(config.database_path, PathBuf::from("/tmp/tree.db"));
        assert_eq!(config.bind_addr(), "0.0.0.0:9090");
        assert!(!config.reject_cycles);
        assert!(config.reject_delete_with_children);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("ORDERTREE_PORT", "eighty"),
            ("ORDERTREE_REJECT_CYCLES", "maybe"),
        ]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.reject_cycles);
    }
}
