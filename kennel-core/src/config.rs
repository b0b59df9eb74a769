//! # Kennel configuration
//!
//! A minimal string key/value store, in the spirit of Feathers'
//! `app.set()` / `app.get()`. Typed option structs (see
//! [`crate::bootstrap::BootstrapOptions`]) read their values out of a
//! [`KennelConfigSnapshot`].
//!
//! ```rust
//! use kennel_core::KennelConfig;
//!
//! let mut config = KennelConfig::new();
//! config.set("http.port", "3030");
//! assert_eq!(config.get("http.port"), Some("3030"));
//! ```
//!
//! Environment variables are layered on top with [`KennelConfig::load_env`]:
//! `KENNEL__BOOTSTRAP__SUPPORT_EMAIL=ops@acme.dev` becomes
//! `bootstrap.support_email`.

use std::collections::HashMap;
use std::time::Duration;

use humantime_serde::re::humantime;

#[derive(Debug, Default, Clone)]
pub struct KennelConfig {
    values: HashMap<String, String>,
}

impl KennelConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style [`KennelConfig::set`].
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set(key, value);
        self
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Overlay every environment variable starting with `prefix`.
    ///
    /// Returns the number of keys that were set.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_vars(prefix, std::env::vars())
    }

    /// Same as [`KennelConfig::load_env`] over an explicit variable list.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut loaded = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                // KENNEL__HTTP__PORT -> http.port
                let normalized = stripped.to_lowercase().replace("__", ".");
                if normalized.is_empty() {
                    continue;
                }
                self.set(normalized, value);
                loaded += 1;
            }
        }
        loaded
    }

    pub fn snapshot(&self) -> KennelConfigSnapshot {
        KennelConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct KennelConfigSnapshot {
    map: HashMap<String, String>,
}

impl KennelConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.trim().parse::<u32>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }

    /// Human readable durations: `90s`, `1h 30m`, `1825days`.
    pub fn get_duration(&self, key: &str) -> Option<Duration> {
        self.get(key)
            .and_then(|v| humantime::parse_duration(v.trim()).ok())
    }

    /// Comma separated list, blank items dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_vars_are_normalized() {
        let mut config = KennelConfig::new();
        let loaded = config.load_vars(
            "KENNEL__",
            vec![
                ("KENNEL__HTTP__PORT".to_string(), "4000".to_string()),
                ("KENNEL__BOOTSTRAP__SUPPORT_EMAIL".to_string(), "ops@acme.dev".to_string()),
                ("OTHER__HTTP__PORT".to_string(), "1".to_string()),
            ],
        );

        assert_eq!(loaded, 2);
        assert_eq!(config.get("http.port"), Some("4000"));
        assert_eq!(config.get("bootstrap.support_email"), Some("ops@acme.dev"));
    }

    #[test]
    fn snapshot_typed_getters() {
        let snap = KennelConfig::new()
            .with("bootstrap.token_lifetime", "1825days")
            .with("bootstrap.compensate", "false")
            .with("bootstrap.retry.max_attempts", "3")
            .with("auth.api_keys", "alpha, beta,,")
            .snapshot();

        assert_eq!(
            snap.get_duration("bootstrap.token_lifetime"),
            Some(Duration::from_secs(1825 * 86_400))
        );
        assert_eq!(snap.get_bool("bootstrap.compensate"), Some(false));
        assert_eq!(snap.get_u32("bootstrap.retry.max_attempts"), Some(3));
        assert_eq!(snap.get_list("auth.api_keys"), vec!["alpha", "beta"]);
        assert!(snap.get_list("missing").is_empty());
    }
}
