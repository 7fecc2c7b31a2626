#![forbid(unsafe_code)]

//! Store configuration.
//!
//! Environment overrides use the `DMLAYER_*` prefix:
//!
//! | Variable | Field |
//! |---|---|
//! | `DMLAYER_MAX_BINARY_LEN` | [`StoreConfig::max_binary_len`] |
//! | `DMLAYER_NOTIFY_ON_TEARDOWN` | [`StoreConfig::notify_on_teardown`] (`1`/`true`, `0`/`false`) |

use std::env;

pub const ENV_MAX_BINARY_LEN: &str = "DMLAYER_MAX_BINARY_LEN";
pub const ENV_NOTIFY_ON_TEARDOWN: &str = "DMLAYER_NOTIFY_ON_TEARDOWN";

/// Tunables for a store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Largest payload a binary cell may grow to. Larger writes fail with
    /// `AllocationFailure` and reset the variable to `None`.
    pub max_binary_len: usize,
    /// Deliver `Deleted` to enabled observers when the store is released.
    pub notify_on_teardown: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_binary_len: usize::MAX,
            notify_on_teardown: true,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_binary_len(mut self, max_binary_len: usize) -> Self {
        self.max_binary_len = max_binary_len;
        self
    }

    #[must_use]
    pub fn with_notify_on_teardown(mut self, enabled: bool) -> Self {
        self.notify_on_teardown = enabled;
        self
    }

    /// Defaults overridden by `DMLAYER_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(val) = lookup(ENV_MAX_BINARY_LEN)
            && let Ok(n) = val.trim().parse()
        {
            config.max_binary_len = n;
        }
        if let Some(val) = lookup(ENV_NOTIFY_ON_TEARDOWN) {
            let val = val.trim();
            if val == "1" || val.eq_ignore_ascii_case("true") {
                config.notify_on_teardown = true;
            } else if val == "0" || val.eq_ignore_ascii_case("false") {
                config.notify_on_teardown = false;
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.max_binary_len, usize::MAX);
        assert!(config.notify_on_teardown);
        assert_eq!(StoreConfig::from_lookup(|_| None), config);
    }

    #[test]
    fn builders() {
        let config = StoreConfig::new()
            .with_max_binary_len(64)
            .with_notify_on_teardown(false);
        assert_eq!(config.max_binary_len, 64);
        assert!(!config.notify_on_teardown);
    }

    #[test]
    fn env_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            (ENV_MAX_BINARY_LEN, " 4096 "),
            (ENV_NOTIFY_ON_TEARDOWN, "FALSE"),
        ]));
        assert_eq!(config.max_binary_len, 4096);
        assert!(!config.notify_on_teardown);
    }

    #[test]
    fn garbage_is_ignored() {
        let config = StoreConfig::from_lookup(lookup(&[
            (ENV_MAX_BINARY_LEN, "lots"),
            (ENV_NOTIFY_ON_TEARDOWN, "maybe"),
        ]));
        assert_eq!(config, StoreConfig::default());
    }
}
