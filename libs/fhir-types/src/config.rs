//! Configuration for the canonicalization engine

use serde::Deserialize;

/// Options controlling how a [`TypeContext`](crate::TypeContext) caches values.
///
/// All fields have defaults, so a partial configuration (or none at all)
/// deserializes into a usable config.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypesConfig {
    /// If `false`, structurally-equal values are never shared. The per-type
    /// EMPTY singletons are still returned for all-absent field tuples.
    pub interning: bool,
    /// Initial capacity of each interner table.
    pub initial_capacity: usize,
    /// Table length at which dead weak entries are swept for the first time.
    pub sweep_threshold: usize,
}

impl Default for TypesConfig {
    fn default() -> Self {
        Self {
            interning: true,
            initial_capacity: 64,
            sweep_threshold: 1024,
        }
    }
}

impl TypesConfig {
    /// Build a config from `FERRUM_TYPES_*` environment variables.
    ///
    /// Missing or unparsable variables keep their default value.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            interning: lookup("FERRUM_TYPES_INTERNING")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.interning),
            initial_capacity: lookup("FERRUM_TYPES_INITIAL_CAPACITY")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.initial_capacity),
            sweep_threshold: lookup("FERRUM_TYPES_SWEEP_THRESHOLD")
                .and_then(|v| v.trim().parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.sweep_threshold),
        }
    }

    pub fn with_interning(mut self, interning: bool) -> Self {
        self.interning = interning;
        self
    }

    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold.max(1);
        self
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
