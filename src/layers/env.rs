//! Environment-variable value source.
//!
//! Variables matching `{PREFIX}__*` map to keys: double underscore `__`
//! separates nesting levels, single `_` within a segment is literal (part
//! of the field name), segments are lowercased to match Rust field names
//! and joined with `-`. So with prefix `APP`, `APP__DATABASE__POOL_SIZE`
//! becomes the key `database-pool_size`.
//!
//! The source snapshots its variables at construction; `with_vars` lets
//! tests pass synthetic data instead of `std::env::vars()`.

use std::collections::BTreeMap;

use crate::error::StrataError;
use crate::layer::LayerIdentity;
use crate::layers::{SourceEntry, ValueSource};

pub struct EnvSource {
    prefix: String,
    vars: Vec<(String, String)>,
}

impl EnvSource {
    /// Snapshot the process environment.
    pub fn new(prefix: &str) -> Self {
        Self::with_vars(prefix, std::env::vars())
    }

    /// Use the given pairs instead of the process environment.
    pub fn with_vars(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        EnvSource {
            prefix: prefix.to_string(),
            vars: vars.into_iter().collect(),
        }
    }
}

impl ValueSource for EnvSource {
    fn name(&self) -> String {
        format!("env[{}]", self.prefix)
    }

    fn identity(&self) -> LayerIdentity {
        LayerIdentity::EnvPrefix(self.prefix.clone())
    }

    fn entries(&self) -> Result<BTreeMap<String, SourceEntry>, StrataError> {
        let needle = format!("{}__", self.prefix);
        let mut out = BTreeMap::new();

        for (var, value) in &self.vars {
            let Some(rest) = var.strip_prefix(&needle) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }

            let key = rest
                .split("__")
                .map(|segment| segment.to_lowercase())
                .collect::<Vec<_>>()
                .join("-");
            out.insert(
                key,
                SourceEntry {
                    value: value.clone(),
                    external_key: var.clone(),
                    location: format!("env[{var}]"),
                },
            );
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn entries(prefix: &str, pairs: &[(&str, &str)]) -> BTreeMap<String, SourceEntry> {
        EnvSource::with_vars(prefix, vars(pairs)).entries().unwrap()
    }

    #[test]
    fn simple_key() {
        let map = entries("MYAPP", &[("MYAPP__HOST", "0.0.0.0")]);
        assert_eq!(map["host"].value, "0.0.0.0");
        assert_eq!(map["host"].location, "env[MYAPP__HOST]");
    }

    #[test]
    fn nested_key_joins_with_hyphen() {
        let map = entries("MYAPP", &[("MYAPP__DATABASE__URL", "postgres://db")]);
        assert_eq!(map["database-url"].value, "postgres://db");
    }

    #[test]
    fn single_underscore_preserved() {
        let map = entries("MYAPP", &[("MYAPP__POOL_SIZE", "10")]);
        assert_eq!(map["pool_size"].value, "10");
    }

    #[test]
    fn segments_lowercased() {
        let map = entries("MYAPP", &[("MYAPP__DATABASE__POOL_SIZE", "20")]);
        assert_eq!(map["database-pool_size"].external_key, "MYAPP__DATABASE__POOL_SIZE");
    }

    #[test]
    fn no_matching_prefix_ignored() {
        let map = entries("MYAPP", &[("OTHER__HOST", "x")]);
        assert!(map.is_empty());
    }

    #[test]
    fn bare_prefix_ignored() {
        let map = entries("MYAPP", &[("MYAPP", "x")]);
        assert!(map.is_empty());
    }

    #[test]
    fn prefix_with_single_underscore_not_matched() {
        let map = entries("MYAPP", &[("MYAPP_HOST", "x")]);
        assert!(map.is_empty());
    }

    #[test]
    fn identity_is_the_prefix() {
        let source = EnvSource::with_vars("APP", vars(&[]));
        assert_eq!(source.identity(), LayerIdentity::EnvPrefix("APP".into()));
    }
}
