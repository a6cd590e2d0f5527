//! In-memory value source — the generic string-keyed provider.
//!
//! Useful for programmatic overrides and for tests: build a named map of
//! key/value strings and hand it to a [`StringLayer`](crate::StringLayer).

use std::collections::BTreeMap;

use crate::error::StrataError;
use crate::layers::{SourceEntry, ValueSource};

pub struct MapSource {
    name: String,
    values: BTreeMap<String, String>,
}

impl MapSource {
    pub fn new(name: &str) -> Self {
        MapSource {
            name: name.to_string(),
            values: BTreeMap::new(),
        }
    }

    /// Add one key/value pair; later calls for the same key replace it.
    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl ValueSource for MapSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn entries(&self) -> Result<BTreeMap<String, SourceEntry>, StrataError> {
        Ok(self
            .values
            .iter()
            .map(|(key, value)| {
                (
                    key.clone(),
                    SourceEntry {
                        value: value.clone(),
                        external_key: key.clone(),
                        location: format!("{}[{key}]", self.name),
                    },
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerIdentity;

    #[test]
    fn entries_carry_name_in_location() {
        let map = MapSource::new("overrides")
            .set("host", "localhost")
            .entries()
            .unwrap();
        assert_eq!(map["host"].value, "localhost");
        assert_eq!(map["host"].location, "overrides[host]");
    }

    #[test]
    fn identity_defaults_to_source_name() {
        let source = MapSource::new("overrides");
        assert_eq!(source.identity(), LayerIdentity::Source("overrides".into()));
    }

    #[test]
    fn set_replaces_earlier_value() {
        let map = MapSource::new("m").set("k", "1").set("k", "2").entries().unwrap();
        assert_eq!(map["k"].value, "2");
    }
}
