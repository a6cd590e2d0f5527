//! The generic string-keyed layer: any [`ValueSource`] wrapped with
//! parsing and consumption tracking.
//!
//! Binding looks the key up (directly, or through a configured alias),
//! parses the text with the destination type's registered codec, and moves
//! the key through the `Unbound → Bound → Used` ledger. A value that fails
//! to parse surfaces a `Parse` error at bind time and parks in `Failed`.

use std::collections::BTreeMap;

use log::trace;

use crate::error::StrataError;
use crate::getlist::LeafTarget;
use crate::layer::{BindingAttempt, KeyLedger, Layer, LayerIdentity};
use crate::layers::ValueSource;
use crate::registry::LeafRegistry;

pub struct StringLayer {
    name: String,
    identity: LayerIdentity,
    /// Payload is the raw string value; parsing happens at bind time, when
    /// the destination type is known.
    ledger: KeyLedger<String>,
    /// alias → canonical key.
    aliases: BTreeMap<String, String>,
}

impl StringLayer {
    /// Wrap a source, snapshotting its entries.
    pub fn new(source: impl ValueSource) -> Result<Self, StrataError> {
        let mut ledger = KeyLedger::new();
        for (key, entry) in source.entries()? {
            ledger.insert(key, entry.external_key, entry.location, entry.value);
        }
        Ok(StringLayer {
            name: source.name(),
            identity: source.identity(),
            ledger,
            aliases: BTreeMap::new(),
        })
    }

    /// Accept `alias` as an alternative external spelling of `key`. If the
    /// alias name itself matches a structural key, binding that key reports
    /// an `AliasCollision`.
    pub fn with_alias(mut self, alias: &str, key: &str) -> Self {
        self.aliases.insert(alias.to_string(), key.to_string());
        self
    }
}

impl Layer for StringLayer {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn identity(&self) -> LayerIdentity {
        self.identity.clone()
    }

    fn bind(
        &mut self,
        target: &LeafTarget,
        registry: &LeafRegistry,
    ) -> Result<BindingAttempt, StrataError> {
        let layer_name = self.name.clone();

        // A structural key that is also configured as an alias name is
        // ambiguous: the same entry would answer for two different keys.
        if let Some(canonical) = self.aliases.get(&target.key)
            && self.ledger.contains(&target.key)
        {
            return Err(StrataError::AliasCollision {
                alias: target.key.clone(),
                key: canonical.clone(),
                layer: layer_name,
            });
        }

        let lookup_key = if self.ledger.contains(&target.key) {
            target.key.clone()
        } else {
            let aliased = self
                .aliases
                .iter()
                .find(|(_, canonical)| **canonical == target.key)
                .map(|(alias, _)| alias.clone());
            match aliased {
                Some(alias) if self.ledger.contains(&alias) => alias,
                _ => return Ok(BindingAttempt::absent()),
            }
        };

        let Some(codec) = registry.codec(target.type_id) else {
            return Err(StrataError::ProtocolViolation {
                layer: layer_name,
                key: target.key.clone(),
                detail: format!("leaf type {} missing from registry at bind time", target.type_name),
            });
        };

        let Some(entry) = self.ledger.entry_mut(&lookup_key) else {
            return Ok(BindingAttempt::absent());
        };

        match (codec.parse)(&entry.payload) {
            Ok(value) => {
                entry.mark_bound(&layer_name, &lookup_key)?;
                trace!("{layer_name}: bound '{}' from {}", target.key, entry.location);
                Ok(BindingAttempt::found(
                    value,
                    entry.external_key.clone(),
                    entry.location.clone(),
                ))
            }
            Err(reason) => {
                let location = entry.location.clone();
                entry.mark_failed(&layer_name, &lookup_key)?;
                Err(StrataError::Parse {
                    key: target.key.clone(),
                    type_name: codec.type_name,
                    location,
                    reason,
                })
            }
        }
    }

    fn commit(&mut self, key: &str) -> Result<(), StrataError> {
        let layer_name = self.name.clone();
        // Commit arrives under the canonical key; the value may live under
        // an alias entry.
        if self.ledger.contains(key) {
            return self.ledger.commit(&layer_name, key);
        }
        let aliased = self
            .aliases
            .iter()
            .find(|(_, canonical)| canonical.as_str() == key)
            .map(|(alias, _)| alias.clone());
        match aliased {
            Some(alias) => self.ledger.commit(&layer_name, &alias),
            None => self.ledger.commit(&layer_name, key),
        }
    }

    fn post_errors(&self) -> Vec<StrataError> {
        self.ledger.post_errors(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::MapSource;
    use std::any::TypeId;

    fn target(key: &str, type_id: TypeId, type_name: &'static str) -> LeafTarget {
        LeafTarget {
            uid: 0,
            key: key.to_string(),
            type_id,
            type_name,
        }
    }

    fn int_target(key: &str) -> LeafTarget {
        target(key, TypeId::of::<i64>(), "i64")
    }

    fn layer(pairs: &[(&str, &str)]) -> StringLayer {
        let mut source = MapSource::new("test");
        for (k, v) in pairs {
            source = source.set(k, v);
        }
        StringLayer::new(source).unwrap()
    }

    #[test]
    fn absent_key_binds_empty_without_error() {
        let mut l = layer(&[("other", "1")]);
        let attempt = l.bind(&int_target("missing"), &LeafRegistry::standard()).unwrap();
        assert!(attempt.value.is_none());
    }

    #[test]
    fn present_key_parses_into_target_type() {
        let mut l = layer(&[("port", "8080")]);
        let attempt = l.bind(&int_target("port"), &LeafRegistry::standard()).unwrap();
        let value = attempt.value.unwrap().downcast::<i64>().unwrap();
        assert_eq!(*value, 8080);
        assert_eq!(attempt.location.as_deref(), Some("test[port]"));
    }

    #[test]
    fn unparseable_value_is_a_parse_error_naming_the_origin() {
        let mut l = layer(&[("arg1", "asdasd")]);
        let err = l.bind(&int_target("arg1"), &LeafRegistry::standard()).unwrap_err();
        let StrataError::Parse { key, type_name, location, .. } = err else {
            panic!("expected Parse, got {err:?}");
        };
        assert_eq!(key, "arg1");
        assert_eq!(type_name, "i64");
        assert_eq!(location, "test[arg1]");
        // A failed key is neither unbound nor overridden afterwards.
        assert!(l.post_errors().is_empty());
    }

    #[test]
    fn bound_and_committed_key_is_clean() {
        let mut l = layer(&[("port", "1")]);
        l.bind(&int_target("port"), &LeafRegistry::standard()).unwrap();
        l.commit("port").unwrap();
        assert!(l.post_errors().is_empty());
    }

    #[test]
    fn bound_but_uncommitted_key_reports_overridden() {
        let mut l = layer(&[("port", "1")]);
        l.bind(&int_target("port"), &LeafRegistry::standard()).unwrap();
        let errs = l.post_errors();
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], StrataError::OverriddenKey { .. }));
    }

    #[test]
    fn untouched_key_reports_unbound() {
        let l = layer(&[("typo_key", "1")]);
        let errs = l.post_errors();
        assert_eq!(errs.len(), 1);
        let StrataError::UnboundKey { key, .. } = &errs[0] else {
            panic!("expected UnboundKey");
        };
        assert_eq!(key, "typo_key");
    }

    #[test]
    fn alias_answers_for_the_canonical_key() {
        let mut l = layer(&[("db", "9")]).with_alias("db", "database-pool");
        let attempt = l
            .bind(&int_target("database-pool"), &LeafRegistry::standard())
            .unwrap();
        assert_eq!(*attempt.value.unwrap().downcast::<i64>().unwrap(), 9);
        l.commit("database-pool").unwrap();
        assert!(l.post_errors().is_empty());
    }

    #[test]
    fn alias_name_matching_structural_key_collides() {
        let mut l = layer(&[("host", "x")]).with_alias("host", "database-host");
        let err = l
            .bind(
                &target("host", TypeId::of::<String>(), "String"),
                &LeafRegistry::standard(),
            )
            .unwrap_err();
        assert!(matches!(err, StrataError::AliasCollision { .. }));
    }
}
