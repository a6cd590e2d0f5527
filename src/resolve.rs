//! Core resolution: walk the get-list and, per leaf, find the first layer
//! that supplies a value.
//!
//! Operates on pre-built data (a get-list plus constructed layers) with no
//! I/O, so the whole pipeline is testable with synthetic sources. Per leaf:
//!
//! 1. Bind every layer in priority order (first = highest).
//! 2. The first present value wins; record its layer index, external key,
//!    and location.
//! 3. Keep querying the remaining layers — their values are discarded
//!    (leaving those keys bound-but-unused for the post-process pass), but
//!    their bind errors are collected: a losing layer can still hold a
//!    value that would have failed to parse, and that is worth surfacing.
//! 4. Commit the winner, transitioning its key to used.
//!
//! A leaf no layer answered keeps `winner: None`; the fill phase turns that
//! into an `Uninitialized` error. Resolution is independent per leaf and
//! deterministic for fixed inputs.

use log::trace;

use crate::error::StrataError;
use crate::getlist::{GetList, Getter, LeafTarget};
use crate::layer::Layer;
use crate::registry::LeafRegistry;
use crate::shape::BoxedLeaf;

/// One registered layer plus its registration-time strictness.
pub(crate) struct LayerSlot {
    pub layer: Box<dyn Layer>,
    pub strict: bool,
}

/// Resolution outcome for one leaf.
pub struct ReportEntry {
    pub uid: usize,
    pub key: String,
    /// The winning layer's native key name, if any.
    pub external_key: Option<String>,
    /// The winning value's provenance, if any.
    pub location: Option<String>,
    /// Index of the winning layer; `None` when no layer had the key.
    pub winner: Option<usize>,
    /// Bind errors from any layer, winning or not.
    pub layer_errors: Vec<StrataError>,
    /// The resolved value, consumed by the fill phase.
    pub(crate) value: Option<BoxedLeaf>,
}

/// Resolve every leaf in UID order. `Err` only on protocol violations —
/// ordinary misconfiguration lands in the entries' error lists.
pub(crate) fn resolve_leaves(
    getlist: &GetList,
    layers: &mut [LayerSlot],
    registry: &LeafRegistry,
) -> Result<Vec<ReportEntry>, StrataError> {
    let mut entries = Vec::with_capacity(getlist.len());
    for get in getlist {
        let mut getter = LayeredGetter {
            layers,
            registry,
            entry: None,
        };
        let lookup = get(&mut getter);
        if let Some(e) = lookup.error {
            return Err(e);
        }
        let mut entry = getter.entry.take().unwrap_or(ReportEntry {
            uid: lookup.uid,
            key: String::new(),
            external_key: None,
            location: None,
            winner: None,
            layer_errors: Vec::new(),
            value: None,
        });
        entry.value = lookup.value;
        entries.push(entry);
    }
    Ok(entries)
}

struct LayeredGetter<'a> {
    layers: &'a mut [LayerSlot],
    registry: &'a LeafRegistry,
    entry: Option<ReportEntry>,
}

struct Winner {
    index: usize,
    value: BoxedLeaf,
    external_key: Option<String>,
    location: Option<String>,
    strict: bool,
    label: String,
}

impl Getter for LayeredGetter<'_> {
    fn get(&mut self, target: &LeafTarget) -> Result<Option<BoxedLeaf>, StrataError> {
        let mut entry = ReportEntry {
            uid: target.uid,
            key: target.key.clone(),
            external_key: None,
            location: None,
            winner: None,
            layer_errors: Vec::new(),
            value: None,
        };

        let mut winner: Option<Winner> = None;
        for (index, slot) in self.layers.iter_mut().enumerate() {
            match slot.layer.bind(target, self.registry) {
                Ok(attempt) => {
                    let Some(value) = attempt.value else { continue };
                    match &winner {
                        None => {
                            winner = Some(Winner {
                                index,
                                value,
                                external_key: attempt.external_key,
                                location: attempt.location,
                                strict: slot.strict,
                                label: slot.layer.describe(),
                            });
                        }
                        Some(w) => {
                            // The value is discarded; the losing layer's key
                            // stays bound-unused and surfaces as an
                            // OverriddenKey in post-processing. A strict
                            // winner additionally rejects the attempt here.
                            if w.strict {
                                entry.layer_errors.push(StrataError::StrictOverride {
                                    key: target.key.clone(),
                                    strict_layer: w.label.clone(),
                                    layer: slot.layer.describe(),
                                    location: attempt.location.unwrap_or_default(),
                                });
                            }
                        }
                    }
                }
                Err(e) => entry.layer_errors.push(e),
            }
        }

        let result = match winner {
            Some(w) => {
                if let Err(e) = self.layers[w.index].layer.commit(&target.key) {
                    self.entry = Some(entry);
                    return Err(e);
                }
                trace!(
                    "resolved '{}' from layer {} ({})",
                    target.key, w.index, w.label
                );
                entry.winner = Some(w.index);
                entry.external_key = w.external_key;
                entry.location = w.location;
                Ok(Some(w.value))
            }
            None => {
                trace!("no layer supplied '{}'", target.key);
                Ok(None)
            }
        };
        self.entry = Some(entry);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Populate;
    use crate::getlist::build_get_list;
    use crate::layers::{MapSource, StringLayer};
    use crate::scan::Schema;

    #[derive(Populate)]
    struct Config {
        host: Option<String>,
        port: Option<u16>,
    }

    fn slot(pairs: &[(&str, &str)], strict: bool) -> LayerSlot {
        let mut source = MapSource::new(if strict { "strict" } else { "normal" });
        for (k, v) in pairs {
            source = source.set(k, v);
        }
        LayerSlot {
            layer: Box::new(StringLayer::new(source).unwrap()),
            strict,
        }
    }

    fn resolve(mut layers: Vec<LayerSlot>) -> (Vec<ReportEntry>, Vec<LayerSlot>) {
        let registry = LeafRegistry::standard();
        let schema = Schema::build::<Config>(&registry).unwrap();
        let getlist = build_get_list(&schema);
        let entries = resolve_leaves(&getlist, &mut layers, &registry).unwrap();
        (entries, layers)
    }

    #[test]
    fn first_layer_with_the_key_wins() {
        let (entries, _) = resolve(vec![
            slot(&[("host", "first")], false),
            slot(&[("host", "second"), ("port", "80")], false),
        ]);
        assert_eq!(entries[0].winner, Some(0));
        assert_eq!(entries[0].location.as_deref(), Some("normal[host]"));
        assert_eq!(entries[1].winner, Some(1));
    }

    #[test]
    fn losing_layer_ends_bound_unused() {
        let (_, layers) = resolve(vec![
            slot(&[("host", "first"), ("port", "1")], false),
            slot(&[("host", "second"), ("port", "2")], false),
        ]);
        assert!(layers[0].layer.post_errors().is_empty());
        let overridden = layers[1].layer.post_errors();
        assert_eq!(overridden.len(), 2);
        assert!(
            overridden
                .iter()
                .all(|e| matches!(e, StrataError::OverriddenKey { .. }))
        );
    }

    #[test]
    fn unresolved_leaf_has_no_winner() {
        let (entries, _) = resolve(vec![slot(&[("host", "x")], false)]);
        assert_eq!(entries[1].winner, None);
        assert!(entries[1].value.is_none());
    }

    #[test]
    fn losing_layers_parse_errors_still_surface() {
        let (entries, _) = resolve(vec![
            slot(&[("port", "80")], false),
            slot(&[("port", "not-a-number")], false),
        ]);
        assert_eq!(entries[1].winner, Some(0));
        assert_eq!(entries[1].layer_errors.len(), 1);
        assert!(matches!(
            entries[1].layer_errors[0],
            StrataError::Parse { .. }
        ));
    }

    #[test]
    fn strict_winner_rejects_later_suppliers() {
        let (entries, _) = resolve(vec![
            slot(&[("host", "pinned")], true),
            slot(&[("host", "later")], false),
        ]);
        assert_eq!(entries[0].winner, Some(0));
        let errs = &entries[0].layer_errors;
        assert_eq!(errs.len(), 1);
        let StrataError::StrictOverride { strict_layer, layer, .. } = &errs[0] else {
            panic!("expected StrictOverride, got {:?}", errs[0]);
        };
        assert_eq!(strict_layer, "strict");
        assert_eq!(layer, "normal");
    }

    #[test]
    fn normal_winner_tolerates_later_suppliers() {
        let (entries, _) = resolve(vec![
            slot(&[("host", "a")], false),
            slot(&[("host", "b")], false),
        ]);
        assert!(entries[0].layer_errors.is_empty());
    }

    #[test]
    fn resolution_is_deterministic() {
        let run = || {
            let (entries, _) = resolve(vec![
                slot(&[("host", "a"), ("port", "1")], false),
                slot(&[("host", "b")], false),
            ]);
            entries
                .into_iter()
                .map(|e| (e.uid, e.key, e.winner, e.location))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
