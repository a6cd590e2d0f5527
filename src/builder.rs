//! Entry point for building and running a fill.
//!
//! A [`Filler`] owns the leaf-type registry and an ordered list of layers
//! (first = highest priority). Layers are registered through the builder;
//! duplicate layer identities — a second cmdline layer, a repeated env
//! prefix, the same defaults struct twice — fail at [`FillerBuilder::build`],
//! before any binding happens, naming both positions.
//!
//! `fill` consumes the filler: layers carry per-key consumption state, so a
//! layer set serves exactly one fill. Build a fresh filler (the cheap part)
//! for every destination instance; the [`Schema`] (the scan) is the
//! reusable artifact — see [`Filler::fill_with`].

use std::any::TypeId;
use std::sync::Arc;

use log::debug;

use crate::error::{FillError, StrataError};
use crate::fill::fill_tree;
use crate::getlist::build_get_list;
use crate::layer::Layer;
use crate::layers::{CmdlineSource, EnvSource, StringLayer, StructLayer, ValueSource};
use crate::registry::LeafRegistry;
use crate::report::FillReport;
use crate::resolve::{LayerSlot, ReportEntry, resolve_leaves};
use crate::scan::Schema;
use crate::shape::Populate;

/// A configured, single-use fill pipeline.
pub struct Filler {
    registry: LeafRegistry,
    layers: Vec<LayerSlot>,
}

impl std::fmt::Debug for Filler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filler")
            .field("layers", &self.layers.len())
            .finish_non_exhaustive()
    }
}

impl Filler {
    pub fn builder() -> FillerBuilder {
        FillerBuilder {
            registry: None,
            layers: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Scan `T` and fill `dest`. Any non-empty error batch is a failure;
    /// the destination may still be partially allocated, and the partial
    /// location report rides inside the error.
    pub fn fill<T: Populate>(self, dest: &mut T) -> Result<FillReport, FillError> {
        let schema = match Schema::build::<T>(&self.registry) {
            Ok(schema) => schema,
            Err(errors) => {
                return Err(FillError {
                    errors,
                    report: FillReport::default(),
                });
            }
        };
        self.fill_with(&schema, dest)
    }

    /// Fill using a prebuilt [`Schema`] (built once per type, reusable
    /// across many fills — each with its own filler).
    pub fn fill_with<T: Populate>(
        mut self,
        schema: &Schema,
        dest: &mut T,
    ) -> Result<FillReport, FillError> {
        if schema.type_id() != TypeId::of::<T>() {
            return Err(FillError {
                errors: vec![StrataError::SchemaMismatch {
                    expected: schema.type_name(),
                    found: std::any::type_name::<T>(),
                }],
                report: FillReport::default(),
            });
        }

        let getlist = build_get_list(schema);
        let mut entries: Vec<ReportEntry> =
            match resolve_leaves(&getlist, &mut self.layers, &self.registry) {
                Ok(entries) => entries,
                Err(e) => {
                    return Err(FillError {
                        errors: vec![e],
                        report: FillReport::default(),
                    });
                }
            };

        let (report, mut errors) = fill_tree(dest, schema.root(), &mut entries);

        // Error batch order: fill-phase errors (uninitialized leaves first,
        // in tree order), then per-leaf bind errors, then each layer's
        // post-process diagnostics.
        for entry in &entries {
            errors.extend(entry.layer_errors.iter().cloned());
        }
        for slot in &self.layers {
            errors.extend(slot.layer.post_errors());
        }

        if errors.is_empty() {
            debug!("fill of {} complete: {} leaves", schema.type_name(), report.rows.len());
            Ok(report)
        } else {
            Err(FillError { errors, report })
        }
    }
}

/// Chainable configuration for a [`Filler`].
///
/// Layer-producing methods register in priority order: the first layer
/// added wins ties. Construction problems (a source that fails to produce
/// entries, duplicate identities) surface from [`build`](Self::build).
pub struct FillerBuilder {
    registry: Option<LeafRegistry>,
    layers: Vec<LayerSlot>,
    errors: Vec<StrataError>,
}

impl FillerBuilder {
    /// Replace the default [`LeafRegistry::standard`] table.
    pub fn registry(mut self, registry: LeafRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register any layer at normal strength.
    pub fn layer(mut self, layer: impl Layer + 'static) -> Self {
        self.layers.push(LayerSlot {
            layer: Box::new(layer),
            strict: false,
        });
        self
    }

    /// Register a strict layer: later layers supplying one of its keys are
    /// rejected at resolve time, not just reported as overridden.
    pub fn strict_layer(mut self, layer: impl Layer + 'static) -> Self {
        self.layers.push(LayerSlot {
            layer: Box::new(layer),
            strict: true,
        });
        self
    }

    /// Wrap any [`ValueSource`] in a [`StringLayer`] and register it.
    pub fn source_layer(mut self, source: impl ValueSource) -> Self {
        match StringLayer::new(source) {
            Ok(layer) => self.layer(layer),
            Err(e) => {
                self.errors.push(e);
                self
            }
        }
    }

    /// Register an environment layer for `{prefix}__*` variables.
    pub fn env_layer(self, prefix: &str) -> Self {
        self.source_layer(EnvSource::new(prefix))
    }

    /// Register a command-line layer over the process arguments.
    pub fn cmdline_layer(self) -> Self {
        self.source_layer(CmdlineSource::new())
    }

    /// Register a defaults-struct layer.
    pub fn struct_layer<S: Populate>(self, id: &str, source: S) -> Self {
        self.layer(StructLayer::new(id, source))
    }

    /// Register a defaults-struct layer sharing the caller's `Arc`.
    pub fn shared_struct_layer<S: Populate>(self, id: &str, source: Arc<S>) -> Self {
        self.layer(StructLayer::shared(id, source))
    }

    /// Validate the configuration and produce the [`Filler`]. Fails fast on
    /// the first construction error or duplicate layer identity.
    pub fn build(self) -> Result<Filler, StrataError> {
        let FillerBuilder {
            registry,
            layers,
            mut errors,
        } = self;

        if !errors.is_empty() {
            return Err(errors.remove(0));
        }

        for (duplicate, slot) in layers.iter().enumerate() {
            let identity = slot.layer.identity();
            for (original, earlier) in layers.iter().enumerate().take(duplicate) {
                if earlier.layer.identity().conflicts(&identity) {
                    return Err(StrataError::DuplicateLayer {
                        original,
                        duplicate,
                        identity: identity.to_string(),
                    });
                }
            }
        }

        Ok(Filler {
            registry: registry.unwrap_or_default(),
            layers,
        })
    }
}
