//! Struct layer: an already-typed default value as a configuration source.
//!
//! The source struct is scanned with the same engine that scans the
//! destination; every leaf that holds a value enters the layer's ledger
//! under its visible key. Binding hands the typed value straight across —
//! no text parsing — after checking that the source leaf's type matches the
//! destination leaf's type.
//!
//! Identity is both the caller-supplied id string and the underlying
//! instance address, so registering the same defaults object twice is
//! caught either way.

use std::any::TypeId;
use std::sync::Arc;

use log::trace;

use crate::error::StrataError;
use crate::getlist::LeafTarget;
use crate::layer::{BindingAttempt, KeyLedger, Layer, LayerIdentity};
use crate::registry::LeafRegistry;
use crate::scan::{Node, Schema};
use crate::shape::{BoxedLeaf, Populate, Probe};

pub struct StructLayer<S: Populate> {
    id: String,
    source: Holder<S>,
    /// Built lazily on first bind — scanning needs the registry, which
    /// arrives with the bind call.
    ledger: Option<KeyLedger<StructValue>>,
    init_error: Option<StrataError>,
}

enum Holder<S> {
    Owned(Box<S>),
    Shared(Arc<S>),
}

impl<S> Holder<S> {
    fn get(&self) -> &S {
        match self {
            Holder::Owned(b) => b,
            Holder::Shared(a) => a,
        }
    }

    fn addr(&self) -> usize {
        match self {
            Holder::Owned(b) => &**b as *const S as usize,
            Holder::Shared(a) => Arc::as_ptr(a) as usize,
        }
    }
}

/// A typed value lifted out of the source struct. The boxed value moves out
/// at bind time; type identity stays behind for diagnostics.
struct StructValue {
    value: Option<BoxedLeaf>,
    type_id: TypeId,
    type_name: &'static str,
}

impl<S: Populate> StructLayer<S> {
    pub fn new(id: &str, source: S) -> Self {
        StructLayer {
            id: id.to_string(),
            source: Holder::Owned(Box::new(source)),
            ledger: None,
            init_error: None,
        }
    }

    /// Share a defaults object between the layer and the caller. Two layers
    /// built from clones of the same `Arc` conflict at registration time.
    pub fn shared(id: &str, source: Arc<S>) -> Self {
        StructLayer {
            id: id.to_string(),
            source: Holder::Shared(source),
            ledger: None,
            init_error: None,
        }
    }

    fn ensure_init(&mut self, registry: &LeafRegistry) -> Result<(), StrataError> {
        if self.ledger.is_some() {
            return Ok(());
        }
        if let Some(e) = &self.init_error {
            return Err(e.clone());
        }
        match Schema::build::<S>(registry) {
            Ok(schema) => {
                let mut ledger = KeyLedger::new();
                collect_present(self.source.get(), schema.root(), &self.id, &mut ledger);
                self.ledger = Some(ledger);
                Ok(())
            }
            Err(mut errors) => {
                // A malformed source type poisons the layer; report the
                // first shape error on every bind.
                let e = errors.remove(0);
                self.init_error = Some(e.clone());
                Err(e)
            }
        }
    }
}

fn collect_present<S: Populate>(
    source: &S,
    node: &Node,
    id: &str,
    ledger: &mut KeyLedger<StructValue>,
) {
    match node {
        Node::Struct(s) => {
            for (_, child) in &s.children {
                collect_present(source, child, id, ledger);
            }
        }
        Node::Value(v) => {
            if let Ok(Probe::Leaf(Some(value))) = source.probe(&v.path) {
                ledger.insert(
                    v.key.clone(),
                    v.key.clone(),
                    format!("struct[{id}]:{}", v.key),
                    StructValue {
                        value: Some(value),
                        type_id: v.type_id,
                        type_name: v.type_name,
                    },
                );
            }
        }
    }
}

impl<S: Populate> Layer for StructLayer<S> {
    fn describe(&self) -> String {
        format!("struct[{}]", self.id)
    }

    fn identity(&self) -> LayerIdentity {
        LayerIdentity::Struct {
            id: self.id.clone(),
            ptr: self.source.addr(),
        }
    }

    fn bind(
        &mut self,
        target: &LeafTarget,
        registry: &LeafRegistry,
    ) -> Result<BindingAttempt, StrataError> {
        self.ensure_init(registry)?;
        let layer_name = self.describe();
        let Some(ledger) = self.ledger.as_mut() else {
            return Ok(BindingAttempt::absent());
        };
        let Some(entry) = ledger.entry_mut(&target.key) else {
            return Ok(BindingAttempt::absent());
        };

        if entry.payload.type_id != target.type_id {
            let location = entry.location.clone();
            let found = entry.payload.type_name;
            entry.mark_failed(&layer_name, &target.key)?;
            return Err(StrataError::TypeMismatch {
                key: target.key.clone(),
                expected: target.type_name,
                found,
                location,
            });
        }

        entry.mark_bound(&layer_name, &target.key)?;
        let Some(value) = entry.payload.value.take() else {
            return Err(StrataError::ProtocolViolation {
                layer: layer_name,
                key: target.key.clone(),
                detail: "bound entry no longer holds its value".to_string(),
            });
        };
        trace!("{layer_name}: bound '{}'", target.key);
        Ok(BindingAttempt::found(
            value,
            entry.external_key.clone(),
            entry.location.clone(),
        ))
    }

    fn commit(&mut self, key: &str) -> Result<(), StrataError> {
        let layer_name = self.describe();
        match self.ledger.as_mut() {
            Some(ledger) => ledger.commit(&layer_name, key),
            None => Err(StrataError::ProtocolViolation {
                layer: layer_name,
                key: key.to_string(),
                detail: "commit before any bind".to_string(),
            }),
        }
    }

    fn post_errors(&self) -> Vec<StrataError> {
        match &self.ledger {
            Some(ledger) => ledger.post_errors(&self.describe()),
            None => Vec::new(),
        }
    }
}
