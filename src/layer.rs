//! The layer contract every configuration source implements, and the
//! per-key state machine backing it.
//!
//! A layer is queried in two steps: [`Layer::bind`] is the probe — "do you
//! have this key, and does it coerce into this type?" — and
//! [`Layer::commit`] is the commitment, called exactly once for the key
//! that wins resolution. Splitting the two lets the resolver probe every
//! layer for the same leaf before any winner is known, while each layer
//! still tracks, per key, whether its value was ever consumed.
//!
//! Per-key states: `Unbound` (never queried) → `Bound` (queried, value
//! handed out) → `Used` (committed). A present-but-unparseable key parks in
//! `Failed` so its already-reported parse error is not double-counted by
//! the post-process pass. After resolution, [`Layer::post_errors`] reports
//! every key still `Unbound` (a value nobody asked for — likely a typo) and
//! every key left `Bound` (overridden by a higher-priority layer).

use std::collections::BTreeMap;
use std::fmt;

use crate::error::StrataError;
use crate::getlist::LeafTarget;
use crate::registry::LeafRegistry;
use crate::shape::BoxedLeaf;

/// De-duplication identity for layer registration. No two layers in one
/// filler may conflict: one cmdline layer, one env layer per prefix, one
/// struct layer per identity string *or* underlying instance, one generic
/// source per name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerIdentity {
    Cmdline,
    EnvPrefix(String),
    Struct { id: String, ptr: usize },
    Source(String),
}

impl LayerIdentity {
    pub(crate) fn conflicts(&self, other: &LayerIdentity) -> bool {
        match (self, other) {
            (Self::Struct { id: a, ptr: pa }, Self::Struct { id: b, ptr: pb }) => {
                a == b || pa == pb
            }
            _ => self == other,
        }
    }
}

impl fmt::Display for LayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cmdline => write!(f, "cmdline"),
            Self::EnvPrefix(p) => write!(f, "env prefix '{p}'"),
            Self::Struct { id, .. } => write!(f, "struct layer '{id}'"),
            Self::Source(n) => write!(f, "source '{n}'"),
        }
    }
}

/// Result of one bind probe. An all-`None` attempt means the key is simply
/// absent from this layer — that is not an error.
#[derive(Default)]
pub struct BindingAttempt {
    pub value: Option<BoxedLeaf>,
    /// The layer's native name for the key (e.g. the env var).
    pub external_key: Option<String>,
    /// Human-readable provenance, for diagnostics only.
    pub location: Option<String>,
}

impl std::fmt::Debug for BindingAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingAttempt")
            .field("value", &self.value.is_some())
            .field("external_key", &self.external_key)
            .field("location", &self.location)
            .finish()
    }
}

impl BindingAttempt {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn found(value: BoxedLeaf, external_key: String, location: String) -> Self {
        BindingAttempt {
            value: Some(value),
            external_key: Some(external_key),
            location: Some(location),
        }
    }
}

/// One prioritized configuration source.
pub trait Layer {
    /// Origin label used in diagnostics (e.g. `env[APP]`, `struct[defaults]`).
    fn describe(&self) -> String;

    /// Registration-time de-duplication identity.
    fn identity(&self) -> LayerIdentity;

    /// Probe for `target.key`. `Ok` with an absent attempt when the key is
    /// not present; `Err` when it is present but cannot be coerced into the
    /// target type.
    fn bind(
        &mut self,
        target: &LeafTarget,
        registry: &LeafRegistry,
    ) -> Result<BindingAttempt, StrataError>;

    /// Commit the key that won resolution. Calling this for a key that is
    /// not currently `Bound` is a protocol violation.
    fn commit(&mut self, key: &str) -> Result<(), StrataError>;

    /// Post-resolution diagnostics: unbound and overridden keys.
    fn post_errors(&self) -> Vec<StrataError>;
}

/// Per-key consumption state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Unbound,
    Bound,
    Failed,
    Used,
}

/// One tracked key inside a layer.
pub(crate) struct LedgerEntry<V> {
    pub external_key: String,
    pub location: String,
    pub state: KeyState,
    pub payload: V,
}

impl<V> LedgerEntry<V> {
    /// `Unbound` → `Bound`.
    pub fn mark_bound(&mut self, layer: &str, key: &str) -> Result<(), StrataError> {
        self.transition(layer, key, KeyState::Bound)
    }

    /// `Unbound` → `Failed`.
    pub fn mark_failed(&mut self, layer: &str, key: &str) -> Result<(), StrataError> {
        self.transition(layer, key, KeyState::Failed)
    }

    fn transition(&mut self, layer: &str, key: &str, next: KeyState) -> Result<(), StrataError> {
        if self.state != KeyState::Unbound {
            return Err(StrataError::ProtocolViolation {
                layer: layer.to_string(),
                key: key.to_string(),
                detail: format!("bind while in state {:?}", self.state),
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Shared key bookkeeping for concrete layers. BTreeMap-backed so every
/// iteration — and therefore every diagnostic batch — is deterministic.
pub(crate) struct KeyLedger<V> {
    entries: BTreeMap<String, LedgerEntry<V>>,
}

impl<V> KeyLedger<V> {
    pub fn new() -> Self {
        KeyLedger {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: String, external_key: String, location: String, payload: V) {
        self.entries.insert(
            key,
            LedgerEntry {
                external_key,
                location,
                state: KeyState::Unbound,
                payload,
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entry_mut(&mut self, key: &str) -> Option<&mut LedgerEntry<V>> {
        self.entries.get_mut(key)
    }

    /// `Bound` → `Used`; anything else is a protocol violation.
    pub fn commit(&mut self, layer: &str, key: &str) -> Result<(), StrataError> {
        let Some(entry) = self.entries.get_mut(key) else {
            return Err(StrataError::ProtocolViolation {
                layer: layer.to_string(),
                key: key.to_string(),
                detail: "commit for a key this layer never offered".to_string(),
            });
        };
        if entry.state != KeyState::Bound {
            return Err(StrataError::ProtocolViolation {
                layer: layer.to_string(),
                key: key.to_string(),
                detail: format!("commit while in state {:?}", entry.state),
            });
        }
        entry.state = KeyState::Used;
        Ok(())
    }

    pub fn post_errors(&self, layer: &str) -> Vec<StrataError> {
        self.entries
            .iter()
            .filter_map(|(key, entry)| match entry.state {
                KeyState::Unbound => Some(StrataError::UnboundKey {
                    key: key.clone(),
                    location: entry.location.clone(),
                    layer: layer.to_string(),
                }),
                KeyState::Bound => Some(StrataError::OverriddenKey {
                    key: key.clone(),
                    location: entry.location.clone(),
                    layer: layer.to_string(),
                }),
                KeyState::Failed | KeyState::Used => None,
            })
            .collect()
    }
}
