//! Error taxonomy for every phase of a fill.
//!
//! Scan, resolve, and post-process errors are always **batched** — the
//! engine finishes its pass and reports every problem it found, so one run
//! surfaces every misspelled key, unparseable value, and unsupported field
//! at once. Only layer-registration errors fail fast (there is no useful
//! partial registration state). The batches travel as `Vec<StrataError>`,
//! aggregated into a [`FillError`] by the fill entry point.

use std::fmt;

use thiserror::Error;

use crate::report::FillReport;
use crate::shape::AccessError;

#[derive(Debug, Clone, Error)]
pub enum StrataError {
    /// A field is neither a registered leaf type nor a nested struct.
    #[error("unsupported field type {type_name} at '{path}'")]
    UnsupportedType {
        path: String,
        type_name: &'static str,
    },

    /// Two visible fields at the same embedding depth map to the same key.
    #[error("field name collision on key '{key}': {first} vs {second}")]
    FieldNameCollision {
        key: String,
        first: String,
        second: String,
    },

    /// A struct type appears twice along one root-to-leaf path.
    #[error("recursive struct type {type_name}: first at '{first}', again at '{second}'")]
    RecursiveStruct {
        type_name: &'static str,
        first: String,
        second: String,
    },

    /// The validating scan found a value where only shape was expected.
    #[error("expected an empty placeholder at '{path}', found a value")]
    RequireEmptyStruct { path: String },

    /// A layer holds a value for this key but cannot coerce the text into
    /// the destination type.
    #[error("cannot parse '{key}' as {type_name} from {location}: {reason}")]
    Parse {
        key: String,
        type_name: &'static str,
        location: String,
        reason: String,
    },

    /// A struct layer's source field type differs from the destination's.
    #[error("type mismatch for '{key}' from {location}: expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
        location: String,
    },

    /// A configured alias name is itself a structural key.
    #[error("alias '{alias}' (for '{key}') collides with a structural key in {layer}")]
    AliasCollision {
        alias: String,
        key: String,
        layer: String,
    },

    /// A layer held a value nobody ever asked for under that key.
    #[error("{layer}: value for '{key}' at {location} was never requested")]
    UnboundKey {
        key: String,
        location: String,
        layer: String,
    },

    /// A higher-priority layer's value won over this one.
    #[error("{layer}: value for '{key}' at {location} was overridden by a higher-priority layer")]
    OverriddenKey {
        key: String,
        location: String,
        layer: String,
    },

    /// No layer supplied a value for this leaf.
    #[error("no layer supplied a value for '{key}' ({type_name})")]
    Uninitialized {
        key: String,
        type_name: &'static str,
    },

    /// A later layer supplied a key a strict earlier layer already owns.
    #[error("{layer} supplied '{key}' at {location}, but strict layer {strict_layer} already owns it")]
    StrictOverride {
        key: String,
        strict_layer: String,
        layer: String,
        location: String,
    },

    /// Two registered layers share a de-duplication identity.
    #[error("duplicate layer ({identity}): position {duplicate} repeats position {original}")]
    DuplicateLayer {
        original: usize,
        duplicate: usize,
        identity: String,
    },

    /// The same leaf type was registered twice.
    #[error("leaf type {type_name} is already registered")]
    DuplicateLeafType { type_name: &'static str },

    /// A prebuilt schema was used to fill a different type.
    #[error("schema built for {expected} cannot fill {found}")]
    SchemaMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A bind/commit call broke the layer key-state protocol. Indicates a
    /// bug in a layer implementation, not bad user configuration.
    #[error("layer protocol violation in {layer} for key '{key}': {detail}")]
    ProtocolViolation {
        layer: String,
        key: String,
        detail: String,
    },

    /// Generated accessors rejected a field-index path.
    #[error("field access failed at '{path}': {source}")]
    Access { path: String, source: AccessError },

    /// A value source failed to produce its entries.
    #[error("value source {name} failed: {reason}")]
    Source { name: String, reason: String },
}

/// Aggregate failure from a fill attempt: the full error batch, plus the
/// partial location report for whatever leaves did resolve (the destination
/// may likewise be partially allocated — both are intentional debugging
/// aids).
#[derive(Debug)]
pub struct FillError {
    pub errors: Vec<StrataError>,
    pub report: FillReport,
}

impl fmt::Display for FillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration fill failed with {} error(s)", self.errors.len())?;
        for e in &self.errors {
            write!(f, "\n  - {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FillError {}
