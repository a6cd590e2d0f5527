//! The `Populate` trait and the runtime type descriptor it exposes.
//!
//! `#[derive(Populate)]` (from `strata-derive`) turns a struct definition
//! into three things the engine consumes without knowing the concrete type:
//!
//! - `shape()` — a [`StructShape`] describing every visible field, built
//!   fresh per call and walked once per destination *type* by the scanner;
//! - `vacant()` — the all-`None` placeholder value;
//! - `probe`/`apply` — generated accessors that navigate a value by
//!   field-index path, the ordinary-integer-sequence stand-in for reflective
//!   field access.
//!
//! Nested and embedded roles hold `fn() -> StructShape` pointers rather than
//! expanded sub-shapes, so self-referential types stay representable; the
//! scanner's cycle check is what bounds the walk.

use std::any::{Any, TypeId};

use thiserror::Error;

/// A leaf value in transit between a layer and a destination field.
pub type BoxedLeaf = Box<dyn Any>;

/// Runtime descriptor of one struct type: its identity plus an ordered
/// field list.
#[derive(Debug, Clone)]
pub struct StructShape {
    pub type_name: &'static str,
    pub type_id: TypeId,
    pub fields: Vec<FieldShape>,
}

/// One declared field. `index` is the field's position in the index-path
/// space (skipped fields are not counted).
#[derive(Debug, Clone, Copy)]
pub struct FieldShape {
    pub ident: &'static str,
    pub rename: Option<&'static str>,
    pub index: usize,
    pub role: FieldRole,
}

/// What kind of slot a field is.
#[derive(Debug, Clone, Copy)]
pub enum FieldRole {
    /// Directly bindable: `Option<T>` with `T` in the leaf registry.
    Leaf(LeafShape),
    /// `Option<S>` where `S: Populate`; a nested section of the tree.
    Nested(fn() -> StructShape),
    /// A bare `S: Populate` whose fields are flattened into the parent.
    Embedded(fn() -> StructShape),
}

/// Type identity of a leaf field's inner type.
#[derive(Debug, Clone, Copy)]
pub struct LeafShape {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

/// Result of a non-mutating look at one field-index path.
pub enum Probe {
    /// A leaf slot; `Some` carries a boxed clone of the current value.
    Leaf(Option<BoxedLeaf>),
    /// A nested struct slot, allocated or not.
    Struct { occupied: bool },
    /// The path descends below an unallocated nested struct.
    Vacant,
}

/// A mutation to perform at one field-index path.
pub enum Apply {
    /// Overwrite a nested struct slot with a fresh vacant value.
    Allocate,
    /// Write a resolved leaf value.
    Set(BoxedLeaf),
}

/// Errors from the generated `probe`/`apply` accessors. These indicate a
/// path/shape disagreement, which the engine treats as an invariant
/// violation rather than user input error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("empty field-index path")]
    EmptyPath,
    #[error("field index {index} out of range")]
    IndexOutOfRange { index: usize },
    #[error("index path continues past leaf field {index}")]
    PastLeaf { index: usize },
    #[error("nested struct at field {index} is not allocated")]
    Unallocated { index: usize },
    #[error("cannot allocate into leaf field {index}")]
    AllocateLeaf { index: usize },
    #[error("cannot write a value into nested struct field {index}")]
    SetStruct { index: usize },
    #[error("value type mismatch: expected {expected}")]
    ValueType { expected: &'static str },
}

/// A destination type the engine can scan and fill.
///
/// Implemented via `#[derive(Populate)]`; hand-written impls are possible
/// but the derive enforces the structural rules (leaves are `Option<T>`,
/// embedded structs are bare values) that the engine assumes.
pub trait Populate: 'static {
    /// The runtime type descriptor. Cheap enough to call per scan; the
    /// scanner caches its output in the [`Schema`](crate::Schema) instead.
    fn shape() -> StructShape;

    /// The all-`None` zero value.
    fn vacant() -> Self
    where
        Self: Sized;

    /// Read the slot at `path` without mutating anything.
    fn probe(&self, path: &[usize]) -> Result<Probe, AccessError>;

    /// Mutate the slot at `path`.
    fn apply(&mut self, path: &[usize], op: Apply) -> Result<(), AccessError>;
}
