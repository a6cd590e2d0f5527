//! Concrete configuration layers and the value-source contract they share.
//!
//! String-shaped sources (environment, command line, in-memory maps)
//! implement [`ValueSource`] — "give me your string values keyed by
//! canonical key, each with a provenance string" — and are wrapped in a
//! [`StringLayer`], which owns parsing and consumption tracking. Typed
//! defaults come from a [`StructLayer`], which reads an already-populated
//! `Populate` value instead of parsing text.

use std::collections::BTreeMap;

use crate::error::StrataError;
use crate::layer::LayerIdentity;

mod cmdline;
mod env;
mod map;
mod string;
mod structs;

pub use cmdline::CmdlineSource;
pub use env::EnvSource;
pub use map::MapSource;
pub use string::StringLayer;
pub use structs::StructLayer;

/// One string value as supplied by a source.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub value: String,
    /// The source's native name for the key (env var, flag, ...).
    pub external_key: String,
    /// Human-readable provenance, used only for diagnostics.
    pub location: String,
}

/// A set of string values keyed by canonical key.
pub trait ValueSource {
    /// Label used in diagnostics, e.g. `env[APP]`.
    fn name(&self) -> String;

    /// Registration-time de-duplication identity.
    fn identity(&self) -> LayerIdentity {
        LayerIdentity::Source(self.name())
    }

    /// Produce the source's values. Called once, when the wrapping layer is
    /// constructed.
    fn entries(&self) -> Result<BTreeMap<String, SourceEntry>, StrataError>;
}
