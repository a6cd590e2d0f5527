//! Layered configuration population for Rust structs. Define a struct,
//! stack your sources, and every field tells you where its value came from.
//!
//! Strata fills a destination struct from an ordered list of configuration
//! **layers** — command-line flags, environment variables, in-memory
//! default structs, arbitrary string-keyed providers — resolving each leaf
//! field independently to the first layer that supplies it, and reporting
//! either full success or one aggregate error that names every field still
//! unset, every value that failed to parse, and every supplied value
//! nobody consumed.
//!
//! ```ignore
//! #[derive(Populate)]
//! struct AppConfig {
//!     host: Option<String>,
//!     port: Option<u16>,
//!     #[strata(nested)]
//!     database: Option<DbConfig>,
//! }
//!
//! let mut config = AppConfig::vacant();
//! let report = Filler::builder()
//!     .cmdline_layer()
//!     .env_layer("MYAPP")
//!     .struct_layer("defaults", defaults)
//!     .build()?
//!     .fill(&mut config)?;
//! ```
//!
//! That fills `config.host` from `--host`, or `MYAPP__HOST`, or the
//! defaults struct — whichever comes first — and hands back a report with
//! one `{path, origin}` row per field.
//!
//! # Why strata
//!
//! Most layered-config libraries deep-merge whole value trees and hand the
//! merged blob to a deserializer. That answers *what* each field ended up
//! as, but not *where it came from*, *which supplied values were never
//! used*, or *which fields nobody set* — the three questions that actually
//! matter when a deployment misbehaves. Strata resolves field-by-field
//! instead: every leaf knows its winning layer and provenance, every layer
//! knows which of its values were consumed, and every problem found in a
//! run is reported in that run.
//!
//! # Design: struct as source of truth
//!
//! Your config struct (via the [`Populate`] derive) is the schema for
//! everything:
//!
//! - **Leaf fields are `Option<T>`** — `None` is "unset", so absence is
//!   representable and a fill either sets every leaf or tells you which
//!   ones it could not.
//! - **`#[strata(nested)]`** models hierarchical config. Nesting maps to
//!   hyphenated keys (`database-pool_size`) and double-underscore env var
//!   segments (`APP__DATABASE__POOL_SIZE`).
//! - **`#[strata(flatten)]`** embeds a struct's fields into the parent
//!   scope, with Go-style shadowing: an outer field beats an embedded one
//!   of the same name; two embedded fields at the same depth collide and
//!   are reported.
//! - **`#[strata(rename = "...")]`** overrides a key segment.
//!
//! The engine scans the struct **once per type** into a [`Schema`] — a tree
//! of struct and value nodes in which every leaf carries a dense UID — and
//! reuses that schema across fills.
//!
//! # Layer precedence
//!
//! Layers are registered in **priority-descending** order: the first layer
//! added wins ties. Every layer is sparse — it supplies only the keys it
//! has, and unset keys fall through to the layers after it.
//!
//! A layer registered through
//! [`strict_layer`](FillerBuilder::strict_layer) additionally *rejects*
//! later layers' attempts to supply its keys (a dedicated
//! [`StrictOverride`](StrataError::StrictOverride) error), instead of
//! merely out-prioritizing them.
//!
//! # Consumption tracking
//!
//! Each layer tracks every key it holds through a small state machine:
//! never queried, queried-and-handed-out, or committed. After resolution,
//! a value nobody asked for is an
//! [`UnboundKey`](StrataError::UnboundKey) error (usually a typo'd env
//! var), and a value that lost to a higher-priority layer is an
//! [`OverriddenKey`](StrataError::OverriddenKey) error. Configuration
//! mistakes surface instead of rotting silently.
//!
//! # One-shot fills
//!
//! [`Filler::fill`] consumes the filler: layers are stateful, so a layer
//! set serves exactly one fill. The expensive part — the scan — lives in
//! the reusable [`Schema`]; build a fresh filler per fill and pass the
//! schema to [`Filler::fill_with`]. Everything is synchronous and
//! single-threaded by design.
//!
//! # Error handling
//!
//! All fallible phases batch their errors: the scanner reports every
//! unsupported field and name collision in one pass, and a fill reports
//! every uninitialized leaf, parse failure, and unconsumed value together
//! in a [`FillError`]. Only layer registration fails fast
//! ([`DuplicateLayer`](StrataError::DuplicateLayer), naming both
//! positions). See the [`error`] module for the full taxonomy.

// Lets the derive's `::strata::...` paths resolve inside this crate too.
extern crate self as strata;

pub mod error;
pub mod shape;

mod builder;
mod fill;
mod getlist;
mod key;
mod layer;
pub mod layers;
mod registry;
mod report;
mod resolve;
mod scan;

#[cfg(test)]
mod fixtures;

pub use builder::{Filler, FillerBuilder};
pub use error::{FillError, StrataError};
pub use getlist::{GetList, Getter, LeafLookup, LeafTarget, build_get_list};
pub use layer::{BindingAttempt, KeyState, Layer, LayerIdentity};
pub use layers::{
    CmdlineSource, EnvSource, MapSource, SourceEntry, StringLayer, StructLayer, ValueSource,
};
pub use registry::{LeafCodec, LeafRegistry, ParseFn};
pub use report::{FillReport, ReportRow};
pub use resolve::ReportEntry;
pub use scan::{Node, Schema, StructNode, ValueNode};
pub use shape::Populate;
pub use strata_derive::Populate;
