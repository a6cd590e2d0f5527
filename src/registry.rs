//! The registered leaf-type table.
//!
//! A [`LeafRegistry`] decides which field types the scanner treats as
//! directly bindable leaves, and how string layers parse text into them.
//! It is an explicit, caller-owned object handed to the engine (the
//! [`Filler`](crate::Filler) defaults to [`LeafRegistry::standard`]), not
//! process-global state; registering the same type twice is an ordinary
//! error.
//!
//! `standard()` seeds every fixed-width integer, both floats, `bool`,
//! `String`, `SystemTime` (RFC 3339 via humantime), `Duration` (humantime
//! forms like `30s`, `5m`), and comma-separated `Vec` leaves of the common
//! scalar types. Anything else — a newtype, a chrono timestamp, an enum —
//! goes through [`LeafRegistry::register`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use crate::error::StrataError;
use crate::shape::BoxedLeaf;

/// Parse a string into a boxed value of the registered type.
pub type ParseFn = fn(&str) -> Result<BoxedLeaf, String>;

/// How one leaf type is named and parsed.
pub struct LeafCodec {
    pub type_name: &'static str,
    pub parse: ParseFn,
}

/// The set of terminal types the engine knows how to bind directly.
pub struct LeafRegistry {
    codecs: HashMap<TypeId, LeafCodec>,
}

impl LeafRegistry {
    /// A registry with no entries. Useful for tests and for callers that
    /// want full control over the leaf set.
    pub fn empty() -> Self {
        LeafRegistry {
            codecs: HashMap::new(),
        }
    }

    /// The pre-seeded registry described in the module docs.
    pub fn standard() -> Self {
        let mut r = Self::empty();
        r.seed::<i8>(parse_scalar::<i8>);
        r.seed::<i16>(parse_scalar::<i16>);
        r.seed::<i32>(parse_scalar::<i32>);
        r.seed::<i64>(parse_scalar::<i64>);
        r.seed::<i128>(parse_scalar::<i128>);
        r.seed::<isize>(parse_scalar::<isize>);
        r.seed::<u8>(parse_scalar::<u8>);
        r.seed::<u16>(parse_scalar::<u16>);
        r.seed::<u32>(parse_scalar::<u32>);
        r.seed::<u64>(parse_scalar::<u64>);
        r.seed::<u128>(parse_scalar::<u128>);
        r.seed::<usize>(parse_scalar::<usize>);
        r.seed::<f32>(parse_scalar::<f32>);
        r.seed::<f64>(parse_scalar::<f64>);
        r.seed::<bool>(parse_scalar::<bool>);
        r.seed::<String>(parse_string);
        r.seed::<SystemTime>(parse_timestamp);
        r.seed::<Duration>(parse_duration);
        r.seed::<Vec<String>>(parse_list::<String>);
        r.seed::<Vec<i64>>(parse_list::<i64>);
        r.seed::<Vec<u64>>(parse_list::<u64>);
        r.seed::<Vec<f64>>(parse_list::<f64>);
        r.seed::<Vec<bool>>(parse_list::<bool>);
        r
    }

    /// Register a caller-supplied leaf type.
    pub fn register<T: Any>(&mut self, parse: ParseFn) -> Result<(), StrataError> {
        let type_name = std::any::type_name::<T>();
        match self.codecs.entry(TypeId::of::<T>()) {
            std::collections::hash_map::Entry::Occupied(_) => {
                Err(StrataError::DuplicateLeafType { type_name })
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(LeafCodec { type_name, parse });
                Ok(())
            }
        }
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.codecs.contains_key(&id)
    }

    pub fn codec(&self, id: TypeId) -> Option<&LeafCodec> {
        self.codecs.get(&id)
    }

    fn seed<T: Any>(&mut self, parse: ParseFn) {
        self.register::<T>(parse)
            .expect("standard registry seeds are unique");
    }
}

impl Default for LeafRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn parse_scalar<T>(s: &str) -> Result<BoxedLeaf, String>
where
    T: FromStr + Any,
    T::Err: Display,
{
    s.trim()
        .parse::<T>()
        .map(|v| Box::new(v) as BoxedLeaf)
        .map_err(|e| e.to_string())
}

fn parse_string(s: &str) -> Result<BoxedLeaf, String> {
    Ok(Box::new(s.to_string()))
}

/// Comma-separated list; the empty string is the empty list.
fn parse_list<T>(s: &str) -> Result<BoxedLeaf, String>
where
    T: FromStr + Any,
    T::Err: Display,
{
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(Box::new(Vec::<T>::new()));
    }
    trimmed
        .split(',')
        .map(|part| part.trim().parse::<T>().map_err(|e| e.to_string()))
        .collect::<Result<Vec<T>, String>>()
        .map(|v| Box::new(v) as BoxedLeaf)
}

fn parse_timestamp(s: &str) -> Result<BoxedLeaf, String> {
    humantime::parse_rfc3339_weak(s.trim())
        .map(|t| Box::new(t) as BoxedLeaf)
        .map_err(|e| e.to_string())
}

fn parse_duration(s: &str) -> Result<BoxedLeaf, String> {
    humantime::parse_duration(s.trim())
        .map(|d| Box::new(d) as BoxedLeaf)
        .map_err(|e| e.to_string())
}
