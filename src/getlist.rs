//! Get-list accelerator: the [`Schema`]'s leaves flattened into an ordered
//! list of lookup closures, one per leaf, in UID order.
//!
//! Each closure knows its leaf's key and type and queries whatever
//! [`Getter`] it is handed, so the same list — built once per type — can be
//! replayed against any source without re-walking the struct shape. Entry
//! `i` always queries the leaf with UID `i`; later phases rely on that
//! alignment to index parallel structures.

use std::any::TypeId;

use crate::error::StrataError;
use crate::scan::{Node, Schema};
use crate::shape::BoxedLeaf;

/// Identity of the leaf a closure is asking about.
pub struct LeafTarget {
    pub uid: usize,
    pub key: String,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

/// Abstract lookup capability a get-list entry is replayed against.
pub trait Getter {
    fn get(&mut self, target: &LeafTarget) -> Result<Option<BoxedLeaf>, StrataError>;
}

/// Outcome of one get-list entry: the leaf's UID, its value if the getter
/// had one, and the getter's hard error if it failed outright.
pub struct LeafLookup {
    pub uid: usize,
    pub value: Option<BoxedLeaf>,
    pub error: Option<StrataError>,
}

pub type GetList = Vec<Box<dyn Fn(&mut dyn Getter) -> LeafLookup>>;

/// Flatten a schema's leaves into closures, in UID order.
pub fn build_get_list(schema: &Schema) -> GetList {
    let mut list: GetList = Vec::with_capacity(schema.leaf_count());
    flatten(schema.root(), &mut list);
    debug_assert_eq!(list.len(), schema.leaf_count());
    list
}

fn flatten(node: &Node, list: &mut GetList) {
    match node {
        Node::Struct(s) => {
            for (_, child) in &s.children {
                flatten(child, list);
            }
        }
        Node::Value(v) => {
            debug_assert_eq!(v.uid, list.len());
            let target = LeafTarget {
                uid: v.uid,
                key: v.key.clone(),
                type_id: v.type_id,
                type_name: v.type_name,
            };
            list.push(Box::new(move |getter| match getter.get(&target) {
                Ok(value) => LeafLookup {
                    uid: target.uid,
                    value,
                    error: None,
                },
                Err(e) => LeafLookup {
                    uid: target.uid,
                    value: None,
                    error: Some(e),
                },
            }));
        }
    }
}
