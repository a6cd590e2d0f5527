//! Shape scanner: one DFS over a destination type's descriptor, producing
//! the immutable [`Node`] tree the rest of the pipeline walks.
//!
//! The scan resolves flattening and shadowing (a flattened struct's fields
//! are promoted into the parent's scope; when two fields produce the same
//! visible key, the shallower one wins and an equal-depth tie is a
//! collision error), assigns every leaf a dense UID in DFS order, and
//! detects self-referential types. Errors are batched — the walk continues
//! past every problem and reports all of them from one pass.
//!
//! The resulting [`Schema`] is built once per destination *type* and is
//! safe to reuse across any number of fills.

use std::any::TypeId;

use log::debug;

use crate::error::StrataError;
use crate::key;
use crate::registry::LeafRegistry;
use crate::shape::{FieldRole, Populate, Probe, StructShape};

/// One position in the destination type's shape tree.
#[derive(Debug)]
pub enum Node {
    Struct(StructNode),
    Value(ValueNode),
}

/// A nested (or root) struct: its children keyed by field-index path
/// relative to this struct. Paths longer than one element reach through
/// flattened intermediates.
#[derive(Debug)]
pub struct StructNode {
    pub type_name: &'static str,
    /// Visible key of this struct ("" for the root).
    pub key: String,
    /// Absolute field-index path from the root (empty for the root).
    pub path: Vec<usize>,
    pub children: Vec<(Vec<usize>, Node)>,
}

/// A directly bindable leaf.
#[derive(Debug)]
pub struct ValueNode {
    /// Dense identity, assigned in DFS visitation order starting at 0.
    pub uid: usize,
    /// Visible key — both the human-readable path and the lookup key.
    pub key: String,
    /// Absolute field-index path from the root.
    pub path: Vec<usize>,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

/// The cached scan result for one destination type.
#[derive(Debug)]
pub struct Schema {
    root: Node,
    leaf_count: usize,
    type_id: TypeId,
    type_name: &'static str,
}

impl Schema {
    /// Scan a destination type's shape.
    ///
    /// Returns every error found across the whole tree in one batch:
    /// unsupported leaf types, field-name collisions, recursive struct
    /// types.
    pub fn build<T: Populate>(registry: &LeafRegistry) -> Result<Schema, Vec<StrataError>> {
        let shape = T::shape();
        let mut scanner = Scanner {
            registry,
            errors: Vec::new(),
            next_uid: 0,
        };
        let mut stack = vec![(shape.type_id, String::new())];
        let root = scanner.scan_struct(&shape, "", "", Vec::new(), &mut stack);
        debug!(
            "scanned {}: {} leaves, {} errors",
            shape.type_name,
            scanner.next_uid,
            scanner.errors.len()
        );
        if scanner.errors.is_empty() {
            Ok(Schema {
                root: Node::Struct(root),
                leaf_count: scanner.next_uid,
                type_id: shape.type_id,
                type_name: shape.type_name,
            })
        } else {
            Err(scanner.errors)
        }
    }

    /// The validating variant: scan, then verify that `instance` is a
    /// genuinely empty placeholder — no allocated nested struct, no leaf
    /// already holding a value. Callers use this to assert that a value
    /// passed in for its *shape* carries no data the fill would silently
    /// overwrite.
    pub fn build_checked<T: Populate>(
        registry: &LeafRegistry,
        instance: &T,
    ) -> Result<Schema, Vec<StrataError>> {
        let shape = T::shape();
        let mut scanner = Scanner {
            registry,
            errors: Vec::new(),
            next_uid: 0,
        };
        let mut stack = vec![(shape.type_id, String::new())];
        let root = scanner.scan_struct(&shape, "", "", Vec::new(), &mut stack);
        let mut errors = scanner.errors;
        let root = Node::Struct(root);
        check_vacant(instance, &root, &mut errors);
        if errors.is_empty() {
            Ok(Schema {
                root,
                leaf_count: scanner.next_uid,
                type_id: shape.type_id,
                type_name: shape.type_name,
            })
        } else {
            Err(errors)
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Scan-time visibility record for one candidate field. Shadowing input:
/// shallower embedding depth wins, equal depth collides.
struct Visible {
    segment: String,
    /// Rust-side field path ("db.pool_size"), for diagnostics only.
    ident_path: String,
    /// Field-index path relative to the enclosing struct.
    rel_path: Vec<usize>,
    depth: usize,
    order: usize,
    role: FieldRole,
}

struct Scanner<'r> {
    registry: &'r LeafRegistry,
    errors: Vec<StrataError>,
    next_uid: usize,
}

impl Scanner<'_> {
    /// `stack` holds the struct types currently open along this root-to-leaf
    /// path, with the ident-path where each was entered; a repeat means a
    /// cycle.
    fn scan_struct(
        &mut self,
        shape: &StructShape,
        key_prefix: &str,
        ident_prefix: &str,
        abs_path: Vec<usize>,
        stack: &mut Vec<(TypeId, String)>,
    ) -> StructNode {
        let mut records = Vec::new();
        let mut order = 0;
        self.collect(shape, 0, &[], ident_prefix, &mut order, &mut records, stack);
        let visible = self.resolve_visibility(key_prefix, records);

        let mut children = Vec::new();
        for v in visible {
            let child_key = key::join(key_prefix, &v.segment);
            match v.role {
                FieldRole::Leaf(leaf) => {
                    if self.registry.contains(leaf.type_id) {
                        let uid = self.next_uid;
                        self.next_uid += 1;
                        let mut path = abs_path.clone();
                        path.extend_from_slice(&v.rel_path);
                        children.push((
                            v.rel_path,
                            Node::Value(ValueNode {
                                uid,
                                key: child_key,
                                path,
                                type_id: leaf.type_id,
                                type_name: leaf.type_name,
                            }),
                        ));
                    } else {
                        self.errors.push(StrataError::UnsupportedType {
                            path: child_key,
                            type_name: leaf.type_name,
                        });
                    }
                }
                FieldRole::Nested(sub) => {
                    let sub_shape = sub();
                    if let Some(first) = entered_at(stack, sub_shape.type_id) {
                        self.errors.push(StrataError::RecursiveStruct {
                            type_name: sub_shape.type_name,
                            first,
                            second: v.ident_path,
                        });
                        continue;
                    }
                    let mut path = abs_path.clone();
                    path.extend_from_slice(&v.rel_path);
                    stack.push((sub_shape.type_id, v.ident_path.clone()));
                    let child =
                        self.scan_struct(&sub_shape, &child_key, &v.ident_path, path, stack);
                    stack.pop();
                    children.push((v.rel_path, Node::Struct(child)));
                }
                // Embedded fields are expanded by collect() and never
                // surface as visibility records.
                FieldRole::Embedded(_) => {}
            }
        }

        StructNode {
            type_name: shape.type_name,
            key: key_prefix.to_string(),
            path: abs_path,
            children,
        }
    }

    /// Depth-first, left-to-right field discovery with flattened structs
    /// expanded in place, so discovery order matches declaration order.
    #[allow(clippy::too_many_arguments)]
    fn collect(
        &mut self,
        shape: &StructShape,
        depth: usize,
        rel_prefix: &[usize],
        ident_prefix: &str,
        order: &mut usize,
        out: &mut Vec<Visible>,
        stack: &mut Vec<(TypeId, String)>,
    ) {
        for f in &shape.fields {
            let mut rel_path = rel_prefix.to_vec();
            rel_path.push(f.index);
            let ident_path = if ident_prefix.is_empty() {
                f.ident.to_string()
            } else {
                format!("{ident_prefix}.{}", f.ident)
            };
            match f.role {
                FieldRole::Embedded(sub) => {
                    let sub_shape = sub();
                    if let Some(first) = entered_at(stack, sub_shape.type_id) {
                        self.errors.push(StrataError::RecursiveStruct {
                            type_name: sub_shape.type_name,
                            first,
                            second: ident_path,
                        });
                        continue;
                    }
                    stack.push((sub_shape.type_id, ident_path.clone()));
                    self.collect(
                        &sub_shape,
                        depth + 1,
                        &rel_path,
                        &ident_path,
                        order,
                        out,
                        stack,
                    );
                    stack.pop();
                }
                _ => {
                    out.push(Visible {
                        segment: key::segment(f.ident, f.rename),
                        ident_path,
                        rel_path,
                        depth,
                        order: *order,
                        role: f.role,
                    });
                    *order += 1;
                }
            }
        }
    }

    /// Apply the shadowing rules to the discovered records: per segment,
    /// the shallowest depth wins; an equal-depth tie reports one collision
    /// naming both paths and hides both fields.
    fn resolve_visibility(&mut self, key_prefix: &str, records: Vec<Visible>) -> Vec<Visible> {
        let mut by_segment: std::collections::BTreeMap<String, Vec<Visible>> =
            std::collections::BTreeMap::new();
        for r in records {
            by_segment.entry(r.segment.clone()).or_default().push(r);
        }

        let mut winners = Vec::new();
        for (segment, mut group) in by_segment {
            group.sort_by_key(|r| (r.depth, r.order));
            if group.len() > 1 && group[0].depth == group[1].depth {
                self.errors.push(StrataError::FieldNameCollision {
                    key: key::join(key_prefix, &segment),
                    first: group[0].ident_path.clone(),
                    second: group[1].ident_path.clone(),
                });
                continue;
            }
            if let Some(winner) = group.into_iter().next() {
                winners.push(winner);
            }
        }
        winners.sort_by_key(|r| r.order);
        winners
    }
}

fn entered_at(stack: &[(TypeId, String)], id: TypeId) -> Option<String> {
    stack.iter().find(|(tid, _)| *tid == id).map(|(_, path)| {
        if path.is_empty() {
            "(root)".to_string()
        } else {
            path.clone()
        }
    })
}

/// Instance check for the validating scan: anything already allocated or
/// set where only shape was expected is an error.
fn check_vacant<T: Populate>(instance: &T, node: &Node, errors: &mut Vec<StrataError>) {
    match node {
        Node::Struct(s) => {
            if !s.path.is_empty()
                && let Ok(Probe::Struct { occupied: true }) = instance.probe(&s.path)
            {
                errors.push(StrataError::RequireEmptyStruct { path: s.key.clone() });
            }
            for (_, child) in &s.children {
                check_vacant(instance, child, errors);
            }
        }
        Node::Value(v) => {
            if let Ok(Probe::Leaf(Some(_))) = instance.probe(&v.path) {
                errors.push(StrataError::RequireEmptyStruct { path: v.key.clone() });
            }
        }
    }
}
