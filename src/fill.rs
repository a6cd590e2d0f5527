//! Struct reconstruction: the second DFS over the node tree, writing
//! resolved values into the destination.
//!
//! The destination is first overwritten with its vacant value — a fill
//! never preserves pre-existing partial population. Nested structs are
//! allocated fresh on the way down; each leaf either receives its resolved
//! value (emitting one location-report row) or contributes an
//! `Uninitialized` error. Errors never stop the walk: one child's failure
//! does not block filling its siblings, mirroring the scanner's batching.

use log::debug;

use crate::error::StrataError;
use crate::report::{FillReport, ReportRow};
use crate::resolve::ReportEntry;
use crate::scan::Node;
use crate::shape::{Apply, Populate};

/// Fill `dest` from the resolved entries. Returns the location report for
/// every leaf that was written, plus the batched errors.
pub(crate) fn fill_tree<T: Populate>(
    dest: &mut T,
    root: &Node,
    entries: &mut [ReportEntry],
) -> (FillReport, Vec<StrataError>) {
    *dest = T::vacant();
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    walk(dest, root, entries, &mut rows, &mut errors);
    debug!("filled {} leaves, {} errors", rows.len(), errors.len());
    (FillReport { rows }, errors)
}

fn walk<T: Populate>(
    dest: &mut T,
    node: &Node,
    entries: &mut [ReportEntry],
    rows: &mut Vec<ReportRow>,
    errors: &mut Vec<StrataError>,
) {
    match node {
        Node::Struct(s) => {
            // The root already exists; everything below it is allocated
            // fresh before descending.
            if !s.path.is_empty()
                && let Err(e) = dest.apply(&s.path, Apply::Allocate)
            {
                errors.push(StrataError::Access {
                    path: s.key.clone(),
                    source: e,
                });
                return;
            }
            for (_, child) in &s.children {
                walk(dest, child, entries, rows, errors);
            }
        }
        Node::Value(v) => {
            let entry = &mut entries[v.uid];
            match entry.value.take() {
                Some(value) => match dest.apply(&v.path, Apply::Set(value)) {
                    Ok(()) => rows.push(ReportRow {
                        uid: v.uid,
                        path: v.key.clone(),
                        location: entry.location.clone().unwrap_or_default(),
                    }),
                    Err(e) => errors.push(StrataError::Access {
                        path: v.key.clone(),
                        source: e,
                    }),
                },
                None => errors.push(StrataError::Uninitialized {
                    key: v.key.clone(),
                    type_name: v.type_name,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Populate;
    use crate::registry::LeafRegistry;
    use crate::scan::Schema;

    #[derive(Populate, Debug, PartialEq)]
    struct Root {
        a: Option<i64>,
        #[strata(nested)]
        sub: Option<Sub>,
    }

    #[derive(Populate, Debug, PartialEq)]
    struct Sub {
        b: Option<String>,
    }

    fn entries_for(schema: &Schema) -> Vec<ReportEntry> {
        (0..schema.leaf_count())
            .map(|uid| ReportEntry {
                uid,
                key: String::new(),
                external_key: None,
                location: None,
                winner: None,
                layer_errors: Vec::new(),
                value: None,
            })
            .collect()
    }

    #[test]
    fn resolved_leaves_are_written_and_reported() {
        let schema = Schema::build::<Root>(&LeafRegistry::standard()).unwrap();
        let mut entries = entries_for(&schema);
        entries[0].value = Some(Box::new(42i64));
        entries[0].location = Some("struct[defaults]:a".to_string());
        entries[1].value = Some(Box::new("hello".to_string()));
        entries[1].location = Some("env[APP__SUB__B]".to_string());

        let mut dest = Root::vacant();
        let (report, errors) = fill_tree(&mut dest, schema.root(), &mut entries);
        assert!(errors.is_empty());
        assert_eq!(dest.a, Some(42));
        assert_eq!(dest.sub.as_ref().unwrap().b.as_deref(), Some("hello"));
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].path, "a");
        assert_eq!(report.rows[1].location, "env[APP__SUB__B]");
    }

    #[test]
    fn missing_leaf_is_uninitialized_but_parent_still_allocates() {
        let schema = Schema::build::<Root>(&LeafRegistry::standard()).unwrap();
        let mut entries = entries_for(&schema);
        entries[0].value = Some(Box::new(42i64));

        let mut dest = Root::vacant();
        let (report, errors) = fill_tree(&mut dest, schema.root(), &mut entries);
        assert_eq!(dest.a, Some(42));
        // sub was allocated even though its only leaf stayed unset.
        assert_eq!(dest.sub, Some(Sub { b: None }));
        assert_eq!(report.rows.len(), 1);
        assert_eq!(errors.len(), 1);
        let StrataError::Uninitialized { key, type_name } = &errors[0] else {
            panic!("expected Uninitialized, got {:?}", errors[0]);
        };
        assert_eq!(key, "sub-b");
        assert!(type_name.contains("String"));
    }

    #[test]
    fn prefilled_destination_is_overwritten() {
        let schema = Schema::build::<Root>(&LeafRegistry::standard()).unwrap();
        let mut entries = entries_for(&schema);

        let mut dest = Root {
            a: Some(999),
            sub: Some(Sub {
                b: Some("stale".into()),
            }),
        };
        let (_, errors) = fill_tree(&mut dest, schema.root(), &mut entries);
        // Nothing resolved: both leaves reset and reported uninitialized.
        assert_eq!(dest.a, None);
        assert_eq!(dest.sub, Some(Sub { b: None }));
        assert_eq!(errors.len(), 2);
    }
}
