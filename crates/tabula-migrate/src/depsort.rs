//! Best-effort dependency ordering of tables.
//!
//! Produces an order in which a table referenced by a foreign key precedes
//! every table that declares the key. A genuine circular dependency does not
//! fail the sort; one edge is removed deterministically and the sort
//! continues.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::schema::Table;

/// Orders `tables` so that for every foreign key from table A to table B,
/// B precedes A in the output.
///
/// Kahn's algorithm over the foreign-key graph, restricted to the input set;
/// edges to tables outside the set are ignored. Ties break lexicographically
/// by stable id, so the output is fully deterministic. When a cycle remains,
/// one cycle edge of the lexicographically first table that sits on a cycle
/// is dropped and sorting continues; edges of tables that merely depend on
/// the cycle are left intact.
#[must_use]
pub fn sort_by_dependencies<'a>(tables: &[&'a Table]) -> Vec<&'a Table> {
    let by_id: BTreeMap<&str, &Table> = tables
        .iter()
        .map(|t| (t.qualified_class_name.as_str(), *t))
        .collect();

    // deps[A] = set of tables A references and must therefore follow.
    let mut deps: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for (id, table) in &by_id {
        let referenced: BTreeSet<String> = table
            .referenced_tables()
            .into_iter()
            .filter(|r| r != *id && by_id.contains_key(r.as_str()))
            .collect();
        deps.insert(*id, referenced);
    }

    let mut sorted = Vec::with_capacity(by_id.len());
    let mut emitted: BTreeSet<String> = BTreeSet::new();

    while sorted.len() < by_id.len() {
        let ready: Option<&str> = deps
            .iter()
            .find(|(id, remaining)| {
                !emitted.contains(**id) && remaining.iter().all(|d| emitted.contains(d))
            })
            .map(|(id, _)| *id);

        match ready {
            Some(id) => {
                emitted.insert(id.to_string());
                sorted.push(by_id[id]);
            }
            None => {
                // Cycle: pick the lexicographically first table that can
                // reach itself through unresolved edges and discard one of
                // its cycle edges. Tables that merely depend on the cycle
                // keep their edges.
                let on_cycle: Option<&str> = deps
                    .keys()
                    .copied()
                    .find(|&id| !emitted.contains(id) && reaches(&deps, &emitted, id, id));
                let Some(id) = on_cycle else { break };

                let dropped = deps[id]
                    .iter()
                    .find(|d| {
                        !emitted.contains(d.as_str()) && reaches(&deps, &emitted, d.as_str(), id)
                    })
                    .cloned();
                let Some(dropped) = dropped else { break };

                warn!(
                    table = %id,
                    depends_on = %dropped,
                    "breaking circular foreign key dependency"
                );
                if let Some(remaining) = deps.get_mut(id) {
                    remaining.remove(&dropped);
                }
            }
        }
    }

    sorted
}

/// Whether `to` is reachable from `from` through unresolved edges, ignoring
/// already-emitted tables.
fn reaches(
    deps: &BTreeMap<&str, BTreeSet<String>>,
    emitted: &BTreeSet<String>,
    from: &str,
    to: &str,
) -> bool {
    let mut stack: Vec<&str> = deps
        .get(from)
        .map(|edges| edges.iter().map(String::as_str).collect())
        .unwrap_or_default();
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    while let Some(next) = stack.pop() {
        if emitted.contains(next) || !seen.insert(next) {
            continue;
        }
        if next == to {
            return true;
        }
        if let Some(edges) = deps.get(next) {
            stack.extend(edges.iter().map(String::as_str));
        }
    }
    false
}
