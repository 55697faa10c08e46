//! Ancestor and descendant closures over the static declarations
//!
//! These walk `depends_on` directly rather than the indegree graph, which is
//! consumed by the sorter.

use seedorder_core::{Hierarchy, TableId};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// All tables `target` needs, transitively, including `target` itself
///
/// Iterative depth-first walk along dependency edges. Ids that are not
/// declared are still collected; they simply have no further parents.
pub fn ancestors(hierarchy: &Hierarchy, target: TableId) -> BTreeSet<TableId> {
    let by_id: HashMap<TableId, &[TableId]> = hierarchy
        .tables()
        .iter()
        .map(|t| (t.id, t.depends_on.as_slice()))
        .collect();

    let mut visited = BTreeSet::new();
    let mut stack = vec![target];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        if let Some(parents) = by_id.get(&current) {
            stack.extend(parents.iter().copied());
        }
    }

    visited
}

/// All tables that transitively reference `target`, including `target`
///
/// Clearing `target` leaves dangling foreign keys in every one of these.
pub fn descendants(hierarchy: &Hierarchy, target: TableId) -> BTreeSet<TableId> {
    descendants_of_all(hierarchy, [target])
}

/// Union of [`descendants`] for several start tables
pub fn descendants_of_all<I>(hierarchy: &Hierarchy, targets: I) -> BTreeSet<TableId>
where
    I: IntoIterator<Item = TableId>,
{
    let children = child_map(hierarchy);

    let mut visited = BTreeSet::new();
    let mut queue: VecDeque<TableId> = targets.into_iter().collect();

    // BFS along parent -> child edges
    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        if let Some(kids) = children.get(&current) {
            for child in kids {
                if !visited.contains(child) {
                    queue.push_back(*child);
                }
            }
        }
    }

    visited
}

/// Forward map parent -> children, children in declaration order
fn child_map(hierarchy: &Hierarchy) -> HashMap<TableId, Vec<TableId>> {
    let mut children: HashMap<TableId, Vec<TableId>> = HashMap::new();
    for table in hierarchy.tables() {
        for parent in &table.depends_on {
            children.entry(*parent).or_default().push(table.id);
        }
    }
    children
}

/// Filter an ordered list of table names down to the given ids
///
/// Used to restrict the canonical global order to a scope without
/// re-sorting.
pub fn restrict_order(
    hierarchy: &Hierarchy,
    order: &[String],
    ids: &BTreeSet<TableId>,
) -> Vec<String> {
    let wanted: HashSet<&str> = ids
        .iter()
        .filter_map(|id| hierarchy.find_by_id(*id))
        .map(|t| t.name.as_str())
        .collect();

    order
        .iter()
        .filter(|name| wanted.contains(name.as_str()))
        .cloned()
        .collect()
}
