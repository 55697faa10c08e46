//! Dependency graph (DAG) construction and topological ordering
//!
//! Builds a parent → child graph from table declarations and linearizes it
//! with Kahn's algorithm into an insertion-safe order.

use seedorder_core::{TableId, TableNode};
use std::collections::{HashMap, VecDeque};

/// Graph entry for one declared table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: TableId,
    pub name: String,

    /// Number of not-yet-satisfied parent edges
    pub indegree: usize,

    /// Ids of tables that depend on this one (children)
    pub adjacency: Vec<TableId>,
}

/// Dependency graph with indegree counters
///
/// Nodes are kept in declaration order. The graph is built per request and
/// consumed by [`DependencyGraph::topological_sort`].
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<GraphNode>,

    /// Table id -> position in `nodes`
    index: HashMap<TableId, usize>,
}

impl DependencyGraph {
    /// Build a dependency graph from table declarations
    ///
    /// A dependency on an undeclared id is logged and skipped. A duplicate
    /// id is a configuration bug and aborts the build.
    pub fn build(tables: &[TableNode]) -> Result<Self, GraphError> {
        let mut nodes = Vec::with_capacity(tables.len());
        let mut index = HashMap::with_capacity(tables.len());

        for table in tables {
            if index.contains_key(&table.id) {
                return Err(GraphError::DuplicateNode {
                    id: table.id,
                    table: table.name.clone(),
                });
            }
            index.insert(table.id, nodes.len());
            nodes.push(GraphNode {
                id: table.id,
                name: table.name.clone(),
                indegree: 0,
                adjacency: Vec::new(),
            });
        }

        // Edges go parent -> child: the parent lists the child, the child's
        // indegree counts its parents.
        for (child_pos, table) in tables.iter().enumerate() {
            for parent_id in &table.depends_on {
                let Some(&parent_pos) = index.get(parent_id) else {
                    tracing::warn!(
                        parent_id = *parent_id,
                        table = %table.name,
                        table_id = table.id,
                        "parent table not found in hierarchy, skipping dependency edge"
                    );
                    continue;
                };

                nodes[parent_pos].adjacency.push(table.id);
                nodes[child_pos].indegree += 1;
            }
        }

        Ok(Self { nodes, index })
    }

    /// Get all nodes in declaration order
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, id: TableId) -> Option<&GraphNode> {
        self.index.get(&id).map(|&pos| &self.nodes[pos])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of edges that were added
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.adjacency.len()).sum()
    }

    /// Get topological sort of all nodes (Kahn's algorithm)
    ///
    /// Ties between tables that become ready together are broken by
    /// declaration order, so the result is deterministic for a fixed input.
    /// If a cycle prevents some tables from ever becoming ready, every
    /// unprocessed table is reported and no partial order is returned.
    pub fn topological_sort(mut self) -> Result<Vec<String>, GraphError> {
        let mut queue: VecDeque<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.indegree == 0)
            .map(|(pos, _)| pos)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut processed = vec![false; self.nodes.len()];

        while let Some(pos) = queue.pop_front() {
            processed[pos] = true;
            order.push(self.nodes[pos].name.clone());

            // For each child, decrease in-degree
            let children = std::mem::take(&mut self.nodes[pos].adjacency);
            for child_id in &children {
                let child_pos = self.index[child_id];
                let child = &mut self.nodes[child_pos];
                child.indegree -= 1;
                if child.indegree == 0 {
                    queue.push_back(child_pos);
                }
            }
            self.nodes[pos].adjacency = children;
        }

        if order.len() == self.nodes.len() {
            return Ok(order);
        }

        let remaining = self
            .nodes
            .iter()
            .zip(processed)
            .filter(|(_, done)| !done)
            .map(|(node, _)| (node.name.clone(), node.id))
            .collect();

        Err(GraphError::Cycle { remaining })
    }
}

/// Structural errors in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Duplicate table ID detected: {id} for table {table}")]
    DuplicateNode { id: TableId, table: String },

    #[error(
        "Circular dependency detected in database schema. Cannot determine a valid seeding order. \
         Remaining nodes (with non-zero in-degree): {}",
        format_remaining(.remaining)
    )]
    Cycle { remaining: Vec<(String, TableId)> },
}

fn format_remaining(remaining: &[(String, TableId)]) -> String {
    remaining
        .iter()
        .map(|(name, id)| format!("{} (ID: {})", name, id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build and sort in one step
pub fn seeding_order(tables: &[TableNode]) -> Result<Vec<String>, GraphError> {
    DependencyGraph::build(tables)?.topological_sort()
}
