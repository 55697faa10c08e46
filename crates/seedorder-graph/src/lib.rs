//! Table dependency graph
//!
//! This crate handles:
//! - Building the parent → child graph from table declarations
//! - Topological ordering (Kahn's algorithm, declaration-order tie-break)
//! - Ancestor closures (what a partial seed needs)
//! - Descendant closures (what must be cleared when a table is reseeded)

pub mod dag;
pub mod resolver;

pub use dag::{seeding_order, DependencyGraph, GraphError, GraphNode};
pub use resolver::{ancestors, descendants, descendants_of_all, restrict_order};
