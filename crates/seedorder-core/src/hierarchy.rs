//! Table hierarchy declarations
//!
//! A hierarchy is the static list of seedable tables and the foreign-key
//! dependencies between them. Declaration order matters: it is the
//! tie-break used when several tables become insertable at the same time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Stable numeric identifier of a declared table
pub type TableId = u32;

/// One seedable table and the tables it references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNode {
    /// Unique id within the hierarchy
    pub id: TableId,

    /// Database table name
    pub name: String,

    /// Ids of tables that must be fully inserted before this one
    #[serde(default)]
    pub depends_on: Vec<TableId>,
}

impl TableNode {
    /// Create a new table declaration
    pub fn new(id: TableId, name: impl Into<String>, depends_on: Vec<TableId>) -> Self {
        Self {
            id,
            name: name.into(),
            depends_on,
        }
    }
}

/// Ordered set of table declarations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hierarchy {
    tables: Vec<TableNode>,
}

impl Hierarchy {
    /// Build a hierarchy, rejecting duplicate ids
    pub fn new(tables: Vec<TableNode>) -> Result<Self, HierarchyError> {
        let hierarchy = Self { tables };
        hierarchy.validate()?;
        Ok(hierarchy)
    }

    /// Check declaration-level invariants
    ///
    /// Only duplicate ids and duplicate names are fatal. Dependency ids that
    /// point outside the hierarchy are tolerated and reported when the graph
    /// is built.
    pub fn validate(&self) -> Result<(), HierarchyError> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();

        for table in &self.tables {
            if !ids.insert(table.id) {
                return Err(HierarchyError::DuplicateId {
                    id: table.id,
                    table: table.name.clone(),
                });
            }
            if !names.insert(table.name.as_str()) {
                return Err(HierarchyError::DuplicateName(table.name.clone()));
            }
        }

        Ok(())
    }

    /// All declarations in declaration order
    pub fn tables(&self) -> &[TableNode] {
        &self.tables
    }

    /// Table names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn find_by_id(&self, id: TableId) -> Option<&TableNode> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&TableNode> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Resolve a table name to its declaration or fail with a configuration error
    pub fn require(&self, name: &str) -> Result<&TableNode, HierarchyError> {
        self.find_by_name(name)
            .ok_or_else(|| HierarchyError::UnknownTable(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<TableNode> for Hierarchy {
    /// Collect without validation; call [`Hierarchy::validate`] before use
    fn from_iter<I: IntoIterator<Item = TableNode>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}

/// Configuration errors in a hierarchy declaration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("Duplicate table ID detected: {id} for table {table}")]
    DuplicateId { id: TableId, table: String },

    #[error("Duplicate table name detected: {0}")]
    DuplicateName(String),

    #[error("Table '{0}' is not declared in the seeding hierarchy")]
    UnknownTable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<TableNode> {
        vec![
            TableNode::new(1, "a", vec![]),
            TableNode::new(2, "b", vec![1]),
            TableNode::new(3, "c", vec![2]),
        ]
    }

    #[test]
    fn accepts_unique_ids() {
        let hierarchy = Hierarchy::new(chain()).unwrap();
        assert_eq!(hierarchy.names(), vec!["a", "b", "c"]);
        assert_eq!(hierarchy.find_by_name("b").map(|t| t.id), Some(2));
    }

    #[test]
    fn rejects_duplicate_id() {
        let mut tables = chain();
        tables.push(TableNode::new(2, "d", vec![]));

        let err = Hierarchy::new(tables).unwrap_err();
        assert_eq!(
            err,
            HierarchyError::DuplicateId {
                id: 2,
                table: "d".to_string()
            }
        );
    }

    #[test]
    fn unknown_dependency_is_not_a_declaration_error() {
        let tables = vec![TableNode::new(1, "a", vec![99])];
        assert!(Hierarchy::new(tables).is_ok());
    }

    #[test]
    fn require_reports_unknown_table() {
        let hierarchy = Hierarchy::new(chain()).unwrap();
        assert!(matches!(
            hierarchy.require("missing"),
            Err(HierarchyError::UnknownTable(name)) if name == "missing"
        ));
    }
}
