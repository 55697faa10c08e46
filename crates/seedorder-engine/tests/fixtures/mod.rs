//! Test fixtures for seeding integration tests
//!
//! A [`Harness`] owns a temporary seed directory, a mock database and a
//! seeder wired to both. Two hierarchies are provided:
//!
//! - `chain`: `a <- b <- c`
//! - `branching`: the chain plus a sibling `d` that also depends on `a`

#![allow(dead_code)]

use seedorder_catalog::{MemoryRegistry, MockDatabase, SeedStatement};
use seedorder_core::{Hierarchy, SeedKind, TableNode};
use seedorder_data::SeedStore;
use seedorder_engine::{FileBinding, Seeder};
use std::time::Duration;
use tempfile::TempDir;

pub const A_CSV: &str = "id,name\n1,alpha\n2,beta\n";
pub const B_CSV: &str = "id,a_id\n1,1\n2,2\n";
pub const C_CSV: &str = "id,b_id,note\n1,1,first\n";
pub const D_CSV: &str = "id,a_id,label\n1,2,\"side, branch\"\n";

pub struct Harness {
    pub dir: TempDir,
    pub db: MockDatabase,
    pub seeder: Seeder<MockDatabase, MemoryRegistry>,
}

impl Harness {
    pub fn new(tables: Vec<TableNode>, db: MockDatabase) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let hierarchy = Hierarchy::new(tables).expect("valid hierarchy");
        let seeder = Seeder::new(
            hierarchy,
            SeedStore::new(dir.path()),
            db.clone(),
            MemoryRegistry::new(),
        );
        Self { dir, db, seeder }
    }

    pub fn chain() -> Self {
        Self::new(chain_tables(), chain_database().build())
    }

    pub fn branching() -> Self {
        let mut tables = chain_tables();
        tables.push(TableNode::new(4, "d", vec![1]));
        Self::new(
            tables,
            chain_database().foreign_key("d", "a_id", "a").build(),
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.seeder = self.seeder.with_timeout(timeout);
        self
    }

    /// Store a `pre` seed file
    pub fn write(&self, table: &str, file_name: &str, contents: &str) {
        self.write_kind(SeedKind::Pre, table, file_name, contents);
    }

    pub fn write_kind(&self, kind: SeedKind, table: &str, file_name: &str, contents: &str) {
        self.seeder
            .save_seed_file(kind, table, file_name, contents.as_bytes())
            .expect("save seed file");
    }

    /// Write `base` files for a, b and c
    pub fn write_chain_files(&self) {
        self.write("a", "base", A_CSV);
        self.write("b", "base", B_CSV);
        self.write("c", "base", C_CSV);
    }

    /// Tables cleared so far, in statement order
    pub async fn deleted_tables(&self) -> Vec<String> {
        self.db
            .statements()
            .await
            .into_iter()
            .filter(|s| matches!(s, SeedStatement::DeleteAll { .. }))
            .map(|s| s.table().to_string())
            .collect()
    }

    /// Tables that received inserts, in statement order
    pub async fn inserted_tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = self
            .db
            .statements()
            .await
            .into_iter()
            .filter(|s| matches!(s, SeedStatement::Insert { .. }))
            .map(|s| s.table().to_string())
            .collect();
        tables.dedup();
        tables
    }
}

pub fn chain_tables() -> Vec<TableNode> {
    vec![
        TableNode::new(1, "a", vec![]),
        TableNode::new(2, "b", vec![1]),
        TableNode::new(3, "c", vec![2]),
    ]
}

fn chain_database() -> seedorder_catalog::MockDatabaseBuilder {
    MockDatabase::builder()
        .table("a")
        .foreign_key("b", "a_id", "a")
        .foreign_key("c", "b_id", "b")
}

/// Bind every listed table to a file
pub fn bindings(pairs: &[(&str, &str)]) -> Vec<FileBinding> {
    pairs
        .iter()
        .map(|(table, file)| FileBinding::new(*table, *file))
        .collect()
}

pub fn chain_bindings() -> Vec<FileBinding> {
    bindings(&[("a", "base"), ("b", "base"), ("c", "base")])
}

/// The membership/care-package schema used throughout the docs
pub fn clinic_tables() -> Vec<TableNode> {
    vec![
        TableNode::new(1, "employees", vec![]),
        TableNode::new(2, "care_packages", vec![1]),
        TableNode::new(3, "care_package_item_details", vec![2]),
        TableNode::new(4, "member_care_packages", vec![1]),
        TableNode::new(5, "member_care_package_details", vec![4, 7]),
        TableNode::new(6, "member_care_package_transaction_logs", vec![5, 7]),
        TableNode::new(7, "services", vec![8]),
        TableNode::new(8, "service_categories", vec![]),
    ]
}
