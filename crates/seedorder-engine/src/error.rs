//! Errors surfaced by seeding operations

use seedorder_catalog::{DbError, RegistryError};
use seedorder_core::{ConfigError, SeedKind};
use seedorder_data::{LoadError, StoreError};
use seedorder_graph::GraphError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Table '{0}' is not declared in the seeding hierarchy")]
    UnknownTable(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A table that must be seeded has no usable source file
    #[error("{}", missing_file_message(.table, .kind, .file_name.as_deref()))]
    MissingFile {
        table: String,
        kind: SeedKind,
        file_name: Option<String>,
    },

    #[error("Seed file '{file_name}.csv' for table '{table}' ({kind}) does not exist")]
    FileNotFound {
        table: String,
        kind: SeedKind,
        file_name: String,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Store(StoreError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A statement failed; the transaction was rolled back
    #[error("{}", transaction_message(.table.as_deref(), .source))]
    Transaction {
        table: Option<String>,
        #[source]
        source: DbError,
    },

    #[error("Seeding timed out after {}s, no changes applied", .0.as_secs_f64())]
    Timeout(Duration),
}

impl From<StoreError> for SeedError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound {
                table,
                kind,
                file_name,
            } => SeedError::FileNotFound {
                table,
                kind,
                file_name,
            },
            other => SeedError::Store(other),
        }
    }
}

fn missing_file_message(table: &str, kind: &SeedKind, file_name: Option<&str>) -> String {
    match file_name {
        Some(file) => format!(
            "Seed file '{}.csv' for table '{}' ({}) was not found. Seeding aborted before any database changes",
            file, table, kind
        ),
        None => format!(
            "No {} seed file selected for required table '{}'. Seeding aborted before any database changes",
            kind, table
        ),
    }
}

fn transaction_message(table: Option<&str>, source: &DbError) -> String {
    match table {
        Some(table) => format!(
            "Seeding failed at table '{}', no changes applied: {}",
            table, source
        ),
        None => format!("Seeding failed, no changes applied: {}", source),
    }
}
