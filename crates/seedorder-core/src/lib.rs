//! seedorder core
//!
//! Domain model shared by every seedorder crate: table hierarchy
//! declarations, seed kinds and active-seed records, typed tabular rows,
//! run reports and configuration.

pub mod hierarchy;
pub mod seed;
pub mod value;
pub mod report;
pub mod config;

pub use hierarchy::{Hierarchy, HierarchyError, TableId, TableNode};
pub use seed::{ActiveSeed, SeedFileRecord, SeedKind, UnknownSeedKind};
pub use value::{CellValue, TabularRow};
pub use report::{ReportSummary, ReportVersion, SeedReport, TableAction, TableOutcome};
pub use config::{
    Config, ConfigError, DatabaseConfig, RegistryConfig, DEFAULT_TRANSACTION_TIMEOUT_SECS,
};
