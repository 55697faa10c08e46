//! Database and registry backends for seeding
//!
//! This crate provides the transactional database the seeding orchestrator
//! writes to, and the registry that remembers which seed file each table
//! was last loaded from.
//!
//! ## Features
//!
//! Enable database support via Cargo features:
//! - `postgres` - PostgreSQL support (plain or TLS connections)
//!
//! Without it, [`PostgresDatabase`] constructors return a configuration
//! error and only [`MockDatabase`] is usable.
//!
//! ## Example
//!
//! ```rust,ignore
//! use seedorder_catalog::{PostgresDatabase, SeedDatabase, SeedStatement};
//!
//! let db = PostgresDatabase::from_connection_string("host=localhost dbname=clinic").await?;
//! let mut tx = db.begin().await?;
//! tx.execute(&SeedStatement::delete_all("services")).await?;
//! tx.commit().await?;
//! ```

pub mod database;
pub mod mock;
pub mod postgres;
pub mod registry;
pub mod statement;

pub use database::{DbError, SeedDatabase, SeedTransaction};
pub use mock::{ForeignKey, MockDatabase, MockDatabaseBuilder};
pub use postgres::PostgresDatabase;
pub use registry::{JsonFileRegistry, MemoryRegistry, RegistryError, SeedRegistry};
pub use statement::{quote_ident, quote_literal, SeedStatement, IDENTITY_COLUMN};
