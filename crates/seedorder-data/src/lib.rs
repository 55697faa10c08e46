//! Seed data files
//!
//! - [`tabular`]: streaming loader for comma-separated seed files
//! - [`hash`]: SHA-256 content hashes used for change detection
//! - [`store`]: the `<kind>/<table>/<file>.csv` directory layout

pub mod tabular;
pub mod hash;
pub mod store;

pub use tabular::{load_rows, preview, split_fields, LoadError, Preview};
pub use hash::{calculate_file_hash, hash_bytes};
pub use store::{normalize_file_name, SeedFile, SeedStore, StoreError};
