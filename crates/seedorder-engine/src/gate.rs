//! Change detection
//!
//! A table can be skipped only when the registry says the exact same file
//! (same name, same SHA-256) is already loaded. Anything else, including a
//! failure to hash the file or to read the registry, means "reseed".

use seedorder_catalog::SeedRegistry;
use seedorder_core::SeedKind;
use seedorder_data::calculate_file_hash;
use std::path::Path;

/// Outcome of checking one candidate file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub skip: bool,

    /// Hash of the candidate file, if it could be computed
    pub content_hash: Option<String>,
}

pub struct ChangeGate<'a, R: SeedRegistry + ?Sized> {
    registry: &'a R,
}

impl<'a, R: SeedRegistry + ?Sized> ChangeGate<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    /// Whether `table` can be left as it is
    pub async fn should_skip(
        &self,
        table: &str,
        kind: SeedKind,
        file_name: &str,
        path: &Path,
    ) -> bool {
        self.check(table, kind, file_name, path).await.skip
    }

    /// Hash the candidate and compare it with the active record
    pub async fn check(
        &self,
        table: &str,
        kind: SeedKind,
        file_name: &str,
        path: &Path,
    ) -> GateDecision {
        let hash = match calculate_file_hash(path).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(
                    table,
                    %kind,
                    file = %path.display(),
                    error = %e,
                    "could not hash seed file; table will be reseeded"
                );
                return GateDecision {
                    skip: false,
                    content_hash: None,
                };
            }
        };

        let skip = match self.registry.get_active_seed_info(table, kind).await {
            Ok(Some(active)) => active.matches(file_name, &hash),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(
                    table,
                    %kind,
                    error = %e,
                    "could not read active seed record; table will be reseeded"
                );
                false
            }
        };

        tracing::debug!(table, %kind, file = file_name, skip, "change gate");
        GateDecision {
            skip,
            content_hash: Some(hash),
        }
    }
}
