//! Seeding service
//!
//! [`Seeder`] ties the hierarchy, the seed file store, the change gate and
//! the orchestrator together and exposes the operations callers use:
//! global ordering, scoping, partial seeding and seed file management.

use crate::error::SeedError;
use crate::gate::ChangeGate;
use crate::orchestrator::{Orchestrator, SeedPlan};
use seedorder_catalog::{SeedDatabase, SeedRegistry};
use seedorder_core::{
    Config, Hierarchy, HierarchyError, SeedKind, SeedReport, TableAction, TableId, TableNode,
    TableOutcome, DEFAULT_TRANSACTION_TIMEOUT_SECS,
};
use seedorder_data::{calculate_file_hash, load_rows, normalize_file_name, Preview, SeedStore};
use seedorder_graph::{ancestors, descendants_of_all, restrict_order, seeding_order};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;

/// Which file to load for a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBinding {
    pub table: String,

    /// With or without the `.csv` extension
    pub file_name: String,
}

impl FileBinding {
    pub fn new(table: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            file_name: file_name.into(),
        }
    }
}

/// A table plus everything it depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableScope {
    /// Scope tables in global order
    pub insertion_order: Vec<String>,
    pub required_ancestor_ids: BTreeSet<TableId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedOutcome {
    pub message: String,

    /// Tables reloaded, in insertion order (empty when nothing changed)
    pub tables_seeded: Vec<String>,

    pub report: SeedReport,
}

/// A seed file available for a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateFile {
    pub name: String,
    pub hash: String,

    /// Whether this exact file is what the table currently holds
    pub is_live: bool,
}

/// Which kinds of seed data exist for a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableFiles {
    pub name: String,
    pub pre: bool,
    pub post: bool,
}

/// Located source file of a table taking part in a run
struct SourceFile {
    file_name: String,
    path: PathBuf,
}

pub struct Seeder<D, R> {
    hierarchy: Hierarchy,
    store: SeedStore,
    database: D,
    registry: R,
    timeout: Duration,
}

impl<D: SeedDatabase, R: SeedRegistry> Seeder<D, R> {
    pub fn new(hierarchy: Hierarchy, store: SeedStore, database: D, registry: R) -> Self {
        Self {
            hierarchy,
            store,
            database,
            registry,
            timeout: Duration::from_secs(DEFAULT_TRANSACTION_TIMEOUT_SECS),
        }
    }

    /// Build from configuration: hierarchy, seed directory and timeout
    pub fn from_config(config: &Config, database: D, registry: R) -> Result<Self, SeedError> {
        Ok(Self::new(
            config.hierarchy()?,
            SeedStore::new(config.seed_root()),
            database,
            registry,
        )
        .with_timeout(config.transaction_timeout()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn store(&self) -> &SeedStore {
        &self.store
    }

    pub fn database(&self) -> &D {
        &self.database
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    fn resolve(&self, table: &str) -> Result<&TableNode, SeedError> {
        self.hierarchy.require(table).map_err(|e| match e {
            HierarchyError::UnknownTable(name) => SeedError::UnknownTable(name),
            other => SeedError::Config(other.into()),
        })
    }

    /// Every declared table, parents before children
    pub fn compute_global_order(&self) -> Result<Vec<String>, SeedError> {
        Ok(seeding_order(self.hierarchy.tables())?)
    }

    /// `table` and its ancestors, in global order
    pub fn compute_scope_for_table(&self, table: &str) -> Result<TableScope, SeedError> {
        let node = self.resolve(table)?;
        let order = self.compute_global_order()?;
        // Undeclared dependency ids are reachable through `ancestors` but never seeded
        let required_ancestor_ids: BTreeSet<TableId> = ancestors(&self.hierarchy, node.id)
            .into_iter()
            .filter(|id| self.hierarchy.find_by_id(*id).is_some())
            .collect();

        Ok(TableScope {
            insertion_order: restrict_order(&self.hierarchy, &order, &required_ancestor_ids),
            required_ancestor_ids,
        })
    }

    /// Seed `target` and whatever it depends on
    ///
    /// Every scope table needs a binding. Tables whose bound file is already
    /// live are skipped; each changed table is reloaded together with all
    /// of its descendants. Descendants without a binding are cleared only.
    pub async fn seed_table(
        &self,
        target: &str,
        bindings: &[FileBinding],
        kind: SeedKind,
    ) -> Result<SeedOutcome, SeedError> {
        let order = self.compute_global_order()?;
        let target_node = self.resolve(target)?;
        let scope_ids = ancestors(&self.hierarchy, target_node.id);
        let scope = restrict_order(&self.hierarchy, &order, &scope_ids);

        let sources = self.locate_sources(&scope, bindings, kind)?;

        // Change detection over the scope
        let gate = ChangeGate::new(&self.registry);
        let mut hashes: HashMap<String, Option<String>> = HashMap::new();
        let mut changed: BTreeSet<TableId> = BTreeSet::new();

        for table in &scope {
            let source = self.source_for(&sources, table, kind)?;
            let decision = gate.check(table, kind, &source.file_name, &source.path).await;
            if !decision.skip {
                changed.insert(self.resolve(table)?.id);
            }
            hashes.insert(table.clone(), decision.content_hash);
        }

        let mut report = SeedReport::new(target, kind);

        if changed.is_empty() {
            for table in &scope {
                report.add_outcome(TableOutcome {
                    table: table.clone(),
                    action: TableAction::Skipped,
                    rows_inserted: 0,
                    file_name: sources.get(table).map(|s| s.file_name.clone()),
                });
            }
            tracing::info!(table = target, %kind, "all required data is already live");
            return Ok(SeedOutcome {
                message: format!(
                    "Data for '{}' and its dependencies is already live; nothing to seed",
                    target
                ),
                tables_seeded: Vec::new(),
                report,
            });
        }

        // Clearing a changed table invalidates everything below it
        let truncation_ids = descendants_of_all(&self.hierarchy, changed.iter().copied());
        let forward = restrict_order(&self.hierarchy, &order, &truncation_ids);
        let insertion_order: Vec<String> = forward
            .iter()
            .filter(|table| sources.contains_key(table.as_str()))
            .cloned()
            .collect();
        let truncation_order: Vec<String> = forward.iter().rev().cloned().collect();

        let mut data = HashMap::new();
        for table in &insertion_order {
            let source = self.source_for(&sources, table, kind)?;
            let rows = load_rows(&source.path).await?;
            tracing::debug!(%table, rows = rows.len(), file = %source.path.display(), "loaded seed file");
            data.insert(table.clone(), rows);
        }

        let plan = SeedPlan {
            truncation_order,
            insertion_order,
            data,
        };

        tracing::info!(
            table = target,
            %kind,
            truncate = ?plan.truncation_order,
            insert = ?plan.insertion_order,
            "seeding"
        );

        let summary = Orchestrator::new(&self.database, self.timeout)
            .run(&plan)
            .await?;

        self.record_run(&plan, &sources, &mut hashes, kind).await;

        // Report in global order
        for table in order.iter().filter(|t| {
            scope.contains(*t) || plan.truncation_order.contains(*t)
        }) {
            let action = if plan.insertion_order.contains(table) {
                TableAction::Reseeded
            } else if plan.truncation_order.contains(table) {
                TableAction::Cleared
            } else {
                TableAction::Skipped
            };
            report.add_outcome(TableOutcome {
                table: table.clone(),
                action,
                rows_inserted: summary.rows_inserted.get(table).copied().unwrap_or(0),
                file_name: sources.get(table).map(|s| s.file_name.clone()),
            });
        }
        report.summary.tables_truncated = plan.truncation_order.len();
        report.truncation_order = plan.truncation_order;
        report.insertion_order = plan.insertion_order.clone();

        let message = format!(
            "Seeded {} table(s) for '{}' ({}): {}",
            plan.insertion_order.len(),
            target,
            kind,
            plan.insertion_order.join(", ")
        );

        Ok(SeedOutcome {
            message,
            tables_seeded: report.reseeded_tables(),
            report,
        })
    }

    /// Resolve every binding to an existing file before anything else runs
    fn locate_sources(
        &self,
        scope: &[String],
        bindings: &[FileBinding],
        kind: SeedKind,
    ) -> Result<HashMap<String, SourceFile>, SeedError> {
        let mut bound: HashMap<&str, String> = HashMap::new();
        for binding in bindings {
            self.resolve(&binding.table)?;
            bound.insert(&binding.table, normalize_file_name(&binding.file_name));
        }

        for table in scope {
            if !bound.contains_key(table.as_str()) {
                return Err(SeedError::MissingFile {
                    table: table.clone(),
                    kind,
                    file_name: None,
                });
            }
        }

        let mut sources = HashMap::new();
        for (table, file_name) in bound {
            let path = match self.store.locate(kind, table, &file_name) {
                Ok(path) => path,
                Err(seedorder_data::StoreError::NotFound { .. }) => {
                    return Err(SeedError::MissingFile {
                        table: table.to_string(),
                        kind,
                        file_name: Some(file_name),
                    })
                }
                Err(other) => return Err(other.into()),
            };
            sources.insert(table.to_string(), SourceFile { file_name, path });
        }

        Ok(sources)
    }

    fn source_for<'s>(
        &self,
        sources: &'s HashMap<String, SourceFile>,
        table: &str,
        kind: SeedKind,
    ) -> Result<&'s SourceFile, SeedError> {
        sources.get(table).ok_or_else(|| SeedError::MissingFile {
            table: table.to_string(),
            kind,
            file_name: None,
        })
    }

    /// Post-commit bookkeeping
    ///
    /// The data is committed at this point, so registry failures are logged
    /// rather than returned. A table whose record could not be written will
    /// simply be reseeded next time.
    async fn record_run(
        &self,
        plan: &SeedPlan,
        sources: &HashMap<String, SourceFile>,
        hashes: &mut HashMap<String, Option<String>>,
        kind: SeedKind,
    ) {
        for table in &plan.insertion_order {
            let Some(source) = sources.get(table) else {
                continue;
            };

            let hash = match hashes.remove(table).flatten() {
                Some(hash) => Some(hash),
                None => calculate_file_hash(&source.path).await.ok(),
            };

            let result = match hash {
                Some(hash) => {
                    self.registry
                        .log_seeded_file(table, kind, &source.file_name, &hash)
                        .await
                }
                None => {
                    tracing::warn!(%table, "could not hash seed file; active record cleared");
                    self.registry.clear_active_seed_info(table, kind).await
                }
            };
            if let Err(e) = result {
                tracing::warn!(%table, %kind, error = %e, "failed to update active seed record");
            }

            // The other kind's data was replaced too
            for other in SeedKind::ALL.into_iter().filter(|k| *k != kind) {
                self.clear_record(table, other).await;
            }
        }

        for table in plan
            .truncation_order
            .iter()
            .filter(|t| !plan.insertion_order.contains(*t))
        {
            for any in SeedKind::ALL {
                self.clear_record(table, any).await;
            }
        }
    }

    async fn clear_record(&self, table: &str, kind: SeedKind) {
        if let Err(e) = self.registry.clear_active_seed_info(table, kind).await {
            tracing::warn!(table, %kind, error = %e, "failed to clear active seed record");
        }
    }

    /// Seed files of a table, with their hashes and liveness
    pub async fn list_candidate_files(
        &self,
        table: &str,
        kind: SeedKind,
    ) -> Result<Vec<CandidateFile>, SeedError> {
        self.resolve(table)?;

        let active = match self.registry.get_active_seed_info(table, kind).await {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!(table, %kind, error = %e, "could not read active seed record");
                None
            }
        };

        let mut candidates = Vec::new();
        for file in self.store.list_files(kind, table)? {
            let hash = calculate_file_hash(&file.path)
                .await
                .map_err(seedorder_data::StoreError::from)?;
            let is_live = active
                .as_ref()
                .is_some_and(|a| a.matches(&file.name, &hash));
            candidates.push(CandidateFile {
                name: file.name,
                hash,
                is_live,
            });
        }

        Ok(candidates)
    }

    /// Remove a seed file, forgetting it if it was the live one
    pub async fn delete_seed_file(
        &self,
        kind: SeedKind,
        table: &str,
        file_name: &str,
    ) -> Result<(), SeedError> {
        self.resolve(table)?;
        let name = normalize_file_name(file_name);

        let was_live = self
            .registry
            .get_active_seed_info(table, kind)
            .await?
            .is_some_and(|active| active.file_name == name);

        self.store.delete(kind, table, &name)?;

        if was_live {
            self.registry.clear_active_seed_info(table, kind).await?;
            tracing::info!(table, %kind, file = %name, "deleted live seed file; active record cleared");
        }

        Ok(())
    }

    /// Whether each declared table has pre and post seed files
    pub fn table_inventory(&self) -> Vec<TableFiles> {
        self.hierarchy
            .tables()
            .iter()
            .map(|t| TableFiles {
                name: t.name.clone(),
                pre: self.store.has_files(SeedKind::Pre, &t.name),
                post: self.store.has_files(SeedKind::Post, &t.name),
            })
            .collect()
    }

    /// Parsed contents of a seed file
    pub async fn preview_file(
        &self,
        kind: SeedKind,
        table: &str,
        file_name: &str,
    ) -> Result<Preview, SeedError> {
        self.resolve(table)?;
        let path = self.store.locate(kind, table, file_name)?;
        Ok(seedorder_data::preview(&path).await?)
    }

    /// Store an uploaded seed file
    pub fn save_seed_file(
        &self,
        kind: SeedKind,
        table: &str,
        file_name: &str,
        contents: &[u8],
    ) -> Result<PathBuf, SeedError> {
        self.resolve(table)?;
        Ok(self.store.save(kind, table, file_name, contents)?)
    }
}
