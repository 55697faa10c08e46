//! Transactional seeding
//!
//! Clears tables children-first, reloads them parents-first and commits,
//! all inside a single transaction. Any failure, or running past the
//! timeout, rolls everything back.

use crate::error::SeedError;
use seedorder_catalog::{DbError, SeedDatabase, SeedStatement, SeedTransaction};
use seedorder_core::TabularRow;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Work for one seeding transaction
#[derive(Debug, Clone, Default)]
pub struct SeedPlan {
    /// Tables to clear, descendants first
    pub truncation_order: Vec<String>,

    /// Tables to load, parents first
    pub insertion_order: Vec<String>,

    /// Rows per table; insertion tables without an entry are skipped
    pub data: HashMap<String, Vec<TabularRow>>,
}

impl SeedPlan {
    pub fn is_empty(&self) -> bool {
        self.truncation_order.is_empty() && self.insertion_order.is_empty()
    }
}

/// What a committed transaction did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rows_deleted: u64,

    /// Rows inserted per table
    pub rows_inserted: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn total_inserted(&self) -> usize {
        self.rows_inserted.values().sum()
    }
}

pub struct Orchestrator<'a, D: SeedDatabase + ?Sized> {
    database: &'a D,
    timeout: Duration,
}

impl<'a, D: SeedDatabase + ?Sized> Orchestrator<'a, D> {
    pub fn new(database: &'a D, timeout: Duration) -> Self {
        Self { database, timeout }
    }

    /// Apply a plan atomically
    pub async fn run(&self, plan: &SeedPlan) -> Result<RunSummary, SeedError> {
        if plan.is_empty() {
            return Ok(RunSummary::default());
        }

        let mut tx = self
            .database
            .begin()
            .await
            .map_err(|source| SeedError::Transaction {
                table: None,
                source,
            })?;

        let applied = tokio::time::timeout(self.timeout, apply(&mut *tx, plan)).await;

        match applied {
            Ok(Ok(summary)) => {
                tx.commit().await.map_err(|source| SeedError::Transaction {
                    table: None,
                    source,
                })?;
                tracing::info!(
                    truncated = plan.truncation_order.len(),
                    inserted = summary.total_inserted(),
                    "seeding transaction committed"
                );
                Ok(summary)
            }
            Ok(Err((table, source))) => {
                tracing::error!(%table, error = %source, "seeding failed; rolling back");
                rollback(tx).await;
                Err(SeedError::Transaction {
                    table: Some(table),
                    source,
                })
            }
            Err(_) => {
                tracing::error!(timeout = ?self.timeout, "seeding timed out; rolling back");
                rollback(tx).await;
                Err(SeedError::Timeout(self.timeout))
            }
        }
    }
}

async fn rollback(tx: Box<dyn SeedTransaction + '_>) {
    if let Err(e) = tx.rollback().await {
        tracing::error!(error = %e, "rollback failed");
    }
}

/// Run every statement of the plan, reporting the table of the first failure
async fn apply<'t>(
    tx: &mut (dyn SeedTransaction + 't),
    plan: &SeedPlan,
) -> Result<RunSummary, (String, DbError)> {
    let mut summary = RunSummary::default();

    for table in &plan.truncation_order {
        let deleted = tx
            .execute(&SeedStatement::delete_all(table.as_str()))
            .await
            .map_err(|e| (table.clone(), e))?;
        tx.execute(&SeedStatement::reset_sequence(table.as_str()))
            .await
            .map_err(|e| (table.clone(), e))?;

        tracing::info!(%table, deleted, "cleared table");
        summary.rows_deleted += deleted;
    }

    for table in &plan.insertion_order {
        let Some(rows) = plan.data.get(table) else {
            tracing::debug!(%table, "no rows loaded; nothing to insert");
            continue;
        };

        for row in rows {
            tx.execute(&SeedStatement::insert(table.as_str(), row.clone()))
                .await
                .map_err(|e| (table.clone(), e))?;
        }
        tx.execute(&SeedStatement::sync_sequence(table.as_str()))
            .await
            .map_err(|e| (table.clone(), e))?;

        tracing::info!(%table, rows = rows.len(), "inserted rows");
        summary.rows_inserted.insert(table.clone(), rows.len());
    }

    Ok(summary)
}
