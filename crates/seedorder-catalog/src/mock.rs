//! Mock database for testing
//!
//! This database keeps tables in memory and interprets [`SeedStatement`]s
//! directly. It's useful for:
//! - Unit testing the seeding orchestrator without PostgreSQL
//! - Verifying rollback (a failed transaction never touches committed rows)
//! - Simulating foreign key violations and per-table insert failures
//! - Counting how many statements a run issued
//!
//! ## Usage
//!
//! ```rust,ignore
//! use seedorder_catalog::{MockDatabase, SeedDatabase, SeedStatement};
//!
//! let db = MockDatabase::builder()
//!     .table("employees")
//!     .table("care_packages")
//!     .foreign_key("care_packages", "created_by", "employees")
//!     .build();
//!
//! let mut tx = db.begin().await?;
//! tx.execute(&SeedStatement::delete_all("care_packages")).await?;
//! tx.commit().await?;
//! ```
//!
//! Identity semantics follow PostgreSQL: rows inserted with an explicit
//! `id` do not advance the table's sequence; only `SyncSequence` does.
//! Tables declared with [`MockDatabaseBuilder::natural_key`] have no
//! sequence, and sequence statements against them do nothing.

use crate::database::{DbError, SeedDatabase, SeedTransaction};
use crate::statement::{SeedStatement, IDENTITY_COLUMN};
use seedorder_core::{CellValue, TabularRow};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// A single-column foreign key to another table's `id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub references: String,
}

#[derive(Debug, Clone)]
struct MockTable {
    rows: Vec<TabularRow>,

    /// Start value of the identity sequence, `None` without one
    identity_start: Option<i64>,
    next_id: i64,
    foreign_keys: Vec<ForeignKey>,
}

impl Default for MockTable {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            identity_start: Some(1),
            next_id: 1,
            foreign_keys: Vec::new(),
        }
    }
}

type Tables = BTreeMap<String, MockTable>;

#[derive(Debug, Default)]
struct MockStats {
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// In-memory transactional database
///
/// Each transaction works on a private copy of the committed tables;
/// commit swaps the copy in, rollback (or drop) discards it.
pub struct MockDatabase {
    /// Committed table contents
    tables: Arc<RwLock<Tables>>,

    /// Errors to return when inserting into specific tables
    insert_errors: Arc<RwLock<HashMap<String, DbError>>>,

    /// Every statement executed, committed or not
    statements: Arc<RwLock<Vec<SeedStatement>>>,

    stats: Arc<MockStats>,

    /// Serializes transactions
    gate: Arc<Mutex<()>>,

    /// Simulate connection failure
    fail_connection: bool,

    /// Simulate statement latency (milliseconds)
    latency_ms: u64,
}

impl MockDatabase {
    /// Create a mock database with no tables
    pub fn new() -> Self {
        Self::from_tables(Tables::new())
    }

    pub fn builder() -> MockDatabaseBuilder {
        MockDatabaseBuilder::new()
    }

    fn from_tables(tables: Tables) -> Self {
        Self {
            tables: Arc::new(RwLock::new(tables)),
            insert_errors: Arc::new(RwLock::new(HashMap::new())),
            statements: Arc::new(RwLock::new(Vec::new())),
            stats: Arc::new(MockStats::default()),
            gate: Arc::new(Mutex::new(())),
            fail_connection: false,
            latency_ms: 0,
        }
    }

    /// Configure to fail all connection attempts
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Configure simulated latency for every statement
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Replace a table's committed rows, bypassing constraints
    pub async fn preload(&self, table: &str, rows: Vec<TabularRow>) {
        let mut tables = self.tables.write().await;
        let entry = tables.entry(table.to_string()).or_default();
        entry.rows = rows;
    }

    /// Make every insert into `table` fail with `error`
    pub async fn fail_inserts_into(&self, table: &str, error: DbError) {
        self.insert_errors.write().await.insert(table.to_string(), error);
    }

    /// Clear all configured insert errors
    pub async fn clear_errors(&self) {
        self.insert_errors.write().await.clear();
    }

    /// Committed row count of a table (0 for unknown tables)
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    /// Committed rows of a table
    pub async fn rows(&self, table: &str) -> Vec<TabularRow> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Next value the table's identity sequence would hand out
    ///
    /// `None` for unknown tables and tables without a sequence.
    pub async fn next_id(&self, table: &str) -> Option<i64> {
        self.tables
            .read()
            .await
            .get(table)
            .filter(|t| t.identity_start.is_some())
            .map(|t| t.next_id)
    }

    /// Row counts of every table
    pub async fn snapshot(&self) -> BTreeMap<String, usize> {
        self.tables
            .read()
            .await
            .iter()
            .map(|(name, t)| (name.clone(), t.rows.len()))
            .collect()
    }

    /// Every statement executed so far
    pub async fn statements(&self) -> Vec<SeedStatement> {
        self.statements.read().await.clone()
    }

    /// Number of executed deletes and inserts
    pub async fn data_write_count(&self) -> usize {
        self.statements
            .read()
            .await
            .iter()
            .filter(|s| s.is_data_write())
            .count()
    }

    pub async fn clear_statements(&self) {
        self.statements.write().await.clear();
    }

    pub fn begin_count(&self) -> usize {
        self.stats.begins.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.stats.commits.load(Ordering::SeqCst)
    }

    pub fn rollback_count(&self) -> usize {
        self.stats.rollbacks.load(Ordering::SeqCst)
    }

    /// Simulate latency if configured
    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }
}

impl Default for MockDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockDatabase {
    fn clone(&self) -> Self {
        Self {
            tables: Arc::clone(&self.tables),
            insert_errors: Arc::clone(&self.insert_errors),
            statements: Arc::clone(&self.statements),
            stats: Arc::clone(&self.stats),
            gate: Arc::clone(&self.gate),
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
        }
    }
}

#[async_trait::async_trait]
impl SeedDatabase for MockDatabase {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn SeedTransaction + 'a>, DbError> {
        self.simulate_latency().await;

        if self.fail_connection {
            return Err(DbError::ConnectionError(
                "Simulated connection failure".to_string(),
            ));
        }

        let permit = self.gate.lock().await;
        let working = self.tables.read().await.clone();
        self.stats.begins.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockTransaction {
            db: self,
            working,
            finished: false,
            _permit: permit,
        }))
    }

    async fn test_connection(&self) -> Result<(), DbError> {
        self.simulate_latency().await;

        if self.fail_connection {
            Err(DbError::ConnectionError(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

struct MockTransaction<'a> {
    db: &'a MockDatabase,
    working: Tables,
    finished: bool,
    _permit: MutexGuard<'a, ()>,
}

#[async_trait::async_trait]
impl<'a> SeedTransaction for MockTransaction<'a> {
    async fn execute(&mut self, statement: &SeedStatement) -> Result<u64, DbError> {
        self.db.simulate_latency().await;
        self.db.statements.write().await.push(statement.clone());

        match statement {
            SeedStatement::DeleteAll { table } => delete_all(&mut self.working, table),
            SeedStatement::ResetSequence { table } => {
                let target = table_mut(&mut self.working, table)?;
                if let Some(start) = target.identity_start {
                    target.next_id = start;
                }
                Ok(0)
            }
            SeedStatement::Insert { table, row } => {
                if let Some(error) = self.db.insert_errors.read().await.get(table) {
                    return Err(error.clone());
                }
                insert(&mut self.working, table, row)
            }
            SeedStatement::SyncSequence { table } => {
                let target = table_mut(&mut self.working, table)?;
                if let Some(start) = target.identity_start {
                    target.next_id = match target.rows.iter().filter_map(row_id).max() {
                        Some(max_id) => (max_id + 1).max(start),
                        None => start,
                    };
                }
                Ok(0)
            }
        }
    }

    async fn commit(mut self: Box<Self>) -> Result<(), DbError> {
        self.finished = true;
        let working = std::mem::take(&mut self.working);
        *self.db.tables.write().await = working;
        self.db.stats.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), DbError> {
        self.finished = true;
        self.db.stats.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MockTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.db.stats.rollbacks.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn missing_relation(table: &str) -> DbError {
    DbError::QueryError {
        table: table.to_string(),
        message: format!("relation \"{}\" does not exist", table),
    }
}

fn table_mut<'t>(tables: &'t mut Tables, table: &str) -> Result<&'t mut MockTable, DbError> {
    tables.get_mut(table).ok_or_else(|| missing_relation(table))
}

fn row_id(row: &TabularRow) -> Option<i64> {
    match row.get(IDENTITY_COLUMN)? {
        CellValue::Number(n) => Some(*n as i64),
        CellValue::Text(s) => s.parse().ok(),
        _ => None,
    }
}

fn key_of(value: &CellValue) -> String {
    value.to_plain_string()
}

fn delete_all(tables: &mut Tables, table: &str) -> Result<u64, DbError> {
    let target = tables.get(table).ok_or_else(|| missing_relation(table))?;

    if !target.rows.is_empty() {
        for (name, other) in tables.iter().filter(|(name, _)| name.as_str() != table) {
            for fk in other.foreign_keys.iter().filter(|fk| fk.references == table) {
                let referenced = other
                    .rows
                    .iter()
                    .any(|row| row.get(&fk.column).is_some_and(|v| !v.is_null()));

                if referenced {
                    return Err(DbError::ForeignKeyViolation {
                        table: table.to_string(),
                        message: format!(
                            "update or delete on table \"{}\" violates foreign key on table \"{}\" (column \"{}\")",
                            table, name, fk.column
                        ),
                    });
                }
            }
        }
    }

    let target = table_mut(tables, table)?;
    let deleted = target.rows.len() as u64;
    target.rows.clear();
    Ok(deleted)
}

fn insert(tables: &mut Tables, table: &str, row: &TabularRow) -> Result<u64, DbError> {
    let foreign_keys = tables
        .get(table)
        .ok_or_else(|| missing_relation(table))?
        .foreign_keys
        .clone();

    for fk in &foreign_keys {
        let Some(value) = row.get(&fk.column).filter(|v| !v.is_null()) else {
            continue;
        };

        let parent = tables
            .get(&fk.references)
            .ok_or_else(|| missing_relation(&fk.references))?;
        let key = key_of(value);
        let exists = parent
            .rows
            .iter()
            .any(|r| r.get(IDENTITY_COLUMN).map(key_of).as_deref() == Some(key.as_str()));

        if !exists {
            return Err(DbError::ForeignKeyViolation {
                table: table.to_string(),
                message: format!(
                    "insert on table \"{}\" violates foreign key: {}={} is not present in table \"{}\"",
                    table, fk.column, key, fk.references
                ),
            });
        }
    }

    let target = table_mut(tables, table)?;
    let mut row = row.clone();

    if target.identity_start.is_none() {
        target.rows.push(row);
        return Ok(1);
    }

    match row.get(IDENTITY_COLUMN).filter(|v| !v.is_null()) {
        Some(id) => {
            let key = key_of(id);
            let duplicate = target
                .rows
                .iter()
                .any(|r| r.get(IDENTITY_COLUMN).map(key_of).as_deref() == Some(key.as_str()));
            if duplicate {
                return Err(DbError::QueryError {
                    table: table.to_string(),
                    message: format!("duplicate key value violates unique constraint: id={}", key),
                });
            }
        }
        None => {
            row.set(IDENTITY_COLUMN, CellValue::Number(target.next_id as f64));
            target.next_id += 1;
        }
    }

    target.rows.push(row);
    Ok(1)
}

/// Builder for creating MockDatabase with tables and foreign keys
///
/// # Example
///
/// ```rust,ignore
/// let db = MockDatabaseBuilder::new()
///     .table("service_categories")
///     .table("services")
///     .foreign_key("services", "service_category_id", "service_categories")
///     .with_latency(5)
///     .build();
/// ```
pub struct MockDatabaseBuilder {
    tables: Tables,
    insert_errors: HashMap<String, DbError>,
    fail_connection: bool,
    latency_ms: u64,
}

impl MockDatabaseBuilder {
    pub fn new() -> Self {
        Self {
            tables: Tables::new(),
            insert_errors: HashMap::new(),
            fail_connection: false,
            latency_ms: 0,
        }
    }

    /// Declare an empty table
    pub fn table(mut self, name: &str) -> Self {
        self.tables.entry(name.to_string()).or_default();
        self
    }

    /// Declare a table keyed by something other than a sequence-backed `id`
    pub fn natural_key(mut self, name: &str) -> Self {
        self.tables.entry(name.to_string()).or_default().identity_start = None;
        self
    }

    /// Start the table's identity sequence at `start` instead of 1
    pub fn identity_start(mut self, name: &str, start: i64) -> Self {
        let table = self.tables.entry(name.to_string()).or_default();
        table.identity_start = Some(start);
        table.next_id = start;
        self
    }

    /// Declare `table.column` as referencing `references.id`
    ///
    /// Both tables are created if they have not been declared yet.
    pub fn foreign_key(mut self, table: &str, column: &str, references: &str) -> Self {
        self.tables.entry(references.to_string()).or_default();
        self.tables
            .entry(table.to_string())
            .or_default()
            .foreign_keys
            .push(ForeignKey {
                column: column.to_string(),
                references: references.to_string(),
            });
        self
    }

    /// Committed rows present before any transaction
    pub fn rows(mut self, table: &str, rows: Vec<TabularRow>) -> Self {
        self.tables.entry(table.to_string()).or_default().rows = rows;
        self
    }

    pub fn failing_insert(mut self, table: &str, error: DbError) -> Self {
        self.insert_errors.insert(table.to_string(), error);
        self
    }

    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn build(self) -> MockDatabase {
        let mut db = MockDatabase::from_tables(self.tables);
        db.insert_errors = Arc::new(RwLock::new(self.insert_errors));
        db.fail_connection = self.fail_connection;
        db.latency_ms = self.latency_ms;
        db
    }
}

impl Default for MockDatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
