//! Transactional database contract used by the seeding orchestrator

use crate::statement::SeedStatement;

/// Errors that can occur while talking to the database
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Statement failed on table '{table}': {message}")]
    QueryError { table: String, message: String },

    #[error("Foreign key violation on table '{table}': {message}")]
    ForeignKeyViolation { table: String, message: String },

    #[error("Transaction control failed: {0}")]
    TransactionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DbError {
    /// Table the failing statement targeted, when known
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::QueryError { table, .. } | Self::ForeignKeyViolation { table, .. } => Some(table),
            _ => None,
        }
    }
}

/// A database that can run seed statements inside a transaction
///
/// Implementations serialize transactions: at most one transaction per
/// handle is open at a time, and `begin` waits for the previous one to end.
#[async_trait::async_trait]
pub trait SeedDatabase: Send + Sync {
    /// Get the backend name (e.g., "PostgreSQL", "Mock")
    fn name(&self) -> &'static str;

    /// Open a transaction
    async fn begin<'a>(&'a self) -> Result<Box<dyn SeedTransaction + 'a>, DbError>;

    /// Test the connection to the database
    async fn test_connection(&self) -> Result<(), DbError>;
}

/// An open transaction
///
/// Dropping a transaction without calling [`commit`](SeedTransaction::commit)
/// rolls it back.
#[async_trait::async_trait]
pub trait SeedTransaction: Send {
    /// Run one statement, returning the number of affected rows
    async fn execute(&mut self, statement: &SeedStatement) -> Result<u64, DbError>;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}
