//! Typed statements issued during a seeding transaction
//!
//! The orchestrator only ever needs four kinds of statement. Keeping them
//! typed lets in-memory databases interpret them directly, while SQL
//! backends render them with [`SeedStatement::to_sql`].

use seedorder_core::{CellValue, TabularRow};

/// Column assumed to carry the serial/identity sequence
pub const IDENTITY_COLUMN: &str = "id";

#[derive(Debug, Clone, PartialEq)]
pub enum SeedStatement {
    /// Remove every row of a table
    DeleteAll { table: String },

    /// Restart the identity sequence at its initial value
    ResetSequence { table: String },

    /// Insert one row
    Insert { table: String, row: TabularRow },

    /// Move the identity sequence past the largest id present
    SyncSequence { table: String },
}

impl SeedStatement {
    pub fn delete_all(table: impl Into<String>) -> Self {
        Self::DeleteAll { table: table.into() }
    }

    pub fn reset_sequence(table: impl Into<String>) -> Self {
        Self::ResetSequence { table: table.into() }
    }

    pub fn insert(table: impl Into<String>, row: TabularRow) -> Self {
        Self::Insert {
            table: table.into(),
            row,
        }
    }

    pub fn sync_sequence(table: impl Into<String>) -> Self {
        Self::SyncSequence { table: table.into() }
    }

    /// Table the statement operates on
    pub fn table(&self) -> &str {
        match self {
            Self::DeleteAll { table }
            | Self::ResetSequence { table }
            | Self::Insert { table, .. }
            | Self::SyncSequence { table } => table,
        }
    }

    /// Whether the statement changes table data (as opposed to sequences)
    pub fn is_data_write(&self) -> bool {
        matches!(self, Self::DeleteAll { .. } | Self::Insert { .. })
    }

    /// Render as PostgreSQL
    ///
    /// Cell values become quoted literals of unknown type so the server
    /// coerces them to each column's declared type. Literals are escaped
    /// the way the server's own `quote_literal` does, so they read the same
    /// whatever `standard_conforming_strings` is set to.
    ///
    /// Sequence statements are `DO` blocks that do nothing when the table
    /// has no `id` column or the column is not backed by a sequence.
    pub fn to_sql(&self) -> String {
        match self {
            Self::DeleteAll { table } => format!("DELETE FROM {}", quote_ident(table)),
            Self::ResetSequence { table } => with_identity_sequence(
                table,
                "EXECUTE format('ALTER SEQUENCE %s RESTART', seq);",
            ),
            Self::SyncSequence { table } => with_identity_sequence(
                table,
                &format!(
                    "EXECUTE format('SELECT MAX(%I) FROM %I', {col}, {tbl}) INTO max_id;\n\
                     IF max_id IS NULL THEN\n\
                     EXECUTE format('ALTER SEQUENCE %s RESTART', seq);\n\
                     ELSE\n\
                     PERFORM setval(seq::regclass, GREATEST(max_id + 1, \
                     (SELECT seqstart FROM pg_sequence WHERE seqrelid = seq::regclass)), false);\n\
                     END IF;",
                    col = quote_literal(IDENTITY_COLUMN),
                    tbl = quote_literal(table),
                ),
            ),
            Self::Insert { table, row } => {
                let columns = row
                    .columns()
                    .map(quote_ident)
                    .collect::<Vec<_>>()
                    .join(", ");
                let values = row
                    .values()
                    .map(quote_value)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    quote_ident(table),
                    columns,
                    values
                )
            }
        }
    }
}

impl std::fmt::Display for SeedStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeleteAll { table } => write!(f, "DELETE {}", table),
            Self::ResetSequence { table } => write!(f, "RESET SEQUENCE {}", table),
            Self::Insert { table, row } => write!(f, "INSERT {} ({} columns)", table, row.len()),
            Self::SyncSequence { table } => write!(f, "SYNC SEQUENCE {}", table),
        }
    }
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes
///
/// Values containing a backslash use the `E'...'` form with the backslash
/// doubled.
pub fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\'', "''");
    if value.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{}'", escaped)
    }
}

fn quote_value(value: &CellValue) -> String {
    match value {
        CellValue::Null => "NULL".to_string(),
        other => quote_literal(&other.to_string()),
    }
}

/// Wrap `body` in a `DO` block that binds the table's identity sequence to
/// `seq` and only runs `body` when there is one
fn with_identity_sequence(table: &str, body: &str) -> String {
    let rel = quote_literal(&quote_ident(table));
    let col = quote_literal(IDENTITY_COLUMN);
    format!(
        "DO $seed$\n\
         DECLARE\n\
         seq text;\n\
         max_id bigint;\n\
         BEGIN\n\
         IF EXISTS (SELECT 1 FROM pg_attribute WHERE attrelid = {rel}::regclass \
         AND attname = {col} AND attnum > 0 AND NOT attisdropped) THEN\n\
         seq := pg_get_serial_sequence({rel}, {col});\n\
         END IF;\n\
         IF seq IS NOT NULL THEN\n\
         {body}\n\
         END IF;\n\
         END\n\
         $seed$"
    )
}
