//! Seed run report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::seed::SeedKind;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What happened to one table during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableAction {
    /// Source file unchanged and no ancestor was reseeded
    Skipped,

    /// Rows deleted and reloaded from its source file
    Reseeded,

    /// Rows deleted because an ancestor changed; no file was bound to reload it
    Cleared,
}

/// Per-table line of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOutcome {
    pub table: String,
    pub action: TableAction,

    /// Rows inserted (0 unless reseeded)
    pub rows_inserted: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub tables_skipped: usize,
    pub tables_truncated: usize,
    pub tables_reseeded: usize,
    pub rows_inserted: usize,
}

/// Seed run report (seed-report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Table the run was requested for
    pub target: String,

    pub kind: SeedKind,

    /// Tables cleared, in the order they were cleared
    pub truncation_order: Vec<String>,

    /// Tables loaded, in the order they were loaded
    pub insertion_order: Vec<String>,

    pub summary: ReportSummary,

    pub tables: Vec<TableOutcome>,
}

impl SeedReport {
    /// Create an empty report for a run
    pub fn new(target: impl Into<String>, kind: SeedKind) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            target: target.into(),
            kind,
            truncation_order: Vec::new(),
            insertion_order: Vec::new(),
            summary: ReportSummary::default(),
            tables: Vec::new(),
        }
    }

    /// Record a table outcome and update the summary
    pub fn add_outcome(&mut self, outcome: TableOutcome) {
        match outcome.action {
            TableAction::Skipped => self.summary.tables_skipped += 1,
            TableAction::Reseeded => {
                self.summary.tables_reseeded += 1;
                self.summary.rows_inserted += outcome.rows_inserted;
            }
            TableAction::Cleared => {}
        }
        self.tables.push(outcome);
    }

    /// Names of reseeded tables in insertion order
    pub fn reseeded_tables(&self) -> Vec<String> {
        self.insertion_order.clone()
    }

    /// Whether the run touched the database at all
    pub fn is_noop(&self) -> bool {
        self.truncation_order.is_empty() && self.insertion_order.is_empty()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}
