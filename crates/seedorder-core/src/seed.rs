//! Seed dataset kinds and active-seed bookkeeping records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which dataset a seed file belongs to
///
/// Both kinds go through exactly the same seeding path; the kind only
/// selects the directory the files live in and the registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedKind {
    /// Baseline data loaded before simulation
    Pre,

    /// Data loaded after simulation
    Post,
}

impl SeedKind {
    /// All kinds, in directory listing order
    pub const ALL: [SeedKind; 2] = [SeedKind::Pre, SeedKind::Post];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }
}

impl std::fmt::Display for SeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SeedKind {
    type Err = UnknownSeedKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pre" => Ok(Self::Pre),
            "post" => Ok(Self::Post),
            _ => Err(UnknownSeedKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown seed kind '{0}' (expected 'pre' or 'post')")]
pub struct UnknownSeedKind(pub String);

/// The file currently considered live for a (table, kind) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSeed {
    /// Seed file name without extension
    pub file_name: String,

    /// Hex-encoded SHA-256 of the file contents
    pub content_hash: String,
}

impl ActiveSeed {
    pub fn new(file_name: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content_hash: content_hash.into(),
        }
    }

    /// True when both the file identity and its contents match
    pub fn matches(&self, file_name: &str, content_hash: &str) -> bool {
        self.file_name == file_name && self.content_hash == content_hash
    }
}

/// Persisted record of the last successful seed for a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFileRecord {
    pub table: String,
    pub kind: SeedKind,
    pub file_name: String,
    pub content_hash: String,

    /// When the seeding transaction that loaded this file committed
    pub seeded_at: DateTime<Utc>,
}

impl SeedFileRecord {
    /// Create a record stamped with the current time
    pub fn new(
        table: impl Into<String>,
        kind: SeedKind,
        file_name: impl Into<String>,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            kind,
            file_name: file_name.into(),
            content_hash: content_hash.into(),
            seeded_at: Utc::now(),
        }
    }

    pub fn active(&self) -> ActiveSeed {
        ActiveSeed::new(self.file_name.clone(), self.content_hash.clone())
    }
}
