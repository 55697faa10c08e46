//! On-disk seed file store
//!
//! Layout: `<root>/<kind>/<table>/<file_name>.csv`. File names are handled
//! without the `.csv` extension everywhere outside this module.

use regex::Regex;
use seedorder_core::SeedKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

const EXTENSION: &str = "csv";

/// A seed file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedFile {
    /// File name without extension
    pub name: String,
    pub path: PathBuf,
}

/// Directory-backed store of seed files
#[derive(Debug, Clone)]
pub struct SeedStore {
    root: PathBuf,
}

impl SeedStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every file of one table and kind
    pub fn table_dir(&self, kind: SeedKind, table: &str) -> Result<PathBuf, StoreError> {
        validate_name(table)?;
        Ok(self.root.join(kind.as_str()).join(table))
    }

    /// Path of a seed file, whether or not it exists
    pub fn file_path(
        &self,
        kind: SeedKind,
        table: &str,
        file_name: &str,
    ) -> Result<PathBuf, StoreError> {
        let name = normalize_file_name(file_name);
        validate_name(&name)?;
        Ok(self
            .table_dir(kind, table)?
            .join(format!("{}.{}", name, EXTENSION)))
    }

    /// Path of a seed file that must exist
    pub fn locate(
        &self,
        kind: SeedKind,
        table: &str,
        file_name: &str,
    ) -> Result<PathBuf, StoreError> {
        let path = self.file_path(kind, table, file_name)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(StoreError::NotFound {
                table: table.to_string(),
                kind,
                file_name: normalize_file_name(file_name),
            })
        }
    }

    /// Seed files of one table and kind, sorted by name
    ///
    /// A table without a directory simply has no files.
    pub fn list_files(&self, kind: SeedKind, table: &str) -> Result<Vec<SeedFile>, StoreError> {
        let dir = self.table_dir(kind, table)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
            let path = entry.path();

            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION)
            {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                files.push(SeedFile {
                    name: stem.to_string(),
                    path: path.to_path_buf(),
                });
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub fn has_files(&self, kind: SeedKind, table: &str) -> bool {
        self.list_files(kind, table)
            .map(|files| !files.is_empty())
            .unwrap_or(false)
    }

    /// Store file contents, replacing any file with the same name
    ///
    /// Contents are written to a temporary sibling first and renamed into
    /// place, so readers never observe a half-written file.
    pub fn save(
        &self,
        kind: SeedKind,
        table: &str,
        file_name: &str,
        contents: &[u8],
    ) -> Result<PathBuf, StoreError> {
        let path = self.file_path(kind, table, file_name)?;
        let dir = self.table_dir(kind, table)?;
        std::fs::create_dir_all(&dir)?;

        let staging = dir.join(format!(".{}.{}.partial", normalize_file_name(file_name), EXTENSION));
        std::fs::write(&staging, contents)?;
        std::fs::rename(&staging, &path)?;

        tracing::info!(%kind, table, file = %path.display(), "stored seed file");
        Ok(path)
    }

    /// Remove a seed file
    pub fn delete(&self, kind: SeedKind, table: &str, file_name: &str) -> Result<(), StoreError> {
        let path = self.locate(kind, table, file_name)?;
        std::fs::remove_file(&path)?;
        tracing::info!(%kind, table, file = %path.display(), "deleted seed file");
        Ok(())
    }
}

/// Strip a trailing `.csv` extension if present
pub fn normalize_file_name(file_name: &str) -> String {
    let trimmed = file_name.trim();
    trimmed
        .strip_suffix(".csv")
        .unwrap_or(trimmed)
        .to_string()
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]*$").expect("valid regex"))
}

/// Table and file names must be plain path segments
fn validate_name(name: &str) -> Result<(), StoreError> {
    if name_pattern().is_match(name) && !name.contains("..") {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// Errors from the seed file store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid table or file name: '{0}'")]
    InvalidName(String),

    #[error("File not found: '{file_name}.csv' for table '{table}' ({kind})")]
    NotFound {
        table: String,
        kind: SeedKind,
        file_name: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
