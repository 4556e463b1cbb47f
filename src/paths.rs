//! Repository-relative layout of databases, tables and records.
//!
//! ```text
//! <root>/<db>/columns.json
//! <root>/<db>/<table>.data.json
//! <root>/<db>/<table>/<sanitized pk>.json
//! ```

use crate::config::RepoConfig;
use crate::error::{Error, Result};

pub const COLUMNS_FILE: &str = "columns.json";
const DATA_FILE_SUFFIX: &str = ".data.json";
const RECORD_FILE_SUFFIX: &str = ".json";

/// Maps every character outside `[A-Za-z0-9._-]` to `_`, giving a POSIX
/// portable filename. Not injective: `"a b"` and `"a/b"` both become `"a_b"`.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
        } else {
            // One replacement per UTF-16 unit, matching files already written
            // by browser clients.
            for _ in 0..c.len_utf16() {
                out.push('_');
            }
        }
    }
    out
}

#[must_use]
pub fn data_file_name(table: &str) -> String {
    format!("{table}{DATA_FILE_SUFFIX}")
}

#[must_use]
pub fn record_file_name(primary_key: &str) -> String {
    format!("{}{RECORD_FILE_SUFFIX}", sanitize(primary_key))
}

fn validate_identifier(value: &str, entity: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidIdentifier(format!("{entity} cannot be empty")));
    }
    if value.contains('/') {
        return Err(Error::InvalidIdentifier(format!(
            "{entity} cannot contain '/': {value}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct RepoPaths {
    root: String,
}

impl RepoPaths {
    #[must_use]
    pub fn new(config: &RepoConfig) -> Self {
        Self::with_root(&config.root_path)
    }

    #[must_use]
    pub fn with_root(root: &str) -> Self {
        Self {
            root: root.trim().trim_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    fn join(&self, segments: &[&str]) -> String {
        let mut path = self.root.clone();
        for segment in segments {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(segment);
        }
        path
    }

    /// `root/db`, the directory listed to find large table blobs.
    pub fn db_dir(&self, db: &str) -> Result<String> {
        validate_identifier(db, "database name")?;
        Ok(self.join(&[db]))
    }

    pub fn column_def_path(&self, db: &str) -> Result<String> {
        validate_identifier(db, "database name")?;
        Ok(self.join(&[db, COLUMNS_FILE]))
    }

    pub fn data_path(&self, db: &str, table: &str) -> Result<String> {
        validate_identifier(db, "database name")?;
        validate_identifier(table, "table name")?;
        Ok(self.join(&[db, &data_file_name(table)]))
    }

    pub fn record_path(&self, db: &str, table: &str, primary_key: &str) -> Result<String> {
        validate_identifier(db, "database name")?;
        validate_identifier(table, "table name")?;
        if primary_key.is_empty() {
            return Err(Error::InvalidIdentifier(
                "primary key cannot be empty".to_string(),
            ));
        }
        Ok(self.join(&[db, table, &record_file_name(primary_key)]))
    }
}
