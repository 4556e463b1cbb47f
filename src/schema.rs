use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    /// Large tables exceed the content API's inline ceiling and are read as
    /// raw blobs.
    #[serde(default)]
    pub large: bool,
}

/// Which tables exist in each database and which of them are large.
///
/// Loaded once from a document shaped like
///
/// ```json
/// {
///   "iam": [
///     {"name": "users", "large": true},
///     {"name": "roles"}
///   ]
/// }
/// ```
///
/// and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRegistry {
    databases: BTreeMap<String, Vec<TableMeta>>,
}

impl SchemaRegistry {
    /// An empty or `null` document yields an empty registry.
    pub fn from_json(doc: &str) -> Result<Self> {
        if doc.trim().is_empty() {
            return Ok(Self::default());
        }
        let databases: Option<BTreeMap<String, Vec<TableMeta>>> = serde_json::from_str(doc)
            .map_err(|e| Error::Config(format!("invalid schema document: {e}")))?;
        Ok(Self {
            databases: databases.unwrap_or_default(),
        })
    }

    #[must_use]
    pub fn get_table(&self, db: &str, table: &str) -> Option<&TableMeta> {
        self.databases
            .get(db)?
            .iter()
            .find(|meta| meta.name == table)
    }

    /// Unknown tables are treated as small.
    #[must_use]
    pub fn is_large_table(&self, db: &str, table: &str) -> bool {
        self.get_table(db, table).is_some_and(|meta| meta.large)
    }

    pub fn databases(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }

    #[must_use]
    pub fn tables(&self, db: &str) -> &[TableMeta] {
        self.databases.get(db).map(Vec::as_slice).unwrap_or_default()
    }
}
