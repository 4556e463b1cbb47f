use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec;
use crate::config::RepoConfig;
use crate::error::{Error, Result};
use crate::github::{CommitInfo, ContentClient, ContentHash, Versioned, WriteOutcome};
use crate::links::RepoLinks;
use crate::paths::{RepoPaths, data_file_name};
use crate::schema::SchemaRegistry;

/// Primary key of `record` as used in its file name. Strings are used as is,
/// numbers in their JSON form.
pub fn primary_key_value(record: &Value, column: &str) -> Result<String> {
    match record.get(column) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(Error::InvalidIdentifier(format!(
            "primary key column {column} must be a non-empty string or a number, got {other}"
        ))),
        None => Err(Error::InvalidIdentifier(format!(
            "record has no primary key column {column}"
        ))),
    }
}

/// Databases, tables and records stored as JSON files in one repository.
///
/// Every read returns the content hash of the file it came from. Writes and
/// deletes must present the hash last observed for that file; a stale hash
/// fails with [`Error::Conflict`] and the caller re-reads before retrying.
pub struct Database {
    client: ContentClient,
    paths: RepoPaths,
    links: RepoLinks,
    schema: RwLock<Arc<SchemaRegistry>>,
}

impl Database {
    pub fn new(
        client: ContentClient,
        paths: RepoPaths,
        links: RepoLinks,
        schema: SchemaRegistry,
    ) -> Self {
        Self {
            client,
            paths,
            links,
            schema: RwLock::new(Arc::new(schema)),
        }
    }

    pub fn connect(config: &RepoConfig) -> Result<Self> {
        Ok(Self::new(
            ContentClient::new(config)?,
            RepoPaths::new(config),
            RepoLinks::new(config),
            config.schema_registry()?,
        ))
    }

    /// The registry in effect. Callers holding the returned `Arc` keep their
    /// view across a [`Self::reload_schema`].
    #[must_use]
    pub fn schema(&self) -> Arc<SchemaRegistry> {
        self.schema
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the registry. Reads that already started keep the old one.
    pub fn reload_schema(&self, registry: SchemaRegistry) {
        *self.schema.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(registry);
    }

    #[must_use]
    pub fn paths(&self) -> &RepoPaths {
        &self.paths
    }

    #[must_use]
    pub fn links(&self) -> &RepoLinks {
        &self.links
    }

    #[must_use]
    pub fn client(&self) -> &ContentClient {
        &self.client
    }

    pub fn data_url(&self, db: &str, table: &str) -> Result<String> {
        Ok(self.links.blob_url(&self.paths.data_path(db, table)?))
    }

    pub fn record_history_url(&self, db: &str, table: &str, primary_key: &str) -> Result<String> {
        Ok(self
            .links
            .history_url(&self.paths.record_path(db, table, primary_key)?))
    }

    /// Column definitions of every table in `db`.
    pub async fn tables_schema(&self, db: &str, cancel: &CancellationToken) -> Result<Value> {
        let path = self.paths.column_def_path(db)?;
        Ok(self.client.fetch_json(&path, cancel).await?.content)
    }

    /// All rows of a table. Large tables are read as a raw blob found through
    /// the database directory listing, others through the contents endpoint.
    pub async fn table_rows(
        &self,
        db: &str,
        table: &str,
        cancel: &CancellationToken,
    ) -> Result<Versioned<Value>> {
        if self.schema().is_large_table(db, table) {
            return self.large_table_rows(db, table, cancel).await;
        }

        let path = self.paths.data_path(db, table)?;
        match self.client.fetch_json(&path, cancel).await {
            Err(Error::TooLarge { path }) => {
                warn!("{path} exceeds the inline content limit, reading it as a blob");
                self.large_table_rows(db, table, cancel).await
            }
            result => result,
        }
    }

    async fn large_table_rows(
        &self,
        db: &str,
        table: &str,
        cancel: &CancellationToken,
    ) -> Result<Versioned<Value>> {
        let dir = self.paths.db_dir(db)?;
        let data_path = self.paths.data_path(db, table)?;
        let file_name = data_file_name(table);
        debug!("listing {dir} for {file_name}");

        let entries = self.client.fetch_dir(&dir, cancel).await?;
        let entry = entries
            .into_iter()
            .find(|entry| entry.name == file_name)
            .ok_or(Error::NotFound { path: data_path })?;

        self.client.fetch_blob(&entry.sha, cancel).await
    }

    pub async fn record(
        &self,
        db: &str,
        table: &str,
        primary_key: &str,
        cancel: &CancellationToken,
    ) -> Result<Versioned<Value>> {
        let path = self.paths.record_path(db, table, primary_key)?;
        self.client.fetch_json(&path, cancel).await
    }

    /// Replaces the whole table file. Pass `None` as `expected` only when the
    /// file does not exist yet.
    pub async fn write_table<T: Serialize + ?Sized>(
        &self,
        db: &str,
        table: &str,
        rows: &T,
        expected: Option<&ContentHash>,
        cancel: &CancellationToken,
    ) -> Result<WriteOutcome> {
        let path = self.paths.data_path(db, table)?;
        let body = codec::stringify_table(rows)?;
        self.client
            .create_or_update(&path, &body, expected, &format!("Update {db}/{table}"), cancel)
            .await
    }

    /// Writes one record to its own file, named after the value of
    /// `primary_key_column`.
    pub async fn write_record(
        &self,
        db: &str,
        table: &str,
        primary_key_column: &str,
        record: &Value,
        expected: Option<&ContentHash>,
        cancel: &CancellationToken,
    ) -> Result<WriteOutcome> {
        let primary_key = primary_key_value(record, primary_key_column)?;
        let path = self.paths.record_path(db, table, &primary_key)?;
        let body = codec::stringify_record(record)?;
        self.client
            .create_or_update(
                &path,
                &body,
                expected,
                &format!("Update {db}/{table}/{primary_key}"),
                cancel,
            )
            .await
    }

    pub async fn delete_record(
        &self,
        db: &str,
        table: &str,
        primary_key: &str,
        expected: &ContentHash,
        cancel: &CancellationToken,
    ) -> Result<CommitInfo> {
        let path = self.paths.record_path(db, table, primary_key)?;
        self.client
            .delete(
                &path,
                expected,
                &format!("Delete {db}/{table}/{primary_key}"),
                cancel,
            )
            .await
    }
}
