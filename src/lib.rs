//! # repodb
//!
//! Treats a GitHub repository's file tree as a small record store. Databases
//! are directories, tables are JSON array files, and records are one JSON
//! file each. Reads and writes go through the repository contents API, and
//! every write is a commit.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use repodb::{Database, RepoConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = RepoConfig::load("repodb.toml".as_ref())?;
//! let db = Database::connect(&config)?;
//! let cancel = CancellationToken::new();
//!
//! let rows = db.table_rows("iam", "roles", &cancel).await?;
//! let outcome = db
//!     .write_table("iam", "roles", &rows.content, Some(&rows.hash), &cancel)
//!     .await?;
//! // `outcome.hash` replaces `rows.hash` for the next write.
//! ```
//!
//! ## Concurrency
//!
//! Writes are guarded by content hashes only. A write or delete presenting a
//! stale hash fails with [`Error::Conflict`]; nothing is retried or merged.

pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod github;
pub mod links;
pub mod paths;
pub mod schema;

pub use config::{ConfigStore, EnvStore, Identity, RepoConfig};
pub use db::Database;
pub use error::{Error, Result};
pub use github::{CommitInfo, ContentClient, ContentHash, Versioned, WriteOutcome};
pub use links::RepoLinks;
pub use paths::{RepoPaths, sanitize};
pub use schema::{SchemaRegistry, TableMeta};
