use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::config::Identity;
use crate::error::Result;

/// Content hash the remote reports for a file. Every write or delete must
/// present the hash last observed for that file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentHash {
    fn from(hash: &str) -> Self {
        Self::new(hash)
    }
}

impl From<String> for ContentHash {
    fn from(hash: String) -> Self {
        Self(hash)
    }
}

/// Decoded content together with the hash needed to write it back.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub content: T,
    pub hash: ContentHash,
}

impl Versioned<Value> {
    /// Deserializes the JSON content into a caller type, keeping the hash.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Versioned<T>> {
        Ok(Versioned {
            content: serde_json::from_value(self.content)?,
            hash: self.hash,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// One entry of the contents endpoint: a file with its body, or a directory
/// listing entry without one.
#[derive(Debug, Clone, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub path: String,
    pub sha: ContentHash,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FileOrDir {
    Dir(Vec<FileMeta>),
    File(FileMeta),
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlobResponse {
    pub sha: ContentHash,
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitSignature {
    pub name: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

/// The commit a write or delete produced.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author: Option<CommitSignature>,
}

#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub hash: ContentHash,
    pub commit: CommitInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WriteResponse {
    pub content: Option<FileMeta>,
    pub commit: CommitInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteResponse {
    pub commit: CommitInfo,
}

#[derive(Debug, Serialize)]
pub(crate) struct PutContentRequest<'a> {
    pub message: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
    pub branch: &'a str,
    pub committer: &'a Identity,
    pub author: &'a Identity,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteContentRequest<'a> {
    pub message: String,
    pub sha: &'a str,
    pub branch: &'a str,
    pub committer: &'a Identity,
    pub author: &'a Identity,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}
