use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::store::{ConfigStore, keys};
use crate::error::{Error, Result};
use crate::schema::SchemaRegistry;

/// Commit author and committer written into every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: "repodb".to_string(),
            email: "repodb@users.noreply.github.com".to_string(),
        }
    }
}

/// Everything needed to talk to one repository. Built once at startup and
/// passed by reference to the path builder, link builder and content client.
#[derive(Clone, Deserialize)]
pub struct RepoConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    /// Directory inside the repository that holds the databases, e.g. "dbs".
    #[serde(default)]
    pub root_path: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_web_url")]
    pub web_url: String,
    #[serde(default)]
    pub committer: Identity,
    #[serde(default = "default_message_prefix")]
    pub message_prefix: String,
    /// Serialized table-largeness document, see [`SchemaRegistry::from_json`].
    #[serde(default)]
    pub schema: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_web_url() -> String {
    "https://github.com".to_string()
}

fn default_message_prefix() -> String {
    "[db-man]".to_string()
}

impl RepoConfig {
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        root_path: impl Into<String>,
    ) -> Result<Self> {
        Self {
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            root_path: root_path.into(),
            branch: default_branch(),
            api_url: default_api_url(),
            web_url: default_web_url(),
            committer: Identity::default(),
            message_prefix: default_message_prefix(),
            schema: None,
        }
        .normalized()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(format!("invalid toml: {e}")))?;
        config.normalized()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reads every setting from a key-value store. Missing optional keys fall
    /// back to the same defaults as the TOML form.
    pub fn from_store(store: &impl ConfigStore) -> Result<Self> {
        let require = |key: &str| {
            store
                .get(key)
                .ok_or_else(|| Error::Config(format!("missing required key: {key}")))
        };

        let mut config = Self::new(
            require(keys::TOKEN)?,
            require(keys::OWNER)?,
            require(keys::REPO)?,
            require(keys::ROOT_PATH)?,
        )?;

        if let Some(branch) = store.get(keys::BRANCH) {
            config.branch = branch;
        }
        if let Some(api_url) = store.get(keys::API_URL) {
            config.api_url = api_url;
        }
        if let Some(web_url) = store.get(keys::WEB_URL) {
            config.web_url = web_url;
        }
        if let Some(prefix) = store.get(keys::MESSAGE_PREFIX) {
            config.message_prefix = prefix;
        }
        if let Some(name) = store.get(keys::COMMITTER_NAME) {
            config.committer.name = name;
        }
        if let Some(email) = store.get(keys::COMMITTER_EMAIL) {
            config.committer.email = email;
        }
        config.schema = store.get(keys::SCHEMA);

        config.normalized()
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("token", &self.token),
            ("owner", &self.owner),
            ("repo", &self.repo),
            ("branch", &self.branch),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{name} cannot be empty")));
            }
        }
        if self.owner.contains('/') || self.repo.contains('/') {
            return Err(Error::Config(
                "owner and repo cannot contain '/'".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses the configured schema document. No document means no tables are
    /// known, so every table reads through the inline content path.
    pub fn schema_registry(&self) -> Result<SchemaRegistry> {
        match self.schema.as_deref() {
            Some(doc) => SchemaRegistry::from_json(doc),
            None => Ok(SchemaRegistry::default()),
        }
    }

    fn normalized(mut self) -> Result<Self> {
        self.root_path = self.root_path.trim().trim_matches('/').to_string();
        self.api_url = self.api_url.trim_end_matches('/').to_string();
        self.web_url = self.web_url.trim_end_matches('/').to_string();
        self.validate()?;
        Ok(self)
    }
}

impl fmt::Debug for RepoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoConfig")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("root_path", &self.root_path)
            .field("branch", &self.branch)
            .field("api_url", &self.api_url)
            .field("web_url", &self.web_url)
            .field("committer", &self.committer)
            .field("message_prefix", &self.message_prefix)
            .finish_non_exhaustive()
    }
}
