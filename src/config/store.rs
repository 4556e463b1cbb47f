use std::collections::HashMap;

/// Keys read from a [`ConfigStore`].
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const OWNER: &str = "owner";
    pub const REPO: &str = "repo";
    pub const ROOT_PATH: &str = "root_path";
    pub const BRANCH: &str = "branch";
    pub const API_URL: &str = "api_url";
    pub const WEB_URL: &str = "web_url";
    pub const MESSAGE_PREFIX: &str = "message_prefix";
    pub const COMMITTER_NAME: &str = "committer_name";
    pub const COMMITTER_EMAIL: &str = "committer_email";
    pub const SCHEMA: &str = "schema";
}

/// Opaque key-value source of startup settings.
pub trait ConfigStore {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Reads settings from environment variables, `REPODB_TOKEN` and so on.
#[derive(Debug, Clone)]
pub struct EnvStore {
    prefix: String,
}

impl EnvStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_ascii_uppercase())
    }
}

impl Default for EnvStore {
    fn default() -> Self {
        Self::new("REPODB_")
    }
}

impl ConfigStore for EnvStore {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key))
            .ok()
            .filter(|v| !v.is_empty())
    }
}
