use crate::config::RepoConfig;

/// Browser links into the repository, for display only.
#[derive(Debug, Clone)]
pub struct RepoLinks {
    base: String,
    branch: String,
}

impl RepoLinks {
    #[must_use]
    pub fn new(config: &RepoConfig) -> Self {
        Self {
            base: format!(
                "{}/{}/{}",
                config.web_url.trim_end_matches('/'),
                config.owner,
                config.repo
            ),
            branch: config.branch.clone(),
        }
    }

    /// `https://github.com/{owner}/{repo}/{path}`
    #[must_use]
    pub fn repo_url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Rendered file at the tip of the configured branch.
    #[must_use]
    pub fn blob_url(&self, path: &str) -> String {
        self.repo_url(&format!("blob/{}/{}", self.branch, path.trim_start_matches('/')))
    }

    /// Commit history touching `path`.
    #[must_use]
    pub fn history_url(&self, path: &str) -> String {
        self.repo_url(&format!(
            "commits/{}/{}",
            self.branch,
            path.trim_start_matches('/')
        ))
    }
}
