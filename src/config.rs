// src/config.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Every on-disk location the pipeline touches, derived from one project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/data/raw/dsire`
    pub fn raw_dsire_dir(&self) -> PathBuf {
        self.root.join("data").join("raw").join("dsire")
    }

    /// `<root>/data/raw/dsire/<version_tag>`
    pub fn raw_version_dir(&self, version_tag: &str) -> PathBuf {
        self.raw_dsire_dir().join(version_tag)
    }

    /// `<root>/data/processed`
    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("data").join("processed")
    }

    /// Incremental-fetch checkpoint.
    pub fn dsire_state_file(&self) -> PathBuf {
        self.root
            .join("data")
            .join("meta")
            .join("state")
            .join("dsire_last_pull.json")
    }
}

/// Connection settings for the DSIRE programs API.
#[derive(Debug, Clone)]
pub struct DsireClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Sleep before retry `n` is `backoff * n`.
    pub backoff: Duration,
    pub user_agent: String,
}

impl Default for DsireClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://programs.dsireusa.org/api/v1".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            backoff: Duration::from_secs(2),
            user_agent: "der-value-stack/0.1".to_string(),
        }
    }
}

/// Settings for the GridStatus datasets API. The key is always supplied by
/// the caller.
#[derive(Debug, Clone)]
pub struct GridStatusConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl GridStatusConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.gridstatus.io/v1".to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(120),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_data_layout() {
        let paths = ProjectPaths::new("/proj");
        assert_eq!(
            paths.raw_version_dir("v1"),
            PathBuf::from("/proj/data/raw/dsire/v1")
        );
        assert_eq!(paths.processed_dir(), PathBuf::from("/proj/data/processed"));
        assert_eq!(
            paths.dsire_state_file(),
            PathBuf::from("/proj/data/meta/state/dsire_last_pull.json")
        );
    }
}
