//! file: core/src/config.rs
//! description: runtime configuration for a `PackageManager`/`PluginManager`
//! pair — the ambient configuration layer named in SPEC_FULL.md §2.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::platform::Platform;

/// Environment variable consulted when `--base-dir` is not passed on the CLI.
pub const BASE_DIR_ENV_VAR: &str = "BACKSTAGE_BASE_DIR";

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Fully resolved configuration a `PackageManager` is built from. CLI flags
/// override file defaults, which override hardcoded defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: PathBuf,
    pub repositories: Vec<Url>,
    pub request_timeout: Duration,
    pub platform: Platform,
}

impl Config {
    pub fn new(base_dir: PathBuf) -> Self {
        Config {
            base_dir,
            repositories: Vec::new(),
            request_timeout: Duration::from_secs(30),
            platform: Platform::host(),
        }
    }

    pub fn with_repositories(mut self, repositories: Vec<Url>) -> Self {
        self.repositories = repositories;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn merge_file(mut self, file: ConfigFile) -> Self {
        if let Some(dir) = file.base_dir {
            self.base_dir = dir;
        }
        for repo in file.repositories {
            match Url::parse(&repo) {
                Ok(url) => self.repositories.push(url),
                Err(e) => log::warn!("ignoring malformed repository URL '{repo}': {e}"),
            }
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        self
    }

    pub fn load_file(path: &Path) -> std::io::Result<ConfigFile> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// UTC timestamp used for staging-directory names
/// (`<base>/<kind>/<name>-<timestamp>`).
pub fn utc_timestamp() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string()
}
