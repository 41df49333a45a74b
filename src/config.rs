//! Runtime configuration
//!
//! Defaults may be stored in ~/.config/ctldl/config.json; command line flags
//! take precedence. The merged [`Config`] is passed to each component when it
//! is constructed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_RETRIES: u32 = 10;
pub const DEFAULT_DOWNLOAD_SLEEP: u64 = 5;
pub const DEFAULT_REQUEST_SLEEP: u64 = 1;
pub const DEFAULT_YTDLP: &str = "yt-dlp";

/// Optional defaults read from the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub playlists: Vec<String>,
    /// Contact address sent to MusicBrainz in the user agent
    pub email: Option<String>,
    pub retries: Option<u32>,
    pub download_sleep: Option<u64>,
    pub request_sleep: Option<u64>,
    pub interval_hours: Option<u64>,
    pub ytdlp_path: Option<String>,
    pub auto_accept: Option<bool>,
}

impl FileConfig {
    /// Load the config file, or defaults when it does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {:?}", path))?;

        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("ctldl").join("config.json"))
    }
}

/// Settings shared by the pipeline and the review session
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding downloads, playlists, the archive and the ledger
    pub output_dir: PathBuf,
    pub ytdlp_path: String,
    /// Extra download attempts after the first failure
    pub retries: u32,
    /// Upper bound of the random sleep before each download, in seconds
    pub download_sleep: u64,
    /// Sleep between extractor requests, in seconds
    pub request_sleep: u64,
    pub user_agent: String,
    /// Commit fully resolved matches without review
    pub auto_accept: bool,
    /// Treat warnings raised during a run as a failed run
    pub fail_on_warning: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl Config {
    /// Defaults for everything except the output directory
    pub fn for_output_dir(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            ytdlp_path: DEFAULT_YTDLP.to_string(),
            retries: DEFAULT_RETRIES,
            download_sleep: DEFAULT_DOWNLOAD_SLEEP,
            request_sleep: DEFAULT_REQUEST_SLEEP,
            user_agent: user_agent(None),
            auto_accept: false,
            fail_on_warning: false,
            verbose: false,
            quiet: false,
        }
    }
}

/// MusicBrainz user agent, `ctldl/<version> ( <email> )`
pub fn user_agent(email: Option<&str>) -> String {
    let version = env!("CARGO_PKG_VERSION");
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => format!("ctldl/{} ( {} )", version, email),
        None => format!("ctldl/{}", version),
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = FileConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"email": "me@example.com", "retries": 3}"#).unwrap();

        let config = FileConfig::load_from(&path).unwrap();
        assert_eq!(config.email.as_deref(), Some("me@example.com"));
        assert_eq!(config.retries, Some(3));
        assert!(config.playlists.is_empty());
    }

    #[test]
    fn test_user_agent() {
        let version = env!("CARGO_PKG_VERSION");
        assert_eq!(
            user_agent(Some("me@example.com")),
            format!("ctldl/{} ( me@example.com )", version)
        );
        assert_eq!(user_agent(Some("  ")), format!("ctldl/{}", version));
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home(Path::new("/srv/music")), PathBuf::from("/srv/music"));
    }
}
