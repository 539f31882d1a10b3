//! Site configuration.
//!
//! Resolution order: built-in defaults, then `groupsite.toml` (explicit
//! `--config` path, else `./groupsite.toml`, else the platform config dir),
//! then `GROUPSITE_*` environment variables, then CLI flags.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "groupsite.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Intermediate artifacts: `messages.ndjson`, `by_year/`, `index/`.
    pub out_dir: PathBuf,
    /// Published static site.
    pub site_dir: PathBuf,
    /// Raw archive captures scanned by `find-files`.
    pub data_dir: PathBuf,
    pub title: String,
    /// Base URL the site is served from; used when replaying pages in `verify`.
    pub base_url: String,
    /// Number of body characters copied into `index_text`.
    pub index_text_chars: usize,
    pub inject_stylesheet: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("out"),
            site_dir: PathBuf::from("site"),
            data_dir: PathBuf::from("data"),
            title: "Group Archive".to_string(),
            base_url: "http://localhost/".to_string(),
            index_text_chars: 1000,
            inject_stylesheet: true,
        }
    }
}

/// On-disk shape of `groupsite.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    out_dir: Option<PathBuf>,
    site_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    title: Option<String>,
    base_url: Option<String>,
    index_text_chars: Option<usize>,
    inject_stylesheet: Option<bool>,
}

impl SiteConfig {
    /// Load configuration from file and environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = explicit {
            config.apply_file(path)?;
        } else if let Some(path) = default_config_path() {
            config.apply_file(&path)?;
        }
        config.apply_env()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");

        if let Some(v) = file.out_dir {
            self.out_dir = v;
        }
        if let Some(v) = file.site_dir {
            self.site_dir = v;
        }
        if let Some(v) = file.data_dir {
            self.data_dir = v;
        }
        if let Some(v) = file.title {
            self.title = v;
        }
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.index_text_chars {
            self.index_text_chars = v;
        }
        if let Some(v) = file.inject_stylesheet {
            self.inject_stylesheet = v;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = dotenvy::var("GROUPSITE_OUT_DIR") {
            self.out_dir = PathBuf::from(v);
        }
        if let Ok(v) = dotenvy::var("GROUPSITE_SITE_DIR") {
            self.site_dir = PathBuf::from(v);
        }
        if let Ok(v) = dotenvy::var("GROUPSITE_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = dotenvy::var("GROUPSITE_TITLE") {
            self.title = v;
        }
        if let Ok(v) = dotenvy::var("GROUPSITE_BASE_URL") {
            self.base_url = v;
        }
        if let Ok(v) = dotenvy::var("GROUPSITE_INDEX_TEXT_CHARS") {
            self.index_text_chars = v.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "GROUPSITE_INDEX_TEXT_CHARS",
                value: v.clone(),
            })?;
        }
        if let Ok(v) = dotenvy::var("GROUPSITE_INJECT_STYLESHEET") {
            self.inject_stylesheet = !matches!(v.trim(), "0" | "false" | "no");
        }
        Ok(())
    }

    pub fn records_path(&self) -> PathBuf {
        self.out_dir.join("messages.ndjson")
    }

    pub fn by_year_dir(&self) -> PathBuf {
        self.out_dir.join("by_year")
    }

    pub fn index_base(&self) -> PathBuf {
        self.out_dir.join("index")
    }
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    directories::ProjectDirs::from("org", "groupsite", "groupsite")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .filter(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "title = \"Frank's List\"\nsite_dir = \"public\"\nindex_text_chars = 20\n",
        )
        .unwrap();

        let mut config = SiteConfig::default();
        config.apply_file(&path).unwrap();
        assert_eq!(config.title, "Frank's List");
        assert_eq!(config.site_dir, PathBuf::from("public"));
        assert_eq!(config.index_text_chars, 20);
        assert_eq!(config.out_dir, PathBuf::from("out"));
        assert!(config.inject_stylesheet);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "colour = \"blue\"\n").unwrap();

        let err = SiteConfig::default().apply_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = SiteConfig::load(Some(Path::new("/nonexistent/groupsite.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn derived_paths_live_under_out_dir() {
        let config = SiteConfig::default();
        assert_eq!(config.records_path(), PathBuf::from("out/messages.ndjson"));
        assert_eq!(config.by_year_dir(), PathBuf::from("out/by_year"));
        assert_eq!(config.index_base(), PathBuf::from("out/index"));
    }
}
