//! Configuration for the cyclefuse pipeline and server.
//!
//! Stored as a JSON file under the platform config directory. A missing
//! file is not an error; the defaults apply until the first save.

use crate::model::SourceWeights;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Port the HTTP server binds to (0 for random)
    pub port: u16,

    /// Shared secrets accepted in the `x-api-key` header; when empty all
    /// requests are admitted
    pub shared_secrets: Vec<String>,

    /// Source-weight overrides applied on top of the default table
    pub source_weights: SourceWeights,

    /// Number of rows shown by CSV previews
    pub preview_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 7878,
            shared_secrets: Vec::new(),
            source_weights: SourceWeights::new(),
            preview_rows: 10,
        }
    }
}

impl Config {
    /// Where the config file lives. The `CYCLEFUSE_CONFIG` environment
    /// variable overrides the default of
    /// `<platform config dir>/cyclefuse/config.json`; a platform without
    /// a config dir falls back to the working directory.
    pub fn config_path() -> PathBuf {
        if let Some(overridden) = std::env::var_os("CYCLEFUSE_CONFIG") {
            return PathBuf::from(overridden);
        }
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("cyclefuse").join("config.json")
    }

    /// Load from the default location.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path, falling back to defaults when the
    /// file does not exist. A file that exists but fails to parse is an
    /// error, so a typo in a weight override cannot silently reset the
    /// whole configuration.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("malformed config at {}", path.display()))
    }

    /// Save to the default location.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save to an explicit path, creating missing parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let text =
            serde_json::to_string_pretty(self).context("failed to encode configuration")?;
        fs::write(path, text)
            .with_context(|| format!("failed to write config at {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;

    fn scratch_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("cyclefuse-{}-{}.json", label, std::process::id()))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 7878);
        assert!(config.shared_secrets.is_empty());
        assert!(config.source_weights.is_empty());
        assert_eq!(config.preview_rows, 10);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = scratch_path("config-roundtrip");
        let mut config = Config::default();
        config.port = 9000;
        config.shared_secrets.push("s3cret".to_string());
        config.source_weights.set("manual", 0.4);
        config.save_to(&path).unwrap();

        let restored = Config::load_from(&path).unwrap();
        assert_eq!(restored.port, 9000);
        assert_eq!(restored.shared_secrets, vec!["s3cret".to_string()]);
        assert_eq!(restored.source_weights.weight(&Source::Manual), 0.4);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let path = scratch_path("config-absent");
        let _ = fs::remove_file(&path);
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.port, 7878);
    }

    #[test]
    fn test_malformed_file_is_an_error_not_a_reset() {
        let path = scratch_path("config-malformed");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
        let _ = fs::remove_file(&path);
    }
}
