use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use tracing::{info, debug, error};

/// Environment variable that overrides the configured Redis URL
pub const REDIS_URL_ENV: &str = "CRAWLER_REDIS_URL";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct CrawlerConfig {
    #[serde(default)]
    pub crawler: CrawlerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Crawler-specific settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CrawlerSettings {
    /// Number of concurrent fetch workers
    pub workers: usize,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

/// Storage settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub dedup: DedupSettings,
    #[serde(default)]
    pub pages: PageStoreSettings,
}

/// Dedup store settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DedupSettings {
    pub backend: String, // "redis", "memory"
    pub redis_url: String,
    /// Prefix for the `:seen` set and `:pending` list keys
    pub key_prefix: String,
}

/// Fetched page storage settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PageStoreSettings {
    pub dest_dir: PathBuf,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            workers: 1,
            user_agent: format!("bfs-crawler/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
        }
    }
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            backend: "redis".to_string(),
            redis_url: "redis://localhost:6379/0".to_string(),
            key_prefix: "crawler".to_string(),
        }
    }
}

impl Default for PageStoreSettings {
    fn default() -> Self {
        Self {
            dest_dir: PathBuf::from("pages"),
        }
    }
}

impl CrawlerConfig {
    /// Get the path to the config directory
    fn config_dir() -> PathBuf {
        let mut path = if let Some(proj_dirs) = directories::ProjectDirs::from("com", "bfs-crawler", "bfs-crawler") {
            proj_dirs.config_dir().to_path_buf()
        } else {
            PathBuf::from("./config")
        };

        // Create the sites directory if it doesn't exist
        path.push("sites");
        if !path.exists() {
            if let Err(e) = fs::create_dir_all(&path) {
                error!("Failed to create config directory: {}", e);
            }
        }

        path.pop();
        path
    }

    /// Load the default configuration
    pub fn load_default() -> Result<Self> {
        let config_path = Self::config_dir().join("default.yaml");

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            info!("Default configuration not found. Creating {}", config_path.display());
            let config = Self::default();
            config.save_as_default()?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load a configuration profile
    pub fn load_profile(profile: &str) -> Result<Self> {
        let profile_path = Self::config_dir().join("sites").join(format!("{}.yaml", profile));

        if profile_path.exists() {
            let mut config = Self::load_from_file(&profile_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            anyhow::bail!("Profile '{}' not found", profile)
        }
    }

    /// Load the named profile, or the default configuration when none is given
    pub fn load(profile: Option<&str>) -> Result<Self> {
        match profile {
            Some(name) => Self::load_profile(name)
                .context(format!("Failed to load profile: {}", name)),
            None => Self::load_default(),
        }
    }

    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read configuration file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .context(format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(REDIS_URL_ENV) {
            debug!("Using Redis URL from {}", REDIS_URL_ENV);
            self.storage.dedup.redis_url = url;
        }
    }

    /// Save the configuration as the default
    pub fn save_as_default(&self) -> Result<()> {
        let config_path = Self::config_dir().join("default.yaml");
        self.save_to_file(&config_path)
    }

    /// Save the configuration as a profile
    pub async fn save_as_profile(&self, profile: &str) -> Result<()> {
        let sites_dir = Self::config_dir().join("sites");
        let profile_path = sites_dir.join(format!("{}.yaml", profile));
        self.save_to_file(&profile_path)
    }

    /// Save the configuration to a file
    pub(crate) fn save_to_file(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let contents = serde_yaml::to_string(self)
            .context("Failed to serialize configuration")?;

        fs::write(path, contents)
            .context(format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// List all available profiles
    pub async fn list_profiles() -> Result<Vec<String>> {
        let sites_dir = Self::config_dir().join("sites");

        if !sites_dir.exists() {
            return Ok(vec![]);
        }

        let mut profiles = Vec::new();

        for entry in fs::read_dir(sites_dir)? {
            let path = entry?.path();

            if path.is_file() && path.extension().map_or(false, |ext| ext == "yaml") {
                if let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) {
                    profiles.push(name.to_string());
                }
            }
        }

        profiles.sort();
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("bfs-crawler-config-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let path = scratch_file("partial.yaml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            "crawler:\n  workers: 4\nstorage:\n  dedup:\n    backend: memory\n",
        )
        .unwrap();

        let config = CrawlerConfig::load_from_file(&path).unwrap();

        assert_eq!(config.crawler.workers, 4);
        assert_eq!(config.crawler.request_timeout_secs, 30);
        assert_eq!(config.storage.dedup.backend, "memory");
        assert_eq!(config.storage.dedup.key_prefix, "crawler");
        assert_eq!(config.storage.pages.dest_dir, PathBuf::from("pages"));
    }

    #[test]
    fn saved_file_loads_back_unchanged() {
        let path = scratch_file("nested/profile.yaml");
        let mut config = CrawlerConfig::default();
        config.storage.pages.dest_dir = PathBuf::from("/srv/pages");

        config.save_to_file(&path).unwrap();

        assert_eq!(CrawlerConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_reports_path() {
        let path = scratch_file("broken.yaml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "crawler: [not, a, map]\n").unwrap();

        let err = CrawlerConfig::load_from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.yaml"));
    }
}
