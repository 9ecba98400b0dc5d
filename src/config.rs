use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paging::DEFAULT_PAGE_SIZE;

const APP_DIR: &str = "mongodesk";

/// Expand environment variables and tilde in a path string.
/// Supports: $HOME, ${VAR}, ~/path
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_app_name() -> String {
    APP_DIR.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where connection profiles are stored; defaults to the data directory
    #[serde(default)]
    pub profiles_file: Option<String>,

    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Reported to the server in the client handshake
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profiles_file: None,
            page_size: DEFAULT_PAGE_SIZE,
            app_name: default_app_name(),
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR);

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        }

        Ok(config_dir)
    }

    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get data directory")?
            .join(APP_DIR);

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        }

        Ok(data_dir)
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.yaml"))
    }

    /// Load from the default location, writing an example file on first run.
    pub fn load() -> Result<Self> {
        let config_file = Self::config_file()?;

        if !config_file.exists() {
            Self::create_example_config(&config_file)?;
            tracing::info!(
                "No configuration found, wrote an example to {} and using defaults",
                config_file.display()
            );
            return Ok(Self::default());
        }

        Self::load_from(&config_file)
    }

    pub fn load_from(config_file: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_file)
            .with_context(|| format!("Failed to read config file {}", config_file.display()))?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        let mut config: Self =
            serde_yaml::from_str(content).context("Failed to parse config file")?;

        config.expand_paths();
        config.validate();

        Ok(config)
    }

    fn create_example_config(config_file: &Path) -> Result<()> {
        let example_content = r"# mongodesk configuration

# Optional: where connection profiles are kept.
# Defaults to profiles.yaml in the local data directory.
# profiles_file: ~/mongodesk/profiles.yaml

# Documents shown per page by the find command
page_size: 20

# Application name sent to the server
# app_name: mongodesk

# Configuration notes:
# - Profiles may contain passwords in plain text; keep the profiles file private.
";

        fs::write(config_file, example_content).context("Failed to write example config file")?;

        Ok(())
    }

    /// Resolved location of the profile store.
    pub fn profiles_path(&self) -> Result<PathBuf> {
        match &self.profiles_file {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::data_dir()?.join("profiles.yaml")),
        }
    }

    fn expand_paths(&mut self) {
        if let Some(path) = &self.profiles_file {
            self.profiles_file = Some(expand_path(path));
        }
    }

    pub fn validate(&mut self) {
        if self.page_size == 0 {
            tracing::warn!(
                "page_size must be positive, using {} instead",
                DEFAULT_PAGE_SIZE
            );
            self.page_size = DEFAULT_PAGE_SIZE;
        }
    }
}
