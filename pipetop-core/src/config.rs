use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Backend connection settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base URL of the CRM REST backend
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".into()
}

/// Root configuration file structure
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Project name (informational, shown in the TUI header)
    #[serde(default)]
    pub name: Option<String>,

    /// Backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    InvalidBaseUrl { url: String },
    NotFound { searched: Vec<PathBuf> },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Yaml(e) => write!(f, "YAML parse error: {}", e),
            Self::InvalidBaseUrl { url } => {
                write!(f, "base_url '{}' must start with http:// or https://", url)
            }
            Self::NotFound { searched } => {
                write!(f, "no config file found, searched: {:?}", searched)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Yaml(e)
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Search for config file in standard locations
    pub fn discover(start_dir: &Path) -> Result<(PathBuf, Self), ConfigError> {
        let names = ["pipetop.yaml", "pipetop.yml", ".pipetop.yaml", ".pipetop.yml"];
        let mut searched = Vec::new();

        // Check environment variable first
        if let Ok(env_path) = std::env::var("PIPETOP_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok((path.clone(), Self::load(&path)?));
            }
            searched.push(path);
        }

        // Search current directory and parents
        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            for name in &names {
                let path = current.join(name);
                if path.exists() {
                    return Ok((path.clone(), Self::load(&path)?));
                }
                searched.push(path);
            }
            dir = current.parent();
        }

        Err(ConfigError::NotFound { searched })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend.base_url.trim();
        if url.is_empty() || !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.backend.base_url.clone(),
            });
        }
        Ok(())
    }

    /// Base URL with the `PIPETOP_BACKEND_URL` override applied and
    /// trailing slashes trimmed, ready for path joins.
    pub fn effective_base_url(&self) -> String {
        let url = std::env::var("PIPETOP_BACKEND_URL")
            .unwrap_or_else(|_| self.backend.base_url.clone());
        url.trim_end_matches('/').to_string()
    }
}
