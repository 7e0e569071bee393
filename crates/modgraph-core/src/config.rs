use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use modgraph_util::errors::ModError;
use modgraph_util::fs::expand_home;

/// Global user configuration loaded from `~/.modgraph/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

/// Registry settings from `[registry]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
        }
    }
}

fn default_registry_url() -> String {
    crate::DEFAULT_REGISTRY_URL.to_string()
}

/// Module search path settings from `[paths]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directories searched for installed modules, first entry is the default
    /// install target. Empty means `~/.modgraph/modules`.
    #[serde(default)]
    pub modulepath: Vec<String>,
}

impl GlobalConfig {
    /// Load the global configuration from `~/.modgraph/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from an explicit path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        tracing::debug!("loading global config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| ModError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        toml::from_str(&content).map_err(|e| {
            ModError::Config {
                message: format!("Failed to parse {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// The configured module search path, with `~/` expanded.
    pub fn modulepath(&self) -> Vec<PathBuf> {
        if self.paths.modulepath.is_empty() {
            return vec![default_modulepath()];
        }
        self.paths
            .modulepath
            .iter()
            .map(|p| expand_home(p))
            .collect()
    }
}

/// Returns the path to the modgraph data directory (`~/.modgraph/`).
pub fn dirs_path() -> PathBuf {
    expand_home("~/.modgraph")
}

/// Install target used when nothing else is configured.
pub fn default_modulepath() -> PathBuf {
    dirs_path().join("modules")
}
