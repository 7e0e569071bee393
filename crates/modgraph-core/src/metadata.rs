use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use modgraph_util::errors::ModError;
use serde::{Deserialize, Serialize};

use crate::release::{Origin, Release};
use crate::version::{parse_range, parse_version, VersionRange};

/// File name of the manifest inside an installed module directory.
pub const METADATA_FILE: &str = "metadata.json";

/// The `metadata.json` manifest of a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<MetadataDependency>,
    /// Relative file path → MD5 hex digest, as shipped in the archive.
    #[serde(default)]
    pub checksums: BTreeMap<String, String>,
}

/// One entry of `dependencies` in `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataDependency {
    pub name: String,
    #[serde(default)]
    pub version_requirement: Option<String>,
}

impl MetadataDependency {
    /// The requirement as a range; a missing requirement admits any version.
    pub fn range(&self) -> Result<VersionRange, ModError> {
        match &self.version_requirement {
            Some(text) => parse_range(text).map_err(|e| ModError::Metadata {
                message: format!("dependency '{}': {e}", self.name),
            }),
            None => Ok(VersionRange::any()),
        }
    }
}

impl ModuleMetadata {
    pub fn from_json(content: &str) -> Result<Self, ModError> {
        serde_json::from_str(content).map_err(|e| ModError::Metadata {
            message: e.to_string(),
        })
    }

    /// Read `metadata.json` from a module directory.
    pub fn load(module_dir: &Path) -> Result<Self, ModError> {
        let path = module_dir.join(METADATA_FILE);
        let content = std::fs::read_to_string(&path)?;
        Self::from_json(&content).map_err(|e| ModError::Metadata {
            message: format!("{}: {e}", path.display()),
        })
    }

    /// The release this manifest describes, installed at `path`.
    pub fn to_release(&self, path: PathBuf) -> Result<Release, ModError> {
        let version = parse_version(&self.version).map_err(|e| ModError::Metadata {
            message: format!("module '{}': {e}", self.name),
        })?;
        let mut release = Release::new(&self.name, version, Origin::Installed { path });
        for dep in &self.dependencies {
            release = release.with_requirement(&dep.name, dep.range()?);
        }
        Ok(release)
    }
}
