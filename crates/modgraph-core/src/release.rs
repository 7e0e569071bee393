use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::version::{Version, VersionRange};

/// Normalize a module name: `author/name` and `author-name` are the same module.
pub fn normalize_name(name: &str) -> String {
    name.trim().replace('/', "-")
}

/// The directory a module installs into: the part of its full name after
/// the author, e.g. `alice-apollo` → `apollo`.
pub fn install_dir_name(name: &str) -> &str {
    match name.split_once(['-', '/']) {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => name,
    }
}

/// Where a release comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Published on a registry; `file_uri` locates the archive.
    Registry { file_uri: String },
    /// Already present on disk at `path`.
    Installed { path: PathBuf },
}

/// One publishable version of a module and what it requires.
///
/// Equality and ordering consider only `name` and `version`.
#[derive(Debug, Clone)]
pub struct Release {
    pub name: String,
    pub version: Version,
    pub requirements: BTreeMap<String, VersionRange>,
    pub origin: Origin,
}

impl Release {
    pub fn new(name: &str, version: Version, origin: Origin) -> Self {
        Self {
            name: normalize_name(name),
            version,
            requirements: BTreeMap::new(),
            origin,
        }
    }

    /// Builder-style helper adding one requirement.
    pub fn with_requirement(mut self, name: &str, range: VersionRange) -> Self {
        self.requirements.insert(normalize_name(name), range);
        self
    }

    /// Drop every requirement, as `--ignore-dependencies` does.
    pub fn without_requirements(mut self) -> Self {
        self.requirements.clear();
        self
    }

    pub fn is_installed(&self) -> bool {
        matches!(self.origin, Origin::Installed { .. })
    }

    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }

    pub fn install_dir_name(&self) -> &str {
        install_dir_name(&self.name)
    }

    /// Installed location, if this release came from disk.
    pub fn installed_path(&self) -> Option<&PathBuf> {
        match &self.origin {
            Origin::Installed { path } => Some(path),
            Origin::Registry { .. } => None,
        }
    }
}

impl PartialEq for Release {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl Eq for Release {}

impl Ord for Release {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for Release {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (v{})", self.name, self.version)
    }
}
