//! What is already installed on the module search path.

use std::path::{Path, PathBuf};

use crate::release::{install_dir_name, normalize_name, Release};

/// A managed module found on disk.
#[derive(Debug, Clone)]
pub struct InstalledModule {
    pub release: Release,
    /// The module's own directory, e.g. `/etc/modgraph/modules/apollo`.
    pub path: PathBuf,
    /// The search-path entry containing `path`.
    pub modulepath: PathBuf,
    pub has_local_changes: bool,
}

impl InstalledModule {
    pub fn name(&self) -> &str {
        &self.release.name
    }
}

/// A directory on the search path without a readable `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmanagedDirectory {
    pub name: String,
    pub path: PathBuf,
    pub modulepath: PathBuf,
}

/// Installed modules across every search-path directory, in search-path
/// order and sorted by directory name within each entry.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub search_paths: Vec<PathBuf>,
    pub modules: Vec<InstalledModule>,
    pub unmanaged: Vec<UnmanagedDirectory>,
}

impl Inventory {
    /// Every installation of `name` (either `author/name` or `author-name`).
    pub fn find(&self, name: &str) -> Vec<&InstalledModule> {
        let name = normalize_name(name);
        self.modules.iter().filter(|m| m.release.name == name).collect()
    }

    /// The managed module occupying `dir_name` inside `modulepath`, if any.
    pub fn occupant(&self, modulepath: &Path, dir_name: &str) -> Option<&InstalledModule> {
        self.modules.iter().find(|m| {
            m.modulepath == modulepath && install_dir_name(&m.release.name) == dir_name
        })
    }

    /// An unmanaged directory named `dir_name` inside `modulepath`, if any.
    pub fn unmanaged_at(&self, modulepath: &Path, dir_name: &str) -> Option<&UnmanagedDirectory> {
        self.unmanaged
            .iter()
            .find(|d| d.modulepath == modulepath && d.name == dir_name)
    }

    /// Installed modules whose search-path entry is `modulepath`.
    pub fn in_modulepath<'a>(
        &'a self,
        modulepath: &'a Path,
    ) -> impl Iterator<Item = &'a InstalledModule> + 'a {
        self.modules.iter().filter(move |m| m.modulepath == modulepath)
    }
}
