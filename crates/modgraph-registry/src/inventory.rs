//! Scan the module search path for installed modules.

use std::path::{Path, PathBuf};

use modgraph_core::inventory::{InstalledModule, Inventory, UnmanagedDirectory};
use modgraph_core::metadata::{ModuleMetadata, METADATA_FILE};
use modgraph_util::errors::ModError;
use modgraph_util::fs::list_subdirs;

use crate::checksum::has_local_changes;

/// Every module directory under each search-path entry.
///
/// Directories with a readable `metadata.json` become installed modules,
/// others are recorded as unmanaged. Hidden directories are skipped and an
/// unreadable search-path entry contributes nothing.
pub fn scan(search_paths: &[PathBuf]) -> Inventory {
    let mut inventory = Inventory {
        search_paths: search_paths.to_vec(),
        ..Inventory::default()
    };

    for modulepath in search_paths {
        let dirs = match list_subdirs(modulepath) {
            Ok(dirs) => dirs,
            Err(e) => {
                tracing::warn!("cannot read {}: {e}", modulepath.display());
                continue;
            }
        };
        for dir in dirs {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            match read_module(modulepath, &dir) {
                Ok(Some(module)) => inventory.modules.push(module),
                Ok(None) => inventory.unmanaged.push(UnmanagedDirectory {
                    name,
                    path: dir,
                    modulepath: modulepath.clone(),
                }),
                Err(e) => {
                    tracing::warn!("treating {} as unmanaged: {e}", dir.display());
                    inventory.unmanaged.push(UnmanagedDirectory {
                        name,
                        path: dir,
                        modulepath: modulepath.clone(),
                    });
                }
            }
        }
    }

    tracing::debug!(
        "found {} installed module(s) in {} path(s)",
        inventory.modules.len(),
        search_paths.len()
    );
    inventory
}

fn read_module(modulepath: &Path, dir: &Path) -> Result<Option<InstalledModule>, ModError> {
    if !dir.join(METADATA_FILE).is_file() {
        return Ok(None);
    }
    let metadata = ModuleMetadata::load(dir)?;
    let release = metadata.to_release(dir.to_path_buf())?;
    Ok(Some(InstalledModule {
        release,
        path: dir.to_path_buf(),
        modulepath: modulepath.to_path_buf(),
        has_local_changes: has_local_changes(dir, &metadata.checksums),
    }))
}
