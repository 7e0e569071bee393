//! Local-change detection against the checksums recorded in `metadata.json`.

use std::collections::BTreeMap;
use std::path::Path;

use modgraph_util::hash::md5_file;

/// Whether any recorded file under `module_dir` is missing or differs from
/// its recorded MD5 digest.
pub fn has_local_changes(module_dir: &Path, checksums: &BTreeMap<String, String>) -> bool {
    checksums.iter().any(|(file, expected)| {
        match md5_file(&module_dir.join(file)) {
            Ok(actual) if actual.eq_ignore_ascii_case(expected) => false,
            Ok(_) => {
                tracing::debug!("{file} differs in {}", module_dir.display());
                true
            }
            Err(_) => {
                tracing::debug!("{file} is missing from {}", module_dir.display());
                true
            }
        }
    })
}
