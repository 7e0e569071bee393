//! Read-only validation of an install target directory.

use std::path::Path;

use crate::error::PathErrorKind;

/// Check that modules could be installed under `path`.
///
/// An existing path must be a writable directory. A missing one is judged
/// by its nearest existing ancestor, which must be writable.
pub fn check(path: &Path) -> Result<(), PathErrorKind> {
    match path.metadata() {
        Ok(meta) if !meta.is_dir() => return Err(PathErrorKind::NotADirectory),
        Ok(meta) => return writable(&meta),
        Err(_) => {}
    }

    let mut ancestor = path.parent();
    while let Some(dir) = ancestor {
        if let Ok(meta) = dir.metadata() {
            if !meta.is_dir() {
                return Err(PathErrorKind::NotADirectory);
            }
            return writable(&meta);
        }
        ancestor = dir.parent();
    }
    Ok(())
}

fn writable(meta: &std::fs::Metadata) -> Result<(), PathErrorKind> {
    if meta.permissions().readonly() {
        Err(PathErrorKind::PermissionDenied)
    } else {
        Ok(())
    }
}
