//! A release source reading registry responses from a local directory.
//!
//! Each module is a `<name>.json` file holding one `/v3/releases` page.

use std::path::{Path, PathBuf};

use modgraph_core::release::{normalize_name, Release};
use modgraph_resolver::source::{FetchFuture, ReleaseSource, SourceError, REGISTRY_PRIORITY};

use crate::api::parse_page;

#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    label: String,
}

impl DirectorySource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            label: dir.display().to_string(),
        }
    }

    pub fn releases(&self, module: &str) -> Result<Vec<Release>, SourceError> {
        let name = normalize_name(module);
        let path = self.dir.join(format!("{name}.json"));
        let body = match std::fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound { module: name });
            }
            Err(e) => {
                return Err(SourceError::Network {
                    module: name,
                    message: format!("{}: {e}", path.display()),
                })
            }
        };
        let page = parse_page(&name, &body)?;
        if page.next.is_some() {
            tracing::debug!("ignoring pagination in {}", path.display());
        }
        Ok(page.releases)
    }
}

impl ReleaseSource for DirectorySource {
    fn name(&self) -> &str {
        &self.label
    }

    fn priority(&self) -> u8 {
        REGISTRY_PRIORITY
    }

    fn fetch<'a>(&'a self, module: &'a str) -> FetchFuture<'a> {
        Box::pin(async move { self.releases(module) })
    }
}
