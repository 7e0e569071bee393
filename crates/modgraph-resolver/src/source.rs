//! Release sources: where candidate releases come from.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use modgraph_core::inventory::Inventory;
use modgraph_core::release::{normalize_name, Release};
use modgraph_core::version::Version;
use thiserror::Error;

/// Priority of releases already on disk.
pub const INSTALLED_PRIORITY: u8 = 100;
/// Priority of releases published on a registry.
pub const REGISTRY_PRIORITY: u8 = 10;

/// Why a source could not produce releases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("module '{module}' was not found")]
    NotFound { module: String },

    #[error("network error while fetching '{module}': {message}")]
    Network { module: String, message: String },

    #[error("malformed release data for '{module}': {message}")]
    Malformed { module: String, message: String },
}

pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<Release>, SourceError>> + Send + 'a>>;

/// A provider of releases for a module name.
pub trait ReleaseSource: Send + Sync {
    fn name(&self) -> &str;

    /// Higher wins when two sources offer the same version.
    fn priority(&self) -> u8;

    fn fetch<'a>(&'a self, module: &'a str) -> FetchFuture<'a>;
}

/// Sources queried together, results merged by priority.
#[derive(Clone, Default)]
pub struct Sources {
    sources: Vec<Arc<dyn ReleaseSource>>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: Arc<dyn ReleaseSource>) {
        self.sources.push(source);
    }

    pub fn with(mut self, source: impl ReleaseSource + 'static) -> Self {
        self.push(Arc::new(source));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Releases of `module` from every source, one per version, ascending.
    ///
    /// A source that does not know the module contributes nothing. Any
    /// other failure is kept in [`Fetched::failure`] alongside whatever the
    /// remaining sources offered.
    pub async fn fetch(&self, module: &str) -> Fetched {
        let module = normalize_name(module);
        let mut merged: BTreeMap<Version, (u8, Release)> = BTreeMap::new();
        let mut failure = None;

        for source in &self.sources {
            let releases = match source.fetch(&module).await {
                Ok(releases) => releases,
                Err(SourceError::NotFound { .. }) => continue,
                Err(e) => {
                    tracing::debug!("{} failed for {module}: {e}", source.name());
                    failure.get_or_insert(e);
                    continue;
                }
            };
            tracing::debug!(
                "{} offered {} release(s) of {module}",
                source.name(),
                releases.len()
            );
            let priority = source.priority();
            for release in releases.into_iter().filter(|r| r.name == module) {
                match merged.get(&release.version) {
                    Some((existing, _)) if *existing >= priority => {}
                    _ => {
                        merged.insert(release.version.clone(), (priority, release));
                    }
                }
            }
        }

        Fetched {
            releases: merged.into_values().map(|(_, release)| release).collect(),
            failure,
        }
    }
}

/// What [`Sources::fetch`] found for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub releases: Vec<Release>,
    /// The first source failure other than "not found".
    pub failure: Option<SourceError>,
}

/// An in-memory source.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    priority: u8,
    releases: BTreeMap<String, Vec<Release>>,
}

impl StaticSource {
    pub fn new(name: &str, priority: u8) -> Self {
        Self {
            name: name.to_string(),
            priority,
            releases: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, release: Release) {
        self.releases
            .entry(release.name.clone())
            .or_default()
            .push(release);
    }

    pub fn with(mut self, release: Release) -> Self {
        self.add(release);
        self
    }
}

impl ReleaseSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn fetch<'a>(&'a self, module: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            self.releases
                .get(module)
                .cloned()
                .ok_or_else(|| SourceError::NotFound {
                    module: module.to_string(),
                })
        })
    }
}

/// Releases already installed on the search path.
#[derive(Debug, Clone)]
pub struct InstalledSource {
    inner: StaticSource,
}

impl InstalledSource {
    pub fn new(inventory: &Inventory) -> Self {
        let mut inner = StaticSource::new("installed", INSTALLED_PRIORITY);
        for module in &inventory.modules {
            inner.add(module.release.clone());
        }
        Self { inner }
    }
}

impl ReleaseSource for InstalledSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn priority(&self) -> u8 {
        self.inner.priority()
    }

    fn fetch<'a>(&'a self, module: &'a str) -> FetchFuture<'a> {
        self.inner.fetch(module)
    }
}
