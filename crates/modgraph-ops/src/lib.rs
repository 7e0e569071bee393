//! High-level operations behind the `modgraph` commands.

pub mod materialize;
pub mod ops_install;
pub mod ops_list;
pub mod ops_upgrade;

use std::path::PathBuf;
use std::sync::Arc;

use modgraph_core::version::{parse_range, VersionRange};
use modgraph_registry::client::{build_client, RegistryClient};
use modgraph_registry::fixture::DirectorySource;
use modgraph_resolver::error::Request;
use modgraph_resolver::graph::Graph;
use modgraph_resolver::plan::InstallPlan;
use modgraph_resolver::resolution::Resolution;
use modgraph_resolver::resolver::{CancelToken, ResolveOptions, Resolver};
use modgraph_resolver::source::{ReleaseSource, Sources};
use modgraph_resolver::tree;

/// Where registry releases come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registry {
    /// A Forge-style HTTP API at this base URL.
    Url(String),
    /// A directory of `<module>.json` release pages.
    Directory(PathBuf),
}

impl Registry {
    pub fn source(&self) -> miette::Result<Arc<dyn ReleaseSource>> {
        Ok(match self {
            Registry::Url(url) => Arc::new(RegistryClient::new(build_client()?, url)),
            Registry::Directory(dir) => Arc::new(DirectorySource::new(dir)),
        })
    }
}

/// What an install or upgrade ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Planned(InstallPlan),
    /// The requested module is installed at its newest release.
    UpToDate,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub request: Request,
    pub outcome: Outcome,
}

impl Report {
    pub fn render(&self) -> String {
        match &self.outcome {
            Outcome::Planned(plan) => tree::render(plan, &self.request.name),
            Outcome::UpToDate => format!(
                "Module '{}' ({}) is already the latest version",
                self.request.name,
                self.request
                    .installed
                    .as_ref()
                    .map(|v| format!("v{v}"))
                    .unwrap_or_default()
            ),
        }
    }
}

/// Parse a `--version` argument.
pub(crate) fn requested_range(version: Option<&str>) -> miette::Result<Option<VersionRange>> {
    match version {
        Some(text) => Ok(Some(parse_range(text)?)),
        None => Ok(None),
    }
}

pub(crate) async fn resolve(
    sources: Sources,
    options: ResolveOptions,
    cancel: Option<CancelToken>,
    graph: Graph,
    request: &Request,
) -> miette::Result<Resolution> {
    let mut resolver = Resolver::new(sources, options);
    if let Some(token) = cancel {
        resolver = resolver.with_cancel(token);
    }
    let sp = modgraph_util::progress::spinner("Resolving dependencies...");
    let result = resolver.resolve(graph, request).await;
    sp.finish_and_clear();
    Ok(result?)
}
