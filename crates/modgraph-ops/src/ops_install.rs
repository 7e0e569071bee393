//! Operation: install a module and whatever it requires.

use std::path::PathBuf;
use std::sync::Arc;

use modgraph_core::release::normalize_name;
use modgraph_registry::inventory;
use modgraph_resolver::error::Request;
use modgraph_resolver::graph::{Graph, GraphConstraint};
use modgraph_resolver::plan::{self, PlanOptions};
use modgraph_resolver::resolver::{CancelToken, ResolveOptions};
use modgraph_resolver::source::{InstalledSource, Sources};

use crate::materialize::Materializer;
use crate::{requested_range, resolve, Outcome, Registry, Report};

/// Options for `modgraph install`.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub module: String,
    /// Version range text from `--version`.
    pub version: Option<String>,
    /// Install only the requested module, ignoring what is installed.
    pub force: bool,
    pub ignore_dependencies: bool,
    pub target_dir: Option<PathBuf>,
    pub modulepath: Vec<PathBuf>,
    pub registry: Registry,
}

impl InstallOptions {
    /// The target directory (if any) followed by the module path.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.target_dir.iter().cloned().collect();
        for path in &self.modulepath {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }
}

pub async fn install(
    opts: &InstallOptions,
    materializer: &dyn Materializer,
    cancel: Option<CancelToken>,
) -> miette::Result<Report> {
    let name = normalize_name(&opts.module);
    let request = Request::install(&name, requested_range(opts.version.as_deref())?);
    let search_paths = opts.search_paths();
    let inventory = inventory::scan(&search_paths);

    let plan_opts = PlanOptions {
        request: request.clone(),
        force: opts.force,
        ignore_changes: false,
        target_dir: opts.target_dir.clone(),
        search_paths,
    };

    if let Some(plan) = plan::check_installed_request(&inventory, &plan_opts)? {
        return Ok(Report {
            request,
            outcome: Outcome::Planned(plan),
        });
    }

    let mut sources = Sources::new();
    if !opts.force {
        sources.push(Arc::new(InstalledSource::new(&inventory)));
    }
    sources.push(opts.registry.source()?);

    let mut graph = Graph::for_request(&request);
    if !opts.force {
        graph.constrain_installed(&inventory, &name);
        graph.add_graph_constraint(GraphConstraint::DistinctInstallNames);
    }

    let options = ResolveOptions {
        force: opts.force,
        ignore_dependencies: opts.ignore_dependencies,
        ..ResolveOptions::default()
    };
    let resolution = resolve(sources, options, cancel, graph, &request).await?;
    let plan = plan::plan(&resolution, &inventory, &plan_opts)?;

    materializer.apply(&plan.actions)?;
    Ok(Report {
        request,
        outcome: Outcome::Planned(plan),
    })
}
