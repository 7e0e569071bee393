//! Operation: upgrade an installed module in place.

use std::path::PathBuf;
use std::sync::Arc;

use modgraph_core::release::normalize_name;
use modgraph_registry::inventory;
use modgraph_resolver::error::{Action, Request, ResolveError};
use modgraph_resolver::graph::{ConstraintKind, Graph, GraphConstraint};
use modgraph_resolver::plan::{self, PlanOptions};
use modgraph_resolver::resolver::{CancelToken, ResolveOptions};
use modgraph_resolver::source::{InstalledSource, Sources};

use crate::materialize::Materializer;
use crate::{requested_range, resolve, Outcome, Registry, Report};

/// Options for `modgraph upgrade`.
#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    pub module: String,
    pub version: Option<String>,
    /// Upgrade only this module, ignoring other installed modules.
    pub force: bool,
    pub ignore_dependencies: bool,
    /// Overwrite a module with local modifications.
    pub ignore_changes: bool,
    pub modulepath: Vec<PathBuf>,
    pub registry: Registry,
}

pub async fn upgrade(
    opts: &UpgradeOptions,
    materializer: &dyn Materializer,
    cancel: Option<CancelToken>,
) -> miette::Result<Report> {
    let name = normalize_name(&opts.module);
    let range = requested_range(opts.version.as_deref())?;
    let inventory = inventory::scan(&opts.modulepath);

    let installed = match inventory.find(&name).as_slice() {
        [] => return Err(ResolveError::NotInstalled { module: name }.into()),
        [only] => (*only).clone(),
        several => {
            return Err(ResolveError::ModuleAppearsInMultiplePaths {
                action: Action::Upgrade,
                module: name.clone(),
                locations: several
                    .iter()
                    .map(|m| (m.release.version.clone(), m.path.clone()))
                    .collect(),
            }
            .into())
        }
    };
    let current = installed.release.version.clone();
    tracing::debug!("upgrading {name} from v{current} in {}", installed.modulepath.display());
    let request = Request::upgrade(&name, range, current.clone());

    let mut sources = Sources::new();
    if !opts.force {
        sources.push(Arc::new(InstalledSource::new(&inventory)));
    }
    sources.push(opts.registry.source()?);

    let mut graph = Graph::for_request(&request);
    if !opts.force {
        graph.add_constraint("installed", &name, ConstraintKind::NoDowngrade(current));
        graph.constrain_installed(&inventory, &name);
        graph.add_graph_constraint(GraphConstraint::DistinctInstallNames);
    }

    let options = ResolveOptions {
        force: opts.force,
        ignore_dependencies: opts.ignore_dependencies,
        ..ResolveOptions::default()
    };
    let resolution = resolve(sources, options, cancel, graph, &request).await?;

    let plan_opts = PlanOptions {
        request: request.clone(),
        force: opts.force,
        ignore_changes: opts.ignore_changes,
        target_dir: None,
        search_paths: opts.modulepath.clone(),
    };
    let plan = match plan::plan(&resolution, &inventory, &plan_opts) {
        Ok(plan) => plan,
        Err(ResolveError::AlreadyInstalledNoChange { latest: true, .. }) => {
            tracing::debug!("{name} is already the latest version");
            return Ok(Report {
                request,
                outcome: Outcome::UpToDate,
            });
        }
        Err(e) => return Err(e.into()),
    };

    materializer.apply(&plan.actions)?;
    Ok(Report {
        request,
        outcome: Outcome::Planned(plan),
    })
}
