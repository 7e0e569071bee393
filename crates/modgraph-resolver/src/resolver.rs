//! Module resolution.
//!
//! Resolution runs in two phases. Expansion fetches releases round by round
//! until every module any release needs is in the graph. Search then walks
//! the graph depth-first for one release per module that meets the root
//! constraints, every chosen release's requirements and the whole-graph
//! constraints.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use modgraph_core::release::Release;
use modgraph_core::version::VersionRange;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use crate::conflict::{Conflict, ConflictReport};
use crate::error::{ChainLink, Request, ResolveError};
use crate::graph::{ConstraintKind, Graph, GraphNode, NodeId, USER_ORIGIN};
use crate::resolution::Resolution;
use crate::source::{Fetched, SourceError, Sources};

/// Maximum number of concurrent release fetches.
pub const MAX_CONCURRENT_FETCHES: usize = 8;
/// Candidate evaluations allowed before the search gives up.
pub const MAX_SEARCH_STEPS: usize = 100_000;
const CANCEL_CHECK_INTERVAL: usize = 256;

/// Owner side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once cancellation is requested. Never completes if the
    /// handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Resolve only the requested modules, ignoring their requirements.
    pub force: bool,
    pub ignore_dependencies: bool,
    /// Try the installed release of a dependency before any other.
    pub prefer_installed: bool,
    pub max_concurrent_fetches: usize,
    pub max_search_steps: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            force: false,
            ignore_dependencies: false,
            prefer_installed: true,
            max_concurrent_fetches: MAX_CONCURRENT_FETCHES,
            max_search_steps: MAX_SEARCH_STEPS,
        }
    }
}

/// How a module entered the search.
#[derive(Debug, Clone)]
struct Introduction {
    /// The chosen release requiring it; `None` for requested modules.
    via: Option<NodeId>,
    range: VersionRange,
}

/// One state of the search. Children are derived by cloning.
#[derive(Debug, Clone, Default)]
struct Partial {
    assignment: BTreeMap<String, NodeId>,
    pending: BTreeMap<String, Vec<NodeId>>,
    introduced_by: BTreeMap<String, Introduction>,
}

pub struct Resolver {
    sources: Sources,
    options: ResolveOptions,
    cancel: Option<CancelToken>,
}

impl Resolver {
    pub fn new(sources: Sources, options: ResolveOptions) -> Self {
        Self {
            sources,
            options,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Expand `graph` from the sources and search it for a solution.
    pub async fn resolve(&self, graph: Graph, request: &Request) -> Result<Resolution, ResolveError> {
        tracing::debug!(
            "resolving {} ({}) force={} ignore_dependencies={}",
            request.name,
            request.target_label(),
            self.options.force,
            self.options.ignore_dependencies
        );
        let (graph, failures) = self.expand(graph).await?;
        tracing::debug!("graph holds {} release(s)", graph.len());
        self.search(graph, request, &failures)
    }

    async fn expand(
        &self,
        mut graph: Graph,
    ) -> Result<(Graph, BTreeMap<String, SourceError>), ResolveError> {
        let strip = self.options.force || self.options.ignore_dependencies;
        let requested = graph.requested().clone();
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_fetches.max(1)));
        let mut fetched: BTreeSet<String> = BTreeSet::new();
        let mut failures: BTreeMap<String, SourceError> = BTreeMap::new();

        loop {
            if self.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }
            let wanted: Vec<String> = graph
                .wanted_names()
                .into_iter()
                .filter(|name| !fetched.contains(name))
                .collect();
            if wanted.is_empty() {
                break;
            }
            tracing::debug!("fetching {} module(s): {}", wanted.len(), wanted.join(", "));

            let mut join_set = JoinSet::new();
            for name in &wanted {
                let sources = self.sources.clone();
                let sem = semaphore.clone();
                let name = name.clone();
                join_set.spawn(async move {
                    let _permit = sem.acquire().await;
                    let result = sources.fetch(&name).await;
                    (name, result)
                });
            }

            let mut results: BTreeMap<String, Fetched> = BTreeMap::new();
            loop {
                let joined = match &self.cancel {
                    Some(token) => tokio::select! {
                        _ = token.cancelled() => {
                            join_set.abort_all();
                            return Err(ResolveError::Cancelled);
                        }
                        joined = join_set.join_next() => joined,
                    },
                    None => join_set.join_next().await,
                };
                match joined {
                    Some(Ok((name, result))) => {
                        results.insert(name, result);
                    }
                    Some(Err(e)) => tracing::warn!("release fetch task failed: {e}"),
                    None => break,
                }
            }

            // Inserted in name order so node ids do not depend on fetch timing.
            for name in wanted {
                fetched.insert(name.clone());
                match results.remove(&name) {
                    Some(Fetched { releases, failure: error }) => {
                        if releases.is_empty() {
                            tracing::debug!("no releases of {name}");
                        }
                        if let Some(e) = error {
                            tracing::warn!("{e}");
                            failures.insert(name.clone(), e);
                        }
                        for release in releases {
                            let release = if strip && requested.contains(&release.name) {
                                release.without_requirements()
                            } else {
                                release
                            };
                            graph.insert(release);
                        }
                    }
                    None => {
                        let error = SourceError::Network {
                            module: name.clone(),
                            message: "fetch did not complete".to_string(),
                        };
                        failures.insert(name, error);
                    }
                }
            }
        }

        Ok((graph, failures))
    }

    fn search(
        &self,
        graph: Graph,
        request: &Request,
        failures: &BTreeMap<String, SourceError>,
    ) -> Result<Resolution, ResolveError> {
        let mut report = ConflictReport::new();
        let mut stack = vec![seed(&graph)];
        let mut steps = 0usize;

        while let Some(partial) = stack.pop() {
            if partial.pending.is_empty() {
                tracing::debug!(
                    "resolved {} module(s) after {steps} step(s)",
                    partial.assignment.len()
                );
                let selection = partial.assignment.into_values().collect();
                return Ok(Resolution::new(graph, selection));
            }
            let Some((name, open)) = partial.pending.iter().next() else {
                continue;
            };

            let candidates = self.order_candidates(&graph, name, open);
            if candidates.is_empty() {
                report.add(conflict(&graph, &partial, name, None, None));
                continue;
            }

            let mut children = Vec::new();
            for id in candidates {
                steps += 1;
                if steps > self.options.max_search_steps {
                    tracing::warn!("search gave up after {} step(s)", self.options.max_search_steps);
                    return Err(failure(&graph, request, report, failures));
                }
                if steps % CANCEL_CHECK_INTERVAL == 0 && self.is_cancelled() {
                    return Err(ResolveError::Cancelled);
                }
                match try_assign(&graph, &partial, name, id) {
                    Ok(next) => children.push(next),
                    Err(conflict) => report.add(conflict),
                }
            }
            stack.extend(children.into_iter().rev());
        }

        tracing::debug!("search exhausted with {} conflict(s)", report.len());
        Err(failure(&graph, request, report, failures))
    }

    /// Installed first (for dependencies only), then stable releases
    /// highest first, then prereleases highest first.
    fn order_candidates(&self, graph: &Graph, name: &str, open: &[NodeId]) -> Vec<NodeId> {
        let prefer_installed = self.options.prefer_installed && !graph.requested().contains(name);
        let key = |release: &Release| (prefer_installed && release.is_installed(), !release.is_prerelease());
        let mut ordered = open.to_vec();
        ordered.sort_by(|a, b| {
            let (a, b) = (&graph.node(*a).release, &graph.node(*b).release);
            key(b).cmp(&key(a)).then_with(|| b.version.cmp(&a.version))
        });
        ordered
    }
}

fn seed(graph: &Graph) -> Partial {
    let mut partial = Partial::default();
    for name in graph.requested() {
        partial
            .pending
            .insert(name.clone(), graph.candidates(name).to_vec());
        partial.introduced_by.insert(
            name.clone(),
            Introduction {
                via: None,
                range: user_range(graph, name),
            },
        );
    }
    partial
}

fn user_range(graph: &Graph, name: &str) -> VersionRange {
    graph
        .constraints_for(name)
        .iter()
        .find_map(|c| match &c.kind {
            ConstraintKind::Range(range) if c.origin == USER_ORIGIN => Some(range.clone()),
            _ => None,
        })
        .unwrap_or_else(VersionRange::any)
}

fn try_assign(graph: &Graph, partial: &Partial, name: &str, id: NodeId) -> Result<Partial, Conflict> {
    let node = graph.node(id);
    let release = &node.release;

    if !graph.meets_constraints(release) {
        return Err(conflict(graph, partial, name, Some(id), None));
    }
    if let Some(dep) = node
        .dependencies()
        .names
        .iter()
        .find(|dep| node.candidates(dep).is_empty())
    {
        return Err(conflict(graph, partial, name, Some(id), Some(dep)));
    }

    let mut next = partial.clone();
    next.pending.remove(name);
    next.assignment.insert(name.to_string(), id);

    for dep in &node.dependencies().names {
        let allowed = node.candidates(dep);
        if let Some(chosen) = next.assignment.get(dep) {
            if !allowed.contains(chosen) {
                return Err(conflict(graph, partial, name, Some(id), Some(dep)));
            }
        } else if let Some(open) = next.pending.get_mut(dep) {
            open.retain(|c| allowed.contains(c));
            if open.is_empty() {
                return Err(conflict(graph, partial, name, Some(id), Some(dep)));
            }
        } else {
            let fresh: Vec<NodeId> = allowed
                .iter()
                .copied()
                .filter(|c| graph.meets_constraints(&graph.node(*c).release))
                .collect();
            if fresh.is_empty() {
                return Err(conflict(graph, partial, name, Some(id), Some(dep)));
            }
            next.pending.insert(dep.clone(), fresh);
            next.introduced_by.insert(
                dep.clone(),
                Introduction {
                    via: Some(id),
                    range: release
                        .requirements
                        .get(dep)
                        .cloned()
                        .unwrap_or_else(VersionRange::any),
                },
            );
        }
    }

    let selection: Vec<NodeId> = next.assignment.values().copied().collect();
    if !graph.satisfies_graph(&selection) {
        return Err(conflict(graph, partial, name, Some(id), None));
    }
    Ok(next)
}

/// Describe why `candidate` for `name` was rejected: either it failed on
/// its own (`dependency` is `None`) or one of its requirements did.
fn conflict(
    graph: &Graph,
    partial: &Partial,
    name: &str,
    candidate: Option<NodeId>,
    dependency: Option<&str>,
) -> Conflict {
    let module = dependency.unwrap_or(name);
    let mut chain = introduction_chain(graph, partial, name);
    if let (Some(id), Some(dep)) = (candidate, dependency) {
        if let Some(range) = graph.node(id).release.requirements.get(dep) {
            chain.push(ChainLink {
                name: dep.to_string(),
                range: range.clone(),
            });
        }
    }

    let mut constraints: Vec<String> =
        graph.constraints_for(module).iter().map(|c| c.describe()).collect();
    let requirers = partial.assignment.values().copied().chain(candidate);
    for id in requirers {
        let release = &graph.node(id).release;
        if let Some(range) = release.requirements.get(module) {
            let line = format!(
                "'{}' (v{}) requires '{module}' ({range})",
                release.name, release.version
            );
            if !constraints.contains(&line) {
                constraints.push(line);
            }
        }
    }

    Conflict {
        module: module.to_string(),
        depth: partial.assignment.len(),
        chain,
        constraints,
    }
}

/// Requirement path from the user's request down to `name`.
fn introduction_chain(graph: &Graph, partial: &Partial, name: &str) -> Vec<ChainLink> {
    let mut links = Vec::new();
    let mut current = name.to_string();
    while let Some(intro) = partial.introduced_by.get(&current) {
        links.push(ChainLink {
            name: current.clone(),
            range: intro.range.clone(),
        });
        match intro.via {
            Some(via) if links.len() <= partial.introduced_by.len() => {
                current = graph.node(via).release.name.clone();
            }
            _ => break,
        }
    }
    links.reverse();
    links
}

fn failure(
    graph: &Graph,
    request: &Request,
    report: ConflictReport,
    failures: &BTreeMap<String, SourceError>,
) -> ResolveError {
    let Some(conflict) = report.into_deepest() else {
        return ResolveError::UnsatisfiableConstraints {
            request: request.clone(),
            module: request.name.clone(),
            chain: vec![ChainLink {
                name: request.name.clone(),
                range: request.effective_range(),
            }],
            constraints: Vec::new(),
        };
    };

    if graph.releases_of(&conflict.module).next().is_none() {
        return match failures.get(&conflict.module) {
            Some(error) => ResolveError::SourceFailed {
                module: conflict.module,
                message: error.to_string(),
            },
            None => ResolveError::NoCandidateReleases {
                request: request.clone(),
                module: conflict.module,
            },
        };
    }

    if conflict.is_cycle() {
        ResolveError::InvalidDependencyCycle {
            request: request.clone(),
            module: conflict.module,
            chain: conflict.chain,
        }
    } else {
        ResolveError::UnsatisfiableConstraints {
            request: request.clone(),
            module: conflict.module,
            chain: conflict.chain,
            constraints: conflict.constraints,
        }
    }
}
