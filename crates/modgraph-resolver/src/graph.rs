//! Release graph: an arena of release nodes plus the root that carries
//! per-module constraints and whole-solution constraints.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use modgraph_core::inventory::Inventory;
use modgraph_core::release::{install_dir_name, Release};
use modgraph_core::version::{Version, VersionRange};

use crate::error::Request;

/// Index of a release node inside a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bookkeeping shared by every node kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Module names this node needs.
    pub names: BTreeSet<String>,
    /// Attached nodes satisfying each name, in attach order.
    pub candidates: BTreeMap<String, Vec<NodeId>>,
    /// The chosen node per name once a solution is projected.
    pub children: BTreeMap<String, NodeId>,
}

/// Anything that depends on modules: the root graph or a release.
pub trait GraphNode {
    fn dependencies(&self) -> &Dependencies;
    fn dependencies_mut(&mut self) -> &mut Dependencies;

    /// Whether `release` is an acceptable candidate for this node.
    fn satisfies_dependency(&self, release: &Release) -> bool;

    fn add_dependency(&mut self, name: &str) {
        self.dependencies_mut().names.insert(name.to_string());
    }

    /// Record `id` as a candidate if it satisfies this node. Unknown names
    /// and unsatisfying releases leave the node untouched.
    fn attach(&mut self, id: NodeId, release: &Release) -> bool {
        if !self.dependencies().names.contains(&release.name) || !self.satisfies_dependency(release)
        {
            return false;
        }
        let list = self
            .dependencies_mut()
            .candidates
            .entry(release.name.clone())
            .or_default();
        if list.contains(&id) {
            return false;
        }
        list.push(id);
        true
    }

    /// Every needed name has at least one candidate.
    fn is_satisfied(&self) -> bool {
        let deps = self.dependencies();
        deps.names
            .iter()
            .all(|name| deps.candidates.get(name).is_some_and(|c| !c.is_empty()))
    }

    fn candidates(&self, name: &str) -> &[NodeId] {
        self.dependencies()
            .candidates
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn children(&self) -> &BTreeMap<String, NodeId> {
        &self.dependencies().children
    }
}

/// A release placed in the graph.
#[derive(Debug, Clone)]
pub struct ReleaseNode {
    pub release: Release,
    deps: Dependencies,
}

impl ReleaseNode {
    pub fn new(release: Release) -> Self {
        let mut node = Self {
            release,
            deps: Dependencies::default(),
        };
        let names: Vec<String> = node.release.requirements.keys().cloned().collect();
        for name in names {
            node.add_dependency(&name);
        }
        node
    }
}

impl GraphNode for ReleaseNode {
    fn dependencies(&self) -> &Dependencies {
        &self.deps
    }

    fn dependencies_mut(&mut self) -> &mut Dependencies {
        &mut self.deps
    }

    fn satisfies_dependency(&self, release: &Release) -> bool {
        self.release
            .requirements
            .get(&release.name)
            .is_some_and(|range| range.satisfies(&release.version))
    }
}

/// What a [`Constraint`] demands of a candidate release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    /// The version must lie in the range.
    Range(VersionRange),
    /// The version must not be older than the installed one.
    NoDowngrade(Version),
}

/// A named predicate over the releases of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub origin: String,
    pub name: String,
    pub kind: ConstraintKind,
}

/// Origin used for constraints the user typed on the command line.
pub const USER_ORIGIN: &str = "you";

impl Constraint {
    pub fn test(&self, release: &Release) -> bool {
        match &self.kind {
            ConstraintKind::Range(range) => range.satisfies(&release.version),
            ConstraintKind::NoDowngrade(installed) => release.version >= *installed,
        }
    }

    /// Human-readable form used in diagnostics.
    pub fn describe(&self) -> String {
        match &self.kind {
            ConstraintKind::Range(range) if self.origin == USER_ORIGIN => {
                format!("You specified '{}' ({range})", self.name)
            }
            ConstraintKind::Range(range) => {
                format!("'{}' requires '{}' ({range})", self.origin, self.name)
            }
            ConstraintKind::NoDowngrade(version) => {
                format!(
                    "'{}' (v{version}) is installed and may not be downgraded",
                    self.name
                )
            }
        }
    }
}

/// A predicate over a whole (partial) selection.
///
/// Checked against partial selections during search, so every variant
/// must stay violated once violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphConstraint {
    /// No two selected modules may install into the same directory name.
    DistinctInstallNames,
}

impl GraphConstraint {
    pub fn holds(&self, releases: &[&Release]) -> bool {
        match self {
            GraphConstraint::DistinctInstallNames => {
                let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
                releases.iter().all(|release| {
                    let dir = install_dir_name(&release.name);
                    match seen.insert(dir, release.name.as_str()) {
                        Some(previous) => previous == release.name,
                        None => true,
                    }
                })
            }
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            GraphConstraint::DistinctInstallNames => {
                "modules with different authors may not share an install directory"
            }
        }
    }
}

/// The root of resolution: what the user asked for, the constraints every
/// candidate must meet, and the arena of candidate releases.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    deps: Dependencies,
    constraints: BTreeMap<String, Vec<Constraint>>,
    graph_constraints: Vec<GraphConstraint>,
    nodes: Vec<ReleaseNode>,
}

impl Graph {
    /// A graph needing each requested module, constrained by its range.
    pub fn new(requested: BTreeMap<String, VersionRange>) -> Self {
        let mut graph = Self::default();
        for (name, range) in requested {
            graph.add_dependency(&name);
            graph.add_constraint(USER_ORIGIN, &name, ConstraintKind::Range(range));
        }
        graph
    }

    /// A graph for a single request, constrained by its effective range.
    pub fn for_request(request: &Request) -> Self {
        let mut requested = BTreeMap::new();
        requested.insert(request.name.clone(), request.effective_range());
        Self::new(requested)
    }

    /// Keep every installed module other than `requested` satisfied: it may
    /// only move up within its major version, and its own requirements
    /// constrain the modules it needs.
    pub fn constrain_installed(&mut self, inventory: &Inventory, requested: &str) {
        for module in &inventory.modules {
            if module.name() == requested {
                continue;
            }
            self.add_constraint(
                "installed",
                module.name(),
                ConstraintKind::Range(VersionRange::same_major_at_least(&module.release.version)),
            );
            let origin = format!("{} constraint", module.name());
            for (dep, range) in &module.release.requirements {
                self.add_constraint(&origin, dep, ConstraintKind::Range(range.clone()));
            }
        }
    }

    pub fn add_constraint(&mut self, origin: &str, name: &str, kind: ConstraintKind) {
        self.constraints
            .entry(name.to_string())
            .or_default()
            .push(Constraint {
                origin: origin.to_string(),
                name: name.to_string(),
                kind,
            });
    }

    pub fn constraints_for(&self, name: &str) -> &[Constraint] {
        self.constraints
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `release` meets every constraint registered for its name.
    /// Names without constraints accept anything.
    pub fn meets_constraints(&self, release: &Release) -> bool {
        self.constraints_for(&release.name)
            .iter()
            .all(|c| c.test(release))
    }

    pub fn add_graph_constraint(&mut self, constraint: GraphConstraint) {
        if !self.graph_constraints.contains(&constraint) {
            self.graph_constraints.push(constraint);
        }
    }

    pub fn graph_constraints(&self) -> &[GraphConstraint] {
        &self.graph_constraints
    }

    pub fn satisfies_graph(&self, selection: &[NodeId]) -> bool {
        let releases: Vec<&Release> = selection.iter().map(|id| &self.node(*id).release).collect();
        self.graph_constraints.iter().all(|c| c.holds(&releases))
    }

    /// The modules the user asked for.
    pub fn requested(&self) -> &BTreeSet<String> {
        &self.deps.names
    }

    /// Place a release in the arena and link it both ways: to the root and
    /// every node needing its name, and to every existing release it needs.
    pub fn insert(&mut self, release: Release) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ReleaseNode::new(release.clone()));

        self.attach(id, &release);
        for node in &mut self.nodes {
            node.attach(id, &release);
        }

        let wanted: Vec<String> = self.nodes[id.0].deps.names.iter().cloned().collect();
        for other in 0..self.nodes.len() {
            if other == id.0 || !wanted.contains(&self.nodes[other].release.name) {
                continue;
            }
            let candidate = self.nodes[other].release.clone();
            self.nodes[id.0].attach(NodeId(other), &candidate);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &ReleaseNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ReleaseNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every release of `name` in the arena, in insertion order.
    pub fn releases_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Release> + 'a {
        self.nodes
            .iter()
            .map(|n| &n.release)
            .filter(move |r| r.name == name)
    }

    /// Every name any node in the graph needs, the root's included.
    pub fn wanted_names(&self) -> BTreeSet<String> {
        let mut names = self.deps.names.clone();
        for node in &self.nodes {
            names.extend(node.deps.names.iter().cloned());
        }
        names
    }

    /// Project a one-release-per-name `solution` onto the root and every
    /// node reachable from it.
    pub fn populate_children(&mut self, solution: &[NodeId]) {
        let chosen: Vec<Release> = solution
            .iter()
            .map(|id| self.nodes[id.0].release.clone())
            .collect();
        let pick = |deps: &Dependencies, nodes: &[ReleaseNode]| -> BTreeMap<String, NodeId> {
            let mut children = BTreeMap::new();
            for name in &deps.names {
                let found = deps.candidates.get(name).and_then(|cands| {
                    cands
                        .iter()
                        .copied()
                        .find(|c| chosen.contains(&nodes[c.0].release))
                });
                if let Some(child) = found {
                    children.insert(name.clone(), child);
                }
            }
            children
        };

        let root_children = pick(&self.deps, &self.nodes);
        let mut stack: Vec<NodeId> = root_children.values().copied().collect();
        self.deps.children = root_children;

        let mut visited: HashSet<NodeId> = HashSet::new();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let children = pick(&self.nodes[id.0].deps, &self.nodes);
            stack.extend(children.values().copied());
            self.nodes[id.0].deps.children = children;
        }
    }
}

impl GraphNode for Graph {
    fn dependencies(&self) -> &Dependencies {
        &self.deps
    }

    fn dependencies_mut(&mut self) -> &mut Dependencies {
        &mut self.deps
    }

    fn satisfies_dependency(&self, release: &Release) -> bool {
        self.constraints.contains_key(&release.name) && self.meets_constraints(release)
    }
}
