//! Installation planning: turn a resolution into install actions, one per
//! module, given what is already on the search path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use modgraph_core::inventory::{InstalledModule, Inventory};
use modgraph_core::release::Release;
use modgraph_core::version::Version;

use crate::error::{Action, Occupant, Request, ResolveError};
use crate::graph::NodeId;
use crate::install_dir;
use crate::resolution::Resolution;

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub request: Request,
    pub force: bool,
    pub ignore_changes: bool,
    /// Explicit install directory; also narrows which installation of a
    /// module is considered.
    pub target_dir: Option<PathBuf>,
    pub search_paths: Vec<PathBuf>,
}

impl PlanOptions {
    pub fn action(&self) -> Action {
        self.request.action
    }

    /// Where new modules go: the explicit target or the first search path.
    pub fn install_root(&self) -> Option<&Path> {
        self.target_dir
            .as_deref()
            .or_else(|| self.search_paths.first().map(PathBuf::as_path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Install,
    Upgrade,
    ForceReinstall,
    Noop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallAction {
    pub module: Release,
    /// The search-path directory the module lives in afterwards.
    pub target_path: PathBuf,
    pub kind: ActionKind,
    pub previous_version: Option<Version>,
}

impl InstallAction {
    /// The module's own directory.
    pub fn module_dir(&self) -> PathBuf {
        self.target_path.join(self.module.install_dir_name())
    }

    pub fn is_change(&self) -> bool {
        self.kind != ActionKind::Noop
    }
}

/// A node of the display tree, pointing into [`InstallPlan::actions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub action: usize,
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    /// Parents before the modules they require.
    pub actions: Vec<InstallAction>,
    pub tree: Vec<TreeNode>,
}

impl InstallPlan {
    pub fn changes(&self) -> impl Iterator<Item = &InstallAction> {
        self.actions.iter().filter(|a| a.is_change())
    }

    pub fn is_noop(&self) -> bool {
        self.changes().next().is_none()
    }

    pub fn action_for(&self, name: &str) -> Option<&InstallAction> {
        self.actions.iter().find(|a| a.module.name == name)
    }
}

/// Install-mode shortcut for a requested module that is already installed.
///
/// Returns a single no-op plan when the installed version is in the
/// requested range, `None` when resolution should go ahead.
pub fn check_installed_request(
    inventory: &Inventory,
    options: &PlanOptions,
) -> Result<Option<InstallPlan>, ResolveError> {
    if options.force {
        return Ok(None);
    }
    let installs = inventory.find(&options.request.name);
    let installed = match narrow(&installs, options.target_dir.as_deref()) {
        Some(module) => module,
        None => match installs.first() {
            Some(module) => *module,
            None => return Ok(None),
        },
    };

    let version = &installed.release.version;
    if !options.request.effective_range().satisfies(version) {
        return Err(ResolveError::AlreadyInstalledNoChange {
            request: options.request.clone(),
            installed: version.clone(),
            latest: false,
        });
    }

    tracing::debug!("{} (v{version}) is already installed", installed.name());
    Ok(Some(InstallPlan {
        actions: vec![InstallAction {
            module: installed.release.clone(),
            target_path: installed.modulepath.clone(),
            kind: ActionKind::Noop,
            previous_version: Some(version.clone()),
        }],
        tree: vec![TreeNode {
            action: 0,
            children: Vec::new(),
        }],
    }))
}

/// The installation inside `target`, when `target` is given and holds one.
fn narrow<'a>(installs: &[&'a InstalledModule], target: Option<&Path>) -> Option<&'a InstalledModule> {
    let target = target?;
    installs.iter().copied().find(|m| m.modulepath == target)
}

pub fn plan(
    resolution: &Resolution,
    inventory: &Inventory,
    options: &PlanOptions,
) -> Result<InstallPlan, ResolveError> {
    let request = &options.request;

    if request.action == Action::Upgrade && !options.force {
        if let (Some(id), Some(installed)) = (resolution.find(&request.name), &request.installed) {
            if resolution.release(id).version == *installed {
                let range = request.effective_range();
                let latest = !resolution
                    .graph()
                    .releases_of(&request.name)
                    .any(|r| r.version > *installed && range.satisfies(&r.version));
                return Err(ResolveError::AlreadyInstalledNoChange {
                    request: request.clone(),
                    installed: installed.clone(),
                    latest,
                });
            }
        }
    }

    let mut actions = Vec::new();
    let mut index: BTreeMap<NodeId, usize> = BTreeMap::new();
    for id in resolution.breadth_first() {
        let action = decide(resolution.release(id), inventory, options)?;
        tracing::debug!("{:?} {} into {}", action.kind, action.module, action.target_path.display());
        index.insert(id, actions.len());
        actions.push(action);
    }

    let tree = resolution
        .roots()
        .into_iter()
        .filter_map(|id| display_node(resolution, &actions, &index, id, &request.name))
        .collect();

    Ok(InstallPlan { actions, tree })
}

fn decide(
    release: &Release,
    inventory: &Inventory,
    options: &PlanOptions,
) -> Result<InstallAction, ResolveError> {
    let action = options.action();
    let installs = inventory.find(&release.name);

    let installed = match installs.as_slice() {
        [] => None,
        [only] => Some(*only),
        several => match narrow(several, options.target_dir.as_deref()) {
            Some(module) => Some(module),
            None => {
                return Err(ResolveError::ModuleAppearsInMultiplePaths {
                    action,
                    module: release.name.clone(),
                    locations: several
                        .iter()
                        .map(|m| (m.release.version.clone(), m.path.clone()))
                        .collect(),
                })
            }
        },
    };

    let Some(installed) = installed else {
        return fresh_install(release, inventory, options);
    };

    let previous = installed.release.version.clone();
    let kind = if previous != release.version {
        ActionKind::Upgrade
    } else if options.force {
        ActionKind::ForceReinstall
    } else {
        ActionKind::Noop
    };

    if kind != ActionKind::Noop && installed.has_local_changes && !options.force && !options.ignore_changes {
        return Err(ResolveError::LocalChangesDetected {
            action,
            module: release.name.clone(),
            version: previous,
            path: installed.path.clone(),
        });
    }

    Ok(InstallAction {
        module: release.clone(),
        target_path: installed.modulepath.clone(),
        kind,
        previous_version: Some(previous),
    })
}

fn fresh_install(
    release: &Release,
    inventory: &Inventory,
    options: &PlanOptions,
) -> Result<InstallAction, ResolveError> {
    let action = options.action();
    let root = options
        .install_root()
        .ok_or_else(|| ResolveError::PathError {
            action,
            path: PathBuf::new(),
            kind: crate::error::PathErrorKind::NotADirectory,
        })?
        .to_path_buf();

    install_dir::check(&root).map_err(|kind| ResolveError::PathError {
        action,
        path: root.clone(),
        kind,
    })?;

    if !options.force {
        let dir_name = release.install_dir_name();
        let occupant = match inventory.occupant(&root, dir_name) {
            Some(module) => Some(Occupant::Module {
                name: module.release.name.clone(),
                version: module.release.version.clone(),
            }),
            None => inventory.unmanaged_at(&root, dir_name).map(|_| Occupant::Unmanaged),
        };
        if let Some(occupant) = occupant {
            return Err(ResolveError::InstallConflict {
                request: options.request.clone(),
                module: release.name.clone(),
                path: root.join(dir_name),
                occupant,
            });
        }
    }

    Ok(InstallAction {
        module: release.clone(),
        target_path: root,
        kind: ActionKind::Install,
        previous_version: None,
    })
}

/// Unchanged subtrees are dropped, the requested module always stays.
fn display_node(
    resolution: &Resolution,
    actions: &[InstallAction],
    index: &BTreeMap<NodeId, usize>,
    id: NodeId,
    requested: &str,
) -> Option<TreeNode> {
    let action = *index.get(&id)?;
    let children: Vec<TreeNode> = resolution
        .children_of(id)
        .into_iter()
        .filter_map(|child| display_node(resolution, actions, index, child, requested))
        .collect();

    let keep = actions[action].is_change() || !children.is_empty() || actions[action].module.name == requested;
    keep.then_some(TreeNode { action, children })
}
