//! Resolution and planning failures.
//!
//! Every variant renders a one-line form (its `Display`) and a multi-line
//! diagnostic built from the data it carries.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use modgraph_core::version::{Version, VersionRange};
use thiserror::Error;

/// The command being carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Upgrade,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Install => "install",
            Action::Upgrade => "upgrade",
        })
    }
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub action: Action,
    pub name: String,
    /// `None` when no `--version` was given.
    pub range: Option<VersionRange>,
    /// Installed version of the requested module, for upgrades.
    pub installed: Option<Version>,
}

impl Request {
    pub fn install(name: &str, range: Option<VersionRange>) -> Self {
        Self {
            action: Action::Install,
            name: name.to_string(),
            range,
            installed: None,
        }
    }

    pub fn upgrade(name: &str, range: Option<VersionRange>, installed: Version) -> Self {
        Self {
            action: Action::Upgrade,
            name: name.to_string(),
            range,
            installed: Some(installed),
        }
    }

    /// The range to resolve the request against.
    pub fn effective_range(&self) -> VersionRange {
        self.range.clone().unwrap_or_else(VersionRange::any)
    }

    /// `v1.2.3`, the range text, or `latest`.
    pub fn target_label(&self) -> String {
        match &self.range {
            Some(range) => range_label(range),
            None => "latest".to_string(),
        }
    }

    /// `v1.2.3` for installs, `v1.0.0 -> v1.2.3` for upgrades.
    pub fn versions_label(&self) -> String {
        match &self.installed {
            Some(installed) => format!("v{installed} -> {}", self.target_label()),
            None => self.target_label(),
        }
    }
}

/// `v1.2.3` for ranges pinning one version, otherwise the range text.
pub fn range_label(range: &VersionRange) -> String {
    match range.is_exact() {
        Some(version) => format!("v{version}"),
        None => range.to_string(),
    }
}

/// One step of the requirement path leading to a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    pub name: String,
    pub range: VersionRange,
}

impl fmt::Display for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({})", self.name, range_label(&self.range))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathErrorKind {
    NotADirectory,
    PermissionDenied,
}

impl fmt::Display for PathErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PathErrorKind::NotADirectory => "Path exists but is not a directory",
            PathErrorKind::PermissionDenied => "Permission is denied",
        })
    }
}

/// Who already occupies an install directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occupant {
    Module { name: String, version: Version },
    Unmanaged,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ResolveError {
    #[error(
        "Could not {} '{}' ({}); no version satisfies all dependencies",
        .request.action, .request.name, .request.versions_label()
    )]
    #[diagnostic(code(modgraph::unsatisfiable))]
    UnsatisfiableConstraints {
        request: Request,
        module: String,
        chain: Vec<ChainLink>,
        constraints: Vec<String>,
    },

    #[error(
        "'{}' ({}) requested; Invalid dependency cycle",
        .request.name, .request.versions_label()
    )]
    #[diagnostic(code(modgraph::dependency_cycle))]
    InvalidDependencyCycle {
        request: Request,
        module: String,
        chain: Vec<ChainLink>,
    },

    #[error("{}", already_installed_oneline(.request, .installed, .latest))]
    #[diagnostic(code(modgraph::already_installed))]
    AlreadyInstalledNoChange {
        request: Request,
        installed: Version,
        /// No release newer than the installed one exists at all.
        latest: bool,
    },

    #[error("Could not {action} '{module}'; module has had changes made locally")]
    #[diagnostic(code(modgraph::local_changes))]
    LocalChangesDetected {
        action: Action,
        module: String,
        version: Version,
        path: PathBuf,
    },

    #[error("Could not {action} '{module}'; module appears in multiple places in the module path")]
    #[diagnostic(code(modgraph::multiple_installs))]
    ModuleAppearsInMultiplePaths {
        action: Action,
        module: String,
        locations: Vec<(Version, PathBuf)>,
    },

    #[error("Could not {action} into '{}'; {kind}", .path.display())]
    #[diagnostic(code(modgraph::path))]
    PathError {
        action: Action,
        path: PathBuf,
        kind: PathErrorKind,
    },

    #[error(
        "Could not {} '{}' ({}); no releases of '{}' are available",
        .request.action, .request.name, .request.versions_label(), .module
    )]
    #[diagnostic(code(modgraph::no_releases))]
    NoCandidateReleases { request: Request, module: String },

    #[error("Could not upgrade '{module}'; module is not installed")]
    #[diagnostic(code(modgraph::not_installed))]
    NotInstalled { module: String },

    #[error(
        "Could not {} '{}' ({}); installation conflicts with {}",
        .request.action, .module, .request.versions_label(), .path.display()
    )]
    #[diagnostic(code(modgraph::install_conflict))]
    InstallConflict {
        request: Request,
        module: String,
        path: PathBuf,
        occupant: Occupant,
    },

    #[error("Could not fetch releases of '{module}': {message}")]
    #[diagnostic(code(modgraph::source))]
    SourceFailed { module: String, message: String },

    #[error("resolution cancelled")]
    #[diagnostic(code(modgraph::cancelled))]
    Cancelled,
}

fn already_installed_oneline(request: &Request, installed: &Version, latest: &bool) -> String {
    match request.action {
        Action::Install => format!(
            "'{}' ({}) requested; '{}' (v{installed}) already installed",
            request.name,
            request.target_label(),
            request.name
        ),
        Action::Upgrade if *latest => format!(
            "Could not upgrade '{}'; module is already the latest version",
            request.name
        ),
        Action::Upgrade => format!(
            "Could not upgrade '{}'; module is already the best fit for the installed modules",
            request.name
        ),
    }
}

fn push_chain(lines: &mut Vec<String>, chain: &[ChainLink]) {
    for (i, link) in chain.iter().enumerate() {
        let lead = if i == 0 {
            "    You specified".to_string()
        } else {
            "    which depends on".to_string()
        };
        let tail = if i + 1 == chain.len() { "" } else { "," };
        lines.push(format!("{lead} {link}{tail}"));
    }
}

impl ResolveError {
    pub fn oneline(&self) -> String {
        self.to_string()
    }

    pub fn multiline(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        match self {
            ResolveError::UnsatisfiableConstraints {
                request,
                module,
                chain,
                constraints,
            } => {
                lines.push(heading(request));
                lines.push(format!("  No version of '{module}' will satisfy dependencies"));
                push_chain(&mut lines, chain);
                if !constraints.is_empty() {
                    lines.push(format!("    Constraints on '{module}':"));
                    lines.extend(constraints.iter().map(|c| format!("      {c}")));
                }
                lines.push(force_hint(request.action));
            }
            ResolveError::InvalidDependencyCycle {
                request,
                module,
                chain,
            } => {
                lines.push(heading(request));
                lines.push(format!(
                    "  Invalid dependency cycle: '{module}' requires a version of itself that cannot be installed"
                ));
                push_chain(&mut lines, chain);
                lines.push(force_hint(request.action));
            }
            ResolveError::AlreadyInstalledNoChange {
                request,
                installed,
                latest,
            } => {
                lines.push(heading(request));
                match request.action {
                    Action::Install => {
                        lines.push(format!(
                            "  Module '{}' (v{installed}) is already installed",
                            request.name
                        ));
                        lines.push(
                            "    Use `modgraph upgrade` to install a different version".to_string(),
                        );
                        lines.push(
                            "    Use `modgraph install --force` to re-install only this module"
                                .to_string(),
                        );
                    }
                    Action::Upgrade if *latest => {
                        lines.push(format!(
                            "  The installed version (v{installed}) is already the latest version"
                        ));
                    }
                    Action::Upgrade => {
                        lines.push(format!(
                            "  The installed version (v{installed}) is already the best fit for the current dependencies"
                        ));
                        lines.push(
                            "    Use `modgraph upgrade --force` to upgrade only this module"
                                .to_string(),
                        );
                    }
                }
            }
            ResolveError::LocalChangesDetected {
                action,
                module,
                version,
                path,
            } => {
                lines.push(format!("Could not {action} module '{module}' (v{version})"));
                lines.push(format!(
                    "  Installed module has had changes made locally in {}",
                    path.display()
                ));
                lines.push(match action {
                    Action::Install => {
                        "    Use `modgraph install --force` to overwrite the local changes".to_string()
                    }
                    Action::Upgrade => {
                        "    Use `modgraph upgrade --ignore-changes` to upgrade this module anyway"
                            .to_string()
                    }
                });
            }
            ResolveError::ModuleAppearsInMultiplePaths {
                action,
                module,
                locations,
            } => {
                lines.push(format!("Could not {action} module '{module}'"));
                lines.push(format!(
                    "  Module '{module}' appears multiple places in the module path"
                ));
                for (version, path) in locations {
                    lines.push(format!(
                        "    '{module}' (v{version}) was found in {}",
                        path.display()
                    ));
                }
                lines.push(
                    "    Use the `--modulepath` option to limit the search to specific directories"
                        .to_string(),
                );
            }
            ResolveError::PathError { action, path, kind } => {
                lines.push(format!("Could not {action} into '{}'", path.display()));
                lines.push(format!("  {kind}"));
                lines.push(match kind {
                    PathErrorKind::NotADirectory => {
                        "    Use `--target-dir` to choose another install directory".to_string()
                    }
                    PathErrorKind::PermissionDenied => {
                        "    Check the permissions of the install directory".to_string()
                    }
                });
            }
            ResolveError::NoCandidateReleases { request, module } => {
                lines.push(heading(request));
                lines.push(format!(
                    "  No releases of '{module}' are available from the configured sources"
                ));
            }
            ResolveError::NotInstalled { module } => {
                lines.push(format!("Could not upgrade module '{module}'"));
                lines.push(format!("  Module '{module}' is not installed"));
                lines.push("    Use `modgraph install` to install this module".to_string());
            }
            ResolveError::InstallConflict {
                request,
                module,
                path,
                occupant,
            } => {
                lines.push(heading(request));
                lines.push(format!("  Installation would overwrite {}", path.display()));
                lines.push(match occupant {
                    Occupant::Module { name, version } => format!(
                        "    Currently, '{name}' (v{version}) is installed to that directory"
                    ),
                    Occupant::Unmanaged => {
                        "    A directory without module metadata already exists there".to_string()
                    }
                });
                lines.push(format!(
                    "    Use `modgraph {} --force` to {} '{module}' anyway",
                    request.action, request.action
                ));
            }
            ResolveError::SourceFailed { .. } | ResolveError::Cancelled => {
                lines.push(self.oneline());
            }
        }
        lines.join("\n")
    }
}

fn heading(request: &Request) -> String {
    format!(
        "Could not {} module '{}' ({})",
        request.action,
        request.name,
        request.versions_label()
    )
}

fn force_hint(action: Action) -> String {
    format!("    Use `modgraph {action} --force` to {action} this module anyway")
}
