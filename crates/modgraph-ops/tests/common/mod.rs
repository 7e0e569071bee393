#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use modgraph_ops::materialize::Materializer;
use modgraph_ops::{Outcome, Report};
use modgraph_resolver::plan::{ActionKind, InstallAction, InstallPlan};
use modgraph_util::errors::ModResult;
use serde_json::json;
use tempfile::TempDir;

/// A registry fixture directory plus a module path.
pub struct Workspace {
    pub tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let ws = Self {
            tmp: TempDir::new().unwrap(),
        };
        fs::create_dir_all(ws.registry()).unwrap();
        fs::create_dir_all(ws.modules()).unwrap();
        ws
    }

    pub fn registry(&self) -> PathBuf {
        self.tmp.path().join("registry")
    }

    pub fn modules(&self) -> PathBuf {
        self.tmp.path().join("modules")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.tmp.path().join(name)
    }

    /// Publish `releases` of `module`, each as `(version, [(dep, range)])`.
    pub fn publish(&self, module: &str, releases: &[(&str, &[(&str, &str)])]) {
        let results: Vec<_> = releases
            .iter()
            .map(|(version, deps)| {
                let deps: Vec<_> = deps
                    .iter()
                    .map(|(name, range)| json!({ "name": name, "version_requirement": range }))
                    .collect();
                json!({
                    "version": version,
                    "file_uri": format!("/v3/files/{module}-{version}.tar.gz"),
                    "metadata": { "name": module, "version": version, "dependencies": deps },
                })
            })
            .collect();
        let page = json!({ "pagination": { "next": null }, "results": results });
        fs::write(
            self.registry().join(format!("{module}.json")),
            serde_json::to_string_pretty(&page).unwrap(),
        )
        .unwrap();
    }

    /// Install `module` under `modulepath` by writing its `metadata.json`.
    pub fn install(&self, modulepath: &Path, module: &str, version: &str, deps: &[(&str, &str)]) {
        let dir_name = module.split_once('-').map(|(_, rest)| rest).unwrap_or(module);
        let dir = modulepath.join(dir_name);
        fs::create_dir_all(&dir).unwrap();
        let deps: Vec<_> = deps
            .iter()
            .map(|(name, range)| json!({ "name": name, "version_requirement": range }))
            .collect();
        let metadata = json!({ "name": module, "version": version, "dependencies": deps });
        fs::write(dir.join("metadata.json"), metadata.to_string()).unwrap();
    }

    /// Install `module` with a checksum manifest that no longer matches.
    pub fn install_modified(&self, modulepath: &Path, module: &str, version: &str) {
        self.install(modulepath, module, version, &[]);
        let dir_name = module.split_once('-').map(|(_, rest)| rest).unwrap_or(module);
        let dir = modulepath.join(dir_name);
        fs::write(dir.join("README"), "edited").unwrap();
        let metadata = json!({
            "name": module,
            "version": version,
            "checksums": { "README": "00000000000000000000000000000000" },
        });
        fs::write(dir.join("metadata.json"), metadata.to_string()).unwrap();
    }
}

/// Records every action it is asked to apply.
#[derive(Default)]
pub struct Recorder {
    pub applied: RefCell<Vec<InstallAction>>,
}

impl Materializer for Recorder {
    fn apply(&self, actions: &[InstallAction]) -> ModResult<()> {
        self.applied
            .borrow_mut()
            .extend(actions.iter().filter(|a| a.is_change()).cloned());
        Ok(())
    }
}

pub fn plan_of(report: &Report) -> &InstallPlan {
    match &report.outcome {
        Outcome::Planned(plan) => plan,
        Outcome::UpToDate => panic!("expected a plan, got up to date"),
    }
}

/// `name (kind vX)` for every action, in plan order.
pub fn summary(plan: &InstallPlan) -> Vec<String> {
    plan.actions
        .iter()
        .map(|a| {
            let kind = match a.kind {
                ActionKind::Install => "install",
                ActionKind::Upgrade => "upgrade",
                ActionKind::ForceReinstall => "reinstall",
                ActionKind::Noop => "noop",
            };
            format!("{} {kind} v{}", a.module.name, a.module.version)
        })
        .collect()
}
