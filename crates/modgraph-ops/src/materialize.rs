//! Applying an install plan to disk.

use modgraph_resolver::plan::{ActionKind, InstallAction};
use modgraph_util::errors::ModResult;
use modgraph_util::progress;

/// Carries out planned actions, in plan order.
pub trait Materializer {
    fn apply(&self, actions: &[InstallAction]) -> ModResult<()>;
}

/// Reports what would change without touching the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRun;

impl Materializer for DryRun {
    fn apply(&self, actions: &[InstallAction]) -> ModResult<()> {
        for action in actions.iter().filter(|a| a.is_change()) {
            let target = action.module_dir();
            tracing::debug!("{:?} {} into {}", action.kind, action.module, target.display());
            progress::status(
                verb(action.kind),
                &format!("{} into {}", action.module, target.display()),
            );
        }
        Ok(())
    }
}

pub fn verb(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Install => "Installing",
        ActionKind::Upgrade => "Upgrading",
        ActionKind::ForceReinstall => "Reinstalling",
        ActionKind::Noop => "Keeping",
    }
}
