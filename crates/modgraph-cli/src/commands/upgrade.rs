//! Handler for `modgraph upgrade`.

use miette::Result;
use modgraph_ops::materialize::DryRun;
use modgraph_ops::ops_upgrade::{self, UpgradeOptions};
use modgraph_ops::Outcome;
use modgraph_resolver::resolver::CancelToken;

use super::Settings;
use crate::cli::ModuleArgs;

pub async fn exec(
    target: ModuleArgs,
    ignore_changes: bool,
    settings: Settings,
    cancel: CancelToken,
) -> Result<()> {
    let opts = UpgradeOptions {
        module: target.module,
        version: target.version,
        force: target.force,
        ignore_dependencies: target.ignore_dependencies,
        ignore_changes,
        modulepath: settings.modulepath,
        registry: settings.registry,
    };

    let report = ops_upgrade::upgrade(&opts, &DryRun, Some(cancel)).await?;
    if report.outcome == Outcome::UpToDate {
        tracing::info!("nothing to upgrade");
    }
    println!("{}", report.render());
    Ok(())
}
