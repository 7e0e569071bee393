//! Handler for `modgraph install`.

use std::path::PathBuf;

use miette::Result;
use modgraph_ops::materialize::DryRun;
use modgraph_ops::ops_install::{self, InstallOptions};
use modgraph_resolver::resolver::CancelToken;

use super::Settings;
use crate::cli::ModuleArgs;

pub async fn exec(
    target: ModuleArgs,
    target_dir: Option<PathBuf>,
    settings: Settings,
    cancel: CancelToken,
) -> Result<()> {
    let opts = InstallOptions {
        module: target.module,
        version: target.version,
        force: target.force,
        ignore_dependencies: target.ignore_dependencies,
        target_dir,
        modulepath: settings.modulepath,
        registry: settings.registry,
    };

    let report = ops_install::install(&opts, &DryRun, Some(cancel)).await?;
    println!("{}", report.render());
    Ok(())
}
