//! Command dispatch and handler modules.

mod install;
mod list;
mod upgrade;

use std::path::PathBuf;

use console::Style;
use miette::Result;
use modgraph_core::config::GlobalConfig;
use modgraph_ops::Registry;
use modgraph_resolver::error::ResolveError;
use modgraph_resolver::resolver::{CancelHandle, CancelToken};
use modgraph_util::fs::split_search_path;

use crate::cli::{Cli, Command};

/// Module path and registry after applying flags, environment and config.
pub(crate) struct Settings {
    pub modulepath: Vec<PathBuf>,
    pub registry: Registry,
}

impl Settings {
    fn resolve(cli: &Cli) -> Result<Self> {
        let config = GlobalConfig::load()?;
        let modulepath = match cli.modulepath.as_deref() {
            Some(value) => split_search_path(value),
            None => config.modulepath(),
        };
        let registry = match (&cli.source, &cli.registry) {
            (Some(dir), _) => Registry::Directory(dir.clone()),
            (None, Some(url)) => Registry::Url(url.clone()),
            (None, None) => Registry::Url(config.registry.url.clone()),
        };
        tracing::debug!("module path: {modulepath:?}, registry: {registry:?}");
        Ok(Self {
            modulepath,
            registry,
        })
    }
}

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let settings = Settings::resolve(&cli)?;
    match cli.command {
        Command::Install { target, target_dir } => {
            install::exec(target, target_dir, settings, cancel_on_ctrl_c()).await
        }
        Command::Upgrade {
            target,
            ignore_changes,
        } => upgrade::exec(target, ignore_changes, settings, cancel_on_ctrl_c()).await,
        Command::List => list::exec(&settings),
    }
}

/// A token that is cancelled when the user presses Ctrl-C.
fn cancel_on_ctrl_c() -> CancelToken {
    let handle = CancelHandle::new();
    let token = handle.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received, cancelling");
            handle.cancel();
        }
    });
    token
}

/// Print a failed command's error to stderr.
///
/// Resolution errors get their full multi-line explanation, anything else
/// goes through miette's report handler.
pub fn print_error(report: &miette::Report) {
    let red_bold = Style::new().red().bold();
    match report.downcast_ref::<ResolveError>() {
        Some(err) => eprintln!("{} {}", red_bold.apply_to("error:"), err.multiline()),
        None => eprintln!("{report:?}"),
    }
}
