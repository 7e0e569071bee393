//! Handler for `modgraph list`.

use miette::Result;
use modgraph_ops::ops_list;

use super::Settings;

pub fn exec(settings: &Settings) -> Result<()> {
    println!("{}", ops_list::list(&settings.modulepath));
    Ok(())
}
