//! Operation: list installed modules per search-path directory.

use std::path::PathBuf;

use modgraph_core::inventory::Inventory;
use modgraph_registry::inventory;
use modgraph_resolver::tree::{format_tree, DisplayNode};

/// Scan `search_paths` and render every directory with its modules.
pub fn list(search_paths: &[PathBuf]) -> String {
    render(&inventory::scan(search_paths))
}

pub fn render(inventory: &Inventory) -> String {
    let mut sections = Vec::new();
    for modulepath in &inventory.search_paths {
        let mut nodes: Vec<(String, DisplayNode)> = inventory
            .in_modulepath(modulepath)
            .map(|module| {
                let release = &module.release;
                let mut text = format!("{} (v{})", release.name, release.version);
                if module.has_local_changes {
                    text.push_str(" (modified)");
                }
                let children = release
                    .requirements
                    .iter()
                    .filter(|(dep, range)| {
                        !inventory
                            .find(dep)
                            .iter()
                            .any(|m| range.satisfies(&m.release.version))
                    })
                    .map(|(dep, range)| DisplayNode::leaf(format!("UNMET DEPENDENCY {dep} ({range})")))
                    .collect();
                (
                    module.release.install_dir_name().to_string(),
                    DisplayNode { text, children },
                )
            })
            .collect();
        nodes.extend(
            inventory
                .unmanaged
                .iter()
                .filter(|d| d.modulepath == *modulepath)
                .map(|d| (d.name.clone(), DisplayNode::leaf(format!("{} (???)", d.name)))),
        );
        nodes.sort_by(|a, b| a.0.cmp(&b.0));

        let nodes: Vec<DisplayNode> = nodes.into_iter().map(|(_, node)| node).collect();
        let body = if nodes.is_empty() {
            format_tree(&[DisplayNode::leaf("(no modules installed)")])
        } else {
            format_tree(&nodes)
        };
        sections.push(format!("{}\n{body}", modulepath.display()));
    }
    sections.join("\n")
}
