//! Box-drawing rendering of install plans and module listings.

use std::path::Path;

use crate::plan::{ActionKind, InstallAction, InstallPlan, TreeNode};

/// A labelled node of a printable tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNode {
    pub text: String,
    pub children: Vec<DisplayNode>,
}

impl DisplayNode {
    pub fn leaf(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }
}

/// Render `nodes` one per line, without a trailing newline.
pub fn format_tree(nodes: &[DisplayNode]) -> String {
    let mut lines = Vec::new();
    push_nodes(&mut lines, nodes, "");
    lines.join("\n")
}

fn push_nodes(lines: &mut Vec<String>, nodes: &[DisplayNode], indent: &str) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let branch = if last { '└' } else { '├' };
        let fork = if node.children.is_empty() { '─' } else { '┬' };
        lines.push(format!("{indent}{branch}─{fork} {}", node.text));

        let nested = format!("{indent}{}", if last { "  " } else { "│ " });
        push_nodes(lines, &node.children, &nested);
    }
}

/// The plan as a tree under the requested module's directory.
pub fn render(plan: &InstallPlan, requested: &str) -> String {
    let heading = plan
        .action_for(requested)
        .or_else(|| plan.actions.first())
        .map(|a| a.target_path.clone())
        .unwrap_or_default();

    let nodes: Vec<DisplayNode> = plan
        .tree
        .iter()
        .map(|node| display(plan, node, &heading))
        .collect();

    let tree = format_tree(&nodes);
    if tree.is_empty() {
        heading.display().to_string()
    } else {
        format!("{}\n{tree}", heading.display())
    }
}

fn display(plan: &InstallPlan, node: &TreeNode, heading: &Path) -> DisplayNode {
    let action = &plan.actions[node.action];
    DisplayNode {
        text: label(action, heading),
        children: node
            .children
            .iter()
            .map(|child| display(plan, child, heading))
            .collect(),
    }
}

fn label(action: &InstallAction, heading: &Path) -> String {
    let module = &action.module;
    let mut text = match (action.kind, &action.previous_version) {
        (ActionKind::Upgrade | ActionKind::ForceReinstall, Some(previous)) => {
            format!("{} (v{previous} -> v{})", module.name, module.version)
        }
        _ => format!("{} (v{})", module.name, module.version),
    };
    if action.target_path != heading {
        text.push_str(&format!(" [{}]", action.target_path.display()));
    }
    text
}
