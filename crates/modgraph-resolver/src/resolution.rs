//! The outcome of a successful resolution: one release per module and the
//! tree the selection projects onto the graph.

use std::collections::{BTreeMap, VecDeque};

use modgraph_core::release::Release;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::graph::{Graph, GraphNode, NodeId};

/// A resolved graph backed by petgraph.
///
/// The tree keeps each selected module once, under the shallowest module
/// that requires it.
pub struct Resolution {
    graph: Graph,
    selection: Vec<NodeId>,
    tree: DiGraph<Option<NodeId>, ()>,
    root: NodeIndex,
    index: BTreeMap<NodeId, NodeIndex>,
}

impl Resolution {
    pub fn new(mut graph: Graph, mut selection: Vec<NodeId>) -> Self {
        selection.sort_by(|a, b| graph.node(*a).release.cmp(&graph.node(*b).release));
        graph.populate_children(&selection);

        let mut tree = DiGraph::new();
        let root = tree.add_node(None);
        let mut index: BTreeMap<NodeId, NodeIndex> = BTreeMap::new();
        let mut queue: VecDeque<(NodeIndex, Vec<NodeId>)> = VecDeque::new();
        queue.push_back((root, graph.children().values().copied().collect()));

        while let Some((parent, children)) = queue.pop_front() {
            for child in children {
                if index.contains_key(&child) {
                    continue;
                }
                let idx = tree.add_node(Some(child));
                tree.add_edge(parent, idx, ());
                index.insert(child, idx);
                queue.push_back((idx, graph.node(child).children().values().copied().collect()));
            }
        }

        Self {
            graph,
            selection,
            tree,
            root,
            index,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Selected nodes, ordered by release.
    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    pub fn release(&self, id: NodeId) -> &Release {
        &self.graph.node(id).release
    }

    /// The selected release of `name`, if the module is part of the solution.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.selection
            .iter()
            .copied()
            .find(|id| self.release(*id).name == name)
    }

    /// The requested modules at the top of the tree, by name.
    pub fn roots(&self) -> Vec<NodeId> {
        self.tree_children(self.root)
    }

    /// Tree children of a selected node, by name.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        match self.index.get(&id) {
            Some(idx) => self.tree_children(*idx),
            None => Vec::new(),
        }
    }

    fn tree_children(&self, idx: NodeIndex) -> Vec<NodeId> {
        let mut children: Vec<NodeId> = self.tree.neighbors(idx).filter_map(|n| self.tree[n]).collect();
        children.sort_by(|a, b| self.release(*a).cmp(self.release(*b)));
        children
    }

    /// Every module in the tree, parents before the modules they require,
    /// siblings by name.
    pub fn breadth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut queue: VecDeque<NodeId> = self.roots().into();
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.children_of(id));
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgraph_core::release::Origin;
    use modgraph_core::version::{parse_range, parse_version, VersionRange};

    fn release(name: &str, version: &str, deps: &[(&str, &str)]) -> Release {
        let mut r = Release::new(
            name,
            parse_version(version).unwrap(),
            Origin::Registry {
                file_uri: String::new(),
            },
        );
        for (dep, range) in deps {
            r = r.with_requirement(dep, parse_range(range).unwrap());
        }
        r
    }

    #[test]
    fn tree_keeps_each_module_once() {
        let mut requested = BTreeMap::new();
        requested.insert("a-php".to_string(), VersionRange::any());
        let mut graph = Graph::new(requested);
        let php = graph.insert(release("a-php", "0.0.1", &[("a-apache", "0.0.1")]));
        let apache = graph.insert(release("a-apache", "0.0.1", &[("a-php", "0.0.1")]));

        let resolution = Resolution::new(graph, vec![php, apache]);
        assert_eq!(resolution.roots(), vec![php]);
        assert_eq!(resolution.children_of(php), vec![apache]);
        assert!(resolution.children_of(apache).is_empty());
        assert_eq!(resolution.breadth_first(), vec![php, apache]);
    }

    #[test]
    fn shared_dependency_sits_under_shallowest_parent() {
        let mut requested = BTreeMap::new();
        requested.insert("a-apollo".to_string(), VersionRange::any());
        let mut graph = Graph::new(requested);
        let apollo = graph.insert(release(
            "a-apollo",
            "0.0.2",
            &[("a-java", ">= 1.7.0"), ("a-stdlib", ">= 1.0.0")],
        ));
        let java = graph.insert(release("a-java", "1.7.1", &[("a-stdlib", "1.0.0")]));
        let stdlib = graph.insert(release("a-stdlib", "1.0.0", &[]));

        let resolution = Resolution::new(graph, vec![stdlib, java, apollo]);
        assert_eq!(resolution.children_of(apollo), vec![java, stdlib]);
        assert!(resolution.children_of(java).is_empty());
        assert_eq!(resolution.breadth_first()[0], apollo);
        assert_eq!(resolution.find("a-java"), Some(java));
        assert_eq!(resolution.find("a-none"), None);
    }

    #[test]
    fn breadth_first_orders_siblings_by_name() {
        let mut requested = BTreeMap::new();
        requested.insert("a-app".to_string(), VersionRange::any());
        let mut graph = Graph::new(requested);
        let app = graph.insert(release(
            "a-app",
            "1.0.0",
            &[("a-ccc", "1.x"), ("a-aaa", "1.x"), ("a-bbb", "1.x")],
        ));
        let aaa = graph.insert(release("a-aaa", "1.0.0", &[("a-zzz", "1.x")]));
        let bbb = graph.insert(release("a-bbb", "1.0.0", &[]));
        let ccc = graph.insert(release("a-ccc", "1.0.0", &[]));
        let zzz = graph.insert(release("a-zzz", "1.0.0", &[]));

        let resolution = Resolution::new(graph, vec![zzz, ccc, app, bbb, aaa]);
        assert_eq!(resolution.children_of(app), vec![aaa, bbb, ccc]);
        assert_eq!(resolution.breadth_first(), vec![app, aaa, bbb, ccc, zzz]);
    }
}
