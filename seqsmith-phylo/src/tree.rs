//! Arena-backed phylogenetic tree.
//!
//! Nodes live in a flat `Vec<Node>` referenced by index. Structural edits
//! (pruning, rerooting) leave unreachable slots behind; `compacted()`
//! rebuilds a dense arena and is called by the operations that delete
//! nodes.

use seqsmith_core::{SeqsmithError, SeqsmithResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Index into the tree's node arena.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Length of the edge between this node and its parent
    pub branch_length: Option<f64>,
    /// Taxon label for leaves, clade label for internals
    pub label: Option<String>,
    /// Support value (bootstrap proportion, consensus frequency, ...)
    pub support: Option<f64>,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// A tree holding a single unnamed root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                id: 0,
                parent: None,
                children: Vec::new(),
                branch_length: None,
                label: None,
                support: None,
            }],
            root: 0,
        }
    }

    pub fn from_nodes(nodes: Vec<Node>, root: NodeId) -> SeqsmithResult<Self> {
        if nodes.is_empty() {
            return Err(SeqsmithError::InvalidInput("empty node list".to_string()));
        }
        if root >= nodes.len() {
            return Err(SeqsmithError::InvalidInput(format!(
                "root index {} out of range ({})",
                root,
                nodes.len()
            )));
        }
        Ok(Self { nodes, root })
    }

    pub fn add_child(
        &mut self,
        parent: NodeId,
        label: Option<String>,
        branch_length: Option<f64>,
    ) -> SeqsmithResult<NodeId> {
        if parent >= self.nodes.len() {
            return Err(SeqsmithError::InvalidInput(format!(
                "parent index {} out of range ({})",
                parent,
                self.nodes.len()
            )));
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            id,
            parent: Some(parent),
            children: Vec::new(),
            branch_length,
            label,
            support: None,
        });
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    /// Node ids reachable from the root, parents before children.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            for &child in self.nodes[id].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Node ids reachable from the root, children before parents.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            for &child in &self.nodes[id].children {
                stack.push(child);
            }
        }
        order.reverse();
        order
    }

    /// Number of nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        self.preorder().len()
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.nodes[id].is_leaf())
            .collect()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// Leaf labels in tree order (unlabeled leaves are skipped).
    pub fn leaf_labels(&self) -> Vec<String> {
        self.leaves()
            .into_iter()
            .filter_map(|id| self.nodes[id].label.clone())
            .collect()
    }

    /// Sorted set of leaf labels.
    pub fn leaf_label_set(&self) -> BTreeSet<String> {
        self.leaf_labels().into_iter().collect()
    }

    pub fn find_leaf(&self, label: &str) -> Option<NodeId> {
        self.leaves()
            .into_iter()
            .find(|&id| self.nodes[id].label.as_deref() == Some(label))
    }

    /// Sorted leaf labels under the given node.
    pub fn subtree_leaf_labels(&self, id: NodeId) -> BTreeSet<String> {
        let mut labels = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let node = &self.nodes[n];
            if node.is_leaf() {
                if let Some(label) = &node.label {
                    labels.insert(label.clone());
                }
            }
            stack.extend(&node.children);
        }
        labels
    }

    /// Most recent common ancestor of a set of nodes.
    pub fn mrca(&self, ids: &[NodeId]) -> SeqsmithResult<NodeId> {
        let mut iter = ids.iter();
        let first = *iter
            .next()
            .ok_or_else(|| SeqsmithError::InvalidInput("mrca of nothing".to_string()))?;
        let mut current = first;
        for &other in iter {
            current = self.mrca_pair(current, other)?;
        }
        Ok(current)
    }

    fn mrca_pair(&self, a: NodeId, b: NodeId) -> SeqsmithResult<NodeId> {
        if a >= self.nodes.len() || b >= self.nodes.len() {
            return Err(SeqsmithError::InvalidInput(
                "node id out of range".to_string(),
            ));
        }
        let mut ancestors = BTreeSet::new();
        let mut cursor = Some(a);
        while let Some(id) = cursor {
            ancestors.insert(id);
            cursor = self.nodes[id].parent;
        }
        let mut cursor = Some(b);
        while let Some(id) = cursor {
            if ancestors.contains(&id) {
                return Ok(id);
            }
            cursor = self.nodes[id].parent;
        }
        Ok(self.root)
    }

    /// Detach `child` from its parent's child list (the node itself stays
    /// in the arena until compaction).
    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child].parent {
            self.nodes[parent].children.retain(|&c| c != child);
        }
        self.nodes[child].parent = None;
    }

    /// Remove internal nodes that have exactly one child, adding their
    /// branch length onto the child. Root unifurcations promote the child
    /// to root.
    pub fn suppress_unifurcations(&mut self) {
        loop {
            let mut changed = false;
            for id in self.preorder() {
                if self.nodes[id].children.len() != 1 {
                    continue;
                }
                let child = self.nodes[id].children[0];
                let extra = self.nodes[id].branch_length.unwrap_or(0.0);

                match self.nodes[id].parent {
                    Some(parent) => {
                        let slot = self.nodes[parent]
                            .children
                            .iter()
                            .position(|&c| c == id)
                            .unwrap_or(0);
                        self.nodes[parent].children[slot] = child;
                        self.nodes[child].parent = Some(parent);
                        let child_len = self.nodes[child].branch_length.unwrap_or(0.0);
                        if self.nodes[child].branch_length.is_some()
                            || self.nodes[id].branch_length.is_some()
                        {
                            self.nodes[child].branch_length = Some(child_len + extra);
                        }
                    }
                    None => {
                        self.nodes[child].parent = None;
                        self.root = child;
                    }
                }
                self.nodes[id].children.clear();
                changed = true;
                break;
            }
            if !changed {
                return;
            }
        }
    }

    /// Rebuild the arena keeping only nodes reachable from the root.
    pub fn compacted(&self) -> Tree {
        let order = self.preorder();
        let mut remap = vec![usize::MAX; self.nodes.len()];
        for (new_id, &old_id) in order.iter().enumerate() {
            remap[old_id] = new_id;
        }
        let nodes = order
            .iter()
            .map(|&old_id| {
                let old = &self.nodes[old_id];
                Node {
                    id: remap[old_id],
                    parent: old.parent.map(|p| remap[p]),
                    children: old.children.iter().map(|&c| remap[c]).collect(),
                    branch_length: old.branch_length,
                    label: old.label.clone(),
                    support: old.support,
                }
            })
            .collect();
        Tree { nodes, root: 0 }
    }

    /// Re-orient the tree so `new_root` becomes the root. Edges along the
    /// path to the old root are reversed, branch lengths staying with their
    /// edges.
    pub fn reroot_at_node(&mut self, new_root: NodeId) -> SeqsmithResult<()> {
        if new_root >= self.nodes.len() {
            return Err(SeqsmithError::InvalidInput(
                "node id out of range".to_string(),
            ));
        }
        // Path from new_root up to the old root
        let mut path = Vec::new();
        let mut cursor = Some(new_root);
        while let Some(id) = cursor {
            path.push(id);
            cursor = self.nodes[id].parent;
        }

        // Edge (path[i], path[i+1]) carries its length on path[i]; capture
        // them all before any reversal overwrites a slot on the path
        let lengths: Vec<Option<f64>> =
            path.iter().map(|&id| self.nodes[id].branch_length).collect();

        for (i, pair) in path.windows(2).enumerate() {
            let (child, parent) = (pair[0], pair[1]);
            self.nodes[parent].children.retain(|&c| c != child);
            self.nodes[parent].parent = Some(child);
            self.nodes[child].children.push(parent);
            self.nodes[parent].branch_length = lengths[i];
        }

        self.nodes[new_root].parent = None;
        self.nodes[new_root].branch_length = None;
        self.root = new_root;
        Ok(())
    }

    /// Insert a new node in the middle of the edge above `node` and reroot
    /// there (outgroup-style rooting).
    pub fn root_on_edge(&mut self, node: NodeId) -> SeqsmithResult<NodeId> {
        let parent = match self.nodes.get(node).and_then(|n| n.parent) {
            Some(p) => p,
            // Rooting on the root is a no-op
            None => return Ok(self.root),
        };
        let half = self.nodes[node].branch_length.map(|l| l / 2.0);

        let mid = self.nodes.len();
        self.nodes.push(Node {
            id: mid,
            parent: Some(parent),
            children: vec![node],
            branch_length: half,
            label: None,
            support: None,
        });
        let slot = self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == node)
            .unwrap_or(0);
        self.nodes[parent].children[slot] = mid;
        self.nodes[node].parent = Some(mid);
        self.nodes[node].branch_length = half;

        self.reroot_at_node(mid)?;
        Ok(mid)
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ((A:0.1,B:0.2)AB:0.3,(C:0.4,D:0.5)CD:0.6);
    pub(crate) fn sample_tree() -> Tree {
        let mut tree = Tree::new();
        let ab = tree.add_child(0, Some("AB".into()), Some(0.3)).unwrap();
        let cd = tree.add_child(0, Some("CD".into()), Some(0.6)).unwrap();
        tree.add_child(ab, Some("A".into()), Some(0.1)).unwrap();
        tree.add_child(ab, Some("B".into()), Some(0.2)).unwrap();
        tree.add_child(cd, Some("C".into()), Some(0.4)).unwrap();
        tree.add_child(cd, Some("D".into()), Some(0.5)).unwrap();
        tree
    }

    #[test]
    fn test_counts_and_leaves() {
        let tree = sample_tree();
        assert_eq!(tree.node_count(), 7);
        assert_eq!(tree.leaf_count(), 4);
        assert_eq!(tree.leaf_labels(), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_traversal_orders() {
        let tree = sample_tree();
        assert_eq!(tree.preorder(), vec![0, 1, 3, 4, 2, 5, 6]);
        assert_eq!(tree.postorder(), vec![3, 4, 1, 5, 6, 2, 0]);
    }

    #[test]
    fn test_mrca() {
        let tree = sample_tree();
        assert_eq!(tree.mrca(&[3, 4]).unwrap(), 1);
        assert_eq!(tree.mrca(&[3, 5]).unwrap(), 0);
        assert_eq!(tree.mrca(&[3, 4, 5]).unwrap(), 0);
        assert_eq!(tree.mrca(&[3]).unwrap(), 3);
    }

    #[test]
    fn test_subtree_leaf_labels() {
        let tree = sample_tree();
        let labels: Vec<String> = tree.subtree_leaf_labels(1).into_iter().collect();
        assert_eq!(labels, vec!["A", "B"]);
    }

    #[test]
    fn test_detach_and_compact() {
        let mut tree = sample_tree();
        let a = tree.find_leaf("A").unwrap();
        tree.detach(a);
        assert_eq!(tree.leaf_labels(), vec!["B", "C", "D"]);

        let compacted = tree.compacted();
        assert_eq!(compacted.node_count(), 6);
        assert_eq!(compacted.leaf_labels(), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_suppress_unifurcations() {
        let mut tree = sample_tree();
        let a = tree.find_leaf("A").unwrap();
        tree.detach(a);
        // AB now has a single child B
        tree.suppress_unifurcations();
        let compacted = tree.compacted();
        assert_eq!(compacted.leaf_labels(), vec!["B", "C", "D"]);
        // B hangs directly off the root with summed branch length
        let b = compacted.find_leaf("B").unwrap();
        let b_node = compacted.node(b).unwrap();
        assert_eq!(b_node.parent, Some(compacted.root()));
        assert!((b_node.branch_length.unwrap() - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_reroot_at_node() {
        let mut tree = sample_tree();
        tree.reroot_at_node(1).unwrap();
        assert_eq!(tree.root(), 1);
        let root = tree.node(1).unwrap();
        assert!(root.parent.is_none());
        // Old root is now a child of AB
        assert!(root.children.contains(&0));
        // Leaf set unchanged
        assert_eq!(tree.leaf_labels().len(), 4);
        let mut labels = tree.leaf_labels();
        labels.sort();
        assert_eq!(labels, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_root_on_edge() {
        let mut tree = sample_tree();
        let a = tree.find_leaf("A").unwrap();
        let new_root = tree.root_on_edge(a).unwrap();
        assert_eq!(tree.root(), new_root);
        // A hangs directly off the new root with half its branch length
        let a_node = tree.node(a).unwrap();
        assert_eq!(a_node.parent, Some(new_root));
        assert!((a_node.branch_length.unwrap() - 0.05).abs() < 1e-10);
        let mut labels = tree.leaf_labels();
        labels.sort();
        assert_eq!(labels, vec!["A", "B", "C", "D"]);
    }
}
