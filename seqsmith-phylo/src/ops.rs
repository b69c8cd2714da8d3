//! Tree operations: pruning, rooting, polytomy handling, id manipulation.

use crate::tree::{NodeId, Tree};
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::collections::HashSet;

/// Remove every leaf whose label matches any of the patterns, suppressing
/// the unifurcations this creates. Returns the pruned leaf labels.
pub fn prune_taxa(tree: &mut Tree, patterns: &[String]) -> SeqsmithResult<Vec<String>> {
    let regexes: Vec<Regex> = patterns
        .iter()
        .map(|p| Regex::new(p).map_err(SeqsmithError::from))
        .collect::<Result<_, _>>()?;

    let mut pruned = Vec::new();
    for leaf in tree.leaves() {
        let Some(label) = tree.node(leaf).and_then(|n| n.label.clone()) else {
            continue;
        };
        if regexes.iter().any(|re| re.is_match(&label)) {
            tree.detach(leaf);
            pruned.push(label);
        }
    }

    // Dropping leaves can empty out internal nodes; peel them off until the
    // remaining topology is clean
    loop {
        let empties: Vec<NodeId> = tree
            .preorder()
            .into_iter()
            .filter(|&id| {
                tree.node(id).is_some_and(|n| {
                    n.children.is_empty() && n.label.is_none() && id != tree.root()
                })
            })
            .collect();
        if empties.is_empty() {
            break;
        }
        for id in empties {
            tree.detach(id);
        }
    }
    tree.suppress_unifurcations();
    *tree = tree.compacted();
    Ok(pruned)
}

/// Root the tree: one taxon roots on the edge above that leaf, several
/// taxa root at their MRCA, and none roots on the first leaf.
pub fn root(tree: &mut Tree, taxa: &[String]) -> SeqsmithResult<()> {
    match taxa.len() {
        0 => {
            let first = tree.leaves().into_iter().next().ok_or_else(|| {
                SeqsmithError::InvalidInput("cannot root an empty tree".to_string())
            })?;
            tree.root_on_edge(first)?;
        }
        1 => {
            let leaf = tree.find_leaf(&taxa[0]).ok_or_else(|| {
                SeqsmithError::NotFound(format!("taxon '{}' is not in the tree", taxa[0]))
            })?;
            tree.root_on_edge(leaf)?;
        }
        _ => {
            let ids: Vec<NodeId> = taxa
                .iter()
                .map(|t| {
                    tree.find_leaf(t).ok_or_else(|| {
                        SeqsmithError::NotFound(format!("taxon '{}' is not in the tree", t))
                    })
                })
                .collect::<Result<_, _>>()?;
            let mrca = tree.mrca(&ids)?;
            if mrca != tree.root() {
                tree.reroot_at_node(mrca)?;
            }
        }
    }
    *tree = tree.compacted();
    Ok(())
}

/// Collapse a binary root into a trifurcation: one internal root child is
/// deleted and its children promoted, their branch lengths absorbing the
/// deleted edge.
pub fn unroot(tree: &mut Tree) -> SeqsmithResult<()> {
    let root = tree.root();
    let children = tree.node(root).map(|n| n.children.clone()).unwrap_or_default();
    if children.len() != 2 {
        return Ok(()); // already unrooted
    }

    let internal = children
        .into_iter()
        .find(|&c| !tree.node(c).map(|n| n.is_leaf()).unwrap_or(true));
    let Some(victim) = internal else {
        // Two-leaf tree: nothing sensible to collapse
        return Ok(());
    };

    let extra = tree.node(victim).and_then(|n| n.branch_length).unwrap_or(0.0);
    let grandchildren = tree
        .node(victim)
        .map(|n| n.children.clone())
        .unwrap_or_default();
    for child in grandchildren {
        let node = tree.node_mut(child).expect("child of live node");
        node.parent = Some(root);
        if let Some(len) = node.branch_length.as_mut() {
            *len += extra;
        }
        tree.node_mut(root)
            .expect("root exists")
            .children
            .push(child);
    }
    tree.node_mut(victim).expect("victim exists").children.clear();
    tree.detach(victim);
    *tree = tree.compacted();
    Ok(())
}

/// Contract weakly supported internal edges: where the support value (or,
/// when absent, the branch length) falls below the threshold, the node is
/// deleted and its children promoted, absorbing the contracted edge length.
pub fn collapse_polytomies(tree: &mut Tree, threshold: f64) -> SeqsmithResult<()> {
    loop {
        let victim = tree.preorder().into_iter().find(|&id| {
            let node = match tree.node(id) {
                Some(n) => n,
                None => return false,
            };
            if node.is_leaf() || node.is_root() {
                return false;
            }
            match (node.support, node.branch_length) {
                (Some(s), _) => s < threshold,
                (None, Some(l)) => l < threshold,
                (None, None) => false,
            }
        });
        let Some(victim) = victim else {
            break;
        };

        let parent = tree.node(victim).and_then(|n| n.parent).expect("non-root");
        let extra = tree.node(victim).and_then(|n| n.branch_length).unwrap_or(0.0);
        let children = tree
            .node(victim)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in &children {
            let node = tree.node_mut(*child).expect("child of live node");
            node.parent = Some(parent);
            if let Some(len) = node.branch_length.as_mut() {
                *len += extra;
            }
        }
        tree.node_mut(victim).expect("victim exists").children.clear();
        // Replace the victim with its children in the parent's child list
        let parent_node = tree.node_mut(parent).expect("parent exists");
        let slot = parent_node
            .children
            .iter()
            .position(|&c| c == victim)
            .unwrap_or(parent_node.children.len());
        parent_node.children.remove(slot);
        for (offset, child) in children.into_iter().enumerate() {
            parent_node.children.insert(slot + offset, child);
        }
    }
    *tree = tree.compacted();
    Ok(())
}

/// Branch length given to the edges created when resolving polytomies.
const RESOLUTION_LENGTH: f64 = 1e-6;

/// Arbitrarily resolve every polytomy into bifurcations with near-zero
/// branch lengths.
pub fn split_polytomies(tree: &mut Tree) -> SeqsmithResult<()> {
    loop {
        let target = tree
            .preorder()
            .into_iter()
            .find(|&id| tree.node(id).is_some_and(|n| n.children.len() > 2));
        let Some(target) = target else {
            break;
        };

        let children = tree
            .node(target)
            .map(|n| n.children.clone())
            .expect("target exists");
        // Pair off the first two children under a new internal node
        let (a, b) = (children[0], children[1]);
        let fresh = tree.add_child(target, None, Some(RESOLUTION_LENGTH))?;
        for moved in [a, b] {
            let node = tree.node_mut(moved).expect("child of live node");
            node.parent = Some(fresh);
        }
        let node = tree.node_mut(fresh).expect("fresh node");
        node.children = vec![a, b];
        let target_node = tree.node_mut(target).expect("target exists");
        target_node.children.retain(|&c| c != a && c != b);
        // Keep the fresh node in the position the pair occupied
        target_node.children.retain(|&c| c != fresh);
        target_node.children.insert(0, fresh);
    }
    *tree = tree.compacted();
    Ok(())
}

/// Leaf labels present in exactly one of the two trees.
pub fn show_unique(a: &Tree, b: &Tree) -> (Vec<String>, Vec<String>) {
    let set_a = a.leaf_label_set();
    let set_b = b.leaf_label_set();
    let only_a = set_a.difference(&set_b).cloned().collect();
    let only_b = set_b.difference(&set_a).cloned().collect();
    (only_a, only_b)
}

/// Regex-substitute over every node label.
pub fn rename(tree: &mut Tree, pattern: &str, replacement: &str) -> SeqsmithResult<()> {
    let re = Regex::new(pattern)?;
    for id in tree.preorder() {
        let node = tree.node_mut(id).expect("node id from traversal");
        if let Some(label) = &node.label {
            node.label = Some(re.replace_all(label, replacement).to_string());
        }
    }
    Ok(())
}

/// Replace every leaf label with a unique 10-character hash; returns the
/// (hash, original) table.
pub fn hash_ids(tree: &mut Tree) -> Vec<(String, String)> {
    hash_ids_with_rng(tree, &mut rand::thread_rng())
}

pub fn hash_ids_with_rng<R: Rng>(tree: &mut Tree, rng: &mut R) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut table = Vec::new();
    for leaf in tree.leaves() {
        let node = tree.node_mut(leaf).expect("leaf id from traversal");
        let Some(original) = node.label.clone() else {
            continue;
        };
        let hash = loop {
            let candidate: String = (&mut *rng)
                .sample_iter(&Alphanumeric)
                .take(10)
                .map(char::from)
                .collect();
            if seen.insert(candidate.clone()) {
                break candidate;
            }
        };
        node.label = Some(hash.clone());
        table.push((hash, original));
    }
    table
}
