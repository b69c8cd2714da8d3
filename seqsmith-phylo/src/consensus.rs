//! Majority-rule consensus trees built from clade frequencies.

use crate::tree::Tree;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::collections::{BTreeMap, BTreeSet};

/// A clade (set of leaf labels) with its observed frequency and the average
/// branch length of the corresponding edge across the trees containing it.
#[derive(Debug, Clone)]
struct CladeCount {
    leaves: BTreeSet<String>,
    frequency: f64,
    mean_length: Option<f64>,
}

/// Build a consensus tree: clades appearing in at least `min_frequency` of
/// the input trees are kept (0.5 = majority rule, 1.0 = strict). Internal
/// nodes carry the clade frequency as their support value; branch lengths
/// are averaged over the trees containing the clade.
///
/// All input trees must share one leaf set.
pub fn consensus_tree(trees: &[Tree], min_frequency: f64) -> SeqsmithResult<Tree> {
    if trees.is_empty() {
        return Err(SeqsmithError::InvalidInput("no trees provided".to_string()));
    }
    if !(0.0..=1.0).contains(&min_frequency) {
        return Err(SeqsmithError::InvalidInput(format!(
            "consensus frequency must be within [0, 1], got {}",
            min_frequency
        )));
    }

    let all_leaves = trees[0].leaf_label_set();
    for (i, tree) in trees.iter().enumerate().skip(1) {
        if tree.leaf_label_set() != all_leaves {
            return Err(SeqsmithError::InvalidInput(format!(
                "tree {} has a different leaf set from the first tree",
                i + 1
            )));
        }
    }

    let n_trees = trees.len() as f64;
    let mut counts: BTreeMap<BTreeSet<String>, (usize, f64, usize)> = BTreeMap::new();
    for tree in trees {
        // Deduplicate clades within one tree before counting
        let mut tree_clades: BTreeMap<BTreeSet<String>, Option<f64>> = BTreeMap::new();
        for id in tree.preorder() {
            let node = tree.node(id).expect("node id from traversal");
            if node.is_leaf() || node.is_root() {
                continue;
            }
            let clade = tree.subtree_leaf_labels(id);
            if clade.len() <= 1 || clade.len() >= all_leaves.len() {
                continue;
            }
            tree_clades.entry(clade).or_insert(node.branch_length);
        }
        for (clade, length) in tree_clades {
            let entry = counts.entry(clade).or_insert((0, 0.0, 0));
            entry.0 += 1;
            if let Some(len) = length {
                entry.1 += len;
                entry.2 += 1;
            }
        }
    }

    let mut accepted: Vec<CladeCount> = counts
        .into_iter()
        .map(|(leaves, (count, length_sum, length_n))| CladeCount {
            leaves,
            frequency: count as f64 / n_trees,
            mean_length: (length_n > 0).then(|| length_sum / length_n as f64),
        })
        .filter(|c| c.frequency + 1e-10 >= min_frequency)
        .collect();

    // Majority-rule clades are mutually compatible when min_frequency > 0.5;
    // at exactly 0.5 ties can conflict, so keep the more frequent clade and
    // drop anything incompatible with what is already accepted.
    accepted.sort_by(|a, b| {
        b.frequency
            .partial_cmp(&a.frequency)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.leaves.cmp(&b.leaves))
    });
    let mut kept: Vec<CladeCount> = Vec::new();
    for clade in accepted {
        if kept.iter().all(|k| compatible(&k.leaves, &clade.leaves)) {
            kept.push(clade);
        }
    }

    Ok(build_from_clades(&all_leaves, &kept))
}

/// Two clades are compatible when they nest or are disjoint.
fn compatible(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    a.is_subset(b) || b.is_subset(a) || a.is_disjoint(b)
}

fn build_from_clades(all_leaves: &BTreeSet<String>, clades: &[CladeCount]) -> Tree {
    // Insert larger clades first so nesting resolves top-down
    let mut ordered: Vec<&CladeCount> = clades.iter().collect();
    ordered.sort_by_key(|c| std::cmp::Reverse(c.leaves.len()));

    let mut tree = Tree::new();
    // Node each clade hangs off: start everything at the root
    let mut clade_nodes: Vec<(BTreeSet<String>, usize)> = Vec::new();

    for clade in ordered {
        let parent = clade_nodes
            .iter()
            .filter(|(leaves, _)| clade.leaves.is_subset(leaves))
            .min_by_key(|(leaves, _)| leaves.len())
            .map(|(_, id)| *id)
            .unwrap_or_else(|| tree.root());
        let id = tree
            .add_child(parent, None, clade.mean_length)
            .expect("parent id is live");
        tree.node_mut(id).expect("fresh node").support = Some(clade.frequency);
        clade_nodes.push((clade.leaves.clone(), id));
    }

    for leaf in all_leaves {
        let parent = clade_nodes
            .iter()
            .filter(|(leaves, _)| leaves.contains(leaf))
            .min_by_key(|(leaves, _)| leaves.len())
            .map(|(_, id)| *id)
            .unwrap_or_else(|| tree.root());
        tree.add_child(parent, Some(leaf.clone()), None)
            .expect("parent id is live");
    }

    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick;

    fn trees(inputs: &[&str]) -> Vec<Tree> {
        inputs.iter().map(|s| newick::parse(s).unwrap()).collect()
    }

    #[test]
    fn test_unanimous_clade_kept() {
        let input = trees(&[
            "((A,B),(C,D));",
            "((A,B),(C,D));",
            "((A,B),(D,C));",
        ]);
        let consensus = consensus_tree(&input, 0.5).unwrap();
        let mut labels = consensus.leaf_labels();
        labels.sort();
        assert_eq!(labels, vec!["A", "B", "C", "D"]);

        // The AB clade exists with full support
        let ab_node = consensus
            .preorder()
            .into_iter()
            .find(|&id| {
                let clade: Vec<String> =
                    consensus.subtree_leaf_labels(id).into_iter().collect();
                clade == vec!["A", "B"]
            })
            .unwrap();
        assert_eq!(consensus.node(ab_node).unwrap().support, Some(1.0));
    }

    #[test]
    fn test_minority_clade_dropped() {
        let input = trees(&[
            "((A,B),(C,D));",
            "((A,C),(B,D));",
            "((A,D),(B,C));",
        ]);
        let consensus = consensus_tree(&input, 0.5).unwrap();
        // Every grouping appears once (1/3 < 1/2): total polytomy
        assert_eq!(
            consensus.node(consensus.root()).unwrap().children.len(),
            4
        );
    }

    #[test]
    fn test_strict_consensus() {
        let input = trees(&["((A,B),(C,D));", "((A,B),(C,D));"]);
        let consensus = consensus_tree(&input, 1.0).unwrap();
        assert_eq!(consensus.leaf_count(), 4);
        // Both non-trivial clades survive
        let internal = consensus
            .preorder()
            .into_iter()
            .filter(|&id| {
                let n = consensus.node(id).unwrap();
                !n.is_leaf() && !n.is_root()
            })
            .count();
        assert_eq!(internal, 2);
    }

    #[test]
    fn test_branch_lengths_averaged() {
        let input = trees(&["((A:1,B:1):2,(C:1,D:1):2);", "((A:1,B:1):4,(C:1,D:1):4);"]);
        let consensus = consensus_tree(&input, 0.5).unwrap();
        let ab_node = consensus
            .preorder()
            .into_iter()
            .find(|&id| {
                consensus.subtree_leaf_labels(id).len() == 2
                    && consensus.subtree_leaf_labels(id).contains("A")
            })
            .unwrap();
        assert!((consensus.node(ab_node).unwrap().branch_length.unwrap() - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_leaf_set_mismatch_is_error() {
        let input = trees(&["((A,B),(C,D));", "((A,B),(C,E));"]);
        assert!(consensus_tree(&input, 0.5).is_err());
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(consensus_tree(&[], 0.5).is_err());
    }

    #[test]
    fn test_bad_frequency_is_error() {
        let input = trees(&["((A,B),(C,D));"]);
        assert!(consensus_tree(&input, 1.5).is_err());
    }
}
