//! End-to-end tree manipulation scenarios.

use seqsmith_phylo::distance::{self, Metric};
use seqsmith_phylo::{ascii, consensus, newick, ops, TreeFormat, TreeSet};

const BALANCED: &str = "((A:0.1,B:0.2)0.9:0.3,(C:0.4,D:0.5)0.8:0.6);";

#[test]
fn parse_prune_root_write() {
    let mut set = TreeSet::from_str_data(BALANCED, None).unwrap();
    assert_eq!(set.len(), 1);

    let tree = &mut set.trees[0];
    let pruned = ops::prune_taxa(tree, &["D".to_string()]).unwrap();
    assert_eq!(pruned, vec!["D"]);
    assert_eq!(tree.leaf_labels(), vec!["A", "B", "C"]);

    ops::root(tree, &["A".to_string()]).unwrap();
    let rendered = set.write_string();
    let reparsed = TreeSet::from_str_data(&rendered, None).unwrap();
    let mut labels = reparsed.trees[0].leaf_labels();
    labels.sort();
    assert_eq!(labels, vec!["A", "B", "C"]);
}

#[test]
fn newick_to_nexus_and_back() {
    let mut set = TreeSet::from_str_data(BALANCED, None).unwrap();
    set.out_format = TreeFormat::Nexus;
    let nexus_text = set.write_string();
    assert!(nexus_text.starts_with("#NEXUS"));

    let reparsed = TreeSet::from_str_data(&nexus_text, None).unwrap();
    assert_eq!(reparsed.in_format, TreeFormat::Nexus);
    assert_eq!(
        reparsed.trees[0].leaf_label_set(),
        set.trees[0].leaf_label_set()
    );
}

#[test]
fn consensus_majority_and_distance_agree() {
    let inputs = [
        "((A,B),(C,D));",
        "((A,B),(C,D));",
        "((A,C),(B,D));",
    ];
    let trees: Vec<_> = inputs
        .iter()
        .map(|s| newick::parse(s).unwrap())
        .collect();

    let consensus = consensus::consensus_tree(&trees, 0.5).unwrap();
    // AB appears in 2/3 of the trees and survives majority rule
    let has_ab = consensus.preorder().into_iter().any(|id| {
        let clade: Vec<String> = consensus.subtree_leaf_labels(id).into_iter().collect();
        clade == vec!["A", "B"]
    });
    assert!(has_ab);

    // The consensus is closer to the majority topology than the minority one
    let to_majority = distance::distance(&consensus, &trees[0], Metric::UnweightedRf).unwrap();
    let to_minority = distance::distance(&consensus, &trees[2], Metric::UnweightedRf).unwrap();
    assert!(to_majority <= to_minority);
}

#[test]
fn distances_are_symmetric() {
    let a = newick::parse("((A:1,B:2):3,(C:4,D:5):6);").unwrap();
    let b = newick::parse("((A:2,C:2):2,(B:2,D:2):2);").unwrap();
    for metric in [Metric::UnweightedRf, Metric::WeightedRf, Metric::Euclidean] {
        let ab = distance::distance(&a, &b, metric).unwrap();
        let ba = distance::distance(&b, &a, metric).unwrap();
        assert!((ab - ba).abs() < 1e-12, "{:?} not symmetric", metric);
        let aa = distance::distance(&a, &a, metric).unwrap();
        assert!(aa.abs() < 1e-12, "{:?} self-distance not zero", metric);
    }
}

#[test]
fn ascii_rendering_contains_all_taxa() {
    let set = TreeSet::from_str_data(BALANCED, None).unwrap();
    let art = ascii::render(&set.trees[0]);
    for taxon in ["A", "B", "C", "D"] {
        assert!(art.contains(taxon));
    }
    assert!(art.lines().count() >= 4);
}

#[test]
fn hash_then_rename_back() {
    let mut set = TreeSet::from_str_data("((alpha,beta),(gamma,delta));", None).unwrap();
    let table = ops::hash_ids(&mut set.trees[0]);
    assert_eq!(table.len(), 4);
    // Every original label is recoverable through the table
    for (hash, original) in &table {
        ops::rename(&mut set.trees[0], &regex::escape(hash), original).unwrap();
    }
    let mut labels = set.trees[0].leaf_labels();
    labels.sort();
    assert_eq!(labels, vec!["alpha", "beta", "delta", "gamma"]);
}
