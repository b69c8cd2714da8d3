//! Topology distances: Robinson-Foulds (unweighted and weighted) and the
//! Euclidean branch-score distance.

use crate::tree::Tree;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::collections::{BTreeMap, BTreeSet};

/// Which tree-distance metric to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Unweighted Robinson-Foulds, normalized to [0, 1]
    UnweightedRf,
    /// Weighted Robinson-Foulds (sum of branch-length differences)
    WeightedRf,
    /// Euclidean branch-score distance
    Euclidean,
}

impl std::str::FromStr for Metric {
    type Err = SeqsmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uwrf" | "rf" => Ok(Metric::UnweightedRf),
            "wrf" => Ok(Metric::WeightedRf),
            "ed" | "euclidean" => Ok(Metric::Euclidean),
            other => Err(SeqsmithError::InvalidInput(format!(
                "unknown distance metric '{}'; pick wrf, uwrf, or ed",
                other
            ))),
        }
    }
}

type SplitMap = BTreeMap<BTreeSet<String>, f64>;

/// Non-trivial unrooted splits of a tree with their branch lengths.
///
/// Each internal edge yields the leaf set below it, canonicalized to the
/// side containing the smallest leaf label so that complementary clades
/// collapse onto one split. The two root-adjacent edges of a rooted binary
/// tree describe the same split; their lengths are summed.
fn splits(tree: &Tree) -> SplitMap {
    let all_leaves = tree.leaf_label_set();
    let n_leaves = all_leaves.len();
    let smallest = all_leaves.iter().next().cloned();
    let mut map = SplitMap::new();

    for id in tree.preorder() {
        let node = tree.node(id).expect("node id from traversal");
        if node.is_leaf() || node.is_root() {
            continue;
        }
        let clade = tree.subtree_leaf_labels(id);
        if clade.len() <= 1 || clade.len() >= n_leaves - 1 {
            continue;
        }
        let canonical = match &smallest {
            Some(first) if !clade.contains(first) => {
                all_leaves.difference(&clade).cloned().collect()
            }
            _ => clade,
        };
        *map.entry(canonical).or_insert(0.0) += node.branch_length.unwrap_or(0.0);
    }
    map
}

fn validate_same_leaves(a: &Tree, b: &Tree) -> SeqsmithResult<()> {
    if a.leaf_label_set() != b.leaf_label_set() {
        return Err(SeqsmithError::InvalidInput(
            "trees have different leaf sets".to_string(),
        ));
    }
    Ok(())
}

/// Raw Robinson-Foulds distance: the number of splits found in exactly one
/// of the two trees.
pub fn robinson_foulds(a: &Tree, b: &Tree) -> SeqsmithResult<usize> {
    validate_same_leaves(a, b)?;
    let sa = splits(a);
    let sb = splits(b);
    let keys_a: BTreeSet<_> = sa.keys().collect();
    let keys_b: BTreeSet<_> = sb.keys().collect();
    Ok(keys_a.symmetric_difference(&keys_b).count())
}

/// Robinson-Foulds normalized by the maximum possible distance for the
/// leaf count, 2*(n-3) non-trivial splits per unrooted pair (0.0 for trees
/// too small to have any).
pub fn robinson_foulds_normalized(a: &Tree, b: &Tree) -> SeqsmithResult<f64> {
    let rf = robinson_foulds(a, b)?;
    let n = a.leaf_label_set().len();
    if n < 4 {
        return Ok(0.0);
    }
    let max_rf = 2 * (n - 3);
    if max_rf == 0 {
        return Ok(0.0);
    }
    Ok(rf as f64 / max_rf as f64)
}

/// Weighted Robinson-Foulds: sum over all splits of the absolute difference
/// in branch length, counting a split absent from one tree at length zero.
pub fn weighted_robinson_foulds(a: &Tree, b: &Tree) -> SeqsmithResult<f64> {
    validate_same_leaves(a, b)?;
    let sa = splits(a);
    let sb = splits(b);
    let mut total = 0.0;
    for (split, &la) in &sa {
        let lb = sb.get(split).copied().unwrap_or(0.0);
        total += (la - lb).abs();
    }
    for (split, &lb) in &sb {
        if !sa.contains_key(split) {
            total += lb.abs();
        }
    }
    Ok(total)
}

/// Euclidean branch-score distance: square root of the summed squared
/// branch-length differences over all splits.
pub fn euclidean_distance(a: &Tree, b: &Tree) -> SeqsmithResult<f64> {
    validate_same_leaves(a, b)?;
    let sa = splits(a);
    let sb = splits(b);
    let mut sum_sq = 0.0;
    for (split, &la) in &sa {
        let lb = sb.get(split).copied().unwrap_or(0.0);
        sum_sq += (la - lb).powi(2);
    }
    for (split, &lb) in &sb {
        if !sa.contains_key(split) {
            sum_sq += lb.powi(2);
        }
    }
    Ok(sum_sq.sqrt())
}

/// Dispatch on the metric.
pub fn distance(a: &Tree, b: &Tree, metric: Metric) -> SeqsmithResult<f64> {
    match metric {
        Metric::UnweightedRf => robinson_foulds_normalized(a, b),
        Metric::WeightedRf => weighted_robinson_foulds(a, b),
        Metric::Euclidean => euclidean_distance(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick;

    fn tree(s: &str) -> Tree {
        newick::parse(s).unwrap()
    }

    #[test]
    fn test_rf_identical() {
        let a = tree("((A,B),(C,D));");
        let b = tree("((A,B),(C,D));");
        assert_eq!(robinson_foulds(&a, &b).unwrap(), 0);
        assert_eq!(robinson_foulds_normalized(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_rf_different_topologies() {
        let a = tree("((A,B),(C,D));");
        let b = tree("((A,C),(B,D));");
        assert!(robinson_foulds(&a, &b).unwrap() > 0);
        let nrf = robinson_foulds_normalized(&a, &b).unwrap();
        assert!(nrf > 0.0 && nrf <= 1.0);
    }

    #[test]
    fn test_rf_leaf_mismatch_is_error() {
        let a = tree("((A,B),(C,D));");
        let b = tree("((A,B),(C,E));");
        assert!(robinson_foulds(&a, &b).is_err());
    }

    #[test]
    fn test_wrf_counts_length_differences() {
        let a = tree("(((A:1,B:1):1,C:1),(D:1,E:1):1);");
        let b = tree("(((A:1,B:1):3,C:1),(D:1,E:1):1);");
        let wrf = weighted_robinson_foulds(&a, &b).unwrap();
        assert!((wrf - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_wrf_identical_is_zero() {
        let a = tree("((A:1,B:2):3,(C:4,D:5):6);");
        let b = tree("((A:1,B:2):3,(C:4,D:5):6);");
        assert!(weighted_robinson_foulds(&a, &b).unwrap().abs() < 1e-10);
    }

    #[test]
    fn test_euclidean() {
        let a = tree("(((A:1,B:1):1,C:1),(D:1,E:1):2);");
        let b = tree("(((A:1,B:1):4,C:1),(D:1,E:1):6);");
        // Shared splits differ by 3 and 4: sqrt(9 + 16) = 5
        let ed = euclidean_distance(&a, &b).unwrap();
        assert!((ed - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("wrf".parse::<Metric>().unwrap(), Metric::WeightedRf);
        assert_eq!("uwrf".parse::<Metric>().unwrap(), Metric::UnweightedRf);
        assert_eq!("ed".parse::<Metric>().unwrap(), Metric::Euclidean);
        assert!("banana".parse::<Metric>().is_err());
    }
}
