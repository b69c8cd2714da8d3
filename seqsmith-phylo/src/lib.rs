//! Phylogenetic trees and the operations behind the `treesmith` binary:
//! Newick/NEXUS I/O, rooting, pruning, polytomy handling, consensus, and
//! topology distances.

pub mod ascii;
pub mod consensus;
pub mod distance;
pub mod newick;
pub mod nexus;
pub mod ops;
pub mod tree;
pub mod treeset;

pub use tree::{Node, NodeId, Tree};
pub use treeset::{TreeFormat, TreeSet};
