//! Wrappers around external bioinformatics binaries: the BLAST family for
//! similarity search and RAxML/PhyML/FastTree for tree building. Binaries
//! are discovered on PATH (overridable through configuration or explicit
//! parameters), probed with `-version`, and run inside temp workspaces.

pub mod blast;
pub mod discovery;
pub mod treegen;

pub use blast::{bl2seq, blast_search, purge, BlastBinaries, HitSummary};
pub use discovery::{find_in_path, identify_binary};
pub use treegen::{generate_tree, TreeBuilder};
