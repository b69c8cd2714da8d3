//! The treesmith binary: one flag per phylogenetic-tree operation. Inputs
//! are Newick or NEXUS tree files (or literal Newick strings); tree
//! generation takes a sequence alignment instead.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use seqsmith_bio::collection::SeqCollection;
use seqsmith_cli::{init_tracing, report_error, stderr_message};
use seqsmith_phylo::distance::{self, Metric};
use seqsmith_phylo::{ascii, consensus, ops, TreeFormat, TreeSet};
use seqsmith_tools::TreeBuilder;
use seqsmith_utils::display::columnize;
use std::path::Path;
use std::process;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(
    name = "treesmith",
    version,
    about = "Command-line toolkit for phylogenetic tree files",
    long_about = "Root, prune, compare, and rewrite phylogenetic trees, or build new \
                  ones through locally installed RAxML/PhyML/FastTree binaries. Each \
                  operation is a flag; supply tree files (or literal Newick strings) \
                  as positional arguments."
)]
struct Cli {
    /// Tree files or literal Newick strings (an alignment file for -gt)
    #[arg(value_name = "TREES", required = true, num_args = 1..)]
    trees: Vec<String>,

    /// Output all leaf labels; use -p to set the column count
    #[arg(long, alias = "li")]
    list_ids: bool,

    /// Replace a pattern in node labels with a substitution
    #[arg(long, alias = "ri", num_args = 2, value_names = ["PATTERN", "SUBSTITUTION"])]
    rename_ids: Option<Vec<String>>,

    /// Rename every leaf to a unique 10-character hash
    #[arg(long, alias = "hsi")]
    hash_ids: bool,

    /// Remove leaves matching the patterns, suppressing unifurcations
    #[arg(long, alias = "pt", num_args = 1.., value_name = "REGEX")]
    prune_taxa: Option<Vec<String>>,

    /// Root the trees: no value roots at the first leaf, one value on that
    /// leaf's edge, several values at their common ancestor
    #[arg(long, alias = "rt", num_args = 0.., value_name = "TAXON")]
    root: Option<Vec<String>>,

    /// Collapse a binary root into a trifurcation
    #[arg(long, alias = "ur")]
    unroot: bool,

    /// List the leaves unique to each of exactly two trees
    #[arg(long, alias = "su")]
    show_unique: bool,

    /// Contract internal edges with support (or, lacking support, branch
    /// length) below the threshold
    #[arg(long, alias = "cp", value_name = "THRESHOLD")]
    collapse_polytomies: Option<f64>,

    /// Arbitrarily resolve polytomies with near-zero branch lengths
    #[arg(long, alias = "sp")]
    split_polytomies: bool,

    /// Majority-rule consensus of the input trees (default frequency 0.5)
    #[arg(long, alias = "ct", value_name = "FREQUENCY", num_args = 0..=1,
          default_missing_value = "0.5")]
    consensus_tree: Option<f64>,

    /// Pairwise distances between the input trees: wrf, uwrf, or ed
    #[arg(long, alias = "dis", value_name = "METRIC", num_args = 0..=1,
          default_missing_value = "uwrf")]
    distance: Option<String>,

    /// Build a tree from a sequence alignment: raxml, phyml, or fasttree.
    /// Extra binary arguments go through -p
    #[arg(long, alias = "gt", value_name = "PROGRAM")]
    generate_tree: Option<String>,

    /// Render the trees as ASCII art
    #[arg(long, alias = "ptr")]
    print_trees: bool,

    /// Rewrite the input file in place. Be careful!
    #[arg(short = 'i', long)]
    in_place: bool,

    /// Free-form arguments consumed by some operations
    #[arg(short = 'p', long, num_args = 1..)]
    params: Option<Vec<String>>,

    /// Suppress stderr messages
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Output format override (newick or nexus)
    #[arg(short = 'o', long, value_name = "FORMAT")]
    out_format: Option<String>,

    /// Input format override
    #[arg(short = 'f', long, value_name = "FORMAT")]
    in_format: Option<String>,
}

impl Cli {
    fn params(&self) -> &[String] {
        self.params.as_deref().unwrap_or(&[])
    }

    fn columns(&self) -> usize {
        self.params()
            .first()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1)
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        process::exit(report_error(&e));
    }
}

fn parse_format(spec: &Option<String>) -> Result<Option<TreeFormat>> {
    spec.as_deref()
        .map(|s| TreeFormat::from_str(s).map_err(anyhow::Error::from))
        .transpose()
}

fn load_all(cli: &Cli) -> Result<TreeSet> {
    let in_format = parse_format(&cli.in_format)?;
    let mut merged: Option<TreeSet> = None;
    for input in &cli.trees {
        let set = if Path::new(input).is_file() {
            TreeSet::from_path(input, in_format)
                .with_context(|| format!("failed to read '{}'", input))?
        } else {
            TreeSet::from_str_data(input, in_format)
                .with_context(|| format!("failed to parse '{}'", input))?
        };
        match merged.as_mut() {
            Some(m) => m.trees.extend(set.trees),
            None => merged = Some(set),
        }
    }
    let mut merged = merged.ok_or_else(|| anyhow!("no tree input given"))?;
    if let Some(format) = parse_format(&cli.out_format)? {
        merged.out_format = format;
    }
    Ok(merged)
}

fn print_trees(set: &TreeSet, cli: &Cli, in_place_allowed: bool) -> Result<()> {
    if set.is_empty() {
        eprintln!("Nothing returned.");
        return Ok(());
    }
    let output = set.write_string();

    if cli.in_place && in_place_allowed {
        let target = Path::new(&cli.trees[0]);
        if target.is_file() {
            std::fs::write(target, &output)?;
            stderr_message(
                &format!("File over-written at:\n{}", target.display()),
                cli.quiet,
            );
            return Ok(());
        }
        stderr_message(
            "Warning: the -i flag was passed in, but the positional argument doesn't seem \
             to be a file. Nothing was written.",
            cli.quiet,
        );
    }
    println!("{}", output.trim_end());
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    // Tree generation from an alignment
    if let Some(program) = &cli.generate_tree {
        let builder = TreeBuilder::from_str(program)?;
        let seqs = SeqCollection::from_input(&cli.trees[0], None)?;
        let mut trees = seqsmith_tools::generate_tree(&seqs, builder, cli.params())?;
        if let Some(format) = parse_format(&cli.out_format)? {
            trees.out_format = format;
        }
        return print_trees(&trees, cli, false);
    }

    // List leaf labels
    if cli.list_ids {
        let set = load_all(cli)?;
        for (i, tree) in set.trees.iter().enumerate() {
            if set.trees.len() > 1 {
                println!("# tree {}", i + 1);
            }
            println!("{}", columnize(&tree.leaf_labels(), cli.columns()));
        }
        return Ok(());
    }

    // Rename labels
    if let Some(args) = &cli.rename_ids {
        let mut set = load_all(cli)?;
        for tree in &mut set.trees {
            ops::rename(tree, &args[0], &args[1])?;
        }
        return print_trees(&set, cli, true);
    }

    // Hash leaf labels
    if cli.hash_ids {
        let mut set = load_all(cli)?;
        let mut report = String::from("# Hash table\n");
        for tree in &mut set.trees {
            for (hash, original) in ops::hash_ids(tree) {
                report.push_str(&format!("{},{}\n", hash, original));
            }
        }
        stderr_message(&report, cli.quiet);
        return print_trees(&set, cli, true);
    }

    // Prune taxa
    if let Some(patterns) = &cli.prune_taxa {
        let mut set = load_all(cli)?;
        let mut pruned = Vec::new();
        for tree in &mut set.trees {
            pruned.extend(ops::prune_taxa(tree, patterns)?);
        }
        if pruned.is_empty() {
            stderr_message("No taxa matched; nothing pruned.", cli.quiet);
        } else {
            stderr_message(&format!("# Pruned taxa\n{}", pruned.join(", ")), cli.quiet);
        }
        return print_trees(&set, cli, true);
    }

    // Rooting
    if let Some(taxa) = &cli.root {
        let mut set = load_all(cli)?;
        for tree in &mut set.trees {
            ops::root(tree, taxa)?;
        }
        return print_trees(&set, cli, true);
    }
    if cli.unroot {
        let mut set = load_all(cli)?;
        for tree in &mut set.trees {
            ops::unroot(tree)?;
        }
        return print_trees(&set, cli, true);
    }

    // Leaves unique to one of two trees
    if cli.show_unique {
        let set = load_all(cli)?;
        if set.len() != 2 {
            return Err(anyhow!(
                "show_unique needs exactly two trees, got {}",
                set.len()
            ));
        }
        let (only_first, only_second) = ops::show_unique(&set.trees[0], &set.trees[1]);
        println!("# Unique to the first tree");
        println!("{}", columnize(&only_first, cli.columns()));
        println!("# Unique to the second tree");
        println!("{}", columnize(&only_second, cli.columns()));
        return Ok(());
    }

    // Polytomies
    if let Some(threshold) = cli.collapse_polytomies {
        let mut set = load_all(cli)?;
        for tree in &mut set.trees {
            ops::collapse_polytomies(tree, threshold)?;
        }
        return print_trees(&set, cli, true);
    }
    if cli.split_polytomies {
        let mut set = load_all(cli)?;
        for tree in &mut set.trees {
            ops::split_polytomies(tree)?;
        }
        return print_trees(&set, cli, true);
    }

    // Consensus
    if let Some(frequency) = cli.consensus_tree {
        let set = load_all(cli)?;
        let consensus = consensus::consensus_tree(&set.trees, frequency)?;
        let mut output = TreeSet::from_trees(vec![consensus]);
        output.out_format = set.out_format;
        return print_trees(&output, cli, false);
    }

    // Pairwise distances
    if let Some(metric) = &cli.distance {
        let metric = Metric::from_str(metric)?;
        let set = load_all(cli)?;
        if set.len() < 2 {
            return Err(anyhow!("distance needs at least two trees"));
        }
        for i in 0..set.trees.len() {
            for j in i + 1..set.trees.len() {
                let value = distance::distance(&set.trees[i], &set.trees[j], metric)?;
                println!("tree_{}\ttree_{}\t{}", i + 1, j + 1, value);
            }
        }
        return Ok(());
    }

    // ASCII rendering
    if cli.print_trees {
        let set = load_all(cli)?;
        for (i, tree) in set.trees.iter().enumerate() {
            if set.trees.len() > 1 {
                println!("# tree {}", i + 1);
            }
            print!("{}", ascii::render(tree));
        }
        return Ok(());
    }

    Err(anyhow!(
        "no operation requested; run with --help to see what treesmith can do"
    ))
}
