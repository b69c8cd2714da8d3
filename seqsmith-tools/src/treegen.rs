//! Tree generation by shelling out to RAxML, PhyML, or FastTree.

use crate::discovery;
use anyhow::{bail, Context, Result};
use seqsmith_bio::alphabet::Alphabet;
use seqsmith_bio::collection::SeqCollection;
use seqsmith_bio::formats::{self, SeqFormat};
use seqsmith_core::Config;
use seqsmith_phylo::TreeSet;
use seqsmith_utils::{workspace::find_output, TempWorkspace};
use std::path::PathBuf;
use std::process::Command;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeBuilder {
    Raxml,
    Phyml,
    Fasttree,
}

impl FromStr for TreeBuilder {
    type Err = seqsmith_core::SeqsmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raxml" => Ok(TreeBuilder::Raxml),
            "phyml" => Ok(TreeBuilder::Phyml),
            "fasttree" => Ok(TreeBuilder::Fasttree),
            other => Err(seqsmith_core::SeqsmithError::InvalidInput(format!(
                "unknown tree builder '{}'; pick raxml, phyml, or fasttree",
                other
            ))),
        }
    }
}

impl TreeBuilder {
    fn binary(&self) -> Result<PathBuf> {
        let tools = &Config::global().tools;
        let (override_path, candidates): (Option<&str>, &[&str]) = match self {
            TreeBuilder::Raxml => (
                tools.raxml.as_deref(),
                &["raxmlHPC", "raxmlHPC-PTHREADS-SSE3", "raxmlHPC-SSE3", "raxml"],
            ),
            TreeBuilder::Phyml => (tools.phyml.as_deref(), &["phyml", "PhyML"]),
            TreeBuilder::Fasttree => (
                tools.fasttree.as_deref(),
                &["fasttree", "FastTree", "FastTreeMP"],
            ),
        };
        discovery::resolve(override_path, candidates).with_context(|| {
            format!(
                "no {} binary found on PATH; install it or set the path in the config file",
                self.name()
            )
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            TreeBuilder::Raxml => "raxml",
            TreeBuilder::Phyml => "phyml",
            TreeBuilder::Fasttree => "fasttree",
        }
    }
}

fn render(collection: &SeqCollection, format: SeqFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    formats::write(
        &mut buffer,
        &collection.records,
        format,
        collection.alphabet,
        80,
    )?;
    Ok(buffer)
}

/// Build a tree from an aligned sequence collection with the chosen
/// external program. `extra_args` are passed through verbatim.
pub fn generate_tree(
    collection: &SeqCollection,
    builder: TreeBuilder,
    extra_args: &[String],
) -> Result<TreeSet> {
    if collection.is_empty() {
        bail!("cannot build a tree from an empty collection");
    }
    let binary = builder.binary()?;
    let nucleic = collection.alphabet != Some(Alphabet::Protein);
    let mut workspace = TempWorkspace::new(builder.name())?;

    let newick = match builder {
        TreeBuilder::Raxml => {
            let input = workspace.write_file("input.phy", &render(collection, SeqFormat::Phylip)?)?;
            let model = if nucleic { "GTRCAT" } else { "PROTCATLG" };
            let mut cmd = Command::new(&binary);
            cmd.arg("-s")
                .arg(&input)
                .arg("-n")
                .arg("seqsmith")
                .arg("-m")
                .arg(model)
                .arg("-p")
                .arg("12345")
                .arg("-w")
                .arg(&workspace.root)
                .args(extra_args);
            run(&mut cmd, "raxml", &mut workspace)?;

            let best = find_output(
                &workspace.root,
                &["RAxML_bestTree.seqsmith", "RAxML_result.seqsmith"],
            )
            .context("raxml finished but produced no tree file")?;
            std::fs::read_to_string(best)?
        }
        TreeBuilder::Phyml => {
            let input = workspace.write_file("input.phy", &render(collection, SeqFormat::Phylip)?)?;
            let mut cmd = Command::new(&binary);
            cmd.arg("-i")
                .arg(&input)
                .arg("-d")
                .arg(if nucleic { "nt" } else { "aa" })
                .arg("--no_memory_check")
                .args(extra_args);
            run(&mut cmd, "phyml", &mut workspace)?;

            let tree_file = find_output(
                &workspace.root,
                &["input.phy_phyml_tree.txt", "input.phy_phyml_tree"],
            )
            .context("phyml finished but produced no tree file")?;
            std::fs::read_to_string(tree_file)?
        }
        TreeBuilder::Fasttree => {
            let input = workspace.write_file("input.fa", &render(collection, SeqFormat::Fasta)?)?;
            let mut cmd = Command::new(&binary);
            if nucleic {
                cmd.arg("-nt");
            }
            cmd.args(extra_args).arg(&input);
            let output = run(&mut cmd, "fasttree", &mut workspace)?;
            String::from_utf8_lossy(&output.stdout).to_string()
        }
    };

    let trees = TreeSet::from_str_data(&newick, None)
        .with_context(|| format!("{} output was not parseable Newick", builder.name()))?;
    Ok(trees)
}

fn run(
    cmd: &mut Command,
    what: &str,
    workspace: &mut TempWorkspace,
) -> Result<std::process::Output> {
    tracing::info!(?cmd, "running {}", what);
    let output = cmd
        .output()
        .with_context(|| format!("failed to launch {}", what))?;
    if !output.status.success() {
        workspace.mark_failed();
        bail!(
            "{} exited with {}: {}",
            what,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output)
}
