//! An ordered set of trees plus its file formats, mirroring the sequence
//! collection on the other side of the toolkit.

use crate::newick;
use crate::nexus;
use crate::tree::Tree;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TreeFormat {
    Newick,
    Nexus,
}

impl TreeFormat {
    pub fn name(&self) -> &'static str {
        match self {
            TreeFormat::Newick => "newick",
            TreeFormat::Nexus => "nexus",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TreeFormat::Newick => "nwk",
            TreeFormat::Nexus => "nex",
        }
    }
}

impl std::fmt::Display for TreeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TreeFormat {
    type Err = SeqsmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newick" | "nwk" | "tree" => Ok(TreeFormat::Newick),
            "nexus" | "nex" | "nxs" => Ok(TreeFormat::Nexus),
            other => Err(SeqsmithError::Format(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeSet {
    pub trees: Vec<Tree>,
    pub in_format: TreeFormat,
    pub out_format: TreeFormat,
}

impl TreeSet {
    pub fn from_trees(trees: Vec<Tree>) -> Self {
        Self {
            trees,
            in_format: TreeFormat::Newick,
            out_format: TreeFormat::Newick,
        }
    }

    pub fn from_str_data(data: &str, in_format: Option<TreeFormat>) -> SeqsmithResult<Self> {
        if data.trim().is_empty() {
            return Err(SeqsmithError::InvalidInput("input is empty".to_string()));
        }
        let format = match in_format {
            Some(f) => f,
            None if data.trim_start().starts_with("#NEXUS")
                || data.trim_start().starts_with("#nexus") =>
            {
                TreeFormat::Nexus
            }
            None => TreeFormat::Newick,
        };
        let trees = match format {
            TreeFormat::Newick => newick::parse_trees(data)?,
            TreeFormat::Nexus => nexus::parse(data)?,
        };
        Ok(Self {
            trees,
            in_format: format,
            out_format: format,
        })
    }

    pub fn from_path<P: AsRef<Path>>(
        path: P,
        in_format: Option<TreeFormat>,
    ) -> SeqsmithResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_str_data(&data, in_format)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn write_string(&self) -> String {
        match self.out_format {
            TreeFormat::Newick => {
                let mut out = String::new();
                for tree in &self.trees {
                    out.push_str(&newick::write(tree));
                    out.push('\n');
                }
                out
            }
            TreeFormat::Nexus => nexus::write(&self.trees),
        }
    }
}
