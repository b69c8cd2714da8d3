//! NEXUS trees-block reader and writer, with translate-table support.

use crate::newick;
use crate::tree::Tree;
use seqsmith_core::{SeqsmithError, SeqsmithResult};
use std::collections::HashMap;

pub fn parse(input: &str) -> SeqsmithResult<Vec<Tree>> {
    let mut lines = input.lines();
    let header = lines.next().unwrap_or_default().trim();
    if !header.eq_ignore_ascii_case("#nexus") {
        return Err(SeqsmithError::Parse(
            "NEXUS input must start with #NEXUS".to_string(),
        ));
    }

    let mut translate: HashMap<String, String> = HashMap::new();
    let mut trees = Vec::new();
    let mut in_translate = false;

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('[') {
            continue;
        }
        let lowered = trimmed.to_ascii_lowercase();

        if lowered.starts_with("translate") {
            in_translate = true;
            continue;
        }
        if in_translate {
            // Entries look like "1 taxon_a," until a terminating ';'
            for entry in trimmed.trim_end_matches(';').split(',') {
                let mut parts = entry.split_whitespace();
                if let (Some(key), Some(name)) = (parts.next(), parts.next()) {
                    translate.insert(key.to_string(), name.trim_matches('\'').to_string());
                }
            }
            if trimmed.ends_with(';') {
                in_translate = false;
            }
            continue;
        }

        if lowered.starts_with("tree ") {
            let newick_part = match trimmed.split_once('=') {
                Some((_, rest)) => rest.trim(),
                None => continue,
            };
            let mut tree = newick::parse(newick_part)?;
            if !translate.is_empty() {
                apply_translation(&mut tree, &translate);
            }
            trees.push(tree);
        }
    }

    if trees.is_empty() {
        return Err(SeqsmithError::Parse(
            "NEXUS input has no tree statements".to_string(),
        ));
    }
    Ok(trees)
}

fn apply_translation(tree: &mut Tree, translate: &HashMap<String, String>) {
    for id in tree.preorder() {
        let node = tree.node_mut(id).expect("node id from traversal");
        if let Some(label) = &node.label {
            if let Some(name) = translate.get(label) {
                node.label = Some(name.clone());
            }
        }
    }
}

pub fn write(trees: &[Tree]) -> String {
    let mut out = String::from("#NEXUS\nbegin trees;\n");
    for (i, tree) in trees.iter().enumerate() {
        out.push_str(&format!("    tree tree_{} = {}\n", i + 1, newick::write(tree)));
    }
    out.push_str("end;\n");
    out
}
