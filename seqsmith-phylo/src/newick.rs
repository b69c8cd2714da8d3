//! Newick parser and writer.
//!
//! Grammar:
//! ```text
//! tree     = subtree ';'
//! subtree  = '(' children ')' label | label
//! children = subtree (',' subtree)*
//! label    = name? (':' length)?
//! ```
//!
//! Extensions over the bare grammar: quoted labels, bracket comments
//! (skipped), bare numeric labels on internal nodes read as support values,
//! and any number of trees per input.

use crate::tree::{Node, NodeId, Tree};
use seqsmith_core::{SeqsmithError, SeqsmithResult};

/// Parse every tree in the input.
pub fn parse_trees(input: &str) -> SeqsmithResult<Vec<Tree>> {
    let mut parser = Parser::new(input.as_bytes());
    let mut trees = Vec::new();
    loop {
        parser.skip_filler();
        if parser.at_end() {
            break;
        }
        trees.push(parser.parse_tree()?);
    }
    if trees.is_empty() {
        return Err(SeqsmithError::Parse("no Newick trees found".to_string()));
    }
    Ok(trees)
}

/// Parse exactly one tree.
pub fn parse(input: &str) -> SeqsmithResult<Tree> {
    let trees = parse_trees(input)?;
    trees
        .into_iter()
        .next()
        .ok_or_else(|| SeqsmithError::Parse("no Newick trees found".to_string()))
}

/// Serialize a tree to Newick.
pub fn write(tree: &Tree) -> String {
    let mut buf = String::new();
    write_subtree(tree, tree.root(), &mut buf);
    buf.push(';');
    buf
}

fn write_subtree(tree: &Tree, id: NodeId, buf: &mut String) {
    let node = tree.node(id).expect("node id from traversal");
    if !node.children.is_empty() {
        buf.push('(');
        for (i, &child) in node.children.iter().enumerate() {
            if i > 0 {
                buf.push(',');
            }
            write_subtree(tree, child, buf);
        }
        buf.push(')');
    }
    if let Some(ref label) = node.label {
        if label
            .chars()
            .any(|c| matches!(c, ' ' | '(' | ')' | ',' | ':' | ';' | '\''))
        {
            buf.push('\'');
            buf.push_str(&label.replace('\'', "''"));
            buf.push('\'');
        } else {
            buf.push_str(label);
        }
    } else if let Some(support) = node.support {
        buf.push_str(&format_float(support));
    }
    if let Some(len) = node.branch_length {
        buf.push(':');
        buf.push_str(&format_float(len));
    }
}

fn format_float(value: f64) -> String {
    let s = format!("{:.10}", value);
    let s = s.trim_end_matches('0');
    s.trim_end_matches('.').to_string()
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    nodes: Vec<Node>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            nodes: Vec::new(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn parse_tree(&mut self) -> SeqsmithResult<Tree> {
        self.nodes.clear();
        let root = self.parse_subtree(None)?;
        self.skip_filler();
        if self.peek() != Some(b';') {
            return Err(SeqsmithError::Parse(
                "expected ';' at end of Newick string".to_string(),
            ));
        }
        self.pos += 1;
        Tree::from_nodes(std::mem::take(&mut self.nodes), root)
    }

    fn parse_subtree(&mut self, parent: Option<NodeId>) -> SeqsmithResult<NodeId> {
        self.skip_filler();
        let id = self.alloc_node(parent);

        if self.peek() == Some(b'(') {
            self.pos += 1;
            let first = self.parse_subtree(Some(id))?;
            self.nodes[id].children.push(first);

            loop {
                self.skip_filler();
                if self.peek() == Some(b',') {
                    self.pos += 1;
                    let child = self.parse_subtree(Some(id))?;
                    self.nodes[id].children.push(child);
                } else {
                    break;
                }
            }
            self.skip_filler();
            if self.peek() != Some(b')') {
                return Err(SeqsmithError::Parse(
                    "expected ')' in Newick string".to_string(),
                ));
            }
            self.pos += 1;
        }

        self.parse_label(id)?;
        Ok(id)
    }

    fn parse_label(&mut self, id: NodeId) -> SeqsmithResult<()> {
        self.skip_filler();

        let name = if self.peek() == Some(b'\'') {
            self.parse_quoted_name()?
        } else {
            self.parse_bare_name()
        };
        if !name.is_empty() {
            // A bare number on an internal node is a support value
            let internal = !self.nodes[id].children.is_empty();
            match name.parse::<f64>() {
                Ok(value) if internal => self.nodes[id].support = Some(value),
                _ => self.nodes[id].label = Some(name),
            }
        }

        self.skip_filler();
        if self.peek() == Some(b':') {
            self.pos += 1;
            self.skip_filler();
            let text = self.parse_float_str();
            if text.is_empty() {
                return Err(SeqsmithError::Parse(
                    "expected number after ':'".to_string(),
                ));
            }
            let len: f64 = text
                .parse()
                .map_err(|_| SeqsmithError::Parse(format!("invalid branch length: '{}'", text)))?;
            self.nodes[id].branch_length = Some(len);
            self.skip_filler();
        }
        Ok(())
    }

    fn parse_bare_name(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b':' | b',' | b')' | b'(' | b';' | b'[' => break,
                b' ' | b'\t' | b'\n' | b'\r' => break,
                _ => self.pos += 1,
            }
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn parse_quoted_name(&mut self) -> SeqsmithResult<String> {
        self.pos += 1; // opening quote
        let mut name = String::new();
        loop {
            match self.peek() {
                Some(b'\'') => {
                    // Doubled quote is an escaped quote
                    if self.input.get(self.pos + 1) == Some(&b'\'') {
                        name.push('\'');
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        return Ok(name);
                    }
                }
                Some(c) => {
                    name.push(c as char);
                    self.pos += 1;
                }
                None => {
                    return Err(SeqsmithError::Parse(
                        "unterminated quoted label".to_string(),
                    ))
                }
            }
        }
    }

    fn parse_float_str(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b'0'..=b'9' | b'.' | b'-' | b'+' | b'e' | b'E' => self.pos += 1,
                _ => break,
            }
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn alloc_node(&mut self, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            id,
            parent,
            children: Vec::new(),
            branch_length: None,
            label: None,
            support: None,
        });
        id
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Skip whitespace and bracket comments
    fn skip_filler(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') => self.pos += 1,
                Some(b'[') => {
                    while self.pos < self.input.len() && self.input[self.pos] != b']' {
                        self.pos += 1;
                    }
                    if self.pos < self.input.len() {
                        self.pos += 1;
                    }
                }
                _ => return,
            }
        }
    }
}
