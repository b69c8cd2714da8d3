//! Plain-text tree rendering for terminal display.

use crate::tree::{NodeId, Tree};

/// Render a tree as ASCII art, one leaf per line:
///
/// ```text
/// ,-A
/// |
/// +-B
/// |
/// `-,-C
///   |
///   `-D
/// ```
pub fn render(tree: &Tree) -> String {
    let block = render_node(tree, tree.root());
    let mut out = String::new();
    for line in block.lines {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

struct Block {
    lines: Vec<String>,
    /// Index of the line where this subtree attaches to its parent
    axis: usize,
}

fn render_node(tree: &Tree, id: NodeId) -> Block {
    let node = tree.node(id).expect("node id from traversal");

    if node.is_leaf() {
        let label = node.label.as_deref().unwrap_or("?");
        return Block {
            lines: vec![label.to_string()],
            axis: 0,
        };
    }

    let blocks: Vec<Block> = node
        .children
        .iter()
        .map(|&child| render_node(tree, child))
        .collect();
    let last = blocks.len() - 1;

    let mut lines = Vec::new();
    let mut axes = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        // Blank spacer line between sibling subtrees
        if i > 0 {
            lines.push("|".to_string());
        }
        for (j, line) in block.lines.iter().enumerate() {
            let prefix = if j == block.axis {
                axes.push(lines.len());
                match i {
                    0 if last == 0 => "--",
                    0 => ",-",
                    _ if i == last => "`-",
                    _ => "+-",
                }
            } else if (i == 0 && j > block.axis)
                || (i == last && j < block.axis)
                || (i != 0 && i != last)
            {
                "| "
            } else {
                "  "
            };
            lines.push(format!("{}{}", prefix, line));
        }
    }

    let axis = (axes.first().copied().unwrap_or(0) + axes.last().copied().unwrap_or(0)) / 2;

    // Internal labels and support values annotate the axis line
    if let Some(text) = node
        .label
        .as_deref()
        .map(str::to_string)
        .or_else(|| node.support.map(|s| format!("{}", s)))
    {
        lines[axis] = format!("{} [{}]", lines[axis], text);
    }

    Block { lines, axis }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick;

    #[test]
    fn test_all_leaves_rendered() {
        let tree = newick::parse("((A,B),(C,D));").unwrap();
        let art = render(&tree);
        for label in ["A", "B", "C", "D"] {
            assert!(art.contains(label), "missing {} in:\n{}", label, art);
        }
    }

    #[test]
    fn test_nesting_indents() {
        let tree = newick::parse("(A,(B,C));").unwrap();
        let art = render(&tree);
        let a_indent = art
            .lines()
            .find(|l| l.contains('A'))
            .unwrap()
            .find('A')
            .unwrap();
        let b_indent = art
            .lines()
            .find(|l| l.contains('B'))
            .unwrap()
            .find('B')
            .unwrap();
        assert!(b_indent > a_indent);
    }

    #[test]
    fn test_single_leaf() {
        let tree = newick::parse("A;").unwrap();
        assert_eq!(render(&tree), "A\n");
    }

    #[test]
    fn test_support_annotated() {
        let tree = newick::parse("((A,B)0.95,C);").unwrap();
        let art = render(&tree);
        assert!(art.contains("[0.95]"));
    }
}
