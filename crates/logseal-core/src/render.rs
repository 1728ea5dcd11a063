//! Plain-text drawing of a finalized tree, for debugging.
//!
//! Each node is drawn as the first `width` hex characters of its digest. The
//! right child follows its parent on the same line after `-`; the left child
//! starts a new line, indented to the parent's end column, after `\`:
//!
//! ```text
//! 1f3a-9c0e-77aa
//!          \04b2
//!     \d2c8-5e61
//!          \b0f7
//! ```

use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::tree::Tree;

/// Render `tree` with labels `width` hex characters wide.
///
/// A `width` of 0, or one wider than the digest, prints full digests.
///
/// # Errors
///
/// [`Error::NotFinalized`] if the tree has no root yet.
pub fn render_tree(tree: &Tree, width: usize) -> Result<String> {
    let root = tree.root().ok_or(Error::NotFinalized)?;
    let full = tree.node(root).digest().as_bytes().len() * 2;
    let width = if width == 0 { full } else { width.min(full) };

    let mut out = String::new();
    push_label(&mut out, tree, root, width);
    draw(&mut out, tree, root, width, width);
    Ok(out)
}

/// Pending work for the drawing loop.
enum Step {
    /// Draw the children of a node whose label ends at column `end`.
    Children { id: NodeId, end: usize },
    /// Start a new line for a left child under a parent ending at `end`.
    Left { id: NodeId, end: usize },
}

/// Draw everything below `root`, whose label ends at column `end`.
///
/// Same order as a recursive walk (right subtree, then left child) but with
/// an explicit stack, since streamed trees can be very deep.
fn draw(out: &mut String, tree: &Tree, root: NodeId, end: usize, width: usize) {
    let mut stack = vec![Step::Children { id: root, end }];
    while let Some(step) = stack.pop() {
        match step {
            Step::Children { id, end } => {
                let node = tree.node(id);
                if let Some(left) = node.left() {
                    stack.push(Step::Left { id: left, end });
                }
                if let Some(right) = node.right() {
                    out.push('-');
                    push_label(out, tree, right, width);
                    stack.push(Step::Children {
                        id: right,
                        end: end + 1 + width,
                    });
                } else {
                    out.push('\n');
                }
            }
            Step::Left { id, end } => {
                out.extend(std::iter::repeat_n(' ', end));
                out.push('\\');
                push_label(out, tree, id, width);
                stack.push(Step::Children {
                    id,
                    end: end + 1 + width,
                });
            }
        }
    }
}

fn push_label(out: &mut String, tree: &Tree, id: NodeId, width: usize) {
    let hex = tree.node(id).digest().to_hex();
    out.push_str(&hex[..width]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;

    fn prefix(tree: &Tree, id: NodeId, width: usize) -> String {
        tree.node(id).digest().to_hex()[..width].to_string()
    }

    #[test]
    fn two_leaves() {
        let tree = Tree::from_events(TreeConfig::default(), ["a", "b"]).expect("tree");
        let root = tree.root().expect("root");
        let node = tree.node(root);
        let a = prefix(&tree, node.left().expect("left"), 4);
        let b = prefix(&tree, node.right().expect("right"), 4);
        let r = prefix(&tree, root, 4);

        let drawn = render_tree(&tree, 4).expect("render");
        assert_eq!(drawn, format!("{r}-{b}\n    \\{a}\n"));
    }

    #[test]
    fn one_line_per_leaf() {
        let events: Vec<String> = (0..7).map(|i| format!("e{i}")).collect();
        let tree = Tree::from_events(TreeConfig::default(), &events).expect("tree");
        let drawn = render_tree(&tree, 6).expect("render");
        assert_eq!(drawn.lines().count(), 7);
        assert_eq!(drawn.matches('\\').count(), 6);
    }

    #[test]
    fn zero_width_prints_full_digest() {
        let tree = Tree::from_events(TreeConfig::default(), ["only"]).expect("tree");
        let drawn = render_tree(&tree, 0).expect("render");
        assert_eq!(drawn.trim_end(), tree.root_digest().expect("root").to_hex());
        assert_eq!(render_tree(&tree, 500).expect("render"), drawn);
    }

    #[test]
    fn deep_left_spine_draws_every_leaf() {
        let mut tree = Tree::from_events(TreeConfig::default(), ["e0"]).expect("first");
        for i in 1..2_000 {
            let mut next = Tree::default();
            next.merge(tree).expect("merge");
            next.append_event(format!("e{i}")).expect("append");
            next.finalize().expect("finalize");
            tree = next;
        }

        let drawn = render_tree(&tree, 1).expect("render");
        assert_eq!(drawn.lines().count(), 2_000);
        assert_eq!(drawn.matches('\\').count(), 1_999);
        // Each left child sits two columns further in than its parent.
        let last = drawn.lines().last().expect("line");
        assert_eq!(last.find('\\'), Some(2 * 1_998 + 1));
    }

    #[test]
    fn unfinished_tree_is_rejected() {
        let mut tree = Tree::default();
        tree.append_event("a").expect("append");
        assert_eq!(render_tree(&tree, 8).err(), Some(Error::NotFinalized));
    }
}
