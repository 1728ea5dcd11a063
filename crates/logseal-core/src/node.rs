//! Tree nodes and the arena that owns them.
//!
//! Nodes are addressed by [`NodeId`] into an [`Arena`] owned by exactly one
//! tree. Child and parent links are ids, so a parent never holds a reference
//! cycle with its children. The parent link is only read for upward walks.

use std::ops::Index;

use crate::digest::{Digest, HashAlgorithm};
use crate::error::Result;

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    const fn shifted(self, offset: usize) -> Self {
        Self(self.0 + offset)
    }
}

/// A leaf (digest of one event) or an interior node (digest of its
/// children's digests, left first).
#[derive(Debug, Clone)]
pub struct Node {
    digest: Digest,
    depth: u32,
    left: Option<NodeId>,
    right: Option<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    /// Create a leaf for `event` under the algorithm named `algorithm`.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::UnsupportedAlgorithm`] for unknown names.
    pub fn new_leaf(event: impl AsRef<[u8]>, algorithm: &str) -> Result<Self> {
        Ok(Self::leaf(Digest::create(event, algorithm)?))
    }

    pub(crate) fn leaf_of(event: impl AsRef<[u8]>, algorithm: HashAlgorithm) -> Self {
        Self::leaf(Digest::of(event, algorithm))
    }

    const fn leaf(digest: Digest) -> Self {
        Self {
            digest,
            depth: 0,
            left: None,
            right: None,
            parent: None,
        }
    }

    #[must_use]
    pub const fn digest(&self) -> &Digest {
        &self.digest
    }

    /// 0 for leaves, otherwise one more than the deeper child.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    pub const fn left(&self) -> Option<NodeId> {
        self.left
    }

    #[must_use]
    pub const fn right(&self) -> Option<NodeId> {
        self.right
    }

    /// Parent link; `None` for a root or a dangling subtree root.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    fn shifted(mut self, offset: usize) -> Self {
        self.left = self.left.map(|id| id.shifted(offset));
        self.right = self.right.map(|id| id.shifted(offset));
        self.parent = self.parent.map(|id| id.shifted(offset));
        self
    }
}

/// Append-only node storage for one tree.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Iterate nodes in creation order together with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Build the parent of `left` and `right`.
    ///
    /// The only place parent links are written: each child gets its parent
    /// exactly once, here, and both digests receive their side-tags.
    pub(crate) fn new_parent(&mut self, left: NodeId, right: NodeId) -> Result<NodeId> {
        let parent_id = NodeId(self.nodes.len());
        let (l, r) = self.pair_mut(left, right);
        debug_assert!(l.parent.is_none() && r.parent.is_none());

        let digest = Digest::merge(&mut l.digest, &mut r.digest)?;
        let depth = l.depth.max(r.depth) + 1;
        l.parent = Some(parent_id);
        r.parent = Some(parent_id);

        self.nodes.push(Node {
            digest,
            depth,
            left: Some(left),
            right: Some(right),
            parent: None,
        });
        Ok(parent_id)
    }

    /// Move every node of `other` into this arena, returning the id offset
    /// to apply to `other`'s ids.
    pub(crate) fn absorb(&mut self, other: Self) -> usize {
        let offset = self.nodes.len();
        if offset == 0 {
            self.nodes = other.nodes;
        } else {
            self.nodes.reserve(other.nodes.len());
            self.nodes
                .extend(other.nodes.into_iter().map(|node| node.shifted(offset)));
        }
        offset
    }

    pub(crate) const fn shift(id: NodeId, offset: usize) -> NodeId {
        id.shifted(offset)
    }

    fn pair_mut(&mut self, a: NodeId, b: NodeId) -> (&mut Node, &mut Node) {
        debug_assert_ne!(a, b, "a node cannot be its own sibling");
        if a.0 < b.0 {
            let (lo, hi) = self.nodes.split_at_mut(b.0);
            (&mut lo[a.0], &mut hi[0])
        } else {
            let (lo, hi) = self.nodes.split_at_mut(a.0);
            (&mut hi[0], &mut lo[b.0])
        }
    }
}

impl Index<NodeId> for Arena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}
