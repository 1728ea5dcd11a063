//! Incrementally balanced Merkle tree.
//!
//! # Construction
//!
//! Nodes are pushed onto a stack of *dangling* subtree roots. When the
//! incoming node has the same depth as the top of the stack the two are
//! merged (older on the left) and the parent is pushed in turn, cascading
//! like a binary counter. After `n` leaves the stack holds one perfect subtree
//! per set bit of `n`, deepest at the bottom.
//!
//! [`Tree::finalize`] folds the stack from the top: the top node becomes the
//! right child, the node below it the left child, and the parent goes back on
//! the stack until one root remains. For `["a", "b", "c"]` this yields
//! `H(H(H(a) ++ H(b)) ++ H(c))`.
//!
//! Whole finalized trees can be folded in with [`Tree::merge`]; their root is
//! treated as one more dangling node, so chunked construction reuses the same
//! balancing without re-hashing chunk contents.
//!
//! # Validation
//!
//! A [`HashChain`] lists the leaf digest, the sibling digest at every level up
//! to the root (each carrying its side-tag), and the root digest.
//! [`Tree::is_valid_event`] replays the chain and compares the result with
//! both the chain's root and the live root.

use std::collections::HashMap;

use tracing::debug;

use crate::chain::HashChain;
use crate::config::{LookupStrategy, TreeConfig};
use crate::digest::{Digest, HashAlgorithm};
use crate::error::{Error, Result};
use crate::node::{Arena, Node, NodeId};

/// Merkle tree builder and, once finalized, the immutable tree.
#[derive(Debug, Clone)]
pub struct Tree {
    config: TreeConfig,
    /// Parsed once from `config.algorithm`; an unknown name is reported at
    /// the first digest.
    algorithm: Result<HashAlgorithm>,
    arena: Arena,
    stack: Vec<NodeId>,
    root: Option<NodeId>,
    leaf_count: u64,
    /// Present only for [`LookupStrategy::Indexed`].
    index: Option<HashMap<Box<[u8]>, NodeId>>,
    built: bool,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

impl Tree {
    /// Start an empty builder. The algorithm name is checked at the first
    /// digest, not here.
    #[must_use]
    pub fn new(config: TreeConfig) -> Self {
        let index = match config.lookup {
            LookupStrategy::Indexed => Some(HashMap::new()),
            LookupStrategy::Search => None,
        };
        Self {
            algorithm: config.algorithm.parse(),
            config,
            arena: Arena::default(),
            stack: Vec::new(),
            root: None,
            leaf_count: 0,
            index,
            built: false,
        }
    }

    #[must_use]
    pub fn with_algorithm(algorithm: impl Into<String>) -> Self {
        Self::new(TreeConfig::with_algorithm(algorithm))
    }

    /// Build and finalize a tree over `events` in one go.
    ///
    /// # Errors
    ///
    /// Propagates digest failures and [`Error::EmptyTree`] for no events.
    pub fn from_events<I, E>(config: TreeConfig, events: I) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: AsRef<[u8]>,
    {
        let mut tree = Self::new(config);
        for event in events {
            tree.append_event(event)?;
        }
        tree.finalize()?;
        Ok(tree)
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    /// Wrap `event` in a leaf and add it.
    ///
    /// # Errors
    ///
    /// [`Error::TreeAlreadyBuilt`] after finalize;
    /// [`Error::UnsupportedAlgorithm`] for an unknown algorithm name.
    pub fn append_event(&mut self, event: impl AsRef<[u8]>) -> Result<&mut Self> {
        self.ensure_open()?;
        let algorithm = self.hash_algorithm()?;
        let leaf = self.insert(Node::leaf_of(event, algorithm));
        self.add_node(leaf)?;
        Ok(self)
    }

    /// Fold a finalized tree in as a single dangling node.
    ///
    /// The other tree's nodes move into this tree unchanged; nothing is
    /// re-hashed except the parents created while balancing.
    ///
    /// # Errors
    ///
    /// [`Error::TreeAlreadyBuilt`] after finalize, [`Error::NotFinalized`] if
    /// `other` has no root, [`Error::AlgorithmMismatch`] if `other` was built
    /// with a different algorithm.
    pub fn merge(&mut self, other: Self) -> Result<&mut Self> {
        self.ensure_open()?;
        let other_root = other.root.ok_or(Error::NotFinalized)?;

        let algorithm = self.hash_algorithm()?;
        let other_algorithm = other.arena[other_root].digest().algorithm();
        if other_algorithm != algorithm {
            return Err(Error::AlgorithmMismatch {
                left: algorithm.name().to_string(),
                right: other_algorithm.name().to_string(),
            });
        }

        let root_is_leaf = other.arena[other_root].is_leaf();
        if !root_is_leaf {
            // A leaf root is counted by add_node.
            self.leaf_count += other.leaf_count;
        }

        let root = self.absorb(other, other_root);
        self.add_node(root)?;
        Ok(self)
    }

    /// Collapse the dangling stack into a single root.
    ///
    /// May be called once; every later mutation fails.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyTree`] if nothing was added, [`Error::InvalidTreeState`]
    /// if the stack does not reduce to one node, [`Error::TreeAlreadyBuilt`]
    /// on a second call.
    pub fn finalize(&mut self) -> Result<NodeId> {
        self.ensure_open()?;
        self.built = true;

        if self.stack.is_empty() {
            return Err(Error::EmptyTree);
        }

        while let Some(right) = self.stack.pop() {
            let Some(left) = self.stack.pop() else {
                self.root = Some(right);
                debug!(
                    leaves = self.leaf_count,
                    nodes = self.arena.len(),
                    depth = self.arena[right].depth(),
                    "tree finalized"
                );
                return Ok(right);
            };
            let parent = self.join(left, right)?;
            self.stack.push(parent);
        }

        Err(Error::InvalidTreeState {
            remaining: self.stack.len(),
        })
    }

    /// Builder-style [`Tree::finalize`].
    ///
    /// # Errors
    ///
    /// Same as [`Tree::finalize`].
    pub fn build(mut self) -> Result<Self> {
        self.finalize()?;
        Ok(self)
    }

    fn add_node(&mut self, mut node: NodeId) -> Result<()> {
        if self.arena[node].is_leaf() {
            self.leaf_count += 1;
        }

        loop {
            let Some(prev) = self.stack.pop() else {
                self.stack.push(node);
                return Ok(());
            };

            if self.arena[prev].depth() == self.arena[node].depth() {
                node = self.join(prev, node)?;
            } else {
                // Wait for an equal-depth node.
                self.stack.push(prev);
                self.stack.push(node);
                return Ok(());
            }
        }
    }

    fn join(&mut self, left: NodeId, right: NodeId) -> Result<NodeId> {
        let parent = self.arena.new_parent(left, right)?;
        self.record(parent);
        Ok(parent)
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = self.arena.push(node);
        self.record(id);
        id
    }

    /// Index `id` unless an earlier node already owns its digest.
    fn record(&mut self, id: NodeId) {
        if let Some(index) = self.index.as_mut() {
            index
                .entry(self.arena[id].digest().as_bytes().into())
                .or_insert(id);
        }
    }

    fn absorb(&mut self, other: Self, other_root: NodeId) -> NodeId {
        let adopt_index = self.arena.is_empty() && other.index.is_some();
        let first_new = self.arena.len();
        let offset = self.arena.absorb(other.arena);

        if let Some(index) = self.index.as_mut() {
            if adopt_index {
                *index = other.index.unwrap_or_default();
            } else {
                for (id, node) in self.arena.iter().skip(first_new) {
                    index.entry(node.digest().as_bytes().into()).or_insert(id);
                }
            }
        }

        Arena::shift(other_root, offset)
    }

    const fn ensure_open(&self) -> Result<()> {
        if self.built {
            return Err(Error::TreeAlreadyBuilt);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Algorithm resolved from the configured name.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedAlgorithm`] if the name is unknown.
    pub fn hash_algorithm(&self) -> Result<HashAlgorithm> {
        self.algorithm.clone()
    }

    #[must_use]
    pub const fn config(&self) -> &TreeConfig {
        &self.config
    }

    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Digest of the root.
    ///
    /// # Errors
    ///
    /// [`Error::NotFinalized`] before [`Tree::finalize`].
    pub fn root_digest(&self) -> Result<&Digest> {
        let root = self.root.ok_or(Error::NotFinalized)?;
        Ok(self.arena[root].digest())
    }

    /// Leaves added so far, including those absorbed from merged trees.
    #[must_use]
    pub const fn leaf_count(&self) -> u64 {
        self.leaf_count
    }

    /// Total nodes owned by this tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Depth of the root, `None` before finalize.
    #[must_use]
    pub fn depth(&self) -> Option<u32> {
        self.root.map(|root| self.arena[root].depth())
    }

    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.root.is_some()
    }

    /// Number of dangling subtree roots waiting to be merged.
    #[must_use]
    pub fn dangling(&self) -> usize {
        self.stack.len()
    }

    /// Node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.arena[id]
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    /// Resolve `digest` to its node with the configured lookup strategy.
    ///
    /// # Errors
    ///
    /// [`Error::NotFinalized`] before finalize, [`Error::DigestNotFound`] if
    /// no node carries `digest`.
    pub fn find_node(&self, digest: &Digest) -> Result<NodeId> {
        let root = self.root.ok_or(Error::NotFinalized)?;
        let found = match &self.index {
            Some(index) => index.get(digest.as_bytes()).copied(),
            None => self.search(root, digest),
        };
        found.ok_or_else(|| Error::DigestNotFound(digest.to_hex()))
    }

    /// Pre-order depth-first search: node, then left, then right.
    ///
    /// Streamed aggregates grow one level per batch, so the walk keeps its
    /// own stack instead of recursing.
    fn search(&self, root: NodeId, target: &Digest) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.arena[id];
            if node.digest() == target {
                return Some(id);
            }
            stack.extend(node.right());
            stack.extend(node.left());
        }
        None
    }

    /// Digest `event` with this tree's algorithm.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedAlgorithm`] if the configured name is unknown.
    pub fn digest_event(&self, event: impl AsRef<[u8]>) -> Result<Digest> {
        Ok(Digest::of(event, self.hash_algorithm()?))
    }

    /// Hash `event` and extract its chain.
    ///
    /// # Errors
    ///
    /// See [`Tree::hash_chain_for_digest`].
    pub fn hash_chain(&self, event: impl AsRef<[u8]>) -> Result<HashChain> {
        self.hash_chain_for_digest(&self.digest_event(event)?)
    }

    /// `[leaf, sibling_1, ..., sibling_k, root]` for the node carrying
    /// `digest`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFinalized`] before finalize, [`Error::DigestNotFound`] if
    /// the digest is absent.
    pub fn hash_chain_for_digest(&self, digest: &Digest) -> Result<HashChain> {
        let node = self.find_node(digest)?;
        let root = self.root_digest()?;

        let mut digests = vec![digest.clone()];
        let mut current = node;
        while let Some(parent_id) = self.arena[current].parent() {
            let parent = &self.arena[parent_id];
            let sibling = if parent.right() == Some(current) {
                parent.left()
            } else {
                parent.right()
            };
            if let Some(sibling) = sibling {
                digests.push(self.arena[sibling].digest().clone());
            }
            current = parent_id;
        }
        digests.push(root.clone());

        Ok(HashChain::new(digests))
    }

    /// Hash `event` and check that it is represented under the current root.
    ///
    /// # Errors
    ///
    /// See [`Tree::is_valid_digest`].
    pub fn is_valid_event(&self, event: impl AsRef<[u8]>) -> Result<bool> {
        self.is_valid_digest(&self.digest_event(event)?)
    }

    /// Replay the chain for `digest` and compare with the live root.
    ///
    /// A chain that resolves but reproduces a different root is `Ok(false)`.
    ///
    /// # Errors
    ///
    /// [`Error::DigestNotFound`] if `digest` is not in the tree;
    /// [`Error::NotFinalized`] before finalize.
    pub fn is_valid_digest(&self, digest: &Digest) -> Result<bool> {
        let chain = self.hash_chain_for_digest(digest)?;
        let recomputed = chain.recompute_root()?;
        let root = self.root_digest()?;
        Ok(&recomputed == chain.root() && chain.root() == root)
    }
}
