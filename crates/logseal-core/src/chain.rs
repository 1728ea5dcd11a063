//! Authentication paths extracted from a finalized tree.

use crate::digest::{Digest, Side};
use crate::error::Result;

/// `[leaf, sibling_1, ..., sibling_k, root]`, always at least two entries.
///
/// Each sibling carries the side-tag it received when its parent was built,
/// which fixes the concatenation order when the root is recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashChain {
    digests: Vec<Digest>,
}

impl HashChain {
    pub(crate) fn new(digests: Vec<Digest>) -> Self {
        debug_assert!(digests.len() >= 2, "chain needs a leaf and a root");
        Self { digests }
    }

    /// Rebuild a chain from stored digests, `None` if the leaf or root is
    /// missing.
    #[must_use]
    pub fn from_digests(digests: Vec<Digest>) -> Option<Self> {
        (digests.len() >= 2).then_some(Self { digests })
    }

    #[must_use]
    pub fn leaf(&self) -> &Digest {
        &self.digests[0]
    }

    #[must_use]
    pub fn root(&self) -> &Digest {
        &self.digests[self.digests.len() - 1]
    }

    /// Sibling digests from the leaf's level upward.
    #[must_use]
    pub fn siblings(&self) -> &[Digest] {
        &self.digests[1..self.digests.len() - 1]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// Always `false`; a chain holds at least its leaf and root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Digest] {
        &self.digests
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Digest> {
        self.digests
    }

    /// Fold the siblings into the leaf digest.
    ///
    /// A `Right` sibling is appended (`H(running ++ sibling)`); anything else
    /// is prepended (`H(sibling ++ running)`).
    ///
    /// # Errors
    ///
    /// [`crate::Error::AlgorithmMismatch`] if the chain mixes algorithms.
    pub fn recompute_root(&self) -> Result<Digest> {
        let mut running = self.leaf().clone();
        for sibling in self.siblings() {
            running = match sibling.side() {
                Some(Side::Right) => Digest::combine(&running, sibling)?,
                _ => Digest::combine(sibling, &running)?,
            };
        }
        Ok(running)
    }

    /// Whether the chain runs up the tree's leftmost path, i.e. every sibling
    /// is a right sibling.
    ///
    /// For a subtree root this means it covers exactly the first leaves of
    /// the tree, in order.
    #[must_use]
    pub fn is_left_spine(&self) -> bool {
        self.siblings()
            .iter()
            .all(|sibling| sibling.side() == Some(Side::Right))
    }

    /// Whether the siblings reproduce the chain's own root.
    ///
    /// # Errors
    ///
    /// Same as [`HashChain::recompute_root`].
    pub fn is_consistent(&self) -> Result<bool> {
        Ok(&self.recompute_root()? == self.root())
    }
}

impl<'a> IntoIterator for &'a HashChain {
    type Item = &'a Digest;
    type IntoIter = std::slice::Iter<'a, Digest>;

    fn into_iter(self) -> Self::IntoIter {
        self.digests.iter()
    }
}
