//! Signature records and their JSON files.

use anyhow::{Context, Result};
use logseal_core::{Digest, HashAlgorithm, Tree};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What `sign` records about a log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Hex root digest of the file's tree.
    pub root: String,
    /// Lines in the file when it was signed.
    pub event_count: u64,
    /// Whether later appends keep the signature valid.
    pub append_allowed: bool,
    pub algorithm: String,
}

impl Signature {
    /// Sign a finalized tree.
    ///
    /// # Errors
    ///
    /// Fails if the tree has no root.
    pub fn from_tree(tree: &Tree, append_allowed: bool) -> Result<Self> {
        let root = tree.root_digest()?;
        Ok(Self {
            root: root.to_hex(),
            event_count: tree.leaf_count(),
            append_allowed,
            algorithm: root.algorithm().name().to_string(),
        })
    }

    pub fn hash_algorithm(&self) -> Result<HashAlgorithm> {
        Ok(self.algorithm.parse()?)
    }

    /// The signed root as a digest.
    ///
    /// # Errors
    ///
    /// Fails on an unknown algorithm or a root that is not valid hex of the
    /// algorithm's length.
    pub fn root_digest(&self) -> Result<Digest> {
        let algorithm = self.hash_algorithm()?;
        Digest::from_hex(&self.root, algorithm)
            .with_context(|| format!("Malformed root digest in signature: {}", self.root))
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, format!("{json}\n"))
            .with_context(|| format!("Failed to write signature {}", path.display()))
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read signature {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse signature {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logseal_core::TreeConfig;
    use tempfile::TempDir;

    fn tree() -> Tree {
        Tree::from_events(TreeConfig::with_algorithm("sha1"), ["a", "b", "c"]).expect("tree")
    }

    #[test]
    fn records_tree_metadata() {
        let tree = tree();
        let sig = Signature::from_tree(&tree, true).expect("sign");
        assert_eq!(sig.event_count, 3);
        assert_eq!(sig.algorithm, "SHA-1");
        assert!(sig.append_allowed);
        assert_eq!(&sig.root_digest().expect("digest"), tree.root_digest().expect("root"));
    }

    #[test]
    fn file_round_trip() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("app.log.sig");
        let sig = Signature::from_tree(&tree(), false).expect("sign");

        sig.write_to(&path).expect("write");
        assert_eq!(Signature::read_from(&path).expect("read"), sig);
    }

    #[test]
    fn unfinalized_tree_cannot_be_signed() {
        let mut open = Tree::default();
        open.append_event("a").expect("append");
        assert!(Signature::from_tree(&open, false).is_err());
    }

    #[test]
    fn malformed_root_is_reported() {
        let sig = Signature {
            root: "not-hex".into(),
            event_count: 1,
            append_allowed: false,
            algorithm: "SHA-256".into(),
        };
        let err = sig.root_digest().expect_err("malformed");
        assert!(err.to_string().contains("Malformed root digest"));

        let cli = crate::output::CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E3002"));
        assert!(cli.suggestion.is_some());
    }

    #[test]
    fn garbage_file_fails_to_parse() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("bad.sig");
        std::fs::write(&path, "{\"root\": 1}").expect("write");
        let err = Signature::read_from(&path).expect_err("bad");
        assert!(err.to_string().contains("Failed to parse signature"));
    }
}
