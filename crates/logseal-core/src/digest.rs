//! Event digests and the pairwise merge that builds interior nodes.
//!
//! A [`Digest`] is the raw output of one [`HashAlgorithm`] over some bytes.
//! Merging two digests hashes `left.bytes ++ right.bytes` (left first, always)
//! and tags each operand with the [`Side`] it played. Chain validation reads
//! those tags back to replay the concatenation order.
//!
//! Equality is byte-wise: the algorithm and the side-tag never take part.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Algorithms
// ---------------------------------------------------------------------------

/// Name of the algorithm used when none is configured.
pub const DEFAULT_ALGORITHM: &str = "SHA-256";

/// Hash algorithms a tree can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha1,
    Md5,
    Blake3,
}

impl HashAlgorithm {
    /// Every supported algorithm, default first.
    pub const ALL: [Self; 4] = [Self::Sha256, Self::Sha1, Self::Md5, Self::Blake3];

    /// Canonical display name (`SHA-256`, `SHA-1`, `MD5`, `BLAKE3`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha1 => "SHA-1",
            Self::Md5 => "MD5",
            Self::Blake3 => "BLAKE3",
        }
    }

    /// Digest length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha256 | Self::Blake3 => 32,
            Self::Sha1 => 20,
            Self::Md5 => 16,
        }
    }

    /// Hash the concatenation of `parts` without copying them together.
    fn hash_parts(self, parts: &[&[u8]]) -> Vec<u8> {
        match self {
            Self::Sha256 => hash_with::<Sha256>(parts),
            Self::Sha1 => hash_with::<Sha1>(parts),
            Self::Md5 => hash_with::<Md5>(parts),
            Self::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize().as_bytes().to_vec()
            }
        }
    }
}

fn hash_with<D: sha2::Digest>(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    /// Accepts the canonical names case-insensitively, with or without the
    /// dash (`sha256`, `SHA-256`, `sha_1`).
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "SHA256" => Ok(Self::Sha256),
            "SHA1" => Ok(Self::Sha1),
            "MD5" => Ok(Self::Md5),
            "BLAKE3" => Ok(Self::Blake3),
            _ => Err(Error::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Side tag
// ---------------------------------------------------------------------------

/// Which operand a digest was in its parent's merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

/// Output of a hash algorithm, plus the side it took in its parent's merge.
#[derive(Clone)]
pub struct Digest {
    bytes: Box<[u8]>,
    algorithm: HashAlgorithm,
    side: Option<Side>,
}

impl Digest {
    /// Digest `event` under the algorithm named `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedAlgorithm`] if the name is not recognized.
    pub fn create(event: impl AsRef<[u8]>, algorithm: &str) -> Result<Self> {
        let algorithm = algorithm.parse::<HashAlgorithm>()?;
        Ok(Self::of(event, algorithm))
    }

    /// Digest `event` under an already-resolved algorithm.
    #[must_use]
    pub fn of(event: impl AsRef<[u8]>, algorithm: HashAlgorithm) -> Self {
        Self::from_raw(algorithm.hash_parts(&[event.as_ref()]), algorithm)
    }

    /// Wrap precomputed digest bytes, e.g. a root read back from a signature.
    #[must_use]
    pub fn from_raw(bytes: impl Into<Box<[u8]>>, algorithm: HashAlgorithm) -> Self {
        Self {
            bytes: bytes.into(),
            algorithm,
            side: None,
        }
    }

    /// Parse a lowercase or uppercase hex string into a digest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedDigest`] when the input is not valid hex of
    /// the algorithm's output length.
    pub fn from_hex(hex_str: &str, algorithm: HashAlgorithm) -> Result<Self> {
        match hex::decode(hex_str.trim()) {
            Ok(bytes) if bytes.len() == algorithm.output_len() => {
                Ok(Self::from_raw(bytes, algorithm))
            }
            _ => Err(Error::MalformedDigest {
                input: hex_str.to_string(),
                algorithm: algorithm.name().to_string(),
            }),
        }
    }

    /// Merge `left` and `right` into `hash(left ++ right)`, tagging each
    /// operand with the side it played.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlgorithmMismatch`] if the digests come from
    /// different algorithms.
    pub fn merge(left: &mut Self, right: &mut Self) -> Result<Self> {
        let merged = Self::combine(left, right)?;
        left.side = Some(Side::Left);
        right.side = Some(Side::Right);
        Ok(merged)
    }

    /// Same hash as [`Digest::merge`] without touching the operands' tags.
    pub(crate) fn combine(left: &Self, right: &Self) -> Result<Self> {
        if left.algorithm != right.algorithm {
            return Err(Error::AlgorithmMismatch {
                left: left.algorithm.name().to_string(),
                right: right.algorithm.name().to_string(),
            });
        }
        let bytes = left.algorithm.hash_parts(&[left.as_bytes(), right.as_bytes()]);
        Ok(Self::from_raw(bytes, left.algorithm))
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub const fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Side this digest took in its parent's merge, if it has a parent.
    #[must_use]
    pub const fn side(&self) -> Option<Side> {
        self.side
    }

    /// Re-attach a side-tag, e.g. to a sibling read back from a saved chain.
    #[must_use]
    pub const fn with_side(mut self, side: Option<Side>) -> Self {
        self.side = side;
        self
    }

    /// Lowercase hex encoding of the digest bytes.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl PartialEq for Digest {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Digest {}

impl Hash for Digest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        let short = hex.get(..16).unwrap_or(hex.as_str());
        match self.side {
            Some(side) => write!(f, "Digest({}:{short}, {side})", self.algorithm),
            None => write!(f, "Digest({}:{short})", self.algorithm),
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest as _;

    fn sha256(data: &[u8]) -> Vec<u8> {
        Sha256::digest(data).to_vec()
    }

    #[test]
    fn create_matches_reference_sha256() {
        let digest = Digest::create("a", "SHA-256").expect("digest");
        assert_eq!(digest.as_bytes(), sha256(b"a").as_slice());
        assert_eq!(
            digest.to_hex(),
            "ca978112ca1bbdcafac231b39a23dc4da786eff8147c4e72b9807785afee48bb"
        );
        assert_eq!(digest.side(), None);
    }

    #[test]
    fn algorithm_names_are_lenient() {
        for name in ["SHA-256", "sha256", "Sha_256", " sha-256 "] {
            assert_eq!(
                name.parse::<HashAlgorithm>().expect("parse"),
                HashAlgorithm::Sha256
            );
        }
        assert_eq!("sha-1".parse::<HashAlgorithm>().expect("parse"), HashAlgorithm::Sha1);
        assert_eq!("md5".parse::<HashAlgorithm>().expect("parse"), HashAlgorithm::Md5);
        assert_eq!("BLAKE3".parse::<HashAlgorithm>().expect("parse"), HashAlgorithm::Blake3);
    }

    #[test]
    fn unsupported_algorithm_is_rejected() {
        let err = Digest::create("a", "SHA-3000").expect_err("should fail");
        assert_eq!(err, Error::UnsupportedAlgorithm("SHA-3000".into()));
    }

    #[test]
    fn output_lengths_match_algorithms() {
        for algorithm in HashAlgorithm::ALL {
            let digest = Digest::of("event", algorithm);
            assert_eq!(digest.as_bytes().len(), algorithm.output_len(), "{algorithm}");
        }
    }

    #[test]
    fn merge_concatenates_left_then_right_and_tags_sides() {
        let mut left = Digest::of("a", HashAlgorithm::Sha256);
        let mut right = Digest::of("b", HashAlgorithm::Sha256);

        let merged = Digest::merge(&mut left, &mut right).expect("merge");

        let mut concat = sha256(b"a");
        concat.extend(sha256(b"b"));
        assert_eq!(merged.as_bytes(), sha256(&concat).as_slice());
        assert_eq!(left.side(), Some(Side::Left));
        assert_eq!(right.side(), Some(Side::Right));
        assert_eq!(merged.side(), None);
    }

    #[test]
    fn merge_is_order_sensitive() {
        let a = Digest::of("a", HashAlgorithm::Sha256);
        let b = Digest::of("b", HashAlgorithm::Sha256);
        let ab = Digest::combine(&a, &b).expect("ab");
        let ba = Digest::combine(&b, &a).expect("ba");
        assert_ne!(ab, ba);
    }

    #[test]
    fn merge_rejects_mixed_algorithms() {
        let mut left = Digest::of("a", HashAlgorithm::Sha256);
        let mut right = Digest::of("a", HashAlgorithm::Md5);
        let err = Digest::merge(&mut left, &mut right).expect_err("mismatch");
        assert_eq!(err.code(), crate::error::ErrorCode::AlgorithmMismatch);
        assert_eq!(left.side(), None, "failed merge must not tag operands");
    }

    #[test]
    fn equality_ignores_side_and_algorithm() {
        let mut left = Digest::of("a", HashAlgorithm::Sha256);
        let mut right = Digest::of("b", HashAlgorithm::Sha256);
        let untouched = left.clone();
        Digest::merge(&mut left, &mut right).expect("merge");
        assert_eq!(left, untouched);

        let raw = Digest::from_raw(left.as_bytes().to_vec(), HashAlgorithm::Blake3);
        assert_eq!(raw, untouched);
    }

    #[test]
    fn hex_round_trip_checks_length() {
        let digest = Digest::of("x", HashAlgorithm::Sha1);
        let parsed = Digest::from_hex(&digest.to_hex(), HashAlgorithm::Sha1).expect("parse");
        assert_eq!(parsed, digest);
        for bad in ["abcd", "zz"] {
            let err = Digest::from_hex(bad, HashAlgorithm::Sha1).expect_err("malformed");
            assert_eq!(err.code(), crate::error::ErrorCode::MalformedDigest);
            assert_eq!(err.code().code(), "E3002");
        }
    }
}
