use std::fmt;

/// Machine-readable error codes for tree and aggregation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UnsupportedAlgorithm,
    InvalidConfig,
    EmptyTree,
    InvalidTreeState,
    TreeAlreadyBuilt,
    NotFinalized,
    DigestNotFound,
    MalformedDigest,
    AlgorithmMismatch,
    ChunkTaskFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::UnsupportedAlgorithm => "E1001",
            Self::InvalidConfig => "E1002",
            Self::EmptyTree => "E2001",
            Self::InvalidTreeState => "E2002",
            Self::TreeAlreadyBuilt => "E2003",
            Self::NotFinalized => "E2004",
            Self::DigestNotFound => "E3001",
            Self::MalformedDigest => "E3002",
            Self::AlgorithmMismatch => "E9001",
            Self::ChunkTaskFailed => "E9002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::UnsupportedAlgorithm => "Unsupported hash algorithm",
            Self::InvalidConfig => "Invalid configuration value",
            Self::EmptyTree => "Tree has no events",
            Self::InvalidTreeState => "Tree construction did not converge",
            Self::TreeAlreadyBuilt => "Tree already built",
            Self::NotFinalized => "Tree not finalized",
            Self::DigestNotFound => "Digest not found in tree",
            Self::MalformedDigest => "Malformed digest",
            Self::AlgorithmMismatch => "Digest algorithms differ",
            Self::ChunkTaskFailed => "Chunk task exited without a result",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::UnsupportedAlgorithm => Some("Use one of: SHA-256, SHA-1, MD5, BLAKE3."),
            Self::InvalidConfig => Some("Chunk size must be a power of two; workers must be > 0."),
            Self::EmptyTree => Some("Append at least one event before building the tree."),
            Self::InvalidTreeState | Self::AlgorithmMismatch | Self::ChunkTaskFailed => {
                Some("Internal fault. Report a bug with logs.")
            }
            Self::TreeAlreadyBuilt => Some("Start a new builder to add more events."),
            Self::NotFinalized => Some("Call finalize() before querying the tree."),
            Self::DigestNotFound => None,
            Self::MalformedDigest => {
                Some("Digests are hex strings of the algorithm's output length; the file may be corrupt.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the tree engine and the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The requested hash algorithm is not one of the supported names.
    #[error("hash algorithm not recognized: {0}")]
    UnsupportedAlgorithm(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `finalize` was called on a builder that never received a node.
    #[error("construction failed: there are no items in the tree")]
    EmptyTree,

    /// `finalize` could not reduce the dangling stack to a single root.
    #[error("construction failed: the tree is in an invalid state ({remaining} dangling nodes)")]
    InvalidTreeState {
        /// Nodes left on the stack when the merge loop stopped.
        remaining: usize,
    },

    /// A mutation was attempted after the tree was finalized.
    #[error("hash tree already built, cannot operate on it anymore")]
    TreeAlreadyBuilt,

    /// The tree (or a tree being merged in) has no root yet.
    #[error("hash tree not finalized")]
    NotFinalized,

    /// No node in the tree carries the requested digest.
    #[error("digest not found: [{0}]")]
    DigestNotFound(String),

    /// Stored digest text is not hex of the expected length.
    #[error("malformed {algorithm} digest: {input}")]
    MalformedDigest {
        /// The rejected text.
        input: String,
        /// Algorithm whose output length was expected.
        algorithm: String,
    },

    /// Two digests produced by different algorithms were merged.
    #[error("cannot merge {left} digest with {right} digest")]
    AlgorithmMismatch {
        /// Algorithm of the left operand.
        left: String,
        /// Algorithm of the right operand.
        right: String,
    },

    /// A chunk build task dropped its result channel.
    #[error("chunk task #{0} exited without a result")]
    ChunkTaskFailed(usize),
}

impl Error {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedAlgorithm(_) => ErrorCode::UnsupportedAlgorithm,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Self::EmptyTree => ErrorCode::EmptyTree,
            Self::InvalidTreeState { .. } => ErrorCode::InvalidTreeState,
            Self::TreeAlreadyBuilt => ErrorCode::TreeAlreadyBuilt,
            Self::NotFinalized => ErrorCode::NotFinalized,
            Self::DigestNotFound(_) => ErrorCode::DigestNotFound,
            Self::MalformedDigest { .. } => ErrorCode::MalformedDigest,
            Self::AlgorithmMismatch { .. } => ErrorCode::AlgorithmMismatch,
            Self::ChunkTaskFailed(_) => ErrorCode::ChunkTaskFailed,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// Result alias used across the core crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::{Error, ErrorCode};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::UnsupportedAlgorithm,
            ErrorCode::InvalidConfig,
            ErrorCode::EmptyTree,
            ErrorCode::InvalidTreeState,
            ErrorCode::TreeAlreadyBuilt,
            ErrorCode::NotFinalized,
            ErrorCode::DigestNotFound,
            ErrorCode::MalformedDigest,
            ErrorCode::AlgorithmMismatch,
            ErrorCode::ChunkTaskFailed,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::DigestNotFound.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn errors_map_to_codes() {
        assert_eq!(Error::EmptyTree.code(), ErrorCode::EmptyTree);
        assert_eq!(
            Error::DigestNotFound("ab".into()).code().code(),
            "E3001"
        );
        assert!(Error::TreeAlreadyBuilt.hint().is_some());
        assert!(Error::DigestNotFound("ab".into()).hint().is_none());
    }
}
