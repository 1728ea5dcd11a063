//! logseal-core library.
//!
//! Incremental Merkle trees over line-oriented logs: digests, the arena node
//! model, the balanced builder with its dangling-node merge, hash-chain
//! extraction and validation, and a concurrent chunk [`Aggregator`].
//!
//! ```
//! use logseal_core::{Tree, TreeConfig};
//!
//! let tree = Tree::from_events(TreeConfig::default(), ["a", "b", "c"])?;
//! assert_eq!(tree.leaf_count(), 3);
//! assert!(tree.is_valid_event("b")?);
//! # Ok::<(), logseal_core::Error>(())
//! ```

pub mod aggregator;
pub mod chain;
pub mod config;
pub mod digest;
pub mod error;
pub mod node;
pub mod render;
pub mod tree;

/// # Conventions
///
/// - **Errors**: engine operations return [`error::Result`]; config file
///   loading returns `anyhow::Result` with path context.
/// - **Logging**: Use `tracing` macros (`warn!`, `debug!`, `trace!`). The
///   engine never installs a subscriber.
pub use aggregator::Aggregator;
pub use chain::HashChain;
pub use config::{AggregatorConfig, ChunkingConfig, LookupStrategy, ProjectConfig, TreeConfig};
pub use digest::{Digest, HashAlgorithm, Side};
pub use error::{Error, ErrorCode, Result};
pub use node::{Arena, Node, NodeId};
pub use render::render_tree;
pub use tree::Tree;
