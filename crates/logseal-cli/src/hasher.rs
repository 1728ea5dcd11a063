//! Line-oriented file hashing on top of the core aggregator.

use anyhow::{Context, Result, anyhow, bail};
use logseal_core::{Aggregator, AggregatorConfig, Tree};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Hashes a log file, one event per line, in `chunk_size` line chunks.
#[derive(Debug, Clone)]
pub struct FileHasher {
    config: AggregatorConfig,
    prev_event_count: Option<u64>,
}

impl FileHasher {
    pub const fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            prev_event_count: None,
        }
    }

    /// End a batch right after line `count`, so the aggregate at that point
    /// is the tree of the file as it was when it had `count` lines.
    #[must_use]
    pub const fn with_prev_event_count(mut self, count: u64) -> Self {
        self.prev_event_count = Some(count);
        self
    }

    /// Build the tree for the file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, has no lines, or the engine rejects
    /// the configuration.
    pub fn hash_file(&self, path: &Path) -> Result<Tree> {
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let tree = self
            .hash_reader(BufReader::new(file))
            .with_context(|| format!("Failed to hash {}", path.display()))?;
        debug!(
            path = %path.display(),
            events = tree.leaf_count(),
            "file hashed"
        );
        Ok(tree)
    }

    /// Build the tree for every line of `reader`.
    ///
    /// # Errors
    ///
    /// See [`FileHasher::hash_file`].
    pub fn hash_reader<R: BufRead>(&self, reader: R) -> Result<Tree> {
        let mut aggregator = Aggregator::new(self.config.clone())?;
        let chunk_size = self.config.chunking.chunk_size;

        let mut chunk = Vec::with_capacity(chunk_size);
        let mut line_no: u64 = 0;
        for line in reader.lines() {
            let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
            chunk.push(line);
            line_no += 1;

            if Some(line_no) == self.prev_event_count {
                aggregator.submit_chunk(chunk.drain(..));
                aggregator.end_batch()?;
                debug!(events = line_no, "previously signed prefix aggregated");
            } else if chunk.len() == chunk_size {
                aggregator.submit_chunk(chunk.drain(..));
            }
        }

        if line_no == 0 {
            bail!("cannot hash a file with empty content");
        }
        if !chunk.is_empty() {
            aggregator.submit_chunk(chunk.drain(..));
        }
        aggregator.end_batch()?;

        aggregator
            .into_tree()
            .ok_or_else(|| anyhow!("aggregation produced no tree"))
    }
}
