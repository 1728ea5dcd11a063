//! Concurrent chunked construction.
//!
//! The aggregator cuts the incoming event stream into chunks of
//! `chunk_size` events (a power of two), builds one subtree per chunk on a
//! `rayon` pool, and folds the finished subtrees into a running aggregate
//! with [`Tree::merge`] when [`Aggregator::end_batch`] is called.
//!
//! Chunk boundaries are taken from the stream itself, not from the caller's
//! batches: every full chunk is a perfect subtree of depth `log2(chunk_size)`
//! and only the batch tail is partial. Folding perfect subtrees behaves like
//! inserting their leaves one at a time, so one batch produces the same root
//! as a sequential [`Tree`] over the same events, whatever the caller's split
//! and whatever order the workers finish in.
//!
//! Each `end_batch` starts a fresh builder with the previous aggregate as its
//! first node. That keeps the earlier root intact as an interior node, which
//! is what append-only verification looks up.

use crossbeam_channel::{Receiver, bounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace, warn};

use crate::config::{AggregatorConfig, TreeConfig};
use crate::error::{Error, Result};
use crate::tree::Tree;

struct PendingChunk {
    seq: usize,
    events: usize,
    result: Receiver<Result<Tree>>,
}

/// Builds subtrees in parallel and folds them in submission order.
///
/// Not `Sync`: submissions and folds happen on the owning thread.
pub struct Aggregator {
    config: AggregatorConfig,
    pool: ThreadPool,
    buffer: Vec<Vec<u8>>,
    pending: Vec<PendingChunk>,
    aggregate: Option<Tree>,
    dispatched: usize,
}

impl Aggregator {
    /// Validate `config` and start the worker pool.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] for a bad chunk size or worker count, or if
    /// the pool cannot be started.
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        config.validate()?;

        let pool = ThreadPoolBuilder::new()
            // 0 lets rayon size the pool to the available parallelism.
            .num_threads(config.chunking.workers.unwrap_or(0))
            .thread_name(|i| format!("logseal-chunk-{i}"))
            .build()
            .map_err(|err| Error::InvalidConfig(format!("worker pool: {err}")))?;

        debug!(
            workers = pool.current_num_threads(),
            chunk_size = config.chunking.chunk_size,
            algorithm = %config.tree.algorithm,
            "aggregator started"
        );

        Ok(Self {
            buffer: Vec::with_capacity(config.chunking.chunk_size),
            config,
            pool,
            pending: Vec::new(),
            aggregate: None,
            dispatched: 0,
        })
    }

    /// Aggregator with default chunking for `algorithm`.
    ///
    /// # Errors
    ///
    /// See [`Aggregator::new`].
    pub fn with_algorithm(algorithm: impl Into<String>) -> Result<Self> {
        Self::new(AggregatorConfig {
            tree: TreeConfig::with_algorithm(algorithm),
            ..AggregatorConfig::default()
        })
    }

    #[must_use]
    pub const fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Queue `events`, dispatching a build task for every full chunk.
    ///
    /// Never waits for workers. Events short of a full chunk stay buffered
    /// until more arrive or [`Aggregator::end_batch`] flushes them.
    pub fn submit_chunk<I, E>(&mut self, events: I) -> &mut Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Vec<u8>>,
    {
        for event in events {
            self.buffer.push(event.into());
            if self.buffer.len() == self.config.chunking.chunk_size {
                self.dispatch();
            }
        }
        self
    }

    /// Tasks dispatched since the last [`Aggregator::end_batch`].
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.pending.len()
    }

    /// Events buffered but not yet dispatched.
    #[must_use]
    pub fn buffered_events(&self) -> usize {
        self.buffer.len()
    }

    fn dispatch(&mut self) {
        let events = std::mem::replace(
            &mut self.buffer,
            Vec::with_capacity(self.config.chunking.chunk_size),
        );
        let seq = self.dispatched;
        self.dispatched += 1;

        let (tx, rx) = bounded(1);
        let tree_config = self.config.tree.clone();
        let count = events.len();
        self.pool.spawn(move || {
            trace!(task = seq, events = events.len(), "building chunk subtree");
            let result = Tree::from_events(tree_config, &events);
            // The receiver is gone only if the aggregator was dropped.
            let _ = tx.send(result);
        });

        self.pending.push(PendingChunk {
            seq,
            events: count,
            result: rx,
        });
    }

    /// Flush the buffer, wait for this batch's tasks, and fold their
    /// subtrees (in submission order) after the previous aggregate.
    ///
    /// With nothing submitted since the last call, the aggregate is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// The first task error in submission order; the rest of the batch is
    /// discarded and the previous aggregate is kept. [`Error::EmptyTree`] if
    /// nothing was ever submitted.
    pub fn end_batch(&mut self) -> Result<&Tree> {
        if !self.buffer.is_empty() {
            self.dispatch();
        }

        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return self.aggregate.as_ref().ok_or(Error::EmptyTree);
        }

        debug!(tasks = pending.len(), "collecting chunk subtrees");
        let mut subtrees = Vec::with_capacity(pending.len());
        for chunk in pending {
            match chunk.result.recv() {
                Ok(Ok(tree)) => {
                    trace!(task = chunk.seq, events = chunk.events, "chunk subtree ready");
                    subtrees.push(tree);
                }
                Ok(Err(err)) => {
                    warn!(task = chunk.seq, error = %err, "chunk task failed, discarding batch");
                    return Err(err);
                }
                Err(_) => {
                    warn!(task = chunk.seq, "chunk task vanished, discarding batch");
                    return Err(Error::ChunkTaskFailed(chunk.seq));
                }
            }
        }

        let mut builder = Tree::new(self.config.tree.clone());
        if let Some(previous) = self.aggregate.take() {
            builder.merge(previous)?;
        }
        for subtree in subtrees {
            builder.merge(subtree)?;
        }
        builder.finalize()?;

        debug!(
            leaves = builder.leaf_count(),
            depth = builder.depth(),
            "batch folded into aggregate"
        );
        Ok(&*self.aggregate.insert(builder))
    }

    /// Current aggregate, `None` until the first successful batch.
    #[must_use]
    pub const fn aggregate(&self) -> Option<&Tree> {
        self.aggregate.as_ref()
    }

    /// Shut the pool down and hand back the aggregate.
    ///
    /// Buffered events and unfolded tasks are discarded.
    #[must_use]
    pub fn into_tree(self) -> Option<Tree> {
        if !self.pending.is_empty() || !self.buffer.is_empty() {
            debug!(
                tasks = self.pending.len(),
                buffered = self.buffer.len(),
                "discarding unfolded chunks at shutdown"
            );
        }
        self.aggregate
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("config", &self.config)
            .field("workers", &self.pool.current_num_threads())
            .field("buffered", &self.buffer.len())
            .field("pending", &self.pending.len())
            .field("leaves", &self.aggregate.as_ref().map(Tree::leaf_count))
            .finish()
    }
}
