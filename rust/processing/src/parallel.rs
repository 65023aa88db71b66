// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded fan-out/fan-in over a rayon worker pool.
//!
//! Each chunk is a boxed command. Commands run in parallel, a panic or error
//! in one chunk is recorded without touching its siblings, and the results are
//! reassembled in chunk order before a single aggregate is delivered through a
//! [`TaskHandle`] (and an optional completion callback).

use rayon::prelude::*;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use xsection_core::{Diagnostic, Error, Result};

/// Hard upper bound on concurrent workers
pub const MAX_WORKERS: usize = 8;

/// Output of one chunk: items in input order plus per-feature diagnostics
#[derive(Debug, Clone)]
pub struct ChunkOutput<T> {
    pub items: Vec<T>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Default for ChunkOutput<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// Unit of work handed to a worker
pub type ChunkCommand<T> = Box<dyn FnOnce() -> Result<ChunkOutput<T>> + Send + 'static>;

/// Completion callback, invoked once on the worker thread
pub type CompletionCallback<T> = Box<dyn FnOnce(&BatchOutcome<T>) + Send + 'static>;

/// Aggregate result of a dispatched batch
#[derive(Debug, Clone)]
pub struct BatchOutcome<T> {
    /// Items of every successful chunk, flattened in chunk order
    pub items: Vec<T>,
    pub diagnostics: Vec<Diagnostic>,
    /// One [`Error::AsyncWorker`] per failed chunk
    pub errors: Vec<Error>,
    pub chunk_count: usize,
}

impl<T> BatchOutcome<T> {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn failed_chunks(&self) -> usize {
        self.errors.len()
    }

    /// Flatten per-chunk results, which must be in chunk order
    fn assemble(results: Vec<(usize, Result<ChunkOutput<T>>)>) -> Self {
        let chunk_count = results.len();
        let mut items = Vec::new();
        let mut diagnostics = Vec::new();
        let mut errors = Vec::new();

        for (chunk, result) in results {
            match result {
                Ok(output) => {
                    items.extend(output.items);
                    diagnostics.extend(output.diagnostics);
                }
                Err(err) => {
                    tracing::warn!(chunk, error = %err, "Chunk failed, keeping sibling results");
                    errors.push(match err {
                        Error::AsyncWorker { .. } => err,
                        other => Error::AsyncWorker {
                            chunk,
                            message: other.to_string(),
                        },
                    });
                }
            }
        }

        Self {
            items,
            diagnostics,
            errors,
            chunk_count,
        }
    }
}

/// Handle to a batch running on the pool
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: Receiver<BatchOutcome<T>>,
    chunk_count: usize,
}

impl<T> TaskHandle<T> {
    /// Number of chunks dispatched
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Block until every chunk has finished
    pub fn wait(self) -> Result<BatchOutcome<T>> {
        self.receiver.recv().map_err(|_| pool_gone())
    }

    /// Block for at most `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Result<BatchOutcome<T>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Ok(outcome),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(pool_gone()),
        }
    }

    /// Take the outcome if the batch has already finished
    pub fn try_take(&self) -> Option<BatchOutcome<T>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

fn pool_gone() -> Error {
    Error::ProcessingAlgorithm("worker pool dropped the batch before completion".to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fixed-size worker pool for chunked feature processing
#[derive(Clone)]
pub struct ParallelCoordinator {
    pool: Arc<rayon::ThreadPool>,
    workers: usize,
}

impl std::fmt::Debug for ParallelCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelCoordinator")
            .field("workers", &self.workers)
            .finish()
    }
}

impl ParallelCoordinator {
    /// Create a pool with `workers` threads, clamped to `1..=MAX_WORKERS`
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.clamp(1, MAX_WORKERS);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("xsection-worker-{}", i))
            .build()
            .map_err(|e| {
                Error::ProcessingAlgorithm(format!("failed to start worker pool: {}", e))
            })?;

        tracing::debug!(workers, "Started worker pool");
        Ok(Self {
            pool: Arc::new(pool),
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Split `items` into chunks of at most `chunk_size`, preserving order
    pub fn partition<I>(items: Vec<I>, chunk_size: usize) -> Vec<Vec<I>> {
        let chunk_size = chunk_size.max(1);
        let mut chunks = Vec::with_capacity(items.len().div_ceil(chunk_size));
        let mut iter = items.into_iter().peekable();
        while iter.peek().is_some() {
            chunks.push(iter.by_ref().take(chunk_size).collect());
        }
        chunks
    }

    /// Run every command and deliver one aggregate outcome
    pub fn dispatch<T: Send + 'static>(&self, commands: Vec<ChunkCommand<T>>) -> TaskHandle<T> {
        self.dispatch_inner(commands, None)
    }

    /// Like [`dispatch`](Self::dispatch), also invoking `on_complete` once
    /// with the aggregate before it is delivered to the handle
    pub fn dispatch_with_callback<T, F>(
        &self,
        commands: Vec<ChunkCommand<T>>,
        on_complete: F,
    ) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&BatchOutcome<T>) + Send + 'static,
    {
        self.dispatch_inner(commands, Some(Box::new(on_complete)))
    }

    fn dispatch_inner<T: Send + 'static>(
        &self,
        commands: Vec<ChunkCommand<T>>,
        on_complete: Option<CompletionCallback<T>>,
    ) -> TaskHandle<T> {
        let chunk_count = commands.len();
        let (sender, receiver) = mpsc::sync_channel(1);

        tracing::debug!(chunks = chunk_count, workers = self.workers, "Dispatching batch");

        self.pool.spawn(move || {
            // Spawned jobs run on the pool, so the parallel iterator does too
            let results: Vec<(usize, Result<ChunkOutput<T>>)> = commands
                .into_par_iter()
                .enumerate()
                .map(|(chunk, command)| {
                    let result = catch_unwind(AssertUnwindSafe(command)).unwrap_or_else(|payload| {
                        Err(Error::AsyncWorker {
                            chunk,
                            message: format!("panicked: {}", panic_message(&*payload)),
                        })
                    });
                    (chunk, result)
                })
                .collect();

            let outcome = BatchOutcome::assemble(results);
            tracing::debug!(
                chunks = outcome.chunk_count,
                items = outcome.items.len(),
                failed = outcome.failed_chunks(),
                "Batch complete"
            );

            if let Some(callback) = on_complete {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(&outcome))) {
                    tracing::error!(
                        error = %panic_message(&*payload),
                        "Completion callback panicked"
                    );
                }
            }
            // Receiver may already be gone if the caller stopped waiting
            let _ = sender.send(outcome);
        });

        TaskHandle {
            receiver,
            chunk_count,
        }
    }
}
