//! Worker pool
//!
//! This module handles:
//! - Owning one page source per worker for the worker's lifetime
//! - Growing the pool one worker per cycle under backlog pressure
//! - Running one visit per worker per cycle, each on its own task
//! - Releasing every page source on shutdown

use crate::crawler::dispatcher::Dispatcher;
use crate::frontier::SharedFrontier;
use crate::source::{PageSource, PageSourceFactory, SourceResult};
use crate::state::PageState;
use std::collections::HashMap;
use std::sync::Arc;

/// One execution unit bound to a single page source
pub struct Worker {
    id: usize,
    source: Box<dyn PageSource>,
}

impl Worker {
    pub fn id(&self) -> usize {
        self.id
    }
}

/// What happened during one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Workers that received a URL
    pub busy: usize,

    /// Workers that found the frontier empty
    pub idle: usize,

    /// Final state of every visit that completed
    pub outcomes: HashMap<PageState, u64>,

    /// Visits whose task panicked; their URLs were re-queued
    pub lost: usize,
}

impl CycleReport {
    /// Returns true if no worker got any work this cycle
    pub fn all_idle(&self) -> bool {
        self.busy == 0
    }
}

/// Variable-size set of workers
pub struct WorkerPool {
    workers: Vec<Worker>,
    factory: Arc<dyn PageSourceFactory>,
    max_size: usize,
    increment_threshold: usize,
    next_id: usize,
}

impl WorkerPool {
    /// Creates a pool with a single worker
    ///
    /// Failing to open that first page source is fatal to the crawl.
    pub fn new(
        factory: Arc<dyn PageSourceFactory>,
        max_size: usize,
        increment_threshold: usize,
    ) -> SourceResult<Self> {
        let mut pool = Self {
            workers: Vec::new(),
            factory,
            max_size: max_size.max(1),
            increment_threshold: increment_threshold.max(1),
            next_id: 0,
        };
        pool.open_worker()?;
        Ok(pool)
    }

    fn open_worker(&mut self) -> SourceResult<()> {
        let source = self.factory.open()?;
        self.workers.push(Worker {
            id: self.next_id,
            source,
        });
        self.next_id += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Adds one worker if the backlog warrants it
    ///
    /// Returns true if the pool grew. A page source that fails to open is
    /// logged and the pool keeps its size.
    pub fn maybe_grow(&mut self, queued: usize) -> bool {
        if !should_grow(self.len(), self.max_size, queued, self.increment_threshold) {
            return false;
        }

        match self.open_worker() {
            Ok(()) => {
                tracing::info!(
                    "Grew worker pool to {} ({} URLs queued)",
                    self.len(),
                    queued
                );
                true
            }
            Err(e) => {
                tracing::warn!("Could not open another page source: {}", e);
                false
            }
        }
    }

    /// Gives every worker at most one URL and waits for all visits to finish
    ///
    /// URLs are taken one at a time from the frontier, then each busy worker
    /// visits its URL on its own task. A visit that panics loses its worker;
    /// its URL goes back on the queue and a replacement worker is opened.
    pub async fn run_cycle(
        &mut self,
        frontier: &SharedFrontier,
        dispatcher: &Dispatcher,
    ) -> CycleReport {
        let mut report = CycleReport::default();
        let mut ready = Vec::with_capacity(self.workers.len());
        let mut tasks = Vec::new();

        for mut worker in self.workers.drain(..) {
            let Some(url) = frontier.take() else {
                report.idle += 1;
                ready.push(worker);
                continue;
            };

            report.busy += 1;
            let dispatcher = dispatcher.clone();
            let task_url = url.clone();
            let handle = tokio::spawn(async move {
                tracing::debug!("Worker {} visiting {}", worker.id, task_url);
                let state = dispatcher.visit(worker.source.as_mut(), &task_url).await;
                (worker, state)
            });
            tasks.push((url, handle));
        }

        for (url, handle) in tasks {
            match handle.await {
                Ok((worker, state)) => {
                    *report.outcomes.entry(state).or_insert(0) += 1;
                    ready.push(worker);
                }
                Err(e) => {
                    tracing::error!("Worker task for {} failed, re-queueing: {}", url, e);
                    frontier.enqueue(&url);
                    report.lost += 1;
                }
            }
        }

        ready.sort_by_key(Worker::id);
        self.workers = ready;

        for _ in 0..report.lost {
            if let Err(e) = self.open_worker() {
                tracing::warn!("Could not replace lost worker: {}", e);
            }
        }

        report
    }

    /// Releases every worker's page source
    pub async fn shutdown(&mut self) {
        for mut worker in self.workers.drain(..) {
            if let Err(e) = worker.source.close().await {
                tracing::warn!("Failed to close page source of worker {}: {}", worker.id, e);
            }
        }
    }
}

/// Growth policy: one more worker iff below the cap and the backlog is at
/// least `increment_threshold` URLs per existing worker
pub fn should_grow(current: usize, max: usize, queued: usize, increment_threshold: usize) -> bool {
    current < max && queued >= current.saturating_mul(increment_threshold)
}
