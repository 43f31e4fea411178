//! Bounded concurrent batch execution.
//!
//! ```text
//!            ┌──────── shared queue (index, task) ────────┐
//!            ▼                    ▼                       ▼
//!        worker 0             worker 1        ...     worker W-1
//!            │ spawn + select(cancel)                     │
//!            └──────────► completion channel ◄────────────┘
//!                                 │
//!                                 ▼
//!                   slot[index] = outcome  (N slots)
//! ```
//!
//! Each completed task owns exactly one pre-allocated slot, so output
//! order always matches input order whatever the completion order.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use terminator_types::{TerminatorError, TerminatorResult};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Terminal state of one scheduled task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<R> {
    Completed(R),
    /// Skipped or aborted by cancellation
    Cancelled,
    /// The task panicked; siblings are unaffected
    Panicked(String),
}

impl<R> TaskOutcome<R> {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }

    pub fn into_result(self) -> TerminatorResult<R> {
        match self {
            TaskOutcome::Completed(r) => Ok(r),
            TaskOutcome::Cancelled => Err(TerminatorError::Cancelled),
            TaskOutcome::Panicked(msg) => {
                Err(TerminatorError::external(format!("task panicked: {}", msg)))
            }
        }
    }

    /// Completed value, or one built from the failure
    pub fn unwrap_or_else(self, f: impl FnOnce(TerminatorError) -> R) -> R {
        self.into_result().unwrap_or_else(f)
    }
}

/// Fans tasks out to at most `workers` concurrent executions
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    workers: usize,
    cancel: CancellationToken,
}

impl BatchScheduler {
    /// `workers` is clamped to at least one
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Token that cancels every run of this scheduler
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run `work` over every task and return outcomes in task order.
    ///
    /// On cancellation in-flight tasks are aborted and unstarted tasks
    /// are skipped; outcomes that already completed are kept.
    pub async fn run<T, R, F, Fut>(&self, tasks: Vec<T>, work: F) -> Vec<TaskOutcome<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }

        let queue = Arc::new(Mutex::new(tasks.into_iter().enumerate()));
        let work = Arc::new(work);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(usize, TaskOutcome<R>)>();

        let mut workers = JoinSet::new();
        for worker in 0..self.workers.min(total) {
            let queue = Arc::clone(&queue);
            let work = Arc::clone(&work);
            let done_tx = done_tx.clone();
            let cancel = self.cancel.clone();

            workers.spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let next = queue.lock().next();
                    let Some((index, task)) = next else {
                        break;
                    };

                    debug!(worker, task = index, total, "Task started");
                    let mut handle = tokio::spawn((*work)(task));
                    let outcome = tokio::select! {
                        biased;
                        joined = &mut handle => match joined {
                            Ok(r) => TaskOutcome::Completed(r),
                            Err(e) if e.is_panic() => TaskOutcome::Panicked(panic_message(e.into_panic())),
                            Err(_) => TaskOutcome::Cancelled,
                        },
                        _ = cancel.cancelled() => {
                            handle.abort();
                            TaskOutcome::Cancelled
                        }
                    };
                    debug!(worker, task = index, total, completed = outcome.is_completed(), "Task finished");

                    if done_tx.send((index, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(done_tx);

        let mut slots: Vec<Option<TaskOutcome<R>>> = (0..total).map(|_| None).collect();
        while let Some((index, outcome)) = done_rx.recv().await {
            slots[index] = Some(outcome);
        }
        while workers.join_next().await.is_some() {}

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(TaskOutcome::Cancelled))
            .collect()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
