// Bounded worker pool for artifact tasks
use std::cell::Cell;

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver};

use crate::task::TaskState;

/// Fixed-capacity pool running thumbnail and filmstrip tasks. Every task may
/// spawn an external process, so concurrency stays bounded no matter how many
/// cards a scan produces.
pub struct WorkerPool {
    inner: rayon::ThreadPool,
}

impl WorkerPool {
    /// Build a pool with `threads` workers, or a small multiple of the
    /// available cores when unset.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let threads = threads.unwrap_or_else(default_threads);
        let inner = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("artifact-worker-{i}"))
            .build()
            .context("failed to build worker pool")?;
        tracing::debug!("worker pool ready with {threads} threads");
        Ok(Self { inner })
    }

    /// Queue a task. The returned handle resolves to the task's terminal
    /// state once a worker has run it to completion.
    pub fn spawn<F>(&self, task: F) -> TaskHandle
    where
        F: FnOnce() -> TaskState + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        self.inner.spawn(move || {
            let state = task();
            let _ = tx.send(state);
        });
        TaskHandle {
            done: rx,
            state: Cell::new(None),
        }
    }
}

fn default_threads() -> usize {
    let cores = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4);
    (cores * 2).clamp(2, 16)
}

/// Completion latch for one queued task.
#[derive(Debug)]
pub struct TaskHandle {
    done: Receiver<TaskState>,
    state: Cell<Option<TaskState>>,
}

impl TaskHandle {
    /// Block until the task reaches a terminal state. A worker that died
    /// mid-task reads as `Failed`.
    pub fn join(&self) -> TaskState {
        if let Some(state) = self.state.get() {
            return state;
        }
        let state = self.done.recv().unwrap_or(TaskState::Failed);
        self.state.set(Some(state));
        state
    }

    /// Non-blocking probe; `Some` once the task has terminated.
    pub fn try_finished(&self) -> Option<TaskState> {
        if self.state.get().is_none() {
            if let Ok(state) = self.done.try_recv() {
                self.state.set(Some(state));
            }
        }
        self.state.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn join_returns_the_terminal_state() {
        let pool = WorkerPool::new(Some(2)).unwrap();
        let handle = pool.spawn(|| TaskState::Completed);
        assert_eq!(handle.join(), TaskState::Completed);
        // Joining again must not block on the consumed latch.
        assert_eq!(handle.join(), TaskState::Completed);
    }

    #[test]
    fn try_finished_is_none_while_running() {
        let pool = WorkerPool::new(Some(1)).unwrap();
        let handle = pool.spawn(|| {
            std::thread::sleep(Duration::from_millis(100));
            TaskState::Canceled
        });
        // May already be done on a slow machine, but must never misreport.
        if let Some(state) = handle.try_finished() {
            assert_eq!(state, TaskState::Canceled);
        }
        assert_eq!(handle.join(), TaskState::Canceled);
        assert_eq!(handle.try_finished(), Some(TaskState::Canceled));
    }

    #[test]
    fn concurrency_never_exceeds_the_pool_size() {
        let pool = WorkerPool::new(Some(2)).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.spawn(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    TaskState::Completed
                })
            })
            .collect();

        for handle in &handles {
            assert_eq!(handle.join(), TaskState::Completed);
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
