// SPDX-License-Identifier: MIT OR Apache-2.0
//! Worker pool abstraction for oisin's parallel orchestrators
//!
//! Orchestrators describe their work as a function run once per worker
//! index; an [`Executor`] decides where those workers come from. The
//! default [`SpawnExecutor`] creates fresh scoped threads per call. The
//! [`SharedPool`] keeps a fixed set of parked threads alive between calls
//! and hands work to them, which matters when many small documents are
//! minified back to back.

#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::cargo)]

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;

/// Failures surfaced by an [`Executor`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The operating system refused to create worker threads
    #[error("failed to spawn {requested} worker threads")]
    SpawnFailed {
        /// Number of workers that were requested
        requested: usize,
    },
    /// A worker panicked outside any recoverable region
    #[error("worker {worker} panicked: {message}")]
    WorkerPanic {
        /// Index of the panicking worker
        worker: usize,
        /// Panic payload rendered to text
        message: String,
    },
}

/// Scoped execution of one function across a set of workers
///
/// `run` invokes `f(worker_index)` once for each index in `0..workers`
/// and does not return until every invocation has finished. The function
/// may borrow from the caller's stack; implementations must join before
/// returning.
pub trait Executor {
    /// Run `f` on `workers` workers and join them all
    ///
    /// # Errors
    ///
    /// [`PoolError::SpawnFailed`] when workers cannot be created, or
    /// [`PoolError::WorkerPanic`] with the first panic observed.
    fn run(&self, workers: usize, f: &(dyn Fn(usize) + Send + Sync)) -> Result<(), PoolError>;
}

/// Spawn-per-call executor backed by [`std::thread::scope`]
///
/// The default choice: no state between calls, no shutdown to manage.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnExecutor;

impl SpawnExecutor {
    /// A fresh spawn-per-call executor
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Executor for SpawnExecutor {
    fn run(&self, workers: usize, f: &(dyn Fn(usize) + Send + Sync)) -> Result<(), PoolError> {
        if workers == 0 {
            return Ok(());
        }
        if workers == 1 {
            f(0);
            return Ok(());
        }
        let mut first_error = None;
        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for worker in 0..workers {
                let builder = std::thread::Builder::new().name(format!("oisin-worker-{worker}"));
                match builder.spawn_scoped(scope, move || f(worker)) {
                    Ok(handle) => handles.push((worker, handle)),
                    Err(_) => {
                        first_error = Some(PoolError::SpawnFailed { requested: workers });
                        break;
                    }
                }
            }
            for (worker, handle) in handles {
                if let Err(payload) = handle.join()
                    && first_error.is_none()
                {
                    first_error = Some(PoolError::WorkerPanic {
                        worker,
                        message: panic_message(&payload),
                    });
                }
            }
        });
        first_error.map_or(Ok(()), Err)
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Queue state; shutdown lives under the same lock so workers can never
/// miss the wakeup that announces it
struct PoolQueue {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

struct PoolShared {
    queue: Mutex<PoolQueue>,
    job_ready: Condvar,
}

/// A fixed set of parked worker threads reused across calls
///
/// Threads are created once and live until the pool is dropped. Each
/// [`run`](Executor::run) call enqueues one job per requested worker and
/// blocks on a latch until all of them finish, so borrowed data stays
/// valid for exactly the duration of the call.
pub struct SharedPool {
    shared: Arc<PoolShared>,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for SharedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPool")
            .field("threads", &self.handles.len())
            .finish_non_exhaustive()
    }
}

impl SharedPool {
    /// Create a pool with `threads` parked workers
    ///
    /// # Errors
    ///
    /// [`PoolError::SpawnFailed`] when the operating system refuses to
    /// create the threads; partially created workers are torn down.
    pub fn new(threads: usize) -> Result<Self, PoolError> {
        let threads = threads.max(1);
        let shared = Arc::new(PoolShared {
            queue: Mutex::new(PoolQueue {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
            job_ready: Condvar::new(),
        });
        let mut handles = Vec::with_capacity(threads);
        for index in 0..threads {
            let shared_ref = Arc::clone(&shared);
            let builder = std::thread::Builder::new().name(format!("oisin-pool-{index}"));
            match builder.spawn(move || worker_loop(&shared_ref)) {
                Ok(handle) => handles.push(handle),
                Err(_) => {
                    drop(Self { shared, handles });
                    return Err(PoolError::SpawnFailed { requested: threads });
                }
            }
        }
        Ok(Self { shared, handles })
    }

    /// Number of threads backing this pool
    #[must_use]
    pub fn threads(&self) -> usize {
        self.handles.len()
    }
}

fn worker_loop(shared: &PoolShared) {
    loop {
        let job = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    break job;
                }
                if queue.shutdown {
                    return;
                }
                shared.job_ready.wait(&mut queue);
            }
        };
        job();
    }
}

/// Completion latch one `run` call blocks on
struct Latch {
    remaining: Mutex<usize>,
    all_done: Condvar,
    first_panic: Mutex<Option<(usize, String)>>,
}

impl Latch {
    fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            all_done: Condvar::new(),
            first_panic: Mutex::new(None),
        }
    }

    fn arrive(&self) {
        let mut remaining = self.remaining.lock();
        *remaining -= 1;
        if *remaining == 0 {
            self.all_done.notify_all();
        }
    }

    fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining != 0 {
            self.all_done.wait(&mut remaining);
        }
    }
}

impl Executor for SharedPool {
    fn run(&self, workers: usize, f: &(dyn Fn(usize) + Send + Sync)) -> Result<(), PoolError> {
        if workers == 0 {
            return Ok(());
        }
        let latch = Arc::new(Latch::new(workers));

        // SAFETY: the erased reference is only reachable from the jobs
        // enqueued below, and this call blocks on the latch until every
        // one of them has run to completion. The borrow therefore strictly
        // outlives all uses, panicking jobs included (the latch arrival
        // sits after the catch_unwind).
        let f_static: &'static (dyn Fn(usize) + Send + Sync) = unsafe {
            std::mem::transmute::<
                &(dyn Fn(usize) + Send + Sync),
                &'static (dyn Fn(usize) + Send + Sync),
            >(f)
        };

        {
            let mut queue = self.shared.queue.lock();
            for worker in 0..workers {
                let latch_ref = Arc::clone(&latch);
                queue.jobs.push_back(Box::new(move || {
                    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| f_static(worker)));
                    if let Err(payload) = outcome {
                        let mut slot = latch_ref.first_panic.lock();
                        if slot.is_none() {
                            *slot = Some((worker, panic_message(&payload)));
                        }
                    }
                    latch_ref.arrive();
                }));
            }
        }
        self.shared.job_ready.notify_all();
        latch.wait();

        let panic = latch.first_panic.lock().take();
        panic.map_or(Ok(()), |(worker, message)| {
            Err(PoolError::WorkerPanic { worker, message })
        })
    }
}

impl Drop for SharedPool {
    fn drop(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.job_ready.notify_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Render a panic payload the way `std::thread` would
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload.downcast_ref::<&str>().map_or_else(
        || {
            payload
                .downcast_ref::<String>()
                .cloned()
                .unwrap_or_else(|| "opaque panic payload".to_owned())
        },
        |s| (*s).to_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_spawn_executor_runs_all_workers() {
        let hits = AtomicUsize::new(0);
        SpawnExecutor::new()
            .run(8, &|_| {
                hits.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn test_spawn_executor_passes_distinct_indices() {
        let seen = Mutex::new(vec![false; 4]);
        SpawnExecutor::new()
            .run(4, &|worker| {
                seen.lock()[worker] = true;
            })
            .unwrap();
        assert!(seen.lock().iter().all(|&hit| hit));
    }

    #[test]
    fn test_spawn_executor_reports_panics() {
        let err = SpawnExecutor::new()
            .run(2, &|worker| {
                assert_ne!(worker, 1, "worker one always fails here");
            })
            .unwrap_err();
        assert!(matches!(err, PoolError::WorkerPanic { worker: 1, .. }));
    }

    #[test]
    fn test_shared_pool_runs_borrowed_work() {
        let pool = SharedPool::new(4).unwrap();
        let hits = AtomicUsize::new(0);
        pool.run(4, &|_| {
            hits.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_shared_pool_is_reusable() {
        let pool = SharedPool::new(2).unwrap();
        for round in 1..=5 {
            let hits = AtomicUsize::new(0);
            pool.run(2, &|_| {
                hits.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
            assert_eq!(hits.load(Ordering::Relaxed), 2, "round {round}");
        }
    }

    #[test]
    fn test_shared_pool_survives_worker_panics() {
        let pool = SharedPool::new(2).unwrap();
        let err = pool
            .run(2, &|worker| assert_ne!(worker, 0, "worker zero fails"))
            .unwrap_err();
        assert!(matches!(err, PoolError::WorkerPanic { worker: 0, .. }));
        // The pool still works afterwards
        let hits = AtomicUsize::new(0);
        pool.run(2, &|_| {
            hits.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_more_workers_than_threads() {
        let pool = SharedPool::new(2).unwrap();
        let hits = AtomicUsize::new(0);
        pool.run(16, &|_| {
            hits.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 16);
    }

    #[test]
    fn test_zero_workers_is_a_no_op() {
        assert!(SpawnExecutor::new().run(0, &|_| {}).is_ok());
        let pool = SharedPool::new(1).unwrap();
        assert!(pool.run(0, &|_| {}).is_ok());
    }
}
