//! Fixed-size thread pool with typed task futures
//!
//! `N` workers are spawned at construction and live until the pool drops.
//! Tasks go through a FIFO queue guarded by one mutex; two condition
//! variables signal "task available" (workers) and "all done" (drain
//! waiters). The lock is never held across task execution.
//!
//! Shutdown drains: dropping the pool wakes every worker, the queue is
//! emptied normally, and already-submitted tasks still run to completion.
//! There is no cancellation; callers needing one must check a flag inside
//! their tasks.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::error::{Result, TradeflowError};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    queue: VecDeque<Job>,
    /// Submitted but not yet finished; dequeued tasks still count
    active: usize,
    shutdown: bool,
}

struct PoolInner {
    state: Mutex<PoolState>,
    task_available: Condvar,
    all_done: Condvar,
}

/// Bounded worker pool. Submission returns a [`TaskHandle`] capturing the
/// task's result, error or panic for retrieval on the submitter's side.
pub struct ThreadPool {
    inner: Arc<PoolInner>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn a pool with `workers` threads
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(TradeflowError::config("thread pool needs at least 1 worker"));
        }

        let inner = Arc::new(PoolInner {
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                active: 0,
                shutdown: false,
            }),
            task_available: Condvar::new(),
            all_done: Condvar::new(),
        });

        let handles = (0..workers)
            .map(|i| {
                let inner = Arc::clone(&inner);
                thread::Builder::new()
                    .name(format!("tradeflow-worker-{i}"))
                    .spawn(move || worker_loop(&inner))
                    .map_err(TradeflowError::Io)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            inner,
            workers: handles,
        })
    }

    /// Number of worker threads
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Submit a task; its return value, error or panic is captured in the
    /// returned handle. Fails with [`TradeflowError::PoolClosed`] once
    /// shutdown has begun.
    pub fn submit<T, F>(&self, task: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let slot = Arc::new(TaskSlot {
            result: Mutex::new(None),
            ready: Condvar::new(),
        });
        let job_slot = Arc::clone(&slot);

        let job: Job = Box::new(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(result) => result,
                Err(payload) => Err(TradeflowError::task_panic(panic_message(&payload))),
            };
            let mut guard = job_slot.result.lock();
            *guard = Some(outcome);
            job_slot.ready.notify_all();
        });

        {
            let mut state = self.inner.state.lock();
            if state.shutdown {
                return Err(TradeflowError::PoolClosed);
            }
            state.queue.push_back(job);
            state.active += 1;
        }
        self.inner.task_available.notify_one();

        Ok(TaskHandle { slot })
    }

    /// Block until the queue is empty and no dequeued task is still running.
    ///
    /// Returns normally even if tasks stored failures in their handles; the
    /// caller must still inspect every handle.
    pub fn wait_all(&self) {
        let mut state = self.inner.state.lock();
        while state.active > 0 || !state.queue.is_empty() {
            self.inner.all_done.wait(&mut state);
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock();
            state.shutdown = true;
        }
        self.inner.task_available.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let job = {
            let mut state = inner.state.lock();
            loop {
                if let Some(job) = state.queue.pop_front() {
                    break job;
                }
                if state.shutdown {
                    return;
                }
                inner.task_available.wait(&mut state);
            }
        };

        // Lock released: execution never serializes on the queue mutex.
        job();

        let mut state = inner.state.lock();
        state.active -= 1;
        if state.active == 0 && state.queue.is_empty() {
            inner.all_done.notify_all();
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

#[derive(Debug)]
struct TaskSlot<T> {
    result: Mutex<Option<Result<T>>>,
    ready: Condvar,
}

/// Future for a submitted task. [`TaskHandle::wait`] blocks until the task
/// finishes and re-surfaces its error or panic on the caller.
#[derive(Debug)]
pub struct TaskHandle<T> {
    slot: Arc<TaskSlot<T>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task completes and take its result
    pub fn wait(self) -> Result<T> {
        let mut guard = self.slot.result.lock();
        loop {
            if let Some(outcome) = guard.take() {
                return outcome;
            }
            self.slot.ready.wait(&mut guard);
        }
    }

    /// Non-blocking completion check
    pub fn is_finished(&self) -> bool {
        self.slot.result.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_zero_workers_rejected() {
        assert!(ThreadPool::new(0).is_err());
    }

    #[test]
    fn test_submit_returns_value() {
        let pool = ThreadPool::new(2).unwrap();
        let handle = pool.submit(|| Ok(21 * 2)).unwrap();
        assert_eq!(handle.wait().unwrap(), 42);
    }

    #[test]
    fn test_task_error_resurfaces_on_submitter() {
        let pool = ThreadPool::new(1).unwrap();
        let handle = pool
            .submit::<(), _>(|| Err(TradeflowError::bulk("stream reset")))
            .unwrap();
        let err = handle.wait().unwrap_err();
        assert!(err.is_store_error());
    }

    #[test]
    fn test_panic_captured_in_handle() {
        let pool = ThreadPool::new(1).unwrap();
        let handle = pool.submit::<(), _>(|| panic!("worker blew up")).unwrap();
        match handle.wait() {
            Err(TradeflowError::TaskPanic { message }) => {
                assert!(message.contains("worker blew up"));
            }
            other => panic!("expected TaskPanic, got {other:?}"),
        }
        // The worker survives the panic and keeps serving tasks.
        let handle = pool.submit(|| Ok(1)).unwrap();
        assert_eq!(handle.wait().unwrap(), 1);
    }

    #[test]
    fn test_wait_all_drains_queue_and_active() {
        let pool = ThreadPool::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..64)
            .map(|_| {
                let counter = Arc::clone(&counter);
                pool.submit(move || {
                    thread::sleep(Duration::from_micros(200));
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
                .unwrap()
            })
            .collect();

        pool.wait_all();
        assert_eq!(counter.load(Ordering::Relaxed), 64);
        for handle in &handles {
            assert!(handle.is_finished());
        }
    }

    #[test]
    fn test_fifo_submission_order_per_worker() {
        // With one worker, execution order must equal submission order.
        let pool = ThreadPool::new(1).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..16 {
            let order = Arc::clone(&order);
            pool.submit(move || {
                order.lock().push(i);
                Ok(())
            })
            .unwrap();
        }
        pool.wait_all();
        assert_eq!(*order.lock(), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_drop_drains_pending_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = ThreadPool::new(2).unwrap();
            for _ in 0..32 {
                let counter = Arc::clone(&counter);
                pool.submit(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
                .unwrap();
            }
            // Drop without wait_all: queued tasks must still run.
        }
        assert_eq!(counter.load(Ordering::Relaxed), 32);
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let pool = ThreadPool::new(1).unwrap();
        {
            let mut state = pool.inner.state.lock();
            state.shutdown = true;
        }
        let err = pool.submit(|| Ok(())).unwrap_err();
        assert!(matches!(err, TradeflowError::PoolClosed));
        // Undo so Drop's join sees a consistent flag (it sets it again).
    }
}
