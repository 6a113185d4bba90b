//! Fixed-size fork-join worker pool.
//!
//! The pool owns its threads for the lifetime of the initialized context.
//! Every `compute_1d` call partitions `[0, range)` into equal-sized
//! contiguous chunks, hands one chunk to each worker over a channel, and
//! blocks until every chunk has completed. There is no task queue beyond the
//! per-call chunks, no work stealing, and no per-call thread state; the join
//! is a full barrier, so all writes made by the callback are visible to the
//! caller when `compute_1d` returns.
//!
//! Callbacks are infallible by contract: anything that can fail must be
//! rejected before dispatch is ever invoked.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::thread::JoinHandle;

/// Lifetime-erased reference to the per-call closure.
///
/// Chunks carrying this pointer are confined to one `compute_1d` call: the
/// caller joins on the completion channel before returning, so the referent
/// strictly outlives every dereference.
#[derive(Clone, Copy)]
struct TaskRef(*const (dyn Fn(usize) + Sync));

unsafe impl Send for TaskRef {}

struct Chunk {
    start: usize,
    end: usize,
    task: TaskRef,
    done: Sender<()>,
}

/// Persistent worker pool executing synchronous fork-join parallel loops.
pub struct WorkerPool {
    senders: Vec<Sender<Chunk>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` threads (clamped below by 1).
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let (tx, rx): (Sender<Chunk>, Receiver<Chunk>) = unbounded();
            let handle = std::thread::Builder::new()
                .name(format!("fastconv-worker-{index}"))
                .spawn(move || {
                    while let Ok(chunk) = rx.recv() {
                        // Safety: see `TaskRef` — the submitting call joins on
                        // `done` before the closure goes out of scope.
                        let task = unsafe { &*chunk.task.0 };
                        for i in chunk.start..chunk.end {
                            task(i);
                        }
                        let _ = chunk.done.send(());
                    }
                })
                .expect("failed to spawn worker thread");
            senders.push(tx);
            handles.push(handle);
        }
        log::debug!("worker pool started with {workers} threads");
        Self { senders, handles }
    }

    /// Pool size as spawned.
    #[inline]
    pub fn workers(&self) -> usize {
        self.senders.len()
    }

    /// Invoke `task(i)` for every `i` in `[0, range)` across the pool.
    ///
    /// The range is split into `ceil(range / workers)`-sized contiguous
    /// chunks, at most one per worker; each worker runs its chunk
    /// sequentially. Blocks until all chunks are done. A zero range performs
    /// zero invocations.
    pub fn compute_1d<F>(&self, range: usize, task: F)
    where
        F: Fn(usize) + Sync,
    {
        if range == 0 {
            return;
        }
        let chunk_len = range.div_ceil(self.workers());
        let chunks = range.div_ceil(chunk_len);

        let task_ref: &(dyn Fn(usize) + Sync) = &task;
        // Safety: only the lifetime is erased; every chunk is joined below
        // before `task` is dropped.
        let task_ref = TaskRef(unsafe {
            std::mem::transmute::<&(dyn Fn(usize) + Sync), &'static (dyn Fn(usize) + Sync)>(
                task_ref,
            ) as *const _
        });

        let (done_tx, done_rx) = bounded(chunks);
        for w in 0..chunks {
            let start = w * chunk_len;
            let end = range.min(start + chunk_len);
            self.senders[w]
                .send(Chunk {
                    start,
                    end,
                    task: task_ref,
                    done: done_tx.clone(),
                })
                .expect("worker thread terminated");
        }
        drop(done_tx);
        for _ in 0..chunks {
            done_rx.recv().expect("worker thread terminated");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channels ends the worker loops.
        self.senders.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
