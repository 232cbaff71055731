//! Fixed-size worker pool (§5): `N` long-lived OS threads draining a
//! bounded `crossbeam-channel` job queue. No cooperative suspension --
//! workers block on the channel or on I/O, never yield to each other.
//!
//! A fatal error in any job sets the process-wide abort flag; every
//! worker checks it before pulling its next job, so the pool drains and
//! stops quickly instead of finishing a queue that's already doomed.

use crossbeam_channel::{bounded, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Default worker count when a command doesn't override it (§5: "size set
/// per command, default 2").
pub const DEFAULT_WORKERS: usize = 2;

/// Read at each I/O boundary inside a worker's job loop; set once by
/// whichever job hits a fatal error first.
static ABORT: AtomicBool = AtomicBool::new(false);

pub fn request_abort() {
    ABORT.store(true, Ordering::Release);
}

pub fn is_aborted() -> bool {
    ABORT.load(Ordering::Acquire)
}

/// Reset the abort flag. Each binary invocation starts a fresh process, so
/// this only matters for tests that run multiple pools in one process.
pub fn reset_abort() {
    ABORT.store(false, Ordering::Release);
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A pool of `workers` long-lived threads draining a bounded job queue of
/// depth `workers * 4` (enough to keep every worker fed without letting an
/// unbounded backlog build up in memory).
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = bounded::<Job>(workers * 4);
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let receiver = receiver.clone();
            handles.push(std::thread::spawn(move || {
                while let Ok(job) = receiver.recv() {
                    if is_aborted() {
                        continue;
                    }
                    job();
                }
            }));
        }
        Self {
            sender: Some(sender),
            handles,
        }
    }

    /// Queue `job`, blocking if every worker is busy and the queue is
    /// full. Panics if called after [`WorkerPool::shutdown`].
    pub fn submit<F: FnOnce() + Send + 'static>(&self, job: F) {
        self.sender
            .as_ref()
            .expect("submit after shutdown")
            .send(Box::new(job))
            .expect("worker pool channel closed unexpectedly");
    }

    /// Drop the sender so every worker's `recv()` loop exits once the
    /// queue empties, then join all of them.
    pub fn shutdown(mut self) {
        self.sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Run `count` independent jobs on a pool of `workers` threads and wait
/// for all of them, collecting each job's result in submission order. A
/// convenience wrapper around [`WorkerPool`] for the common "fan out,
/// then join" shape used by the builder and cleaner commands.
pub fn run_all<T, F>(workers: usize, jobs: Vec<F>) -> Vec<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let pool = WorkerPool::new(workers);
    let results: Arc<std::sync::Mutex<Vec<Option<T>>>> =
        Arc::new(std::sync::Mutex::new((0..jobs.len()).map(|_| None).collect()));

    for (idx, job) in jobs.into_iter().enumerate() {
        let results = Arc::clone(&results);
        pool.submit(move || {
            let value = job();
            results.lock().expect("results mutex poisoned")[idx] = Some(value);
        });
    }
    pool.shutdown();

    Arc::try_unwrap(results)
        .unwrap_or_else(|_| panic!("job closures outlived pool shutdown"))
        .into_inner()
        .expect("results mutex poisoned")
        .into_iter()
        .map(|v| v.expect("job never ran"))
        .collect()
}
