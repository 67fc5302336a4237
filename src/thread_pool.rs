//! Thread pool for offloading blocking work
//!
//! Jobs carry a blocking `run` phase, executed on a pooled worker thread, and
//! a `callback` phase, executed later on the single thread that drives the
//! pool. Splitting the two keeps arbitrary-duration work off the controlling
//! thread while guaranteeing that callbacks never run concurrently with one
//! another, so callback code needs no locking of its own.
//!
//! Worker threads are drawn from a [`ResourcePool`] bounded by low/high
//! watermarks; when every worker is busy and the pool is at its high
//! watermark, jobs wait in a priority queue. Workers report completions over
//! a channel that the controlling thread drains with
//! [`ThreadPool::drain_completions`] or [`ThreadPool::wait_completions`].
//!
//! Dropping the pool signals every worker to exit and joins it. A worker
//! that is mid-`run` finishes that run first; completions that were never
//! drained are dropped without invoking their callback.

use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::{NetforgeError, Result};
use crate::pool::{BasicPolicy, ResourceFactory, ResourcePool, SizingPolicy};

/// A unit of work for the thread pool
///
/// `run` may block for as long as it likes; `callback` must not, since every
/// callback shares the controlling thread. Input and output travel as fields
/// of the implementing type.
pub trait Job: Send {
    /// Blocking phase, executed on a worker thread
    fn run(&mut self);

    /// Completion phase, executed on the pool's controlling thread
    fn callback(&mut self) {}

    /// Scheduling priority; higher runs first, ties dispatch in no
    /// particular order
    fn priority(&self) -> i32 {
        0
    }
}

enum WorkerCommand {
    Run(Box<dyn Job>),
    Shutdown,
}

struct Completion {
    job: Box<dyn Job>,
    worker_id: u64,
}

/// One pooled worker: a dedicated OS thread waiting on its command channel.
struct Worker {
    id: u64,
    commands: Sender<WorkerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(id: u64, completions: Sender<Completion>) -> Result<Self> {
        let (commands, command_rx) = unbounded::<WorkerCommand>();
        let thread = std::thread::Builder::new()
            .name(format!("netforge-worker-{}", id))
            .spawn(move || worker_loop(id, command_rx, completions))?;
        Ok(Self {
            id,
            commands,
            thread: Some(thread),
        })
    }

    fn submit(&self, job: Box<dyn Job>) -> Result<()> {
        self.commands
            .send(WorkerCommand::Run(job))
            .map_err(|_| NetforgeError::channel_closed(format!("worker {} command channel", self.id)))
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // The send fails only if the thread already exited; either way the
        // join below cannot block forever.
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn worker_loop(id: u64, commands: Receiver<WorkerCommand>, completions: Sender<Completion>) {
    while let Ok(command) = commands.recv() {
        match command {
            WorkerCommand::Run(mut job) => {
                job.run();
                if completions.send(Completion { job, worker_id: id }).is_err() {
                    // Controlling side is gone; nothing left to report to.
                    break;
                }
            }
            WorkerCommand::Shutdown => break,
        }
    }
    log::debug!("worker {} exiting", id);
}

/// Resource factory spawning worker threads bound to the pool's completion
/// channel.
struct WorkerFactory {
    completions: Sender<Completion>,
    next_id: AtomicU64,
}

impl ResourceFactory for WorkerFactory {
    type Resource = Worker;

    fn create(&self) -> Result<Worker> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Worker::spawn(id, self.completions.clone())
    }
}

/// Priority-queue entry; ordering looks at priority alone, so equal
/// priorities dispatch in whatever order the heap yields them.
struct QueuedJob(Box<dyn Job>);

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.0.priority() == other.0.priority()
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.priority().cmp(&other.0.priority())
    }
}

/// Pool of worker threads running prioritized blocking jobs
///
/// All scheduling and callback dispatch happens on the thread that owns the
/// `ThreadPool` value; worker threads only ever execute `run` phases.
pub struct ThreadPool<P: SizingPolicy = BasicPolicy> {
    workers: ResourcePool<WorkerFactory, P>,
    todo: BinaryHeap<QueuedJob>,
    busy: HashMap<u64, Worker>,
    completions: Receiver<Completion>,
}

impl ThreadPool<BasicPolicy> {
    /// Create a pool keeping between `low_watermark` and `high_watermark`
    /// worker threads, sized by the default policy
    pub fn new(low_watermark: u32, high_watermark: u32) -> Result<Self> {
        Self::with_policy(BasicPolicy, low_watermark, high_watermark)
    }
}

impl<P: SizingPolicy> ThreadPool<P> {
    /// Create a pool with an explicit worker sizing policy
    pub fn with_policy(policy: P, low_watermark: u32, high_watermark: u32) -> Result<Self> {
        let (completion_tx, completion_rx) = unbounded();
        let factory = WorkerFactory {
            completions: completion_tx,
            next_id: AtomicU64::new(0),
        };
        Ok(Self {
            workers: ResourcePool::with_policy(factory, policy, low_watermark, high_watermark)?,
            todo: BinaryHeap::new(),
            busy: HashMap::new(),
            completions: completion_rx,
        })
    }

    /// Queue a job and dispatch as many queued jobs as free workers allow
    ///
    /// Jobs dispatch in non-increasing priority order. When every worker is
    /// busy and the pool is at its high watermark, the job stays queued until
    /// a completion frees a worker. Errors are fatal: either a worker thread
    /// could not be spawned or a job could not be handed to its worker.
    pub fn schedule(&mut self, job: Box<dyn Job>) -> Result<()> {
        self.todo.push(QueuedJob(job));
        self.dispatch_queued()
    }

    /// Number of jobs waiting for a worker
    pub fn pending(&self) -> usize {
        self.todo.len()
    }

    /// Number of workers currently running a job
    pub fn busy_workers(&self) -> usize {
        self.busy.len()
    }

    /// Whether completed jobs are waiting for their callbacks
    pub fn has_pending_completions(&self) -> bool {
        !self.completions.is_empty()
    }

    /// Run callbacks for every completion received so far, without blocking
    ///
    /// For each completion the finished worker is released back to the pool
    /// first, then the job's `callback` runs, so a callback that schedules
    /// new work may immediately reuse the worker that just freed up. Returns
    /// the number of callbacks invoked. Callbacks run in completion order,
    /// which is not submission order.
    pub fn drain_completions(&mut self) -> Result<usize> {
        let mut drained = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.finish(completion);
            drained += 1;
        }
        if drained > 0 {
            self.dispatch_queued()?;
        }
        Ok(drained)
    }

    /// Block until at least one completion arrives (or the timeout elapses),
    /// then drain everything pending
    ///
    /// Returns the number of callbacks invoked; `Ok(0)` means the timeout
    /// elapsed first. With `None` this blocks indefinitely, so only call it
    /// while jobs are outstanding.
    pub fn wait_completions(&mut self, timeout: Option<Duration>) -> Result<usize> {
        let first = match timeout {
            Some(t) => match self.completions.recv_timeout(t) {
                Ok(completion) => completion,
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => return Ok(0),
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                    return Err(NetforgeError::channel_closed("thread pool completion queue"))
                }
            },
            None => self
                .completions
                .recv()
                .map_err(|_| NetforgeError::channel_closed("thread pool completion queue"))?,
        };
        self.finish(first);
        let mut drained = 1;
        while let Ok(completion) = self.completions.try_recv() {
            self.finish(completion);
            drained += 1;
        }
        self.dispatch_queued()?;
        Ok(drained)
    }

    fn finish(&mut self, completion: Completion) {
        // Release the worker before running the callback; the callback may
        // schedule a job that reuses it right away.
        if let Some(worker) = self.busy.remove(&completion.worker_id) {
            self.workers.release(worker);
        }
        let mut job = completion.job;
        job.callback();
    }

    fn dispatch_queued(&mut self) -> Result<()> {
        while !self.todo.is_empty() {
            let worker = match self.workers.fetch()? {
                Some(worker) => worker,
                // High watermark reached with every worker busy; remaining
                // jobs stay queued until a completion frees one.
                None => break,
            };
            let Some(QueuedJob(job)) = self.todo.pop() else {
                self.workers.release(worker);
                break;
            };
            worker.submit(job)?;
            self.busy.insert(worker.id, worker);
        }
        Ok(())
    }
}
