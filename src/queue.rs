//! Single-worker behavior queue.
//!
//! Every reaction runs as a [`Job`] on one background thread, strictly in
//! submission order and never overlapping. When no job arrives within the
//! idle poll interval, the worker runs an [`IdleBehavior`] instead.
//!
//! # Lifecycle
//!
//! ```text
//! start() ──► [enqueue()...] ──► stop() ──► join()
//!               │                  │
//!               ▼                  ▼
//!           jobs run FIFO     in-flight job finishes,
//!           idle on timeout   pending jobs are abandoned
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::mpsc;
//! use car_agent::{job, BehaviorQueue, NoIdle};
//! use car_agent::config::QueueConfig;
//!
//! let queue = BehaviorQueue::start(NoIdle, &QueueConfig::default()).unwrap();
//!
//! let (tx, rx) = mpsc::channel();
//! queue
//!     .enqueue(job(move |_state| {
//!         tx.send("ran")?;
//!         Ok(())
//!     }))
//!     .unwrap();
//! assert_eq!(rx.recv().unwrap(), "ran");
//!
//! queue.stop();
//! queue.join();
//! assert!(queue.enqueue(job(|_| Ok(()))).is_err());
//! ```

use std::any::Any;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::context::lock;
use crate::error::QueueError;
use crate::reactions::ReactionState;

/// Name of the worker thread.
pub const WORKER_THREAD_NAME: &str = "behavior-worker";

/// One complete reaction cycle.
///
/// Runs on the worker thread with exclusive access to the reaction state.
/// Errors and panics are logged by the worker and go no further.
pub type Job = Box<dyn FnOnce(&mut ReactionState) -> anyhow::Result<()> + Send + 'static>;

/// Boxes a closure as a [`Job`].
pub fn job<F>(f: F) -> Job
where
    F: FnOnce(&mut ReactionState) -> anyhow::Result<()> + Send + 'static,
{
    Box::new(f)
}

/// What the worker does when no job arrived within the idle poll interval.
pub trait IdleBehavior: Send + 'static {
    /// Called on the worker thread after each empty poll.
    fn on_idle(&mut self);
}

impl<F: FnMut() + Send + 'static> IdleBehavior for F {
    fn on_idle(&mut self) {
        self()
    }
}

/// Idle behavior that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoIdle;

impl IdleBehavior for NoIdle {
    fn on_idle(&mut self) {}
}

/// Outcome counters of a queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Jobs that returned `Ok`.
    pub completed: u64,
    /// Jobs that returned `Err` or panicked.
    pub failed: u64,
    /// Jobs dropped unrun because the queue stopped.
    pub abandoned: u64,
}

enum WorkerMessage {
    Run { id: u64, job: Job },
    Shutdown,
}

#[derive(Default)]
struct Shared {
    stopped: AtomicBool,
    pending: AtomicUsize,
    next_id: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to the behavior queue. Cheap to clone; all clones feed the same
/// worker.
#[derive(Clone)]
pub struct BehaviorQueue {
    tx: Sender<WorkerMessage>,
    shared: Arc<Shared>,
}

impl BehaviorQueue {
    /// Spawns the worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to create the thread.
    pub fn start(idle: impl IdleBehavior, config: &QueueConfig) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(Shared::default());
        let poll = Duration::from_millis(u64::from(config.idle_poll_ms.max(1)));

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker_loop(rx, worker_shared, idle, poll))?;
        *lock(&shared.worker) = Some(handle);

        info!(idle_poll_ms = poll.as_millis() as u64, "behavior queue started");
        Ok(Self { tx, shared })
    }

    /// Appends `job` to the queue. Never blocks.
    ///
    /// # Errors
    ///
    /// [`QueueError::Stopped`] once [`stop`](Self::stop) has been called;
    /// the job is dropped unrun.
    pub fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        if self.is_stopped() {
            return Err(QueueError::Stopped);
        }
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(WorkerMessage::Run { id, job }).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Stopped);
        }
        debug!(job = id, "job enqueued");
        Ok(())
    }

    /// Stops the worker after the job in flight, if any.
    ///
    /// Does not interrupt a running job. Jobs still waiting behind it are
    /// abandoned. Safe to call more than once.
    pub fn stop(&self) {
        if self.shared.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(pending = self.pending(), "stopping behavior queue");
        // Wakes an idle worker; fails only if it already exited
        let _ = self.tx.send(WorkerMessage::Shutdown);
    }

    /// Waits for the worker thread to exit. Returns at once on later calls.
    ///
    /// Blocks until [`stop`](Self::stop) is called (or every handle is
    /// dropped), so call it after `stop`.
    pub fn join(&self) {
        let handle = lock(&self.shared.worker).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("behavior worker panicked");
            }
        }
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Jobs enqueued but not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Outcome counters so far.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            completed: self.shared.completed.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            abandoned: self.shared.abandoned.load(Ordering::Relaxed),
        }
    }
}

fn worker_loop(rx: Receiver<WorkerMessage>, shared: Arc<Shared>, mut idle: impl IdleBehavior, poll: Duration) {
    let mut state = ReactionState::default();

    loop {
        match rx.recv_timeout(poll) {
            Ok(WorkerMessage::Run { id, job }) => {
                shared.pending.fetch_sub(1, Ordering::SeqCst);
                if shared.stopped.load(Ordering::SeqCst) {
                    shared.abandoned.fetch_add(1, Ordering::Relaxed);
                    debug!(job = id, "job abandoned");
                    continue;
                }
                run_job(id, job, &mut state, &shared);
            }
            Ok(WorkerMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if shared.stopped.load(Ordering::SeqCst) {
                    continue;
                }
                if let Err(p) = catch_unwind(AssertUnwindSafe(|| idle.on_idle())) {
                    error!(panic = %panic_message(&*p), "idle behavior panicked");
                }
            }
        }
    }

    let drained = rx
        .try_iter()
        .filter(|message| matches!(message, WorkerMessage::Run { .. }))
        .count();
    shared.pending.fetch_sub(drained, Ordering::SeqCst);
    let abandoned = shared.abandoned.fetch_add(drained as u64, Ordering::Relaxed) + drained as u64;
    if abandoned > 0 {
        warn!(abandoned, "pending jobs abandoned at shutdown");
    }
    info!("behavior worker stopped");
}

fn run_job(id: u64, job: Job, state: &mut ReactionState, shared: &Shared) {
    debug!(job = id, "job start");
    let started = Instant::now();

    match catch_unwind(AssertUnwindSafe(|| job(state))) {
        Ok(Ok(())) => {
            shared.completed.fetch_add(1, Ordering::Relaxed);
            debug!(job = id, elapsed_ms = started.elapsed().as_millis() as u64, "job done");
        }
        Ok(Err(e)) => {
            shared.failed.fetch_add(1, Ordering::Relaxed);
            error!(job = id, error = format!("{e:#}"), "job failed");
        }
        Err(p) => {
            shared.failed.fetch_add(1, Ordering::Relaxed);
            error!(job = id, panic = %panic_message(&*p), "job panicked");
        }
    }
}

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    fn fast() -> QueueConfig {
        QueueConfig::default().with_idle_poll_ms(10)
    }

    fn drain(queue: &BehaviorQueue) {
        let (tx, rx) = channel();
        queue
            .enqueue(job(move |_| {
                tx.send(())?;
                Ok(())
            }))
            .unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn panic_message_variants() {
        let p = catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(&*p), "static");
        let p = catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(&*p), "formatted 42");
        let p = catch_unwind(|| std::panic::panic_any(7u8)).unwrap_err();
        assert_eq!(panic_message(&*p), "unknown panic");
    }

    #[test]
    fn worker_thread_is_named() {
        let queue = BehaviorQueue::start(NoIdle, &fast()).unwrap();
        let (tx, rx) = channel();
        queue
            .enqueue(job(move |_| {
                tx.send(thread::current().name().map(str::to_string))?;
                Ok(())
            }))
            .unwrap();
        assert_eq!(rx.recv().unwrap().as_deref(), Some(WORKER_THREAD_NAME));
        queue.stop();
        queue.join();
    }

    #[test]
    fn state_persists_between_jobs() {
        use crate::reactions::ReactionKind;

        let queue = BehaviorQueue::start(NoIdle, &fast()).unwrap();
        queue
            .enqueue(job(|state| {
                state.choose(ReactionKind::Happy, &["Happy", "Love"]);
                Ok(())
            }))
            .unwrap();
        let (tx, rx) = channel();
        queue
            .enqueue(job(move |state| {
                tx.send(state.last_happy().map(str::to_string))?;
                Ok(())
            }))
            .unwrap();
        assert_eq!(rx.recv().unwrap().as_deref(), Some("Happy"));
        queue.stop();
        queue.join();
    }

    #[test]
    fn stats_count_outcomes() {
        let queue = BehaviorQueue::start(NoIdle, &fast()).unwrap();
        queue.enqueue(job(|_| Ok(()))).unwrap();
        queue.enqueue(job(|_| anyhow::bail!("nope"))).unwrap();
        queue.enqueue(job(|_| panic!("boom"))).unwrap();
        drain(&queue);
        assert_eq!(queue.pending(), 0);

        // Counters move after a job returns, so read them once the worker is gone
        queue.stop();
        queue.join();
        let stats = queue.stats();
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.abandoned, 0);
    }

    #[test]
    fn idle_panic_does_not_kill_worker() {
        let queue = BehaviorQueue::start(|| panic!("idle boom"), &fast()).unwrap();
        thread::sleep(Duration::from_millis(50));
        drain(&queue);
        queue.stop();
        queue.join();
    }
}
