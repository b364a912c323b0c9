//! Cancellable worker threads.
//!
//! A [`CancellableWorker`] owns one OS thread that calls
//! [`Tickable::tick`] until told to stop. Ticks are allowed to block, but
//! every blocking wait inside a tick must also be woken by the worker's
//! [`Wake`] primitive and must return once the [`StopSignal`] is raised:
//!
//! ```text
//! owner                              worker thread
//!   │ start()                           │
//!   │──────────── spawn ───────────────>│ loop { tick(&stop) }
//!   │                                   │   └─ blocked in poll / pop
//!   │ stop(): raise flag, wake()        │
//!   │──────────────────────────────────>│   └─ returns, loop observes flag
//!   │<──────────── join ────────────────│ exit, hand tickable back
//! ```
//!
//! The tickable is moved into the thread on `start()` and handed back on
//! `stop()`, so a stopped worker can be started again with its state intact.
//!
//! A tick that fails is fatal: the error goes to the worker's
//! [`FatalHandler`], which by default logs it and terminates the process.
//! A loop that ends silently would stall the whole pipeline.

use std::any::Any;
use std::error::Error;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::trace::{debug, error, warn};

/// Process exit status used by [`terminate_process`].
pub const FATAL_EXIT_CODE: i32 = 1;

/// A primitive that interrupts a blocking wait from another thread.
pub trait Wake: Send + Sync {
    /// Wakes the waiter. Must be safe to call at any time, including when
    /// nobody is waiting.
    fn wake(&self);
}

impl Wake for mio::Waker {
    fn wake(&self) {
        if let Err(_e) = mio::Waker::wake(self) {
            warn!(error = %_e, "failed to wake poll");
        }
    }
}

/// Cancellation flag shared between a worker and its tick.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once a stop has been requested.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Requests a stop. Waiters still have to be woken separately.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Lifecycle of a [`CancellableWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    StopRequested,
}

/// One iteration of a worker loop.
pub trait Tickable: Send + 'static {
    type Error: Error + Send + Sync + 'static;

    /// Performs one loop iteration.
    ///
    /// May block, provided the wait wakes up through the worker's [`Wake`]
    /// primitive and returns promptly once `stop` is raised.
    fn tick(&mut self, stop: &StopSignal) -> Result<(), Self::Error>;
}

/// A [`Tickable`] backed by a closure. See [`tick_fn`].
pub struct TickFn<F, E> {
    f: F,
    _error: PhantomData<fn() -> E>,
}

/// Wraps a closure as a [`Tickable`].
pub fn tick_fn<F, E>(f: F) -> TickFn<F, E>
where
    F: FnMut(&StopSignal) -> Result<(), E> + Send + 'static,
    E: Error + Send + Sync + 'static,
{
    TickFn {
        f,
        _error: PhantomData,
    }
}

impl<F, E> Tickable for TickFn<F, E>
where
    F: FnMut(&StopSignal) -> Result<(), E> + Send + 'static,
    E: Error + Send + Sync + 'static,
{
    type Error = E;

    fn tick(&mut self, stop: &StopSignal) -> Result<(), E> {
        (self.f)(stop)
    }
}

/// A fatal condition raised inside a worker thread.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("tick failed: {0}")]
    Tick(#[source] Box<dyn Error + Send + Sync>),
    #[error("tick panicked: {0}")]
    Panicked(String),
}

/// Callback invoked with the worker name when a tick fails.
pub type FatalHandler = Arc<dyn Fn(&str, &WorkerError) + Send + Sync>;

/// The default [`FatalHandler`]: log the error and exit the process.
#[must_use]
pub fn terminate_process() -> FatalHandler {
    Arc::new(|_worker, _err| {
        error!(worker = %_worker, error = %_err, "fatal worker error, terminating");
        std::process::exit(FATAL_EXIT_CODE);
    })
}

/// Runs a [`Tickable`] on a dedicated, stoppable thread.
///
/// Dropping the worker stops it.
pub struct CancellableWorker<T: Tickable> {
    name: String,
    state: WorkerState,
    stop: StopSignal,
    waker: Arc<dyn Wake>,
    on_fatal: FatalHandler,
    core: Option<usize>,
    /// Present while idle.
    idle: Option<T>,
    /// Present while running. Yields the tickable back unless it panicked.
    handle: Option<JoinHandle<Option<T>>>,
}

impl<T: Tickable> CancellableWorker<T> {
    /// Creates an idle worker.
    ///
    /// `waker` must interrupt every blocking wait `tickable` performs.
    pub fn new(name: impl Into<String>, tickable: T, waker: Arc<dyn Wake>) -> Self {
        Self {
            name: name.into(),
            state: WorkerState::Idle,
            stop: StopSignal::new(),
            waker,
            on_fatal: terminate_process(),
            core: None,
            idle: Some(tickable),
            handle: None,
        }
    }

    /// Replaces the default fatal handler.
    #[must_use]
    pub fn with_fatal_handler(mut self, handler: FatalHandler) -> Self {
        self.on_fatal = handler;
        self
    }

    /// Pins the worker thread to a CPU core when it starts.
    #[must_use]
    pub fn pinned_to(mut self, core: Option<usize>) -> Self {
        self.core = core;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn state(&self) -> WorkerState {
        self.state
    }

    /// Returns `true` while the worker thread is alive and looping. A loop
    /// ended by a fatal error under a non-exiting handler is not running,
    /// even before [`CancellableWorker::stop`] reaps it.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, WorkerState::Running)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Borrows the tickable. Only available while the worker is idle.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.idle.as_mut()
    }

    /// Starts the worker thread. No-op if already running.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the thread.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let Some(mut tickable) = self.idle.take() else {
            warn!(worker = %self.name, "worker loop was lost to a panic, not restarting");
            return;
        };

        self.stop.reset();
        let stop = self.stop.clone();
        let name = self.name.clone();
        let on_fatal = Arc::clone(&self.on_fatal);
        let core = self.core;

        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                if let Some(id) = core
                    && !core_affinity::set_for_current(core_affinity::CoreId { id })
                {
                    warn!(worker = %name, core = id, "failed to pin worker thread");
                }
                debug!(worker = %name, "worker started");
                let tickable = run_loop(&name, &mut tickable, &stop, &*on_fatal)
                    .then_some(tickable);
                debug!(worker = %name, "worker exiting");
                tickable
            })
            .expect("failed to spawn worker thread");

        self.handle = Some(handle);
        self.state = WorkerState::Running;
    }

    /// Stops the worker and waits for its thread to exit. No-op if idle.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.state = WorkerState::StopRequested;
        self.stop.raise();
        self.waker.wake();

        match handle.join() {
            Ok(tickable) => self.idle = tickable,
            Err(_) => {
                error!(worker = %self.name, "worker thread panicked outside its loop");
            }
        }
        self.state = WorkerState::Idle;
    }

    /// Stops the worker and returns its tickable.
    pub fn into_inner(mut self) -> Option<T> {
        self.stop();
        self.idle.take()
    }
}

impl<T: Tickable> Drop for CancellableWorker<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ticks until stopped. Returns `false` if the tickable panicked and must
/// not be reused.
fn run_loop<T: Tickable>(
    name: &str,
    tickable: &mut T,
    stop: &StopSignal,
    on_fatal: &(dyn Fn(&str, &WorkerError) + Send + Sync),
) -> bool {
    while !stop.is_raised() {
        match panic::catch_unwind(AssertUnwindSafe(|| tickable.tick(stop))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                on_fatal(name, &WorkerError::Tick(Box::new(e)));
                return true;
            }
            Err(payload) => {
                on_fatal(name, &WorkerError::Panicked(panic_message(&*payload)));
                return false;
            }
        }
    }
    true
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
