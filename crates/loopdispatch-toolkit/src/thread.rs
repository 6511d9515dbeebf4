//! Dedicated loop thread
//!
//! Starts a thread, creates (or adopts) an event loop on it so that thread
//! becomes the owner, hands the loop back to the caller and pumps it until the
//! loop is disposed.

use crate::{EventLoop, LoopError, LoopResult};
use crossbeam::channel;
use std::thread::{self, JoinHandle};

/// Thread name used when `EventLoopOptions::thread_name` is not set
pub const DEFAULT_THREAD_NAME: &str = "loopdispatch-event-loop";

/// Options for starting a `LoopThread`
#[derive(Debug, Clone, Default)]
pub struct EventLoopOptions {
    /// Diagnostic name of the loop (None = derived from the loop id)
    pub name: Option<String>,

    /// Name of the pumping thread (None = `DEFAULT_THREAD_NAME`)
    pub thread_name: Option<String>,

    /// Adopt the process-wide default loop instead of creating a new one
    pub use_default: bool,
}

impl EventLoopOptions {
    /// Options for a new loop with the given name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Options that adopt the process-wide default loop
    pub fn default_loop() -> Self {
        Self {
            use_default: true,
            ..Self::default()
        }
    }
}

/// An event loop pumped by its own thread
pub struct LoopThread {
    event_loop: EventLoop,
    handle: Option<JoinHandle<()>>,
}

impl LoopThread {
    /// Start a thread that owns and runs a loop
    ///
    /// Blocks until the loop exists. With `use_default`, fails with
    /// `LoopError::WrongThread` if the default loop already belongs to
    /// another thread.
    pub fn spawn(options: EventLoopOptions) -> LoopResult<Self> {
        let (ready_tx, ready_rx) = channel::bounded::<LoopResult<EventLoop>>(1);
        let thread_name = options
            .thread_name
            .clone()
            .unwrap_or_else(|| DEFAULT_THREAD_NAME.to_string());

        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                let event_loop = if options.use_default {
                    EventLoop::default_loop()
                } else {
                    match options.name {
                        Some(name) => EventLoop::with_name(name),
                        None => EventLoop::new(),
                    }
                };

                if !event_loop.is_owner_thread() {
                    let _ = ready_tx.send(Err(LoopError::WrongThread));
                    return;
                }
                if ready_tx.send(Ok(event_loop.clone())).is_err() {
                    return;
                }

                if let Err(err) = event_loop.run() {
                    tracing::warn!(name = %event_loop.name(), "event loop stopped: {}", err);
                }
            })
            .map_err(|err| LoopError::Spawn(err.to_string()))?;

        let started = ready_rx
            .recv()
            .map_err(|_| LoopError::Spawn("loop thread exited during startup".to_string()));
        let event_loop = match started {
            Ok(Ok(event_loop)) => event_loop,
            Ok(Err(err)) | Err(err) => {
                let _ = handle.join();
                return Err(err);
            }
        };

        Ok(Self {
            event_loop,
            handle: Some(handle),
        })
    }

    /// Start a thread that owns and runs the process-wide default loop
    pub fn spawn_default() -> LoopResult<Self> {
        Self::spawn(EventLoopOptions::default_loop())
    }

    /// The loop pumped by this thread
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Dispose the loop and wait for the thread to finish
    pub fn close(&mut self) {
        self.event_loop.dispose();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(name = %self.event_loop.name(), "loop thread panicked");
            }
        }
    }

    /// Whether the pumping thread is still running
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for LoopThread {
    fn drop(&mut self) {
        self.close();
    }
}
