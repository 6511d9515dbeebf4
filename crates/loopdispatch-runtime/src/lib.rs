//! Loopdispatch Runtime
//!
//! A deliberately small task runtime whose only scheduling decision is
//! delegated to a pluggable `Dispatcher`:
//! - `launch` / `Job`: start a future as a task, join it, cancel it
//! - `delay`, `with_timeout`, `yield_now`: suspension points that route through
//!   the current task's dispatcher
//! - `MainDispatcherFactory`: priority-ordered registry for "the" main dispatcher

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod context;
mod dispatcher;
mod disposable;
mod error;
mod job;
mod main_dispatcher;
mod resume;
mod runnable;
mod time;

pub use context::current_dispatcher;
pub use dispatcher::{Action, Dispatcher, MainDispatcher};
pub use disposable::DisposableHandle;
pub use error::{DispatchError, JobError, TimeoutError};
pub use job::{launch, launch_with, Job, JobHandle, JobId, Start};
pub use main_dispatcher::{
    global_registry, main_dispatcher, register_main_dispatcher_factory, MainDispatcherFactory,
    MainDispatcherRegistry,
};
pub use resume::Resumer;
pub use runnable::Runnable;
pub use time::{delay, with_timeout, yield_now, Delay, Timeout, YieldNow};
