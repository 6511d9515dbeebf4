//! Loopdispatch Toolkit
//!
//! A small cooperative event loop standing in for a GUI toolkit's UI thread:
//! - `LoopHandle`: the seam a dispatch adapter talks to (post now, post after
//!   a delay, cancel a timer, query disposal and the owner thread)
//! - `EventLoop`: single-owner-thread loop with an async queue and a timer heap
//! - `LoopThread`: runs an `EventLoop` on a dedicated thread
//! - `Widget`: a disposable resource bound to one loop

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod error;
mod event_loop;
mod handle;
mod thread;
mod timer;
mod widget;

pub use error::{LoopError, LoopResult};
pub use event_loop::{EventLoop, MAX_TIMER_DELAY};
pub use handle::{Callback, LoopHandle, LoopId, TimerToken};
pub use thread::{EventLoopOptions, LoopThread, DEFAULT_THREAD_NAME};
pub use widget::{LoopResource, Widget};
