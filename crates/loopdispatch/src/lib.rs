//! Loopdispatch
//!
//! Runs task segments on a single-threaded cooperative event loop:
//! - `LoopDispatcher`: posts every segment through the loop's queue
//! - `ImmediateLoopDispatcher`: runs inline when already on the loop thread
//! - `DefaultLoopRegistry`: the process-wide default loop and its main
//!   dispatcher factory
//! - scoped helpers that launch only while a loop resource is alive

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod default;
mod dispatcher;
mod error;
mod immediate;
mod scoped;

pub use default::{
    DefaultLoopRegistry, LoopDispatcherFactory, DEFAULT_DISPATCHER_NAME, LOOP_DISPATCHER_PRIORITY,
};
pub use dispatcher::LoopDispatcher;
pub use error::ScopedLaunchError;
pub use immediate::ImmediateLoopDispatcher;
pub use scoped::{
    dispatcher_for, launch_if_not_disposed, launch_if_not_disposed_with, read_if_not_disposed,
};

pub use loopdispatch_runtime as runtime;
pub use loopdispatch_toolkit as toolkit;
