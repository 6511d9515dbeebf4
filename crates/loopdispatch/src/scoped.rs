//! Launch helpers scoped to a loop resource's lifetime
//!
//! Disposal is checked once, at launch. Work that touches the resource later
//! must re-check it.

use crate::{LoopDispatcher, ScopedLaunchError};
use loopdispatch_runtime::{launch, launch_with, Job, Start};
use loopdispatch_toolkit::LoopResource;
use std::future::Future;
use std::sync::Arc;

/// Dispatcher for the loop that owns `resource`
pub fn dispatcher_for<R: LoopResource + ?Sized>(resource: &R) -> LoopDispatcher {
    LoopDispatcher::new(resource.loop_handle())
}

/// Launch `future` on the resource's loop unless the resource is disposed
pub fn launch_if_not_disposed<R, F>(resource: &R, future: F) -> Option<Job<F::Output>>
where
    R: LoopResource + ?Sized,
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    if resource.is_disposed() {
        tracing::trace!("resource disposed, not launching");
        return None;
    }
    Some(launch(Arc::new(dispatcher_for(resource)), future))
}

/// `launch_if_not_disposed` with an explicit start mode
///
/// `Start::Lazy` is rejected: a deferred job would run against a disposal
/// check that is already stale.
pub fn launch_if_not_disposed_with<R, F>(
    resource: &R,
    start: Start,
    future: F,
) -> Result<Option<Job<F::Output>>, ScopedLaunchError>
where
    R: LoopResource + ?Sized,
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    if start == Start::Lazy {
        return Err(ScopedLaunchError::LazyStart);
    }
    if resource.is_disposed() {
        tracing::trace!(?start, "resource disposed, not launching");
        return Ok(None);
    }
    Ok(Some(launch_with(
        Arc::new(dispatcher_for(resource)),
        start,
        future,
    )))
}

/// `Some(resource)` while it is alive
pub fn read_if_not_disposed<R: LoopResource + ?Sized>(resource: &R) -> Option<&R> {
    if resource.is_disposed() {
        None
    } else {
        Some(resource)
    }
}
