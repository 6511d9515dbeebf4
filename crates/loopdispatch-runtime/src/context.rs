//! Per-thread record of the task being polled

use crate::job::JobState;
use crate::Dispatcher;
use std::cell::RefCell;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct TaskContext {
    pub(crate) job: Arc<JobState>,
    pub(crate) dispatcher: Arc<dyn Dispatcher>,
}

thread_local! {
    static CURRENT: RefCell<Option<TaskContext>> = const { RefCell::new(None) };
}

struct Restore(Option<TaskContext>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Run `f` with `context` installed as the current task
pub(crate) fn enter<R>(context: &TaskContext, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT.with(|current| current.replace(Some(context.clone())));
    let _restore = Restore(previous);
    f()
}

pub(crate) fn current() -> Option<TaskContext> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Dispatcher of the task currently being polled on this thread
pub fn current_dispatcher() -> Option<Arc<dyn Dispatcher>> {
    current().map(|context| context.dispatcher)
}
