//! Launched jobs
//!
//! `launch` wraps a future in an `async_task` task whose schedule function asks
//! the job's dispatcher whether to run inline or to `dispatch`. The wrapper
//! future checks the job's cancel flag on every poll and installs the task
//! context that `delay` and friends read.

use crate::context::{self, TaskContext};
use crate::resume;
use crate::{Dispatcher, DisposableHandle, JobError, Runnable};
use async_task::{ScheduleInfo, WithInfo};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Unique identifier for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        JobId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// How a launched job begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Start {
    /// Hand the first segment to the dispatcher (inline if it needs no dispatch)
    #[default]
    Default,
    /// Run the first segment on the calling thread before `launch` returns
    Undispatched,
    /// Do nothing until `Job::start` or `Job::join`
    Lazy,
}

/// State shared by a job, its handles and its runnables
pub(crate) struct JobState {
    id: JobId,
    cancelled: AtomicBool,
    dropped: AtomicBool,
    /// Waker from the most recent poll
    waker: Mutex<Option<Waker>>,
    /// Handles disposed when the job is cancelled
    on_cancel: Mutex<FxHashMap<u64, DisposableHandle>>,
    next_key: AtomicU64,
    /// First segment of a lazily started job
    pending_start: Mutex<Option<Runnable>>,
}

impl JobState {
    fn new() -> Self {
        Self {
            id: JobId::new(),
            cancelled: AtomicBool::new(false),
            dropped: AtomicBool::new(false),
            waker: Mutex::new(None),
            on_cancel: Mutex::new(FxHashMap::default()),
            next_key: AtomicU64::new(1),
            pending_start: Mutex::new(None),
        }
    }

    pub(crate) fn id(&self) -> JobId {
        self.id
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn mark_dropped(&self) {
        self.dropped.store(true, Ordering::Release);
    }

    pub(crate) fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::trace!(job = self.id.as_u64(), "cancelling job");

        let handles: Vec<DisposableHandle> =
            self.on_cancel.lock().drain().map(|(_, handle)| handle).collect();
        for handle in handles {
            handle.dispose();
        }

        // A never-started lazy job simply closes.
        let pending = self.pending_start.lock().take();
        drop(pending);

        let waker = self.waker.lock().take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Dispose `handle` when the job is cancelled; returns a key for
    /// `unregister`. Disposes immediately if the job is already cancelled.
    pub(crate) fn dispose_on_cancellation(&self, handle: DisposableHandle) -> u64 {
        let mut on_cancel = self.on_cancel.lock();
        if self.is_cancelled() {
            drop(on_cancel);
            handle.dispose();
            return 0;
        }
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        on_cancel.insert(key, handle);
        key
    }

    pub(crate) fn unregister(&self, key: u64) {
        let removed = self.on_cancel.lock().remove(&key);
        drop(removed);
    }

    fn set_waker(&self, waker: &Waker) {
        let mut slot = self.waker.lock();
        match slot.as_ref() {
            Some(current) if current.will_wake(waker) => {}
            _ => *slot = Some(waker.clone()),
        }
    }

    fn clear_waker(&self) {
        let waker = self.waker.lock().take();
        drop(waker);
    }

    fn failure(&self) -> JobError {
        if !self.is_cancelled() && self.dropped.load(Ordering::Acquire) {
            JobError::Dropped
        } else {
            JobError::Cancelled
        }
    }
}

/// Wrapper future that observes cancellation and installs the task context
struct Supervised<F: Future> {
    future: Option<Pin<Box<F>>>,
    context: TaskContext,
}

impl<F: Future> Future for Supervised<F> {
    type Output = Option<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let job = this.context.job.clone();

        // Publish the waker before reading the flag: a cancel that lands after
        // the read finds the waker and reschedules us.
        job.set_waker(cx.waker());
        if job.is_cancelled() {
            this.future = None;
            job.clear_waker();
            return Poll::Ready(None);
        }
        let Some(future) = this.future.as_mut() else {
            job.clear_waker();
            return Poll::Ready(None);
        };

        let polled = context::enter(&this.context, || future.as_mut().poll(cx));
        match polled {
            Poll::Ready(value) => {
                this.future = None;
                job.clear_waker();
                Poll::Ready(Some(value))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<F: Future> Drop for Supervised<F> {
    fn drop(&mut self) {
        // The stored waker points back at the task that owns this future.
        self.context.job.clear_waker();
    }
}

/// Cloneable, type-erased reference to a job
#[derive(Clone)]
pub struct JobHandle {
    state: Arc<JobState>,
}

impl JobHandle {
    /// Handle of the job currently being polled on this thread
    pub fn current() -> Option<Self> {
        context::current().map(|context| Self {
            state: context.job,
        })
    }

    /// Job id
    pub fn id(&self) -> JobId {
        self.state.id()
    }

    /// Request cancellation (idempotent)
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A launched unit of work
///
/// Dropping a started `Job` detaches it; it keeps running. Dropping an
/// unstarted lazy job discards it.
pub struct Job<T> {
    task: Option<async_task::Task<Option<T>>>,
    state: Arc<JobState>,
}

impl<T> Job<T> {
    /// Job id
    pub fn id(&self) -> JobId {
        self.state.id()
    }

    /// Cloneable handle for cancelling from elsewhere
    pub fn handle(&self) -> JobHandle {
        JobHandle {
            state: self.state.clone(),
        }
    }

    /// Start a lazy job; returns false if it was already started
    pub fn start(&self) -> bool {
        let pending = self.state.pending_start.lock().take();
        match pending {
            Some(runnable) => {
                runnable.schedule();
                true
            }
            None => false,
        }
    }

    /// Request cancellation (idempotent)
    ///
    /// Pending delays are disposed and the job finishes at its next
    /// suspension point.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Whether the job has completed, been cancelled, or been dropped
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Wait for the job's result, starting it first if it is lazy
    ///
    /// A panic inside the job is resumed here.
    pub async fn join(mut self) -> Result<T, JobError> {
        self.start();
        let Some(task) = self.task.take() else {
            return Err(JobError::Cancelled);
        };
        match task.fallible().await {
            Some(Some(value)) => Ok(value),
            _ => Err(self.state.failure()),
        }
    }

    /// Cancel, then wait for the job to finish
    pub async fn cancel_and_join(self) -> Result<T, JobError> {
        self.cancel();
        self.join().await
    }
}

impl<T> Drop for Job<T> {
    fn drop(&mut self) {
        let pending = self.state.pending_start.lock().take();
        drop(pending);
        if let Some(task) = self.task.take() {
            task.detach();
        }
    }
}

impl<T> fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id())
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Launch `future` on `dispatcher`
pub fn launch<F>(dispatcher: Arc<dyn Dispatcher>, future: F) -> Job<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    launch_with(dispatcher, Start::Default, future)
}

/// Launch `future` on `dispatcher` with an explicit start mode
pub fn launch_with<F>(dispatcher: Arc<dyn Dispatcher>, start: Start, future: F) -> Job<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let state = Arc::new(JobState::new());
    let context = TaskContext {
        job: state.clone(),
        dispatcher: dispatcher.clone(),
    };

    let schedule_state = state.clone();
    let schedule = move |runnable: async_task::Runnable, info: ScheduleInfo| {
        schedule_segment(
            dispatcher.as_ref(),
            Runnable::new(runnable, schedule_state.clone()),
            info,
        );
    };

    let (runnable, task) = async_task::Builder::new().propagate_panic(true).spawn(
        move |_| Supervised {
            future: Some(Box::pin(future)),
            context,
        },
        WithInfo(schedule),
    );
    let runnable = Runnable::new(runnable, state.clone());
    tracing::trace!(job = state.id().as_u64(), ?start, "launching job");

    match start {
        Start::Default => runnable.schedule(),
        Start::Undispatched => {
            runnable.run();
        }
        Start::Lazy => *state.pending_start.lock() = Some(runnable),
    }

    Job {
        task: Some(task),
        state,
    }
}

fn schedule_segment(dispatcher: &dyn Dispatcher, runnable: Runnable, info: ScheduleInfo) {
    if !info.woken_while_running
        && (resume::take_undispatched() || !dispatcher.is_dispatch_needed())
    {
        runnable.run();
        return;
    }

    let job = runnable.job_id();
    if let Err(err) = dispatcher.dispatch(runnable) {
        tracing::warn!(job = job.as_u64(), dispatcher = %dispatcher, "dispatch failed: {}", err);
    }
}
