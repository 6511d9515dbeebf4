//! Suspension helpers that route through the current task's dispatcher

use crate::context;
use crate::job::JobState;
use crate::resume::ResumeState;
use crate::{DispatchError, DisposableHandle, Resumer, TimeoutError};
use futures::task::AtomicWaker;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

/// Suspend the current job for `duration`
///
/// Resolves to `Ok(())` once the dispatcher resumes the job. A zero duration
/// completes immediately. Outside a launched job this fails with
/// `DispatchError::NoDispatcher`.
pub fn delay(duration: Duration) -> Delay {
    Delay {
        duration,
        state: DelayState::Idle,
    }
}

/// Future returned by `delay`
#[must_use = "futures do nothing unless polled"]
pub struct Delay {
    duration: Duration,
    state: DelayState,
}

enum DelayState {
    Idle,
    Waiting {
        resume: Arc<ResumeState>,
        _registration: Registration,
    },
    Done,
}

/// Ties a scheduled resumption to its job's cancellation
struct Registration {
    job: Arc<JobState>,
    key: u64,
    handle: DisposableHandle,
}

impl Registration {
    fn new(job: Arc<JobState>, handle: DisposableHandle) -> Self {
        let key = job.dispose_on_cancellation(handle.clone());
        Self { job, key, handle }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.job.unregister(self.key);
        self.handle.dispose();
    }
}

impl Future for Delay {
    type Output = Result<(), DispatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &this.state {
            DelayState::Done => return Poll::Ready(Ok(())),
            DelayState::Waiting { resume, .. } => {
                let outcome = resume.poll_outcome(cx.waker());
                if outcome.is_ready() {
                    this.state = DelayState::Done;
                }
                return outcome;
            }
            DelayState::Idle => {}
        }

        if this.duration.is_zero() {
            this.state = DelayState::Done;
            return Poll::Ready(Ok(()));
        }
        let Some(context) = context::current() else {
            this.state = DelayState::Done;
            return Poll::Ready(Err(DispatchError::NoDispatcher));
        };

        let (resumer, resume) = Resumer::new();
        resume.register(cx.waker());
        let handle = match context
            .dispatcher
            .schedule_resume_after_delay(this.duration, resumer)
        {
            Ok(handle) => handle,
            Err(err) => {
                this.state = DelayState::Done;
                return Poll::Ready(Err(err));
            }
        };

        let outcome = resume.poll_outcome(cx.waker());
        if outcome.is_ready() {
            handle.dispose();
            this.state = DelayState::Done;
            return outcome;
        }
        this.state = DelayState::Waiting {
            resume,
            _registration: Registration::new(context.job, handle),
        };
        Poll::Pending
    }
}

/// Run `future` with a deadline on the current job's dispatcher
///
/// If `future` finishes first the timer is disposed. A zero duration fails
/// immediately without polling `future`.
pub fn with_timeout<F: Future>(duration: Duration, future: F) -> Timeout<F> {
    Timeout {
        duration,
        future: Box::pin(future),
        state: TimeoutState::Idle,
    }
}

/// Future returned by `with_timeout`
#[must_use = "futures do nothing unless polled"]
pub struct Timeout<F: Future> {
    duration: Duration,
    future: Pin<Box<F>>,
    state: TimeoutState,
}

enum TimeoutState {
    Idle,
    Armed(Armed),
    Done,
}

#[derive(Default)]
struct TimeoutSignal {
    fired: AtomicBool,
    waker: AtomicWaker,
}

impl TimeoutSignal {
    fn fire(&self) {
        self.fired.store(true, Ordering::Release);
        self.waker.wake();
    }
}

struct Armed {
    signal: Arc<TimeoutSignal>,
    handle: DisposableHandle,
}

impl Drop for Armed {
    fn drop(&mut self) {
        self.handle.dispose();
    }
}

impl<F: Future> Future for Timeout<F> {
    type Output = Result<F::Output, TimeoutError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let TimeoutState::Idle = this.state {
            if this.duration.is_zero() {
                this.state = TimeoutState::Done;
                return Poll::Ready(Err(TimeoutError::Elapsed(this.duration)));
            }
            let Some(context) = context::current() else {
                this.state = TimeoutState::Done;
                return Poll::Ready(Err(DispatchError::NoDispatcher.into()));
            };
            let signal = Arc::new(TimeoutSignal::default());
            signal.waker.register(cx.waker());
            let notify = signal.clone();
            let handle = match context
                .dispatcher
                .invoke_on_timeout(this.duration, Box::new(move || notify.fire()))
            {
                Ok(handle) => handle,
                Err(err) => {
                    this.state = TimeoutState::Done;
                    return Poll::Ready(Err(err.into()));
                }
            };
            this.state = TimeoutState::Armed(Armed { signal, handle });
        }

        let TimeoutState::Armed(armed) = &this.state else {
            return Poll::Ready(Err(TimeoutError::Elapsed(this.duration)));
        };
        armed.signal.waker.register(cx.waker());

        if let Poll::Ready(value) = this.future.as_mut().poll(cx) {
            this.state = TimeoutState::Done;
            return Poll::Ready(Ok(value));
        }
        if armed_fired(&this.state) {
            tracing::trace!(timeout = ?this.duration, "timeout elapsed");
            this.state = TimeoutState::Done;
            return Poll::Ready(Err(TimeoutError::Elapsed(this.duration)));
        }
        Poll::Pending
    }
}

fn armed_fired(state: &TimeoutState) -> bool {
    match state {
        TimeoutState::Armed(armed) => armed.signal.fired.load(Ordering::Acquire),
        _ => false,
    }
}

/// Give other ready work on the dispatcher a chance to run
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by `yield_now`
#[must_use = "futures do nothing unless polled"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_delay_outside_job() {
        assert_eq!(
            block_on(delay(Duration::from_millis(5))),
            Err(DispatchError::NoDispatcher)
        );
    }

    #[test]
    fn test_zero_delay_completes() {
        assert_eq!(block_on(delay(Duration::ZERO)), Ok(()));
    }

    #[test]
    fn test_zero_timeout_elapses() {
        let result = block_on(with_timeout(Duration::ZERO, async { 1 }));
        assert_eq!(result, Err(TimeoutError::Elapsed(Duration::ZERO)));
    }

    #[test]
    fn test_timeout_outside_job() {
        let result = block_on(with_timeout(Duration::from_millis(5), async { 1 }));
        assert_eq!(result, Err(TimeoutError::Dispatch(DispatchError::NoDispatcher)));
    }

    #[test]
    fn test_yield_now() {
        block_on(yield_now());
    }
}
