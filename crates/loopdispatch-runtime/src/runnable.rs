//! Ready-to-run task segments handed to dispatchers

use crate::job::{JobId, JobState};
use std::fmt;
use std::sync::Arc;

/// One ready segment of a launched job
///
/// Running it polls the job until its next suspension. Dropping it without
/// running cancels the rest of the job, which then resolves with
/// `JobError::Dropped`.
pub struct Runnable {
    inner: Option<async_task::Runnable>,
    job: Arc<JobState>,
}

impl Runnable {
    pub(crate) fn new(inner: async_task::Runnable, job: Arc<JobState>) -> Self {
        Self {
            inner: Some(inner),
            job,
        }
    }

    /// Poll the job; returns true if it woke itself while running
    pub fn run(mut self) -> bool {
        match self.inner.take() {
            Some(inner) => inner.run(),
            None => false,
        }
    }

    /// Id of the owning job
    pub fn job_id(&self) -> JobId {
        self.job.id()
    }

    /// Hand the segment back to the job's schedule function
    pub(crate) fn schedule(mut self) {
        if let Some(inner) = self.inner.take() {
            inner.schedule();
        }
    }
}

impl Drop for Runnable {
    fn drop(&mut self) {
        if self.inner.is_some() {
            self.job.mark_dropped();
        }
    }
}

impl fmt::Debug for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runnable").field("job", &self.job_id()).finish()
    }
}
