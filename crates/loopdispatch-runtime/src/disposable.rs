//! Disposable handles for cancelling scheduled work

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type DisposeFn = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    disposed: AtomicBool,
    action: Mutex<Option<DisposeFn>>,
}

/// Handle that cancels one piece of scheduled work
///
/// `dispose` runs the cancel action at most once no matter how many clones
/// call it or from which thread.
#[derive(Clone)]
pub struct DisposableHandle {
    inner: Option<Arc<Inner>>,
}

impl DisposableHandle {
    /// Handle whose first `dispose` runs `action`
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Some(Arc::new(Inner {
                disposed: AtomicBool::new(false),
                action: Mutex::new(Some(Box::new(action))),
            })),
        }
    }

    /// Inert handle; disposing it does nothing
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// Cancel the scheduled work (idempotent)
    pub fn dispose(&self) {
        let Some(inner) = &self.inner else {
            return;
        };
        if inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let action = inner.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }

    /// Whether `dispose` has been called (always true for `noop`)
    pub fn is_disposed(&self) -> bool {
        self.inner
            .as_ref()
            .map_or(true, |inner| inner.disposed.load(Ordering::Acquire))
    }

    /// Whether this is an inert handle
    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }
}

impl fmt::Debug for DisposableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableHandle")
            .field("noop", &self.is_noop())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_dispose_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let handle = DisposableHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!handle.is_disposed());
        handle.dispose();
        handle.clone().dispose();
        handle.dispose();

        assert!(handle.is_disposed());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_dispose_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let handle = DisposableHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || handle.dispose())
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_noop() {
        let handle = DisposableHandle::noop();
        assert!(handle.is_noop());
        assert!(handle.is_disposed());
        handle.dispose();
    }
}
