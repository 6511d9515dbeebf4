//! Loop-bound resources

use crate::{EventLoop, LoopError, LoopHandle, LoopResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Something whose disposal can be checked and which belongs to one loop
pub trait LoopResource {
    /// Whether the resource is disposed
    fn is_disposed(&self) -> bool;

    /// The loop that owns this resource
    fn loop_handle(&self) -> Arc<dyn LoopHandle>;
}

impl LoopResource for EventLoop {
    fn is_disposed(&self) -> bool {
        EventLoop::is_disposed(self)
    }

    fn loop_handle(&self) -> Arc<dyn LoopHandle> {
        self.handle()
    }
}

struct WidgetInner {
    name: String,
    event_loop: EventLoop,
    disposed: AtomicBool,
    text: Mutex<String>,
}

/// Minimal widget: owned by a loop, mutable only from the loop's thread
///
/// A widget is disposed when it is disposed explicitly or when its loop is.
#[derive(Clone)]
pub struct Widget {
    inner: Arc<WidgetInner>,
}

impl Widget {
    /// Create a widget bound to `event_loop`
    pub fn new(event_loop: &EventLoop, name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(WidgetInner {
                name: name.into(),
                event_loop: event_loop.clone(),
                disposed: AtomicBool::new(false),
                text: Mutex::new(String::new()),
            }),
        }
    }

    /// Widget name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The owning loop
    pub fn event_loop(&self) -> &EventLoop {
        &self.inner.event_loop
    }

    /// Whether the widget or its loop is disposed
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire) || self.inner.event_loop.is_disposed()
    }

    /// Dispose the widget
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::Release);
    }

    /// Replace the widget text (owner thread only)
    pub fn set_text(&self, text: impl Into<String>) -> LoopResult<()> {
        self.check_access()?;
        *self.inner.text.lock() = text.into();
        Ok(())
    }

    /// Current widget text (owner thread only)
    pub fn text(&self) -> LoopResult<String> {
        self.check_access()?;
        Ok(self.inner.text.lock().clone())
    }

    fn check_access(&self) -> LoopResult<()> {
        if self.is_disposed() {
            return Err(LoopError::Disposed);
        }
        if !self.inner.event_loop.is_owner_thread() {
            return Err(LoopError::WrongThread);
        }
        Ok(())
    }
}

impl LoopResource for Widget {
    fn is_disposed(&self) -> bool {
        Widget::is_disposed(self)
    }

    fn loop_handle(&self) -> Arc<dyn LoopHandle> {
        self.inner.event_loop.handle()
    }
}

impl std::fmt::Debug for Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("name", &self.inner.name)
            .field("event_loop", &self.inner.event_loop)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
