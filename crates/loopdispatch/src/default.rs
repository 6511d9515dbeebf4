//! Default loop registry
//!
//! The default dispatcher wraps `EventLoop::default_loop()`. Whichever thread
//! touches it first owns that loop and must pump it (see
//! `LoopThread::spawn_default`).

use crate::LoopDispatcher;
use loopdispatch_runtime::{
    register_main_dispatcher_factory, DispatchError, MainDispatcher, MainDispatcherFactory,
};
use loopdispatch_toolkit::EventLoop;
use std::sync::{Arc, Once, OnceLock};

/// Load priority of `LoopDispatcherFactory` (lower wins)
pub const LOOP_DISPATCHER_PRIORITY: i32 = 2;

/// Name of the default dispatcher
pub const DEFAULT_DISPATCHER_NAME: &str = "Default";

/// Process-wide default dispatcher; no teardown
pub struct DefaultLoopRegistry;

impl DefaultLoopRegistry {
    /// The default dispatcher, created on first access
    pub fn dispatcher() -> Arc<LoopDispatcher> {
        static DEFAULT: OnceLock<Arc<LoopDispatcher>> = OnceLock::new();
        DEFAULT
            .get_or_init(|| {
                let event_loop = EventLoop::default_loop();
                tracing::debug!(
                    loop_id = event_loop.id().as_u64(),
                    "default loop dispatcher created"
                );
                Arc::new(LoopDispatcher::with_name(
                    event_loop.handle(),
                    DEFAULT_DISPATCHER_NAME,
                ))
            })
            .clone()
    }

    /// Register `LoopDispatcherFactory` with the runtime (once per process)
    pub fn install() {
        static INSTALLED: Once = Once::new();
        INSTALLED.call_once(|| register_main_dispatcher_factory(Arc::new(LoopDispatcherFactory)));
    }
}

/// Main dispatcher factory backed by the default loop
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopDispatcherFactory;

impl MainDispatcherFactory for LoopDispatcherFactory {
    fn load_priority(&self) -> i32 {
        LOOP_DISPATCHER_PRIORITY
    }

    fn create_dispatcher(
        &self,
        _all: &[Arc<dyn MainDispatcherFactory>],
    ) -> Result<Arc<dyn MainDispatcher>, DispatchError> {
        Ok(DefaultLoopRegistry::dispatcher())
    }

    fn hint_on_error(&self) -> Option<String> {
        Some("the default event loop must be pumped by the thread that first touched it".to_string())
    }
}
