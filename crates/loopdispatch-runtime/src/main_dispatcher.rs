//! Main dispatcher selection
//!
//! Integrations register a `MainDispatcherFactory`; the factory with the lowest
//! load priority wins, the earliest registration breaking ties. The process-wide
//! main dispatcher is created once, on first successful lookup.

use crate::{DispatchError, MainDispatcher};
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

/// Creates a main dispatcher for one UI integration
pub trait MainDispatcherFactory: Send + Sync {
    /// Lower values win
    fn load_priority(&self) -> i32;

    /// Build the dispatcher; `all` is every registered factory in
    /// registration order
    fn create_dispatcher(
        &self,
        all: &[Arc<dyn MainDispatcherFactory>],
    ) -> Result<Arc<dyn MainDispatcher>, DispatchError>;

    /// Extra text appended to the error when creation fails
    fn hint_on_error(&self) -> Option<String> {
        None
    }
}

/// Ordered set of main dispatcher factories
#[derive(Default)]
pub struct MainDispatcherRegistry {
    factories: RwLock<Vec<Arc<dyn MainDispatcherFactory>>>,
}

impl MainDispatcherRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory
    pub fn register(&self, factory: Arc<dyn MainDispatcherFactory>) {
        let mut factories = self.factories.write();
        tracing::debug!(
            priority = factory.load_priority(),
            position = factories.len(),
            "registering main dispatcher factory"
        );
        factories.push(factory);
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// Factory that would be used to create the main dispatcher
    pub fn select(&self) -> Option<Arc<dyn MainDispatcherFactory>> {
        select(&self.factories.read()).cloned()
    }

    /// Create a dispatcher from the selected factory
    pub fn create_main(&self) -> Result<Arc<dyn MainDispatcher>, DispatchError> {
        let all = self.factories.read().clone();
        let Some(factory) = select(&all) else {
            return Err(DispatchError::MissingMain(
                "no main dispatcher factory registered".to_string(),
            ));
        };
        factory.create_dispatcher(&all).map_err(|err| {
            tracing::warn!(error = %err, "main dispatcher creation failed");
            match factory.hint_on_error() {
                Some(hint) => DispatchError::MissingMain(format!("{err}. {hint}")),
                None => err,
            }
        })
    }
}

fn select(factories: &[Arc<dyn MainDispatcherFactory>]) -> Option<&Arc<dyn MainDispatcherFactory>> {
    factories.iter().min_by_key(|factory| factory.load_priority())
}

static REGISTRY: OnceLock<MainDispatcherRegistry> = OnceLock::new();
static MAIN: OnceLock<Arc<dyn MainDispatcher>> = OnceLock::new();

/// Process-wide registry
pub fn global_registry() -> &'static MainDispatcherRegistry {
    REGISTRY.get_or_init(MainDispatcherRegistry::new)
}

/// Register a factory with the process-wide registry
pub fn register_main_dispatcher_factory(factory: Arc<dyn MainDispatcherFactory>) {
    global_registry().register(factory);
}

/// The process-wide main dispatcher
///
/// Fixed by the first successful call; failures are not cached.
pub fn main_dispatcher() -> Result<Arc<dyn MainDispatcher>, DispatchError> {
    if let Some(main) = MAIN.get() {
        return Ok(main.clone());
    }
    let created = global_registry().create_main()?;
    let main = MAIN.get_or_init(|| created);
    tracing::debug!(dispatcher = %main, "main dispatcher selected");
    Ok(main.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, Dispatcher, DisposableHandle, Resumer, Runnable};
    use std::fmt;
    use std::time::Duration;

    struct Named(&'static str);

    impl fmt::Display for Named {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl Dispatcher for Named {
        fn dispatch(&self, runnable: Runnable) -> Result<(), DispatchError> {
            runnable.run();
            Ok(())
        }

        fn schedule_resume_after_delay(
            &self,
            _delay: Duration,
            _resumer: Resumer,
        ) -> Result<DisposableHandle, DispatchError> {
            Ok(DisposableHandle::noop())
        }

        fn invoke_on_timeout(
            &self,
            _delay: Duration,
            _action: Action,
        ) -> Result<DisposableHandle, DispatchError> {
            Ok(DisposableHandle::noop())
        }
    }

    impl MainDispatcher for Named {
        fn immediate(self: Arc<Self>) -> Arc<dyn MainDispatcher> {
            self
        }
    }

    struct Factory {
        priority: i32,
        name: &'static str,
        fails: bool,
    }

    impl MainDispatcherFactory for Factory {
        fn load_priority(&self) -> i32 {
            self.priority
        }

        fn create_dispatcher(
            &self,
            _all: &[Arc<dyn MainDispatcherFactory>],
        ) -> Result<Arc<dyn MainDispatcher>, DispatchError> {
            if self.fails {
                return Err(DispatchError::Rejected("toolkit unavailable".to_string()));
            }
            Ok(Arc::new(Named(self.name)))
        }

        fn hint_on_error(&self) -> Option<String> {
            Some(format!("is the {} toolkit installed?", self.name))
        }
    }

    fn factory(priority: i32, name: &'static str) -> Arc<dyn MainDispatcherFactory> {
        Arc::new(Factory {
            priority,
            name,
            fails: false,
        })
    }

    #[test]
    fn test_empty_registry() {
        let registry = MainDispatcherRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.select().is_none());
        assert!(matches!(
            registry.create_main(),
            Err(DispatchError::MissingMain(_))
        ));
    }

    #[test]
    fn test_lowest_priority_wins() {
        let registry = MainDispatcherRegistry::new();
        registry.register(factory(2, "loop"));
        registry.register(factory(0, "swing"));
        registry.register(factory(1, "fx"));

        let main = registry.create_main().unwrap();
        assert_eq!(main.to_string(), "swing");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_tie_goes_to_first_registered() {
        let registry = MainDispatcherRegistry::new();
        registry.register(factory(2, "first"));
        registry.register(factory(2, "second"));

        assert_eq!(registry.create_main().unwrap().to_string(), "first");
    }

    #[test]
    fn test_failure_carries_hint() {
        let registry = MainDispatcherRegistry::new();
        registry.register(Arc::new(Factory {
            priority: 0,
            name: "broken",
            fails: true,
        }));

        let Err(DispatchError::MissingMain(message)) = registry.create_main() else {
            panic!("expected MissingMain");
        };
        assert!(message.contains("toolkit unavailable"));
        assert!(message.contains("is the broken toolkit installed?"));
    }
}
