//! Per-worker browser session ownership.
//!
//! Each worker thread drives exactly one browser session for the duration
//! of one test method. The registry is an explicit map from worker thread
//! to owned session — no thread-local magic — so ownership and teardown
//! order are visible and testable. The map itself is shared structurally,
//! but every entry is created, used, and removed only by its owning thread;
//! cross-thread handle use is a detected programming error, not something
//! that is silently tolerated.

use crate::config::Settings;
use crate::driver::{SessionFactory, UiDriver};
use crate::result::{EsperarError, EsperarResult};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{info, warn};
use uuid::Uuid;

/// One browser session, bound to the worker thread that acquired it
pub struct SessionHandle {
    id: Uuid,
    owner: ThreadId,
    driver: Box<dyn UiDriver>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    /// Unique id of this session
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Worker thread this session is bound to
    #[must_use]
    pub const fn owner(&self) -> ThreadId {
        self.owner
    }

    /// The underlying driver, for the owning thread only
    ///
    /// # Errors
    ///
    /// [`EsperarError::ForeignSessionAccess`] when called from any thread
    /// other than the one that acquired the session.
    pub fn driver(&self) -> EsperarResult<&dyn UiDriver> {
        let caller = thread::current().id();
        if caller != self.owner {
            return Err(EsperarError::ForeignSessionAccess {
                owner: format!("{:?}", self.owner),
                caller: format!("{caller:?}"),
            });
        }
        Ok(self.driver.as_ref())
    }

    /// Teardown path: release() has already unlinked the handle, and the
    /// registry only tears down entries it removed for the calling thread
    fn driver_for_teardown(&self) -> &dyn UiDriver {
        self.driver.as_ref()
    }
}

/// Explicit map from worker thread to its one live session
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<ThreadId, Arc<SessionHandle>>,
}

impl SessionRegistry {
    /// An empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh session for the calling thread and bind it.
    ///
    /// # Errors
    ///
    /// [`EsperarError::SessionAlreadyBound`] if the calling thread already
    /// holds a live session, and [`EsperarError::SessionCreation`] if the
    /// factory fails — fatal either way, never retried: no test can
    /// proceed without its session.
    pub fn acquire(
        &self,
        factory: &dyn SessionFactory,
        settings: &Settings,
    ) -> EsperarResult<Arc<SessionHandle>> {
        let owner = thread::current().id();
        if self.sessions.contains_key(&owner) {
            return Err(EsperarError::SessionAlreadyBound {
                thread: format!("{owner:?}"),
            });
        }

        let driver = factory.create(settings).map_err(|e| match e {
            fatal @ EsperarError::SessionCreation { .. } => fatal,
            other => EsperarError::SessionCreation {
                message: other.to_string(),
            },
        })?;

        let handle = Arc::new(SessionHandle {
            id: Uuid::new_v4(),
            owner,
            driver,
        });
        info!(session = %handle.id, ?owner, "browser session acquired");
        self.sessions.insert(owner, Arc::clone(&handle));
        Ok(handle)
    }

    /// The calling thread's session, if it holds one. A thread never
    /// observes another thread's handle through this.
    #[must_use]
    pub fn current(&self) -> Option<Arc<SessionHandle>> {
        self.sessions
            .get(&thread::current().id())
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Tear down the calling thread's session.
    ///
    /// The handle is unlinked from the registry before teardown runs, so it
    /// is gone on every exit path; teardown failures are logged and
    /// swallowed — best-effort cleanup must never mask the test's own
    /// outcome. A thread with no session is a no-op.
    pub fn release(&self) {
        let owner = thread::current().id();
        let Some((_, handle)) = self.sessions.remove(&owner) else {
            return;
        };
        match handle.driver_for_teardown().quit() {
            Ok(()) => info!(session = %handle.id, "browser session released"),
            Err(e) => warn!(session = %handle.id, error = %e, "session teardown failed"),
        }
    }

    /// Number of live sessions across all workers
    #[must_use]
    pub fn active(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FailingSessionFactory, MockDriver, MockSessionFactory};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn settings() -> Settings {
        Settings {
            base_url: "https://shop.example.test".into(),
            ..Settings::default()
        }
    }

    fn factory() -> MockSessionFactory {
        MockSessionFactory::new(MockDriver::new)
    }

    #[test]
    fn test_acquire_binds_to_calling_thread() {
        let registry = SessionRegistry::new();
        let handle = registry.acquire(&factory(), &settings()).unwrap();
        assert_eq!(handle.owner(), thread::current().id());
        assert_eq!(registry.current().unwrap().id(), handle.id());
        assert_eq!(registry.active(), 1);
        registry.release();
    }

    #[test]
    fn test_current_on_other_thread_is_absent() {
        let registry = SessionRegistry::new();
        let _handle = registry.acquire(&factory(), &settings()).unwrap();
        thread::scope(|scope| {
            scope.spawn(|| {
                assert!(registry.current().is_none());
            });
        });
        registry.release();
    }

    #[test]
    fn test_double_acquire_is_detected() {
        let registry = SessionRegistry::new();
        let _handle = registry.acquire(&factory(), &settings()).unwrap();
        let err = registry.acquire(&factory(), &settings()).unwrap_err();
        assert!(matches!(err, EsperarError::SessionAlreadyBound { .. }));
        registry.release();
    }

    #[test]
    fn test_factory_failure_is_fatal_session_creation() {
        let registry = SessionRegistry::new();
        let err = registry
            .acquire(&FailingSessionFactory, &settings())
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn test_foreign_driver_access_is_detected() {
        let registry = SessionRegistry::new();
        let handle = registry.acquire(&factory(), &settings()).unwrap();
        assert!(handle.driver().is_ok());
        thread::scope(|scope| {
            let handle = &handle;
            scope.spawn(move || {
                let err = handle.driver().err().unwrap();
                assert!(matches!(err, EsperarError::ForeignSessionAccess { .. }));
            });
        });
        registry.release();
    }

    #[test]
    fn test_release_quits_and_unbinds() {
        let quits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&quits);
        let factory = MockSessionFactory::new(move || {
            MockDriver::new().with_shared_quit_counter(Arc::clone(&counter))
        });
        let registry = SessionRegistry::new();
        let _handle = registry.acquire(&factory, &settings()).unwrap();
        registry.release();
        assert_eq!(quits.load(Ordering::SeqCst), 1);
        assert!(registry.current().is_none());
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn test_release_swallows_teardown_failure() {
        let registry = SessionRegistry::new();
        let factory = MockSessionFactory::new(|| MockDriver::new().failing_quit());
        let _handle = registry.acquire(&factory, &settings()).unwrap();
        // Must not panic, and the handle must be gone regardless
        registry.release();
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn test_release_without_session_is_noop() {
        let registry = SessionRegistry::new();
        registry.release();
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn test_one_session_per_worker() {
        let registry = SessionRegistry::new();
        let factory = factory();
        let settings = settings();
        thread::scope(|scope| {
            for _ in 0..4 {
                let registry = &registry;
                let factory = &factory;
                let settings = &settings;
                scope.spawn(move || {
                    let handle = registry.acquire(factory, settings).unwrap();
                    assert_eq!(registry.current().unwrap().id(), handle.id());
                    registry.release();
                });
            }
        });
        assert_eq!(registry.active(), 0);
        assert_eq!(factory.created(), 4);
    }
}
