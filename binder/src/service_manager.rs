//! Name-keyed registry of binder endpoints with availability waiting.

use crate::endpoint::BinderObject;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

type ServiceCallback = Box<dyn FnOnce(Arc<dyn BinderObject>) + Send>;

struct State {
    services: HashMap<String, Arc<dyn BinderObject>>,
    waiters: HashMap<String, Vec<ServiceCallback>>,
}

struct Inner {
    state: Mutex<State>,
    available: Condvar,
}

/// Process-wide name → binder registry.
///
/// The manager is an explicit, cloneable handle rather than an ambient
/// static: tests construct a fresh instance as their reset, and long-lived
/// code shares one by cloning. Registration and waiter handoff happen
/// under a single lock, so a check-then-wait can never miss a concurrent
/// [`ServiceManager::add_service`].
#[derive(Clone)]
pub struct ServiceManager {
    inner: Arc<Inner>,
}

impl ServiceManager {
    /// Creates an empty service manager.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    services: HashMap::new(),
                    waiters: HashMap::new(),
                }),
                available: Condvar::new(),
            }),
        }
    }

    /// Registers `binder` under `name`, silently overwriting any previous
    /// registration, then releases blocked sync waiters and delivers every
    /// pending availability callback for that name.
    ///
    /// Callbacks run on the calling thread. Each one is isolated: a
    /// panicking waiter is logged and delivery continues with the rest.
    pub fn add_service(&self, name: impl Into<String>, binder: Arc<dyn BinderObject>) {
        let name = name.into();
        let callbacks = {
            let mut state = self.inner.state.lock().unwrap();
            state.services.insert(name.clone(), binder.clone());
            self.inner.available.notify_all();
            state.waiters.remove(&name).unwrap_or_default()
        };
        for callback in callbacks {
            let binder = binder.clone();
            if catch_unwind(AssertUnwindSafe(move || callback(binder))).is_err() {
                tracing::error!(service = %name, "service availability callback panicked");
            }
        }
    }

    /// Returns the binder registered under `name`, if any.
    pub fn get_service(&self, name: &str) -> Option<Arc<dyn BinderObject>> {
        self.inner.state.lock().unwrap().services.get(name).cloned()
    }

    /// Non-blocking lookup; identical to [`ServiceManager::get_service`].
    pub fn check_service(&self, name: &str) -> Option<Arc<dyn BinderObject>> {
        self.get_service(name)
    }

    /// Blocks until `name` is registered or the timeout elapses.
    ///
    /// Returns immediately when the service is already present; otherwise
    /// the caller sleeps on the registry condvar and is woken by the next
    /// matching registration. `None` means the timeout expired.
    pub fn wait_for_service_sync(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Option<Arc<dyn BinderObject>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock().unwrap();
        loop {
            if let Some(binder) = state.services.get(name).cloned() {
                return Some(binder);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (next, _) = self
                .inner
                .available
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = next;
        }
    }

    /// Registers interest in `name` without blocking.
    ///
    /// The callback fires exactly once: synchronously on this thread when
    /// the service is already registered, otherwise later on whatever
    /// thread eventually calls [`ServiceManager::add_service`].
    pub fn wait_for_service<F>(&self, name: impl Into<String>, callback: F)
    where
        F: FnOnce(Arc<dyn BinderObject>) + Send + 'static,
    {
        let name = name.into();
        let mut callback = Some(Box::new(callback) as ServiceCallback);
        let ready = {
            let mut state = self.inner.state.lock().unwrap();
            match state.services.get(&name).cloned() {
                Some(binder) => Some(binder),
                None => {
                    let stored = callback.take().unwrap();
                    state.waiters.entry(name).or_default().push(stored);
                    None
                }
            }
        };
        // Synchronous delivery happens outside the lock.
        if let (Some(binder), Some(callback)) = (ready, callback.take()) {
            callback(binder);
        }
    }

    /// Returns all registered names, sorted.
    pub fn list_services(&self) -> Vec<String> {
        let state = self.inner.state.lock().unwrap();
        let mut names: Vec<String> = state.services.keys().cloned().collect();
        names.sort();
        names
    }

    /// Drops every registration and pending waiter in place.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.services.clear();
        state.waiters.clear();
    }
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{Binder, TransactError};
    use parcel::Parcel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Weak;
    use std::thread;

    const NOOP_DESCRIPTOR: &str = "test.INoop";

    struct NoopService {
        binder: Binder,
    }

    impl NoopService {
        fn new() -> Arc<Self> {
            Arc::new_cyclic(|me: &Weak<NoopService>| {
                let binder = Binder::new();
                binder.attach_interface(me.clone(), NOOP_DESCRIPTOR);
                NoopService { binder }
            })
        }
    }

    impl BinderObject for NoopService {
        fn binder(&self) -> &Binder {
            &self.binder
        }

        fn on_transact(
            &self,
            _code: u32,
            data: &mut Parcel,
            _reply: Option<&mut Parcel>,
            _flags: u32,
        ) -> Result<bool, TransactError> {
            data.enforce_interface(NOOP_DESCRIPTOR)?;
            Ok(true)
        }
    }

    #[test]
    fn test_get_before_add_returns_none() {
        let manager = ServiceManager::new();
        assert!(manager.get_service("missing").is_none());
        assert!(manager.check_service("missing").is_none());
    }

    #[test]
    fn test_add_and_get() {
        let manager = ServiceManager::new();
        let service = NoopService::new();
        manager.add_service("noop", service.clone());

        let found = manager.get_service("noop").unwrap();
        assert_eq!(found.binder().id(), service.binder().id());
    }

    #[test]
    fn test_reregistration_overwrites() {
        let manager = ServiceManager::new();
        let first = NoopService::new();
        let second = NoopService::new();

        manager.add_service("noop", first);
        manager.add_service("noop", second.clone());

        let found = manager.get_service("noop").unwrap();
        assert_eq!(found.binder().id(), second.binder().id());
        assert_eq!(manager.list_services(), vec!["noop".to_string()]);
    }

    #[test]
    fn test_wait_sync_immediate_when_registered() {
        let manager = ServiceManager::new();
        manager.add_service("noop", NoopService::new());

        let found = manager.wait_for_service_sync("noop", Duration::from_millis(0));
        assert!(found.is_some());
    }

    #[test]
    fn test_wait_sync_times_out() {
        let manager = ServiceManager::new();
        let started = Instant::now();
        let found = manager.wait_for_service_sync("never", Duration::from_millis(50));
        assert!(found.is_none());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_wait_sync_released_by_concurrent_add() {
        let manager = ServiceManager::new();
        let producer = manager.clone();

        let registrar = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            producer.add_service("late", NoopService::new());
        });

        let found = manager.wait_for_service_sync("late", Duration::from_secs(5));
        assert!(found.is_some());
        registrar.join().unwrap();
    }

    #[test]
    fn test_callback_fires_synchronously_when_available() {
        let manager = ServiceManager::new();
        manager.add_service("noop", NoopService::new());

        let fired = Arc::new(AtomicUsize::new(0));
        let seen = fired.clone();
        manager.wait_for_service("noop", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_fires_once_on_later_add() {
        let manager = ServiceManager::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = fired.clone();
        manager.wait_for_service("late", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        manager.add_service("late", NoopService::new());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Re-registration does not re-fire a consumed waiter.
        manager.add_service("late", NoopService::new());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_callback_does_not_block_others() {
        let manager = ServiceManager::new();
        let fired = Arc::new(AtomicUsize::new(0));

        manager.wait_for_service("svc", |_| panic!("bad waiter"));
        let seen = fired.clone();
        manager.wait_for_service("svc", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        manager.add_service("svc", NoopService::new());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_list_services_sorted() {
        let manager = ServiceManager::new();
        manager.add_service("zeta", NoopService::new());
        manager.add_service("alpha", NoopService::new());
        assert_eq!(
            manager.list_services(),
            vec!["alpha".to_string(), "zeta".to_string()]
        );
    }

    #[test]
    fn test_reset_clears_registrations_and_waiters() {
        let manager = ServiceManager::new();
        manager.add_service("noop", NoopService::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = fired.clone();
        manager.wait_for_service("pending", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        manager.reset();
        assert!(manager.get_service("noop").is_none());
        assert!(manager.list_services().is_empty());

        // The cleared waiter never fires.
        manager.add_service("pending", NoopService::new());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
