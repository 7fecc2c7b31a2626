#![forbid(unsafe_code)]

//! Thread-safe observable variable store.
//!
//! # Design
//!
//! [`SharedDataLayer`] holds the same registry as [`DataLayer`] behind an
//! `Arc<Mutex<..>>` and pairs it with a [`Condvar`] that is signalled on every
//! notify and on teardown. Waiters park on the condvar instead of spinning a
//! yield loop.
//!
//! The lock is held only for bookkeeping. Callbacks run after it is released,
//! on the notifying thread, so they may call back into the store.
//!
//! # Failure Modes
//!
//! - **Poisoned lock**: a thread panicked while holding the registry. The
//!   registry is never left half-updated across an unwind point, so the
//!   poison is cleared and the data reused.
//! - **Callback panics**: the panic propagates on the notifying thread after
//!   the value and counter were committed. Other threads are unaffected.
//!
//! [`DataLayer`]: crate::store::DataLayer

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::observer::{CallbackIdentity, Notification};
use crate::registry::{Dispatch, Farewell, Registry};
use crate::value::{NotifyKind, UserTag, ValueKind};
use crate::variable::VariableInfo;

type SharedCallbackFn = dyn Fn(&SharedDataLayer, &Notification<'_>) + Send + Sync;

/// Observer callback for a [`SharedDataLayer`].
///
/// Identity is the shared allocation, as with [`crate::store::Callback`].
#[derive(Clone)]
pub struct SharedCallback(Arc<SharedCallbackFn>);

impl SharedCallback {
    pub fn new(f: impl Fn(&SharedDataLayer, &Notification<'_>) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    #[inline]
    fn call(&self, store: &SharedDataLayer, notification: &Notification<'_>) {
        (self.0)(store, notification)
    }
}

impl CallbackIdentity for SharedCallback {
    fn same_callback(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SharedCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedCallback")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

struct Shared {
    registry: Mutex<Registry<SharedCallback>>,
    changed: Condvar,
}

/// Registry of named, observable value cells shared between OS threads.
#[derive(Clone)]
pub struct SharedDataLayer {
    shared: Arc<Shared>,
}

impl Default for SharedDataLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedDataLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedDataLayer")
            .field("registry", &*self.lock())
            .finish()
    }
}

impl SharedDataLayer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::new(config)),
                changed: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry<SharedCallback>> {
        self.shared
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn config(&self) -> StoreConfig {
        self.lock().config()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.lock().is_enabled()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Disable the store, wake every waiter, and deliver `Deleted` notices
    /// if configured.
    pub fn release(&self) -> Result<()> {
        let farewells = self.lock().teardown()?;
        self.shared.changed.notify_all();
        for farewell in farewells {
            self.deliver_farewell(&farewell);
        }
        Ok(())
    }

    pub fn create_variable(&self, name: impl AsRef<[u8]>) -> Result<VariableInfo> {
        self.lock().create(name.as_ref())
    }

    pub fn variable(&self, name: impl AsRef<[u8]>) -> Result<VariableInfo> {
        self.lock().info(name.as_ref())
    }

    pub fn variables(&self) -> Result<Vec<VariableInfo>> {
        self.lock().infos()
    }

    pub fn set_number(
        &self,
        name: impl AsRef<[u8]>,
        user_tag: UserTag,
        value: u64,
    ) -> Result<usize> {
        let name = name.as_ref();
        let dispatch = self.lock().set_number(name, user_tag, value)?;
        Ok(self.deliver(name, dispatch))
    }

    pub fn set_binary(
        &self,
        name: impl AsRef<[u8]>,
        user_tag: UserTag,
        bytes: &[u8],
    ) -> Result<usize> {
        let name = name.as_ref();
        let dispatch = self.lock().set_binary(name, user_tag, bytes)?;
        Ok(self.deliver(name, dispatch))
    }

    pub fn clear_variable(&self, name: impl AsRef<[u8]>, user_tag: UserTag) -> Result<usize> {
        let name = name.as_ref();
        let dispatch = self.lock().clear(name, user_tag)?;
        Ok(self.deliver(name, dispatch))
    }

    pub fn notify_only(&self, name: impl AsRef<[u8]>, user_tag: UserTag) -> Result<usize> {
        let name = name.as_ref();
        let dispatch = self.lock().notify_only(name, user_tag)?;
        Ok(self.deliver(name, dispatch))
    }

    pub fn number(&self, name: impl AsRef<[u8]>) -> Result<u64> {
        self.lock().number(name.as_ref())
    }

    pub fn binary(&self, name: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        self.lock().binary(name.as_ref()).map(<[u8]>::to_vec)
    }

    /// Copy as much of the payload as fits into `out`; returns the declared
    /// length.
    pub fn read_binary(&self, name: impl AsRef<[u8]>, out: &mut [u8]) -> Result<usize> {
        let registry = self.lock();
        let bytes = registry.binary(name.as_ref())?;
        let n = bytes.len().min(out.len());
        out[..n].copy_from_slice(&bytes[..n]);
        Ok(bytes.len())
    }

    pub fn variable_type(&self, name: impl AsRef<[u8]>) -> Result<ValueKind> {
        self.lock().kind(name.as_ref())
    }

    pub fn binary_size(&self, name: impl AsRef<[u8]>) -> Result<usize> {
        self.lock().binary_len(name.as_ref())
    }

    pub fn user_tag(&self, name: impl AsRef<[u8]>) -> Result<UserTag> {
        self.lock().user_tag(name.as_ref())
    }

    pub fn add_observer(&self, name: impl AsRef<[u8]>, callback: &SharedCallback) -> Result<()> {
        self.lock().add_observer(name.as_ref(), callback.clone())
    }

    pub fn remove_observer(
        &self,
        name: impl AsRef<[u8]>,
        callback: &SharedCallback,
    ) -> Result<()> {
        self.lock().remove_observer(name.as_ref(), callback)
    }

    pub fn set_observer_enabled(
        &self,
        name: impl AsRef<[u8]>,
        callback: &SharedCallback,
        enabled: bool,
    ) -> Result<()> {
        self.lock()
            .set_observer_enabled(name.as_ref(), callback, enabled)
    }

    pub fn is_observer_enabled(
        &self,
        name: impl AsRef<[u8]>,
        callback: &SharedCallback,
    ) -> Result<bool> {
        self.lock().is_observer_enabled(name.as_ref(), callback)
    }

    /// Block the calling thread until the variable is notified.
    ///
    /// Returns the tag of the notify that ended the wait. Fails if the
    /// variable is missing or the store is released while waiting.
    pub fn observe_variable(&self, name: impl AsRef<[u8]>) -> Result<UserTag> {
        let name = name.as_ref();
        let mut registry = self.lock();
        let (baseline, _) = registry.event_state(name)?;
        let mut wakeups = 0u64;
        loop {
            let (counter, user_tag) = registry.event_state(name)?;
            if counter != baseline {
                tracing::debug!(
                    message = "dmlayer.observe.wake",
                    name = %String::from_utf8_lossy(name),
                    user_tag,
                    wakeups
                );
                return Ok(user_tag);
            }
            registry = self
                .shared
                .changed
                .wait(registry)
                .unwrap_or_else(PoisonError::into_inner);
            wakeups += 1;
        }
    }

    /// Like [`observe_variable`](Self::observe_variable), giving up after
    /// `timeout`.
    ///
    /// Returns `Ok(None)` when the deadline passes without a notify. A
    /// timeout too large to represent as a deadline waits without bound.
    pub fn observe_variable_timeout(
        &self,
        name: impl AsRef<[u8]>,
        timeout: Duration,
    ) -> Result<Option<UserTag>> {
        let name = name.as_ref();
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.observe_variable(name).map(Some);
        };
        let mut registry = self.lock();
        let (baseline, _) = registry.event_state(name)?;
        let mut wakeups = 0u64;
        loop {
            let (counter, user_tag) = registry.event_state(name)?;
            if counter != baseline {
                tracing::debug!(
                    message = "dmlayer.observe.wake",
                    name = %String::from_utf8_lossy(name),
                    user_tag,
                    wakeups
                );
                return Ok(Some(user_tag));
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Ok(None);
            };
            if remaining.is_zero() {
                return Ok(None);
            }
            let (guard, _) = self
                .shared
                .changed
                .wait_timeout(registry, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            registry = guard;
            wakeups += 1;
        }
    }

    fn deliver(&self, name: &[u8], dispatch: Dispatch<SharedCallback>) -> usize {
        self.shared.changed.notify_all();
        if dispatch.targets.is_empty() {
            return 0;
        }
        let _span = tracing::debug_span!(
            "dmlayer.notify",
            id = %dispatch.id,
            kind = %dispatch.kind,
            counter = dispatch.counter
        )
        .entered();
        let notification = Notification {
            name,
            user_tag: dispatch.user_tag,
            kind: dispatch.kind,
        };
        for callback in &dispatch.targets {
            callback.call(self, &notification);
        }
        dispatch.targets.len()
    }

    fn deliver_farewell(&self, farewell: &Farewell<SharedCallback>) {
        let notification = Notification {
            name: &farewell.name,
            user_tag: farewell.user_tag,
            kind: NotifyKind::Deleted,
        };
        for callback in &farewell.targets {
            callback.call(self, &notification);
        }
    }
}
