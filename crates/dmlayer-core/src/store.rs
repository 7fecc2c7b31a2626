#![forbid(unsafe_code)]

//! Cooperative observable variable store.
//!
//! # Design
//!
//! [`DataLayer`] is a cheaply cloneable handle over `Rc<RefCell<..>>` state,
//! the same single-threaded sharing model as the rest of the reactive stack.
//! Every clone addresses the same store; independent stores never share
//! anything.
//!
//! Notification is synchronous. The registry bumps the event counter and
//! hands back the enabled callbacks; the borrow is released before they are
//! invoked, so a callback may read or write the store (including the
//! variable that notified it).
//!
//! # Failure Modes
//!
//! - **Callback panics**: the remaining callbacks of that notify are not
//!   invoked. The counter and value were already committed.
//! - **Callback blocks or yields**: every other logical thread starves until
//!   it returns. Callbacks must be short.
//! - **Release during delivery**: callbacks already collected for the
//!   in-flight notify are still invoked; their reads fail with `Disabled`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::observer::{CallbackIdentity, Notification};
use crate::registry::{Dispatch, Farewell, Registry};
use crate::value::{NotifyKind, UserTag, ValueKind};
use crate::variable::VariableInfo;
use crate::wait::{Yield, poll_for_event};

type CallbackFn = dyn Fn(&DataLayer, &Notification<'_>);

/// Observer callback for a [`DataLayer`].
///
/// Identity is the shared allocation: clones are the same callback, two
/// separately constructed callbacks are different even if they wrap
/// identical code.
#[derive(Clone)]
pub struct Callback(Rc<CallbackFn>);

impl Callback {
    pub fn new(f: impl Fn(&DataLayer, &Notification<'_>) + 'static) -> Self {
        Self(Rc::new(f))
    }

    #[inline]
    fn call(&self, store: &DataLayer, notification: &Notification<'_>) {
        (self.0)(store, notification)
    }
}

impl CallbackIdentity for Callback {
    fn same_callback(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Registry of named, observable value cells for cooperatively scheduled
/// code.
#[derive(Clone)]
pub struct DataLayer {
    inner: Rc<RefCell<Registry<Callback>>>,
}

impl Default for DataLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DataLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLayer")
            .field("registry", &*self.inner.borrow())
            .finish()
    }
}

impl DataLayer {
    // ── Lifecycle ───────────────────────────────────────────────────

    /// Create an enabled, empty store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry::new(config))),
        }
    }

    #[must_use]
    pub fn config(&self) -> StoreConfig {
        self.inner.borrow().config()
    }

    /// Whether the store still accepts operations.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.borrow().is_enabled()
    }

    /// Disable the store permanently and release every variable and
    /// observer.
    ///
    /// With [`StoreConfig::notify_on_teardown`], each variable's enabled
    /// observers receive [`NotifyKind::Deleted`] after the store is disabled.
    /// The variables are already gone from the registry by then, so the
    /// notice carries the creation name and last tag.
    pub fn release(&self) -> Result<()> {
        let farewells = self.inner.borrow_mut().teardown()?;
        for farewell in farewells {
            self.deliver_farewell(&farewell);
        }
        Ok(())
    }

    /// Whether two handles address the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Registry ────────────────────────────────────────────────────

    /// Create a variable in kind `None`.
    ///
    /// Fails with `AlreadyExists` when the name (or any name with the same
    /// fingerprint) is already registered.
    pub fn create_variable(&self, name: impl AsRef<[u8]>) -> Result<VariableInfo> {
        self.inner.borrow_mut().create(name.as_ref())
    }

    pub fn variable(&self, name: impl AsRef<[u8]>) -> Result<VariableInfo> {
        self.inner.borrow().info(name.as_ref())
    }

    /// Snapshots of every variable, newest first.
    pub fn variables(&self) -> Result<Vec<VariableInfo>> {
        self.inner.borrow().infos()
    }

    // ── Writers ─────────────────────────────────────────────────────

    /// Store a number, creating the variable if needed, and notify.
    ///
    /// Returns the number of observers invoked.
    pub fn set_number(
        &self,
        name: impl AsRef<[u8]>,
        user_tag: UserTag,
        value: u64,
    ) -> Result<usize> {
        let name = name.as_ref();
        let dispatch = self.inner.borrow_mut().set_number(name, user_tag, value)?;
        Ok(self.deliver(name, dispatch))
    }

    /// Store a copy of `bytes`, creating the variable if needed, and notify.
    ///
    /// The backing buffer only grows. Returns the number of observers invoked.
    pub fn set_binary(
        &self,
        name: impl AsRef<[u8]>,
        user_tag: UserTag,
        bytes: &[u8],
    ) -> Result<usize> {
        let name = name.as_ref();
        let dispatch = self.inner.borrow_mut().set_binary(name, user_tag, bytes)?;
        Ok(self.deliver(name, dispatch))
    }

    /// Release the variable's value, reset it to `None`, and notify with
    /// [`NotifyKind::Cleared`].
    pub fn clear_variable(&self, name: impl AsRef<[u8]>, user_tag: UserTag) -> Result<usize> {
        let name = name.as_ref();
        let dispatch = self.inner.borrow_mut().clear(name, user_tag)?;
        Ok(self.deliver(name, dispatch))
    }

    /// Notify observers without touching the stored value.
    pub fn notify_only(&self, name: impl AsRef<[u8]>, user_tag: UserTag) -> Result<usize> {
        let name = name.as_ref();
        let dispatch = self.inner.borrow_mut().notify_only(name, user_tag)?;
        Ok(self.deliver(name, dispatch))
    }

    // ── Readers ─────────────────────────────────────────────────────

    pub fn number(&self, name: impl AsRef<[u8]>) -> Result<u64> {
        self.inner.borrow().number(name.as_ref())
    }

    /// Copy of the binary payload (declared length only).
    pub fn binary(&self, name: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        self.inner.borrow().binary(name.as_ref()).map(<[u8]>::to_vec)
    }

    /// Copy as much of the payload as fits into `out`.
    ///
    /// Returns the declared length, which may exceed `out.len()`.
    pub fn read_binary(&self, name: impl AsRef<[u8]>, out: &mut [u8]) -> Result<usize> {
        let registry = self.inner.borrow();
        let bytes = registry.binary(name.as_ref())?;
        let n = bytes.len().min(out.len());
        out[..n].copy_from_slice(&bytes[..n]);
        Ok(bytes.len())
    }

    pub fn variable_type(&self, name: impl AsRef<[u8]>) -> Result<ValueKind> {
        self.inner.borrow().kind(name.as_ref())
    }

    /// Declared length of a binary variable.
    pub fn binary_size(&self, name: impl AsRef<[u8]>) -> Result<usize> {
        self.inner.borrow().binary_len(name.as_ref())
    }

    /// Tag supplied by the most recent notify.
    pub fn user_tag(&self, name: impl AsRef<[u8]>) -> Result<UserTag> {
        self.inner.borrow().user_tag(name.as_ref())
    }

    // ── Observers ───────────────────────────────────────────────────

    /// Register an enabled observer, creating the variable if needed.
    ///
    /// Registering the same callback twice on one variable fails with
    /// `AlreadyExists`.
    pub fn add_observer(&self, name: impl AsRef<[u8]>, callback: &Callback) -> Result<()> {
        self.inner
            .borrow_mut()
            .add_observer(name.as_ref(), callback.clone())
    }

    /// Remove the newest observer registered with this callback.
    pub fn remove_observer(&self, name: impl AsRef<[u8]>, callback: &Callback) -> Result<()> {
        self.inner
            .borrow_mut()
            .remove_observer(name.as_ref(), callback)
    }

    /// Enable or suppress delivery to an observer without unregistering it.
    pub fn set_observer_enabled(
        &self,
        name: impl AsRef<[u8]>,
        callback: &Callback,
        enabled: bool,
    ) -> Result<()> {
        self.inner
            .borrow_mut()
            .set_observer_enabled(name.as_ref(), callback, enabled)
    }

    pub fn is_observer_enabled(&self, name: impl AsRef<[u8]>, callback: &Callback) -> Result<bool> {
        self.inner
            .borrow()
            .is_observer_enabled(name.as_ref(), callback)
    }

    // ── Blocking wait ───────────────────────────────────────────────

    /// Wait until the variable is notified, yielding between polls.
    ///
    /// `yielder` is invoked exactly once per unsuccessful poll and nowhere
    /// else. Returns the tag of the notify that ended the wait. Fails if the
    /// variable is missing, or disappears (store released) while waiting.
    pub fn observe_variable<Y: Yield + ?Sized>(
        &self,
        name: impl AsRef<[u8]>,
        yielder: &mut Y,
    ) -> Result<UserTag> {
        let name = name.as_ref();
        let wake = poll_for_event(|| self.inner.borrow().event_state(name), yielder)?;
        tracing::debug!(
            message = "dmlayer.observe.wake",
            name = %String::from_utf8_lossy(name),
            user_tag = wake.user_tag,
            yields = wake.yields
        );
        Ok(wake.user_tag)
    }

    // ── Delivery ────────────────────────────────────────────────────

    fn deliver(&self, name: &[u8], dispatch: Dispatch<Callback>) -> usize {
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

    fn deliver_farewell(&self, farewell: &Farewell<Callback>) {
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
