#![forbid(unsafe_code)]

//! Per-variable observer chains.
//!
//! A chain owns its observers outright; there is no way to hold a reference to
//! an observer from outside. Callbacks are identified by the identity of the
//! shared allocation behind them, so a clone of a callback handle addresses
//! the same observer.
//!
//! # Invariants
//!
//! 1. A callback identity is registered at most once per chain.
//! 2. Delivery order is newest registration first.
//! 3. The enabled flag only suppresses delivery; it never changes
//!    registration.
//! 4. Removal takes out the first (newest) match and stops.

use crate::value::{NotifyKind, UserTag};

/// Payload handed to every observer callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification<'a> {
    /// Name bytes of the variable, as supplied by the notifying caller.
    pub name: &'a [u8],
    /// Tag supplied by the notifying caller.
    pub user_tag: UserTag,
    pub kind: NotifyKind,
}

impl Notification<'_> {
    /// Length of [`name`](Self::name) in bytes.
    #[inline]
    #[must_use]
    pub fn name_len(&self) -> usize {
        self.name.len()
    }

    /// The name decoded as UTF-8, with invalid sequences replaced.
    #[must_use]
    pub fn name_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.name)
    }
}

/// A cloneable callback handle with a stable identity.
pub trait CallbackIdentity: Clone {
    /// Whether both handles refer to the same callback.
    fn same_callback(&self, other: &Self) -> bool;
}

#[derive(Debug)]
struct Observer<C> {
    callback: C,
    enabled: bool,
}

/// Observers registered on one variable, stored oldest first.
#[derive(Debug)]
pub(crate) struct ObserverChain<C> {
    observers: Vec<Observer<C>>,
}

impl<C> Default for ObserverChain<C> {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
        }
    }
}

impl<C: CallbackIdentity> ObserverChain<C> {
    fn position(&self, callback: &C) -> Option<usize> {
        self.observers
            .iter()
            .rposition(|o| o.callback.same_callback(callback))
    }

    /// Register a new enabled observer. Returns `false` for a duplicate.
    pub(crate) fn add(&mut self, callback: C) -> bool {
        if self.position(&callback).is_some() {
            return false;
        }
        self.observers.push(Observer {
            callback,
            enabled: true,
        });
        true
    }

    /// Remove the newest observer with this identity.
    pub(crate) fn remove(&mut self, callback: &C) -> bool {
        match self.position(callback) {
            Some(index) => {
                self.observers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns `None` when the callback is not registered.
    pub(crate) fn set_enabled(&mut self, callback: &C, enabled: bool) -> Option<()> {
        let index = self.position(callback)?;
        self.observers[index].enabled = enabled;
        Some(())
    }

    pub(crate) fn is_enabled(&self, callback: &C) -> Option<bool> {
        self.position(callback).map(|i| self.observers[i].enabled)
    }

    /// Enabled callbacks, newest first.
    pub(crate) fn enabled_newest_first(&self) -> Vec<C> {
        self.observers
            .iter()
            .rev()
            .filter(|o| o.enabled)
            .map(|o| o.callback.clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn enabled_len(&self) -> usize {
        self.observers.iter().filter(|o| o.enabled).count()
    }
}
