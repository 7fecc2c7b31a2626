#![forbid(unsafe_code)]

//! Variable records and their read-only snapshots.

use std::fmt;

use crate::fingerprint::Fingerprint;
use crate::observer::{CallbackIdentity, ObserverChain};
use crate::value::{UserTag, Value, ValueKind};

/// A named value cell with its observer chain.
#[derive(Debug)]
pub(crate) struct Variable<C> {
    pub(crate) id: Fingerprint,
    /// Name the variable was first created under.
    pub(crate) name: Box<[u8]>,
    pub(crate) value: Value,
    pub(crate) user_tag: UserTag,
    /// Bumped by exactly one per notify. Wraps.
    pub(crate) event_counter: u64,
    /// Set by the first value assignment; never reset.
    pub(crate) assigned: bool,
    pub(crate) observers: ObserverChain<C>,
}

impl<C: CallbackIdentity> Variable<C> {
    pub(crate) fn new(id: Fingerprint, name: &[u8]) -> Self {
        Self {
            id,
            name: name.into(),
            value: Value::None,
            user_tag: 0,
            event_counter: 0,
            assigned: false,
            observers: ObserverChain::default(),
        }
    }

    pub(crate) fn info(&self) -> VariableInfo {
        VariableInfo {
            id: self.id,
            name: String::from_utf8_lossy(&self.name).into_owned(),
            kind: self.value.kind(),
            user_tag: self.user_tag,
            event_counter: self.event_counter,
            observers: self.observers.len(),
            enabled_observers: self.observers.enabled_len(),
            binary_len: self.value.binary_len(),
            binary_capacity: self.value.binary_capacity(),
        }
    }
}

/// Point-in-time snapshot of a variable's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VariableInfo {
    pub id: Fingerprint,
    /// Name the variable was first created under (lossy UTF-8).
    pub name: String,
    pub kind: ValueKind,
    pub user_tag: UserTag,
    pub event_counter: u64,
    /// Registered observers, enabled or not.
    pub observers: usize,
    pub enabled_observers: usize,
    /// Declared length of the binary payload; `0` unless `kind` is binary.
    pub binary_len: usize,
    /// Allocated capacity of the binary buffer.
    pub binary_capacity: usize,
}

impl fmt::Display for VariableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]\t{:<7}\ttag={}\tevents={}\tobs={}/{}\t[{}]",
            self.id,
            self.kind,
            self.user_tag,
            self.event_counter,
            self.enabled_observers,
            self.observers,
            self.name
        )?;
        if self.kind == ValueKind::Binary {
            write!(f, "\t{}/{}B", self.binary_len, self.binary_capacity)?;
        }
        Ok(())
    }
}
