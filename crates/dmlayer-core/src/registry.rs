#![forbid(unsafe_code)]

//! Variable registry: storage, kind management, and notification bookkeeping.
//!
//! The registry never invokes callbacks itself. Every value-affecting
//! operation returns a [`Dispatch`] listing the enabled callbacks (newest
//! first) so the owning store can release its borrow or lock before
//! delivering them. That lets callbacks re-enter the store freely.
//!
//! # Invariants
//!
//! 1. At most one variable per [`Fingerprint`]; duplicates and collisions
//!    both fail with `AlreadyExists`.
//! 2. Lookups scan newest first.
//! 3. Every dispatch bumps the event counter by exactly one.
//! 4. Once disabled, every operation fails with `Disabled`, forever.

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::fingerprint::Fingerprint;
use crate::observer::CallbackIdentity;
use crate::value::{NotifyKind, UserTag, Value, ValueKind};
use crate::variable::{Variable, VariableInfo};

/// Callbacks to deliver for one notify, plus what to tell them.
#[derive(Debug)]
pub(crate) struct Dispatch<C> {
    pub(crate) id: Fingerprint,
    pub(crate) kind: NotifyKind,
    pub(crate) user_tag: UserTag,
    pub(crate) counter: u64,
    pub(crate) targets: Vec<C>,
}

/// `Deleted` delivery for one variable at teardown.
#[derive(Debug)]
pub(crate) struct Farewell<C> {
    pub(crate) name: Box<[u8]>,
    pub(crate) user_tag: UserTag,
    pub(crate) targets: Vec<C>,
}

#[derive(Debug)]
pub(crate) struct Registry<C> {
    enabled: bool,
    /// Oldest first; indices are stable until teardown.
    variables: Vec<Variable<C>>,
    config: StoreConfig,
}

impl<C: CallbackIdentity> Registry<C> {
    pub(crate) fn new(config: StoreConfig) -> Self {
        Self {
            enabled: true,
            variables: Vec::new(),
            config,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn config(&self) -> StoreConfig {
        self.config
    }

    fn guard(&self, name: &[u8]) -> Result<Fingerprint> {
        if !self.enabled {
            return Err(StoreError::Disabled);
        }
        if name.is_empty() {
            return Err(StoreError::invalid("variable name is empty"));
        }
        Ok(Fingerprint::of(name))
    }

    fn index_of(&self, id: Fingerprint) -> Option<usize> {
        self.variables.iter().rposition(|v| v.id == id)
    }

    fn find(&self, name: &[u8]) -> Result<&Variable<C>> {
        let id = self.guard(name)?;
        match self.index_of(id) {
            Some(index) => Ok(&self.variables[index]),
            None => Err(StoreError::NotFound { id }),
        }
    }

    fn find_mut(&mut self, name: &[u8]) -> Result<&mut Variable<C>> {
        let id = self.guard(name)?;
        match self.index_of(id) {
            Some(index) => Ok(&mut self.variables[index]),
            None => Err(StoreError::NotFound { id }),
        }
    }

    fn insert(&mut self, id: Fingerprint, name: &[u8]) -> usize {
        tracing::debug!(
            message = "dmlayer.create",
            id = %id,
            name = %String::from_utf8_lossy(name)
        );
        self.variables.push(Variable::new(id, name));
        self.variables.len() - 1
    }

    fn resolve_or_create(&mut self, name: &[u8]) -> Result<&mut Variable<C>> {
        let id = self.guard(name)?;
        let index = match self.index_of(id) {
            Some(index) => index,
            None => self.insert(id, name),
        };
        Ok(&mut self.variables[index])
    }

    // ── Registry ────────────────────────────────────────────────────

    pub(crate) fn create(&mut self, name: &[u8]) -> Result<VariableInfo> {
        let id = self.guard(name)?;
        if self.index_of(id).is_some() {
            return Err(StoreError::AlreadyExists { id });
        }
        let index = self.insert(id, name);
        Ok(self.variables[index].info())
    }

    pub(crate) fn info(&self, name: &[u8]) -> Result<VariableInfo> {
        self.find(name).map(Variable::info)
    }

    /// Snapshots of every variable, newest first.
    pub(crate) fn infos(&self) -> Result<Vec<VariableInfo>> {
        if !self.enabled {
            return Err(StoreError::Disabled);
        }
        Ok(self.variables.iter().rev().map(Variable::info).collect())
    }

    /// Disable the registry and drop every variable and observer chain.
    ///
    /// Returns the enabled callbacks of each chain so the caller can deliver
    /// `Deleted` once the registry is no longer borrowed.
    pub(crate) fn teardown(&mut self) -> Result<Vec<Farewell<C>>> {
        if !self.enabled {
            return Err(StoreError::Disabled);
        }
        self.enabled = false;

        let observers: usize = self.variables.iter().map(|v| v.observers.len()).sum();
        tracing::info!(
            message = "dmlayer.teardown",
            variables = self.variables.len(),
            observers
        );

        let notify = self.config.notify_on_teardown;
        let farewells = self
            .variables
            .drain(..)
            .rev()
            .filter_map(|var| {
                let targets = var.observers.enabled_newest_first();
                (notify && !targets.is_empty()).then(|| Farewell {
                    name: var.name,
                    user_tag: var.user_tag,
                    targets,
                })
            })
            .collect();
        Ok(farewells)
    }

    // ── Value cell ──────────────────────────────────────────────────

    fn notify(var: &mut Variable<C>, user_tag: UserTag, kind: NotifyKind) -> Dispatch<C> {
        var.user_tag = user_tag;
        var.event_counter = var.event_counter.wrapping_add(1);
        let targets = var.observers.enabled_newest_first();
        tracing::trace!(
            message = "dmlayer.notify",
            id = %var.id,
            kind = %kind,
            counter = var.event_counter,
            invoked = targets.len()
        );
        Dispatch {
            id: var.id,
            kind,
            user_tag,
            counter: var.event_counter,
            targets,
        }
    }

    fn assignment_kind(var: &mut Variable<C>) -> NotifyKind {
        if std::mem::replace(&mut var.assigned, true) {
            NotifyKind::Changed
        } else {
            NotifyKind::Created
        }
    }

    fn trace_kind_switch(var: &Variable<C>, to: ValueKind) {
        let from = var.value.kind();
        if from != ValueKind::None && from != to {
            tracing::trace!(message = "dmlayer.kind_switch", id = %var.id, from = %from, to = %to);
        }
    }

    pub(crate) fn set_number(
        &mut self,
        name: &[u8],
        user_tag: UserTag,
        value: u64,
    ) -> Result<Dispatch<C>> {
        let var = self.resolve_or_create(name)?;
        Self::trace_kind_switch(var, ValueKind::Number);
        var.value.set_number(value);
        let kind = Self::assignment_kind(var);
        Ok(Self::notify(var, user_tag, kind))
    }

    pub(crate) fn set_binary(
        &mut self,
        name: &[u8],
        user_tag: UserTag,
        bytes: &[u8],
    ) -> Result<Dispatch<C>> {
        self.guard(name)?;
        if bytes.is_empty() {
            return Err(StoreError::invalid("binary payload is empty"));
        }
        let max_len = self.config.max_binary_len;
        let var = self.resolve_or_create(name)?;
        Self::trace_kind_switch(var, ValueKind::Binary);
        if let Err(err) = var.value.set_binary(bytes, max_len) {
            tracing::warn!(
                message = "dmlayer.alloc_failed",
                id = %var.id,
                requested = err.requested
            );
            return Err(StoreError::AllocationFailure {
                id: var.id,
                requested: err.requested,
            });
        }
        let kind = Self::assignment_kind(var);
        Ok(Self::notify(var, user_tag, kind))
    }

    pub(crate) fn clear(&mut self, name: &[u8], user_tag: UserTag) -> Result<Dispatch<C>> {
        let var = self.find_mut(name)?;
        var.value.clear();
        Ok(Self::notify(var, user_tag, NotifyKind::Cleared))
    }

    pub(crate) fn notify_only(&mut self, name: &[u8], user_tag: UserTag) -> Result<Dispatch<C>> {
        let var = self.find_mut(name)?;
        Ok(Self::notify(var, user_tag, NotifyKind::Notify))
    }

    fn mismatch(var: &Variable<C>, expected: ValueKind) -> StoreError {
        StoreError::KindMismatch {
            id: var.id,
            expected,
            actual: var.value.kind(),
        }
    }

    pub(crate) fn number(&self, name: &[u8]) -> Result<u64> {
        let var = self.find(name)?;
        match var.value {
            Value::Number(n) => Ok(n),
            _ => Err(Self::mismatch(var, ValueKind::Number)),
        }
    }

    pub(crate) fn binary(&self, name: &[u8]) -> Result<&[u8]> {
        let var = self.find(name)?;
        match &var.value {
            Value::Binary(buf) => Ok(buf.as_slice()),
            _ => Err(Self::mismatch(var, ValueKind::Binary)),
        }
    }

    pub(crate) fn kind(&self, name: &[u8]) -> Result<ValueKind> {
        self.find(name).map(|v| v.value.kind())
    }

    pub(crate) fn binary_len(&self, name: &[u8]) -> Result<usize> {
        self.binary(name).map(<[u8]>::len)
    }

    pub(crate) fn user_tag(&self, name: &[u8]) -> Result<UserTag> {
        self.find(name).map(|v| v.user_tag)
    }

    /// Current `(event_counter, user_tag)` of a variable.
    pub(crate) fn event_state(&self, name: &[u8]) -> Result<(u64, UserTag)> {
        self.find(name).map(|v| (v.event_counter, v.user_tag))
    }

    // ── Observer chain ──────────────────────────────────────────────

    pub(crate) fn add_observer(&mut self, name: &[u8], callback: C) -> Result<()> {
        let var = self.resolve_or_create(name)?;
        if var.observers.add(callback) {
            Ok(())
        } else {
            Err(StoreError::AlreadyExists { id: var.id })
        }
    }

    pub(crate) fn remove_observer(&mut self, name: &[u8], callback: &C) -> Result<()> {
        let var = self.find_mut(name)?;
        if var.observers.remove(callback) {
            Ok(())
        } else {
            Err(StoreError::NotFound { id: var.id })
        }
    }

    pub(crate) fn set_observer_enabled(
        &mut self,
        name: &[u8],
        callback: &C,
        enabled: bool,
    ) -> Result<()> {
        let var = self.find_mut(name)?;
        let id = var.id;
        var.observers
            .set_enabled(callback, enabled)
            .ok_or(StoreError::NotFound { id })
    }

    pub(crate) fn is_observer_enabled(&self, name: &[u8], callback: &C) -> Result<bool> {
        let var = self.find(name)?;
        var.observers
            .is_enabled(callback)
            .ok_or(StoreError::NotFound { id: var.id })
    }
}
