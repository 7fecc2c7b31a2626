#![forbid(unsafe_code)]

//! Cooperative blocking wait.
//!
//! The store cannot suspend anything by itself. A logical thread that wants to
//! wait for a variable hands in a [`Yield`] primitive supplied by its
//! scheduler; the wait polls the variable's event counter and yields once per
//! unsuccessful poll.
//!
//! # State machine
//!
//! A single *polling* state per call:
//!
//! 1. Resolve the variable and record its event counter as the baseline.
//! 2. Re-resolve (the handle is never cached: teardown may remove it). If it is
//!    gone, fail. If its counter differs from the baseline, return its tag.
//! 3. Otherwise yield and go to 2.
//!
//! There is no timeout and no cancellation. A thread parked here stays parked
//! until some other logical thread notifies the variable, or until the
//! scheduler retires it.

use crate::error::Result;
use crate::value::UserTag;

/// Scheduler hook: suspend the calling logical thread and let other ready
/// logical threads run.
///
/// Implemented for every `FnMut()`, so a closure that runs one scheduler
/// turn is a valid yield primitive.
pub trait Yield {
    fn yield_now(&mut self);
}

impl<F: FnMut()> Yield for F {
    #[inline]
    fn yield_now(&mut self) {
        self()
    }
}

/// Outcome of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Wake {
    pub(crate) user_tag: UserTag,
    pub(crate) yields: u64,
}

/// Poll `probe` until its event counter moves away from the first reading.
///
/// `probe` returns the variable's current `(event_counter, user_tag)`; any
/// error it returns ends the wait. `yielder` runs exactly once per
/// unsuccessful poll.
pub(crate) fn poll_for_event<Y: Yield + ?Sized>(
    mut probe: impl FnMut() -> Result<(u64, UserTag)>,
    yielder: &mut Y,
) -> Result<Wake> {
    let (baseline, _) = probe()?;
    let mut yields = 0u64;
    loop {
        let (counter, user_tag) = probe()?;
        if counter != baseline {
            return Ok(Wake { user_tag, yields });
        }
        yielder.yield_now();
        yields += 1;
    }
}
