#![forbid(unsafe_code)]

//! Tagged value cells.
//!
//! A cell is `None`, a `Number` (`u64`), or `Binary` bytes. The enum makes the
//! representations exclusive: replacing the variant drops the previous one.
//!
//! # Invariants
//!
//! 1. A binary buffer's capacity only grows while the cell stays `Binary`;
//!    shorter writes reuse it.
//! 2. Reads of a binary cell return exactly the declared length, never the
//!    tail of an earlier, longer write.
//! 3. A failed binary write leaves the cell `None`.

use std::fmt;

/// Caller-supplied tag delivered with every notification.
pub type UserTag = u64;

/// Kind of value a variable currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ValueKind {
    #[default]
    None,
    Number,
    Binary,
}

impl ValueKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Number => "number",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Classification of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NotifyKind {
    /// Pure signal; the value did not change.
    Notify = 0,
    /// First value assignment of the variable.
    Created = 1,
    /// Any later value assignment.
    Changed = 2,
    /// The value was released and the kind reset to `None`.
    Cleared = 3,
    /// The store is being torn down.
    Deleted = 4,
}

impl NotifyKind {
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for NotifyKind {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Notify),
            1 => Ok(Self::Created),
            2 => Ok(Self::Changed),
            3 => Ok(Self::Cleared),
            4 => Ok(Self::Deleted),
            other => Err(other),
        }
    }
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Notify => "notify",
            Self::Created => "created",
            Self::Changed => "changed",
            Self::Cleared => "cleared",
            Self::Deleted => "deleted",
        };
        f.pad(name)
    }
}

/// Why a binary write could not be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GrowError {
    pub(crate) requested: usize,
}

/// Stored value of a variable.
#[derive(Debug, Default)]
pub(crate) enum Value {
    #[default]
    None,
    Number(u64),
    /// `buf.len()` is the declared length, `buf.capacity()` the allocation.
    Binary(Vec<u8>),
}

impl Value {
    pub(crate) fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::Number(_) => ValueKind::Number,
            Self::Binary(_) => ValueKind::Binary,
        }
    }

    /// Replace the cell with a number, dropping any binary buffer.
    pub(crate) fn set_number(&mut self, value: u64) {
        *self = Self::Number(value);
    }

    /// Store `bytes`, reusing the current buffer when it is large enough.
    ///
    /// Growth beyond `max_len` or a failed reservation resets the cell to
    /// `None`.
    pub(crate) fn set_binary(&mut self, bytes: &[u8], max_len: usize) -> Result<(), GrowError> {
        let requested = bytes.len();
        if requested > max_len {
            *self = Self::None;
            return Err(GrowError { requested });
        }

        let mut buf = match std::mem::take(self) {
            Self::Binary(buf) => buf,
            Self::None | Self::Number(_) => Vec::new(),
        };
        buf.clear();
        if buf.try_reserve_exact(requested).is_err() {
            return Err(GrowError { requested });
        }
        buf.extend_from_slice(bytes);
        *self = Self::Binary(buf);
        Ok(())
    }

    /// Release every representation.
    pub(crate) fn clear(&mut self) {
        *self = Self::None;
    }

    pub(crate) fn binary_len(&self) -> usize {
        match self {
            Self::Binary(buf) => buf.len(),
            _ => 0,
        }
    }

    pub(crate) fn binary_capacity(&self) -> usize {
        match self {
            Self::Binary(buf) => buf.capacity(),
            _ => 0,
        }
    }
}
