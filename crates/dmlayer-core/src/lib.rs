#![forbid(unsafe_code)]

//! Core: observable variable store, name fingerprints, and observer chains.
//!
//! Two store flavours share one registry:
//!
//! - [`DataLayer`]: single-threaded, for cooperatively scheduled logical
//!   threads that wait by yielding.
//! - [`SharedDataLayer`]: `Send + Sync`, for OS threads that wait on a
//!   condition variable.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod observer;
mod registry;
pub mod shared;
pub mod store;
pub mod value;
pub mod variable;
pub mod wait;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use fingerprint::{Fingerprint, crc16};
pub use observer::{CallbackIdentity, Notification};
pub use shared::{SharedCallback, SharedDataLayer};
pub use store::{Callback, DataLayer};
pub use value::{NotifyKind, UserTag, ValueKind};
pub use variable::VariableInfo;
pub use wait::Yield;
