#![forbid(unsafe_code)]

//! DMLayer public facade crate.
//!
//! A named, observable variable store: values keyed by a 32-bit fingerprint
//! of their name, observer callbacks notified synchronously on every write,
//! and a blocking wait for the next notification.
//!
//! ```
//! use dmlayer::prelude::*;
//!
//! let store = DataLayer::new();
//! let on_change = Callback::new(|store, n| {
//!     let value = store.number(n.name).unwrap_or_default();
//!     println!("{} = {value} ({})", n.name_lossy(), n.kind);
//! });
//! store.add_observer("temperature", &on_change)?;
//! assert_eq!(store.set_number("temperature", 7, 21)?, 1);
//! assert_eq!(store.number("temperature")?, 21);
//! # Ok::<(), StoreError>(())
//! ```

pub use dmlayer_core as core;

pub mod prelude {
    pub use dmlayer_core::{
        Callback, DataLayer, Fingerprint, Notification, NotifyKind, SharedCallback,
        SharedDataLayer, StoreConfig, StoreError, UserTag, ValueKind, VariableInfo, Yield,
    };
}
