#![forbid(unsafe_code)]

//! DMLayer producer/consumer demo.
//!
//! Mirrors the classic embedded setup: several producers publish a counter
//! into one variable while a consumer observes it, all on a cooperative
//! round-robin scheduler. `--mode threaded` runs the same scenario on OS
//! threads against the shared store.

pub mod cli;
pub mod demo;
pub mod error;
pub mod logging;
pub mod scheduler;

pub use cli::{run, run_from_env};
pub use error::{DemoError, Result};
