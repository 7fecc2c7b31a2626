//! Subscriber setup for the demo binary.
//!
//! `RUST_LOG` overrides the default filter.

use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::{DemoError, Result};

const DEFAULT_FILTER: &str = "info,dmlayer_core=info,dmlayer_demo=info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

pub fn init(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Text => builder.with_target(false).try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    installed.map_err(|err| DemoError::Logging {
        message: err.to_string(),
    })
}
