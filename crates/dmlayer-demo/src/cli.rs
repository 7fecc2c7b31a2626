use clap::{Parser, ValueEnum};
use dmlayer_core::StoreConfig;

use crate::demo::{Report, Settings, run_cooperative, run_threaded};
use crate::error::Result;
use crate::logging::{self, LogFormat};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Single OS thread, round-robin logical threads.
    #[default]
    Cooperative,
    /// One OS thread per producer, condvar-based waiting.
    Threaded,
}

#[derive(Debug, Parser)]
#[command(
    name = "dmlayer-demo",
    about = "Producer/consumer demo for the DMLayer observable variable store",
    version
)]
pub struct Cli {
    /// Number of producer tasks.
    #[arg(long, default_value_t = 3)]
    pub producers: u64,

    /// Values each producer publishes.
    #[arg(long, default_value_t = 10)]
    pub rounds: u64,

    #[arg(long, value_enum, default_value_t = Mode::Cooperative)]
    pub mode: Mode,

    /// Log output format (stderr).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Print the final report as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            producers: self.producers,
            rounds: self.rounds,
            config: StoreConfig::from_env(),
        }
    }
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format)?;
    run(&cli)
}

pub fn run(cli: &Cli) -> Result<()> {
    let report = execute(cli)?;
    println!("{}", render(&report, cli.json)?);
    Ok(())
}

pub fn execute(cli: &Cli) -> Result<Report> {
    let settings = cli.settings();
    match cli.mode {
        Mode::Cooperative => run_cooperative(&settings),
        Mode::Threaded => run_threaded(&settings),
    }
}

pub fn render(report: &Report, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(report)?)
    } else {
        Ok(report.render_text().trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["dmlayer-demo"]).unwrap();
        assert_eq!(cli.producers, 3);
        assert_eq!(cli.rounds, 10);
        assert_eq!(cli.mode, Mode::Cooperative);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(!cli.json);
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from([
            "dmlayer-demo",
            "--producers",
            "5",
            "--rounds",
            "2",
            "--mode",
            "threaded",
            "--log-format",
            "json",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.producers, 5);
        assert_eq!(cli.rounds, 2);
        assert_eq!(cli.mode, Mode::Threaded);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(cli.json);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Cli::try_parse_from(["dmlayer-demo", "--producers", "many"]).is_err());
        assert!(Cli::try_parse_from(["dmlayer-demo", "--mode", "async"]).is_err());
    }

    #[test]
    fn execute_and_render_json() {
        let cli = Cli::try_parse_from(["dmlayer-demo", "--producers", "2", "--rounds", "3"])
            .unwrap();
        let report = execute(&cli).unwrap();
        assert_eq!(report.wakes, 6);
        let rendered = render(&report, true).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["consumed"]["1"], 3);
        assert_eq!(parsed["consumed"]["2"], 3);
    }
}
