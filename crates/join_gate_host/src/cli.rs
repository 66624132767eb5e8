use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use join_gate::UnlockShape;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "join_gate_host",
    version,
    about = "Replay level transitions against the join gate"
)]
pub struct Cli {
    /// Settings file carrying [join_policy] and [join_timing]
    #[arg(short, long, default_value = "join_gate.toml")]
    pub settings: PathBuf,

    /// Scenario script; the built-in scenario runs when omitted
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// Unlock call shape the simulated lobby directory exposes
    #[arg(long, value_enum, default_value_t = ApiShape::NoArg)]
    pub api: ApiShape,

    /// Run as a client instead of the session host
    #[arg(long)]
    pub client: bool,

    /// Sleep through `wait` steps on the wall clock instead of a virtual one
    #[arg(long)]
    pub realtime: bool,

    /// Override the build's default log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ApiShape {
    NoArg,
    BoolArg,
    /// Neither shape, directory calls stay disabled
    None,
}

impl ApiShape {
    pub fn exposed(self) -> Option<UnlockShape> {
        match self {
            ApiShape::NoArg => Some(UnlockShape::NoArg),
            ApiShape::BoolArg => Some(UnlockShape::BoolArg),
            ApiShape::None => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["join_gate_host"]);
        assert_eq!(cli.settings, PathBuf::from("join_gate.toml"));
        assert_eq!(cli.api, ApiShape::NoArg);
        assert!(cli.scenario.is_none());
        assert!(!cli.client);
        assert!(!cli.realtime);
    }

    #[test]
    fn parses_shape_and_level() {
        let cli = Cli::parse_from([
            "join_gate_host",
            "--api",
            "bool-arg",
            "--log-level",
            "debug",
            "--client",
        ]);
        assert_eq!(cli.api.exposed(), Some(UnlockShape::BoolArg));
        assert_eq!(LevelFilter::from(cli.log_level.unwrap()), LevelFilter::DEBUG);
        assert!(cli.client);
    }
}
