use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use watch_logging::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "fuzzwatch", about = "Live dashboard for a fuzzinator campaign")]
pub struct Cli {
    /// RON configuration file; defaults apply when it does not exist.
    #[arg(long, default_value = "fuzzwatch.ron")]
    pub config: PathBuf,
    /// Websocket endpoint of the fuzzinator web UI, e.g. ws://localhost:8080/websocket.
    #[arg(long)]
    pub url: Option<String>,
    /// Reconnect with backoff after the connection drops.
    #[arg(long)]
    pub reconnect: bool,
    /// Seconds between full refreshes.
    #[arg(long)]
    pub poll: Option<u64>,
    #[arg(long, value_enum)]
    pub log: Option<LogArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogArg {
    Terminal,
    File,
    Both,
}

impl From<LogArg> for LogDestination {
    fn from(arg: LogArg) -> Self {
        match arg {
            LogArg::Terminal => LogDestination::Terminal,
            LogArg::File => LogDestination::File,
            LogArg::Both => LogDestination::Both,
        }
    }
}
