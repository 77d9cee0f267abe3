use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use fuzzwatch_engine::{ConnectionError, ConnectionSettings, ReconnectPolicy};
use serde::Deserialize;
use watch_logging::LogDestination;

use crate::cli::Cli;

const DEFAULT_URL: &str = "ws://localhost:8080/websocket";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub url: String,
    pub reconnect: Option<BackoffConfig>,
    pub poll_interval_secs: Option<u64>,
    pub log: LogDestination,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 1_000,
            max_ms: 30_000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            reconnect: None,
            poll_interval_secs: None,
            log: LogDestination::Terminal,
            log_file: PathBuf::from("./fuzzwatch.log"),
        }
    }
}

impl AppConfig {
    /// Command-line flags win over the file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.url {
            self.url = url.clone();
        }
        if cli.reconnect && self.reconnect.is_none() {
            self.reconnect = Some(BackoffConfig::default());
        }
        if let Some(poll) = cli.poll {
            self.poll_interval_secs = Some(poll);
        }
        if let Some(log) = cli.log {
            self.log = log.into();
        }
    }

    pub fn connection_settings(&self) -> Result<ConnectionSettings, ConnectionError> {
        let reconnect = match self.reconnect {
            Some(backoff) => ReconnectPolicy::Backoff {
                initial: Duration::from_millis(backoff.initial_ms.max(1)),
                max: Duration::from_millis(backoff.max_ms.max(backoff.initial_ms)),
            },
            None => ReconnectPolicy::Never,
        };
        Ok(ConnectionSettings::new(&self.url)?.with_reconnect(reconnect))
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Reads the config file. `Ok(None)` means there is no file at `path`.
pub fn load(path: &Path) -> anyhow::Result<Option<AppConfig>> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config {}", path.display()))
        }
    };
    let config = ron::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(Some(config))
}
