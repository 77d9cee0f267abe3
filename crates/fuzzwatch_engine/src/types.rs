use std::fmt;
use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStatus {
    #[default]
    Disconnected,
    Connecting,
    Online,
}

impl LinkStatus {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            LinkStatus::Disconnected => 0,
            LinkStatus::Connecting => 1,
            LinkStatus::Online => 2,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => LinkStatus::Connecting,
            2 => LinkStatus::Online,
            _ => LinkStatus::Disconnected,
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Disconnected => write!(f, "disconnected"),
            LinkStatus::Connecting => write!(f, "connecting"),
            LinkStatus::Online => write!(f, "online"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Status(LinkStatus),
    /// One inbound text frame, verbatim.
    Frame(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectPolicy {
    /// Stay disconnected until `connect` is called again.
    #[default]
    Never,
    /// Retry after unexpected loss, doubling the delay up to `max`.
    Backoff { initial: Duration, max: Duration },
}

impl ReconnectPolicy {
    pub(crate) fn next_delay(&self, current: Duration) -> Duration {
        match self {
            ReconnectPolicy::Never => current,
            ReconnectPolicy::Backoff { max, .. } => current.saturating_mul(2).min(*max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub url: Url,
    pub reconnect: ReconnectPolicy,
}

impl ConnectionSettings {
    pub fn new(url: &str) -> Result<Self, ConnectionError> {
        let url = Url::parse(url).map_err(|err| ConnectionError::InvalidUrl(err.to_string()))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConnectionError::UnsupportedScheme(url.scheme().to_string()));
        }
        Ok(Self {
            url,
            reconnect: ReconnectPolicy::Never,
        })
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("unsupported scheme {0:?}, expected ws or wss")]
    UnsupportedScheme(String),
    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("push channel failed: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("could not start connection runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
