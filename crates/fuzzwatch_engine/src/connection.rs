use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use watch_logging::{watch_debug, watch_error, watch_info, watch_warn};

use crate::{ConnectionError, ConnectionEvent, ConnectionSettings, LinkStatus, ReconnectPolicy};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum Command {
    Connect,
    Send(String),
    Close,
}

/// Handle to the single push-channel connection.
///
/// IO runs on a background thread with its own tokio runtime. Commands are
/// fire-and-forget; status changes and inbound frames are polled with
/// [`ConnectionHandle::try_recv`]. Dropping the handle shuts the connection down.
pub struct ConnectionHandle {
    cmd_tx: UnboundedSender<Command>,
    event_rx: mpsc::Receiver<ConnectionEvent>,
    status: Arc<AtomicU8>,
}

impl ConnectionHandle {
    pub fn new(settings: ConnectionSettings) -> Self {
        let (cmd_tx, cmd_rx) = unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();
        let status = Arc::new(AtomicU8::new(LinkStatus::Disconnected.as_u8()));
        let events = EventSink {
            tx: event_tx,
            status: status.clone(),
        };

        thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    watch_error!("{}", ConnectionError::Runtime(err));
                    return;
                }
            };
            runtime.block_on(run(settings, cmd_rx, events));
        });

        Self {
            cmd_tx,
            event_rx,
            status,
        }
    }

    pub fn connect(&self) {
        let _ = self.cmd_tx.send(Command::Connect);
    }

    /// Queues a text frame. Dropped without error unless the channel is online.
    pub fn send(&self, text: impl Into<String>) {
        if self.status() != LinkStatus::Online {
            watch_debug!("Dropping outbound frame while {}", self.status());
            return;
        }
        let _ = self.cmd_tx.send(Command::Send(text.into()));
    }

    pub fn close(&self) {
        let _ = self.cmd_tx.send(Command::Close);
    }

    pub fn status(&self) -> LinkStatus {
        LinkStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn try_recv(&self) -> Option<ConnectionEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ConnectionEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

struct EventSink {
    tx: mpsc::Sender<ConnectionEvent>,
    status: Arc<AtomicU8>,
}

impl EventSink {
    fn status(&self, status: LinkStatus) {
        self.status.store(status.as_u8(), Ordering::Release);
        let _ = self.tx.send(ConnectionEvent::Status(status));
    }

    fn frame(&self, text: String) {
        let _ = self.tx.send(ConnectionEvent::Frame(text));
    }
}

enum SessionEnd {
    /// Closed on request; wait for the next `connect`.
    Closed,
    /// Lost without being asked to; may be retried.
    Lost,
    /// The handle was dropped.
    Shutdown,
}

enum RetryDecision {
    Retry,
    Stop,
    Shutdown,
}

async fn run(
    settings: ConnectionSettings,
    mut cmd_rx: UnboundedReceiver<Command>,
    events: EventSink,
) {
    loop {
        match cmd_rx.recv().await {
            None => return,
            Some(Command::Connect) => {}
            Some(Command::Send(_)) => {
                watch_debug!("Dropping outbound frame while disconnected");
                continue;
            }
            Some(Command::Close) => continue,
        }

        let mut delay = match settings.reconnect {
            ReconnectPolicy::Backoff { initial, .. } => initial,
            ReconnectPolicy::Never => Duration::ZERO,
        };
        loop {
            events.status(LinkStatus::Connecting);
            match open(&settings).await {
                Ok(socket) => {
                    watch_info!("Connected to {}", settings.url);
                    events.status(LinkStatus::Online);
                    if let ReconnectPolicy::Backoff { initial, .. } = settings.reconnect {
                        delay = initial;
                    }
                    let end = session(socket, &mut cmd_rx, &events).await;
                    events.status(LinkStatus::Disconnected);
                    match end {
                        SessionEnd::Closed => break,
                        SessionEnd::Shutdown => return,
                        SessionEnd::Lost => watch_warn!("Connection to {} lost", settings.url),
                    }
                }
                Err(err) => {
                    watch_warn!("{}", err);
                    events.status(LinkStatus::Disconnected);
                }
            }

            if settings.reconnect == ReconnectPolicy::Never {
                break;
            }
            watch_info!("Reconnecting in {:?}", delay);
            match wait_for_retry(delay, &mut cmd_rx).await {
                RetryDecision::Retry => delay = settings.reconnect.next_delay(delay),
                RetryDecision::Stop => break,
                RetryDecision::Shutdown => return,
            }
        }
    }
}

async fn open(settings: &ConnectionSettings) -> Result<Socket, ConnectionError> {
    let (socket, _response) =
        connect_async(settings.url.as_str())
            .await
            .map_err(|source| ConnectionError::Connect {
                url: settings.url.to_string(),
                source,
            })?;
    Ok(socket)
}

async fn session(
    socket: Socket,
    cmd_rx: &mut UnboundedReceiver<Command>,
    events: &EventSink,
) -> SessionEnd {
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => events.frame(text.to_string()),
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Lost,
                // Pings are answered by tungstenite; binary frames are not part of the protocol.
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    watch_warn!("{}", ConnectionError::Transport(err));
                    return SessionEnd::Lost;
                }
            },
            command = cmd_rx.recv() => match command {
                Some(Command::Send(text)) => {
                    if let Err(err) = sink.send(Message::Text(text.into())).await {
                        watch_warn!("{}", ConnectionError::Transport(err));
                        return SessionEnd::Lost;
                    }
                }
                Some(Command::Connect) => watch_debug!("Already connected"),
                Some(Command::Close) => {
                    // Closing the sink sends the close frame.
                    let _ = sink.close().await;
                    return SessionEnd::Closed;
                }
                None => {
                    let _ = sink.close().await;
                    return SessionEnd::Shutdown;
                }
            },
        }
    }
}

/// Sleeps out the backoff delay while still honouring commands.
async fn wait_for_retry(delay: Duration, cmd_rx: &mut UnboundedReceiver<Command>) -> RetryDecision {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return RetryDecision::Retry,
            command = cmd_rx.recv() => match command {
                None => return RetryDecision::Shutdown,
                Some(Command::Close) => return RetryDecision::Stop,
                Some(Command::Connect) => return RetryDecision::Retry,
                Some(Command::Send(_)) => watch_debug!("Dropping outbound frame while reconnecting"),
            },
        }
    }
}
