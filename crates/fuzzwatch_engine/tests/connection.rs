use std::net::SocketAddr;
use std::sync::{mpsc, Once};
use std::thread;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use fuzzwatch_engine::{
    ConnectionEvent, ConnectionHandle, ConnectionSettings, LinkStatus, ReconnectPolicy,
};
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const GREETING: &str = r#"{"action":"set_stats","data":{}}"#;
/// Text that makes the test server hang up.
const HANG_UP: &str = "hang-up";
const WAIT: Duration = Duration::from_secs(5);

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(watch_logging::initialize_for_tests);
}

/// Spawns a websocket server that greets each client, forwards every text
/// frame it receives, and hangs up on [`HANG_UP`].
fn spawn_server() -> (String, mpsc::Receiver<String>) {
    let (addr_tx, addr_rx) = mpsc::channel::<SocketAddr>();
    let (frame_tx, frame_rx) = mpsc::channel();

    thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().expect("server runtime");
        runtime.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            addr_tx.send(listener.local_addr().expect("addr")).expect("report addr");
            while let Ok((stream, _)) = listener.accept().await {
                let frame_tx = frame_tx.clone();
                tokio::spawn(async move {
                    let Ok(mut ws) = accept_async(stream).await else {
                        return;
                    };
                    let _ = ws.send(Message::Text(GREETING.to_string().into())).await;
                    while let Some(Ok(message)) = ws.next().await {
                        if let Message::Text(text) = message {
                            if text.as_str() == HANG_UP {
                                let _ = ws.close(None).await;
                                break;
                            }
                            let _ = frame_tx.send(text.to_string());
                        }
                    }
                });
            }
        });
    });

    let addr = addr_rx.recv_timeout(WAIT).expect("server address");
    (format!("ws://{addr}/websocket"), frame_rx)
}

/// Collects events until `done` matches one of them.
fn wait_for(
    handle: &ConnectionHandle,
    done: impl Fn(&ConnectionEvent) -> bool,
) -> Vec<ConnectionEvent> {
    let deadline = Instant::now() + WAIT;
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        if let Some(event) = handle.recv_timeout(Duration::from_millis(50)) {
            let finished = done(&event);
            seen.push(event);
            if finished {
                return seen;
            }
        }
    }
    panic!("timed out; events so far: {seen:?}");
}

fn is_status(status: LinkStatus) -> impl Fn(&ConnectionEvent) -> bool {
    move |event| *event == ConnectionEvent::Status(status)
}

#[test]
fn connect_goes_online_and_delivers_frames() {
    init_logging();
    let (url, _frames) = spawn_server();
    let handle = ConnectionHandle::new(ConnectionSettings::new(&url).unwrap());
    assert_eq!(handle.status(), LinkStatus::Disconnected);

    handle.connect();
    let events = wait_for(&handle, |event| matches!(event, ConnectionEvent::Frame(_)));

    assert_eq!(
        events,
        vec![
            ConnectionEvent::Status(LinkStatus::Connecting),
            ConnectionEvent::Status(LinkStatus::Online),
            ConnectionEvent::Frame(GREETING.to_string()),
        ]
    );
    assert_eq!(handle.status(), LinkStatus::Online);
}

#[test]
fn outbound_frames_reach_the_server() {
    init_logging();
    let (url, frames) = spawn_server();
    let handle = ConnectionHandle::new(ConnectionSettings::new(&url).unwrap());
    handle.connect();
    wait_for(&handle, is_status(LinkStatus::Online));

    handle.send(r#"{"action":"get_stats"}"#);
    assert_eq!(
        frames.recv_timeout(WAIT).unwrap(),
        r#"{"action":"get_stats"}"#
    );
}

#[test]
fn send_while_disconnected_is_dropped() {
    init_logging();
    let (url, frames) = spawn_server();
    let handle = ConnectionHandle::new(ConnectionSettings::new(&url).unwrap());

    handle.send("early");
    handle.connect();
    wait_for(&handle, is_status(LinkStatus::Online));
    handle.send("late");

    assert_eq!(frames.recv_timeout(WAIT).unwrap(), "late");
}

#[test]
fn server_hang_up_is_reported_without_reconnecting() {
    init_logging();
    let (url, _frames) = spawn_server();
    let handle = ConnectionHandle::new(ConnectionSettings::new(&url).unwrap());
    handle.connect();
    wait_for(&handle, is_status(LinkStatus::Online));

    handle.send(HANG_UP);
    wait_for(&handle, is_status(LinkStatus::Disconnected));

    assert_eq!(handle.recv_timeout(Duration::from_millis(300)), None);
    assert_eq!(handle.status(), LinkStatus::Disconnected);
}

#[test]
fn backoff_policy_reconnects_after_loss() {
    init_logging();
    let (url, _frames) = spawn_server();
    let settings = ConnectionSettings::new(&url)
        .unwrap()
        .with_reconnect(ReconnectPolicy::Backoff {
            initial: Duration::from_millis(20),
            max: Duration::from_millis(100),
        });
    let handle = ConnectionHandle::new(settings);
    handle.connect();
    wait_for(&handle, is_status(LinkStatus::Online));

    handle.send(HANG_UP);
    wait_for(&handle, is_status(LinkStatus::Disconnected));
    let events = wait_for(&handle, is_status(LinkStatus::Online));

    assert_eq!(events[0], ConnectionEvent::Status(LinkStatus::Connecting));
}

#[test]
fn explicit_close_is_not_retried() {
    init_logging();
    let (url, _frames) = spawn_server();
    let settings = ConnectionSettings::new(&url)
        .unwrap()
        .with_reconnect(ReconnectPolicy::Backoff {
            initial: Duration::from_millis(20),
            max: Duration::from_millis(100),
        });
    let handle = ConnectionHandle::new(settings);
    handle.connect();
    wait_for(&handle, is_status(LinkStatus::Online));

    handle.close();
    wait_for(&handle, is_status(LinkStatus::Disconnected));

    let after: Vec<_> = std::iter::from_fn(|| handle.recv_timeout(Duration::from_millis(200)))
        .filter(|event| matches!(event, ConnectionEvent::Status(_)))
        .collect();
    assert_eq!(after, Vec::new());
}

#[test]
fn unreachable_server_ends_disconnected() {
    init_logging();
    // Grab a free port, then release it so nothing is listening there.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let url = format!("ws://127.0.0.1:{port}/websocket");
    let handle = ConnectionHandle::new(ConnectionSettings::new(&url).unwrap());

    handle.connect();
    let events = wait_for(&handle, is_status(LinkStatus::Disconnected));
    assert_eq!(
        events,
        vec![
            ConnectionEvent::Status(LinkStatus::Connecting),
            ConnectionEvent::Status(LinkStatus::Disconnected),
        ]
    );
}
