use fuzzwatch_core::{ConnectionState, Effect, Msg};
use fuzzwatch_engine::{ConnectionEvent, ConnectionHandle, LinkStatus};
use watch_logging::watch_debug;

use crate::view::{render_change, ViewAdapter};

/// Executes effects against the connection and the view.
pub struct EffectRunner {
    connection: ConnectionHandle,
}

impl EffectRunner {
    pub fn new(connection: ConnectionHandle) -> Self {
        Self { connection }
    }

    pub fn run(&self, view: &mut dyn ViewAdapter, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(request) => {
                    watch_debug!("Sending {}", request.action());
                    self.connection.send(request.to_frame());
                }
                Effect::Render(change) => render_change(view, &change),
            }
        }
    }

    pub fn connect(&self) {
        self.connection.connect();
    }

    pub fn disconnect(&self) {
        self.connection.close();
    }

    /// Drains pending connection events without blocking.
    pub fn pending_msgs(&self) -> Vec<Msg> {
        std::iter::from_fn(|| self.connection.try_recv())
            .map(msg_for)
            .collect()
    }
}

pub fn msg_for(event: ConnectionEvent) -> Msg {
    match event {
        ConnectionEvent::Status(status) => Msg::ConnectionChanged(map_status(status)),
        ConnectionEvent::Frame(text) => Msg::FrameReceived(text),
    }
}

fn map_status(status: LinkStatus) -> ConnectionState {
    match status {
        LinkStatus::Disconnected => ConnectionState::Disconnected,
        LinkStatus::Connecting => ConnectionState::Connecting,
        LinkStatus::Online => ConnectionState::Online,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn connection_events_become_messages() {
        assert_eq!(
            msg_for(ConnectionEvent::Status(LinkStatus::Online)),
            Msg::ConnectionChanged(ConnectionState::Online)
        );
        assert_eq!(
            msg_for(ConnectionEvent::Status(LinkStatus::Connecting)),
            Msg::ConnectionChanged(ConnectionState::Connecting)
        );
        assert_eq!(
            msg_for(ConnectionEvent::Frame("{}".into())),
            Msg::FrameReceived("{}".into())
        );
    }
}
