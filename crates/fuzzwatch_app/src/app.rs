use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use fuzzwatch_core::{update, AppState, Msg};
use watch_logging::{watch_debug, watch_info, watch_warn};

use crate::console::{parse_command, ConsoleCommand};
use crate::effects::EffectRunner;
use crate::view::ViewAdapter;

const IDLE_TICK: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Single-threaded event loop around the core state machine.
pub struct App<V: ViewAdapter> {
    state: AppState,
    runner: EffectRunner,
    view: V,
    commands: Option<mpsc::Receiver<String>>,
    poll_interval: Option<Duration>,
}

impl<V: ViewAdapter> App<V> {
    pub fn new(
        runner: EffectRunner,
        view: V,
        commands: mpsc::Receiver<String>,
        poll_interval: Option<Duration>,
    ) -> Self {
        Self {
            state: AppState::new(),
            runner,
            view,
            commands: Some(commands),
            poll_interval,
        }
    }

    pub fn run(mut self) {
        self.runner.connect();
        let mut last_poll = Instant::now();
        loop {
            let mut busy = false;

            for msg in self.runner.pending_msgs() {
                busy = true;
                self.dispatch_msg(msg);
            }

            while let Some(line) = self.next_line() {
                busy = true;
                match parse_command(&line) {
                    Ok(command) => {
                        if self.handle_command(command) == Flow::Quit {
                            watch_info!("Quitting");
                            self.runner.disconnect();
                            return;
                        }
                    }
                    Err(err) => watch_warn!("{}", err),
                }
            }

            if let Some(interval) = self.poll_interval {
                if last_poll.elapsed() >= interval {
                    last_poll = Instant::now();
                    self.dispatch_msg(Msg::RefreshRequested);
                }
            }

            self.flush_if_dirty();
            if !busy {
                thread::sleep(IDLE_TICK);
            }
        }
    }

    fn flush_if_dirty(&mut self) {
        if self.state.consume_dirty() {
            let snapshot = self.state.view();
            self.view.flush(&snapshot);
        }
    }

    fn next_line(&mut self) -> Option<String> {
        let commands = self.commands.as_ref()?;
        match commands.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                watch_debug!("Console input closed");
                self.commands = None;
                None
            }
        }
    }

    fn handle_command(&mut self, command: ConsoleCommand) -> Flow {
        let msg = match command {
            ConsoleCommand::Page(page) => Msg::PageRequested(page),
            ConsoleCommand::Next => Msg::PageRequested(self.target_page().saturating_add(1)),
            ConsoleCommand::Prev => Msg::PageRequested(self.target_page().saturating_sub(1)),
            ConsoleCommand::Refresh => Msg::RefreshRequested,
            ConsoleCommand::Show(projection) => Msg::ProjectionShown(projection),
            ConsoleCommand::Hide(projection) => Msg::ProjectionHidden(projection),
            ConsoleCommand::Issue(internal_id) => Msg::IssueDetailRequested(internal_id),
            ConsoleCommand::Delete(internal_id) => Msg::DeleteIssueRequested(internal_id),
            ConsoleCommand::Connect => {
                self.runner.connect();
                return Flow::Continue;
            }
            ConsoleCommand::Disconnect => {
                self.runner.disconnect();
                return Flow::Continue;
            }
            ConsoleCommand::Quit => return Flow::Quit,
        };
        self.dispatch_msg(msg);
        Flow::Continue
    }

    /// Page navigation continues from a pending request, if any.
    fn target_page(&self) -> u32 {
        self.state
            .requested_page()
            .unwrap_or_else(|| self.state.current_page())
    }

    fn dispatch_msg(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.run(&mut self.view, effects);
    }
}
