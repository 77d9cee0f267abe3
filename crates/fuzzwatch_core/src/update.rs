use watch_logging::{watch_debug, watch_info, watch_warn};

use crate::protocol::decode_frame;
use crate::{AppState, ConnectionState, Effect, Msg, Projection, Request, ServerEvent, ViewChange};

/// Pure update function: applies a message to state and returns any effects.
///
/// Each message is applied as a whole; observers never see a half-applied
/// event because payloads are validated while decoding.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FrameReceived(text) => match decode_frame(&text) {
            Ok(event) => apply_event(&mut state, event),
            Err(err) => {
                watch_warn!("Discarding frame: {}", err);
                Vec::new()
            }
        },
        Msg::Server(event) => apply_event(&mut state, event),
        Msg::ConnectionChanged(connection) => {
            if !state.set_connection(connection) {
                return (state, Vec::new());
            }
            watch_info!("Connection is now {:?}", connection);
            state.mark_dirty();
            let mut effects = vec![Effect::Render(ViewChange::Connection(connection))];
            if connection == ConnectionState::Online {
                // Running jobs are re-announced by `get_jobs`; anything left over
                // from before the outage would otherwise linger forever.
                effects.extend(
                    state
                        .clear_jobs()
                        .into_iter()
                        .map(|id| Effect::Render(ViewChange::JobRemoved(id))),
                );
                effects.extend(resync_requests(&mut state));
            } else {
                state.set_awaiting_running_jobs(false);
            }
            effects
        }
        Msg::PageRequested(requested) => {
            let page = state.request_page(requested);
            if page != requested {
                watch_debug!("Page {} clamped to {}", requested, page);
            }
            state.mark_dirty();
            vec![Effect::Send(Request::GetIssues { page: Some(page) })]
        }
        Msg::RefreshRequested => {
            if state.connection() == ConnectionState::Online {
                resync_requests(&mut state)
            } else {
                watch_debug!("Refresh skipped while {:?}", state.connection());
                Vec::new()
            }
        }
        Msg::ProjectionShown(projection) => {
            if !state.set_hot(projection, true) {
                return (state, Vec::new());
            }
            state.mark_dirty();
            // Patches skipped while hidden are recovered by a full refresh.
            match projection {
                Projection::Stats => vec![Effect::Send(Request::GetStats)],
                Projection::Issues => vec![Effect::Send(Request::GetIssues {
                    page: Some(state.current_page()),
                })],
                Projection::Jobs => Vec::new(),
            }
        }
        Msg::ProjectionHidden(projection) => {
            if state.set_hot(projection, false) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::IssueDetailRequested(internal_id) => {
            vec![Effect::Send(Request::GetIssue { internal_id })]
        }
        Msg::DeleteIssueRequested(internal_id) => {
            let mut effects = Vec::with_capacity(3);
            if state.selected_issue_id().as_deref() == Some(internal_id.as_str()) {
                state.set_selected_issue(None);
                state.mark_dirty();
                effects.push(Effect::Render(ViewChange::IssueDetail(None)));
            }
            state.forget_issue(&internal_id);
            effects.push(Effect::Send(Request::DeleteIssue { internal_id }));
            // The issue disappears only when the refreshed page replaces the window.
            effects.push(Effect::Send(Request::GetIssues {
                page: Some(state.current_page()),
            }));
            effects
        }
    };

    (state, effects)
}

fn apply_event(state: &mut AppState, event: ServerEvent) -> Vec<Effect> {
    // The `get_jobs` reply is a run of job creations; live traffic ends it.
    if !matches!(
        event,
        ServerEvent::JobCreated { .. }
            | ServerEvent::IssuesPage(_)
            | ServerEvent::StatsReplaced(_)
            | ServerEvent::IssueDetail(_)
            | ServerEvent::Unknown(_)
    ) {
        state.set_awaiting_running_jobs(false);
    }

    let change = match event {
        ServerEvent::StatsReplaced(stats) => {
            state.replace_stats(stats);
            Some(ViewChange::Stats(state.stats().clone()))
        }
        ServerEvent::StatsPatched(patch) => {
            if !state.is_hot(Projection::Stats) {
                watch_debug!("Stats hidden; skipping patch for {} fuzzers", patch.len());
                None
            } else if state.patch_stats(patch) {
                Some(ViewChange::Stats(state.stats().clone()))
            } else {
                None
            }
        }
        ServerEvent::IssuesPage(batch) => {
            state.replace_issue_page(batch);
            Some(ViewChange::IssuesPage(state.issue_page()))
        }
        ServerEvent::JobCreated {
            mut job,
            status_reported,
        } => {
            // Jobs listed by `get_jobs` are already running but carry no status.
            if state.awaiting_running_jobs() && !status_reported {
                job.activate();
            }
            let id = job.id.clone();
            let row = state.insert_job(job);
            if row.is_none() {
                watch_debug!("Job {} already known; ignoring creation", id);
            }
            row.map(ViewChange::JobCreated)
        }
        ServerEvent::JobProgress { id, progress } => state
            .apply_progress(&id, progress)
            .map(|percent| ViewChange::JobProgress { id, percent }),
        ServerEvent::JobActivated(id) => state
            .activate_job(&id)
            .then_some(ViewChange::JobActivated(id)),
        ServerEvent::JobRemoved(id) => {
            if state.remove_job(&id) {
                Some(ViewChange::JobRemoved(id))
            } else {
                watch_debug!("Removal of unknown job {}", id);
                None
            }
        }
        ServerEvent::IssueFound(issue) => {
            if state.push_issue(issue) {
                Some(ViewChange::IssuesPage(state.issue_page()))
            } else {
                None
            }
        }
        ServerEvent::IssueDetail(document) => {
            state.set_selected_issue(document);
            Some(ViewChange::IssueDetail(state.selected_issue()))
        }
        ServerEvent::Unknown(action) => {
            watch_debug!("Ignoring unknown action {:?}", action);
            None
        }
    };

    match change {
        Some(change) => {
            state.mark_dirty();
            vec![Effect::Render(change)]
        }
        None => Vec::new(),
    }
}

/// Full-state refresh: the current issue page, stats and running jobs.
fn resync_requests(state: &mut AppState) -> Vec<Effect> {
    state.set_awaiting_running_jobs(true);
    vec![
        Effect::Send(Request::GetIssues {
            page: Some(state.current_page()),
        }),
        Effect::Send(Request::GetStats),
        Effect::Send(Request::GetJobs),
    ]
}
