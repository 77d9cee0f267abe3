use std::sync::Once;

use fuzzwatch_core::{
    update, AppState, ConnectionState, Effect, JobId, JobStatus, Msg, Request, ViewChange,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(watch_logging::initialize_for_tests);
}

fn sent(effects: &[Effect]) -> Vec<Request> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Send(request) => Some(request.clone()),
            Effect::Render(_) => None,
        })
        .collect()
}

#[test]
fn going_online_requests_a_full_resync() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::ConnectionChanged(ConnectionState::Connecting),
    );
    let (state, effects) = update(state, Msg::ConnectionChanged(ConnectionState::Online));

    assert_eq!(state.connection(), ConnectionState::Online);
    assert_eq!(
        effects,
        vec![
            Effect::Render(ViewChange::Connection(ConnectionState::Online)),
            Effect::Send(Request::GetIssues { page: Some(1) }),
            Effect::Send(Request::GetStats),
            Effect::Send(Request::GetJobs),
        ]
    );
}

#[test]
fn reconnect_drops_stale_jobs_and_keeps_the_page() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::ConnectionChanged(ConnectionState::Online),
    );
    let (state, _) = update(
        state,
        Msg::FrameReceived(
            r#"{"action":"new_fuzz_job","data":{"ident":"j1","fuzzer":"f","sut":"s","batch":10}}"#
                .into(),
        ),
    );
    let (state, _) = update(
        state,
        Msg::FrameReceived(
            r#"{"action":"set_issues","data":{"issues":[],"issues_size":40,"page_id":3}}"#.into(),
        ),
    );

    let (state, effects) = update(state, Msg::ConnectionChanged(ConnectionState::Disconnected));
    assert_eq!(state.job_count(), 1, "the stale view is kept while offline");
    assert_eq!(
        effects,
        vec![Effect::Render(ViewChange::Connection(
            ConnectionState::Disconnected
        ))]
    );

    let (state, effects) = update(state, Msg::ConnectionChanged(ConnectionState::Online));
    assert_eq!(state.job_count(), 0);
    assert!(effects.contains(&Effect::Render(ViewChange::JobRemoved(JobId::from("j1")))));
    assert_eq!(
        sent(&effects),
        vec![
            Request::GetIssues { page: Some(3) },
            Request::GetStats,
            Request::GetJobs,
        ]
    );
}

#[test]
fn repeated_status_is_not_reported_twice() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::ConnectionChanged(ConnectionState::Online),
    );
    let (_, effects) = update(state, Msg::ConnectionChanged(ConnectionState::Online));
    assert!(effects.is_empty());
}

#[test]
fn refresh_only_while_online() {
    init_logging();
    let (offline, effects) = update(AppState::new(), Msg::RefreshRequested);
    assert!(effects.is_empty());

    let (online, _) = update(offline, Msg::ConnectionChanged(ConnectionState::Online));
    let (online, effects) = update(online, Msg::RefreshRequested);
    assert_eq!(
        sent(&effects),
        vec![
            Request::GetIssues { page: Some(1) },
            Request::GetStats,
            Request::GetJobs,
        ]
    );
    assert_eq!(online.connection(), ConnectionState::Online);
}

#[test]
fn jobs_listed_after_resync_are_running() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::ConnectionChanged(ConnectionState::Online),
    );
    let (state, _) = update(
        state,
        Msg::FrameReceived(
            r#"{"action":"new_fuzz_job","data":{"ident":"j1","fuzzer":"f","sut":"s","batch":10,"cost":1}}"#
                .into(),
        ),
    );
    assert_eq!(
        state.job(&JobId::from("j1")).map(|job| job.status()),
        Some(JobStatus::Active)
    );

    // Live traffic ends the listing; later creations start out pending.
    let (state, _) = update(
        state,
        Msg::FrameReceived(r#"{"action":"job_progress","data":{"ident":"j1","progress":4}}"#.into()),
    );
    let (state, _) = update(
        state,
        Msg::FrameReceived(
            r#"{"action":"new_fuzz_job","data":{"ident":"j2","fuzzer":"f","sut":"s","batch":10,"cost":1}}"#
                .into(),
        ),
    );
    assert_eq!(
        state.job(&JobId::from("j2")).map(|job| job.status()),
        Some(JobStatus::Pending)
    );
}

#[test]
fn jobs_created_while_offline_stay_pending() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::FrameReceived(
            r#"{"action":"new_fuzz_job","data":{"ident":"j1","fuzzer":"f","sut":"s","batch":10}}"#
                .into(),
        ),
    );
    assert_eq!(
        state.job(&JobId::from("j1")).map(|job| job.status()),
        Some(JobStatus::Pending)
    );
}
