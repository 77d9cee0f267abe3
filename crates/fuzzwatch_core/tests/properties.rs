use std::collections::BTreeSet;

use fuzzwatch_core::{update, AppState, JobId, Msg};
use proptest::prelude::*;

fn fuzz_job(ident: &str, batch: u64) -> Msg {
    Msg::FrameReceived(format!(
        r#"{{"action":"new_fuzz_job","data":{{"ident":"{ident}","fuzzer":"f","sut":"s","batch":{batch}}}}}"#
    ))
}

fn progress(ident: &str, value: u64) -> Msg {
    Msg::FrameReceived(format!(
        r#"{{"action":"job_progress","data":{{"ident":"{ident}","progress":{value}}}}}"#
    ))
}

proptest! {
    #[test]
    fn job_count_matches_distinct_ids(ids in prop::collection::vec("[a-z0-9]{1,6}", 0..40)) {
        let state = ids
            .iter()
            .fold(AppState::new(), |state, id| update(state, fuzz_job(id, 10)).0);

        let distinct: BTreeSet<_> = ids.iter().collect();
        prop_assert_eq!(state.job_count(), distinct.len());
    }

    #[test]
    fn progress_never_exceeds_bound(
        batch in 0u64..1_000,
        reports in prop::collection::vec(0u64..5_000, 1..20),
    ) {
        let mut state = update(AppState::new(), fuzz_job("j", batch)).0;
        for value in reports {
            state = update(state, progress("j", value)).0;
            let job = state.job(&JobId::from("j")).unwrap();
            prop_assert!(job.progress_current() <= job.progress_max());
            prop_assert!(job.percent() <= 100);
        }
    }

    #[test]
    fn percent_stays_in_range_for_huge_batches(
        batch in (u64::MAX - 1_000_000)..=u64::MAX,
        report in any::<u64>(),
    ) {
        let state = update(AppState::new(), fuzz_job("j", batch)).0;
        let state = update(state, progress("j", report)).0;
        let job = state.job(&JobId::from("j")).unwrap();
        prop_assert!(job.progress_current() <= job.progress_max());
        prop_assert!(job.percent() <= 100);
    }
}
