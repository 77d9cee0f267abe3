//! Fuzzwatch core: the pure reconciliation state machine behind the
//! campaign dashboard, its wire protocol and its projections.
mod detail;
mod effect;
mod model;
mod msg;
mod pagination;
mod protocol;
mod state;
mod update;
mod view_model;

pub use detail::{flatten, DetailRow, Flatten};
pub use effect::{Effect, ViewChange};
pub use model::{ConnectionState, Issue, Job, JobId, JobKind, JobStatus, Projection, StatEntry};
pub use msg::Msg;
pub use pagination::{clamp_page, page_count, PAGE_SIZE};
pub use protocol::{decode_frame, FrameError, IssueBatch, Request, ServerEvent};
pub use state::AppState;
pub use update::update;
pub use view_model::{AppViewModel, IssueDetailView, IssuePage, JobRow};
