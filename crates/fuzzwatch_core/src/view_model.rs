use crate::{ConnectionState, DetailRow, Issue, JobId, JobStatus, Projection, StatEntry};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub connection: ConnectionState,
    pub jobs: Vec<JobRow>,
    pub job_count: usize,
    pub issues: IssuePage,
    /// Page asked for whose reply has not arrived yet.
    pub requested_page: Option<u32>,
    pub stats: Vec<StatEntry>,
    pub hot: Vec<Projection>,
    pub selected_issue: Option<IssueDetailView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRow {
    pub id: JobId,
    pub kind: &'static str,
    pub fuzzer: Option<String>,
    pub sut: String,
    /// Issue the job works on, for reduce and validate jobs.
    pub issue_id: Option<String>,
    pub status: JobStatus,
    pub progress_current: u64,
    pub progress_max: u64,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuePage {
    pub issues: Vec<Issue>,
    pub total_count: u64,
    pub page_index: u32,
    pub page_count: u32,
}

impl Default for IssuePage {
    fn default() -> Self {
        Self {
            issues: Vec::new(),
            total_count: 0,
            page_index: 1,
            page_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDetailView {
    pub internal_id: Option<String>,
    pub rows: Vec<DetailRow>,
}
