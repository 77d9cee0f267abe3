use std::collections::BTreeMap;

use crate::{ConnectionState, IssueDetailView, IssuePage, JobId, JobRow, Request, StatEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Outbound request for the push channel.
    Send(Request),
    /// Change notification for the view adapter.
    Render(ViewChange),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewChange {
    JobCreated(JobRow),
    JobProgress { id: JobId, percent: u8 },
    JobActivated(JobId),
    JobRemoved(JobId),
    IssuesPage(IssuePage),
    Stats(BTreeMap<String, StatEntry>),
    IssueDetail(Option<IssueDetailView>),
    Connection(ConnectionState),
}
