//! View adapter boundary: turns change notifications into output.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use fuzzwatch_core::{
    AppViewModel, ConnectionState, IssueDetailView, IssuePage, JobId, JobRow, Projection,
    StatEntry, ViewChange,
};
use watch_logging::watch_warn;

pub trait ViewAdapter {
    fn render_job_created(&mut self, job: &JobRow);
    fn render_job_progress(&mut self, id: &JobId, percent: u8);
    fn render_job_activated(&mut self, id: &JobId);
    fn render_job_removed(&mut self, id: &JobId);
    fn render_issues_page(&mut self, page: &IssuePage);
    fn render_stats(&mut self, stats: &BTreeMap<String, StatEntry>);
    fn render_issue_detail(&mut self, detail: Option<&IssueDetailView>);
    fn render_connection(&mut self, state: ConnectionState);
    /// Called once a batch of changes has been rendered, with the resulting snapshot.
    fn flush(&mut self, _view: &AppViewModel) {}
}

pub fn render_change(view: &mut dyn ViewAdapter, change: &ViewChange) {
    match change {
        ViewChange::JobCreated(job) => view.render_job_created(job),
        ViewChange::JobProgress { id, percent } => view.render_job_progress(id, *percent),
        ViewChange::JobActivated(id) => view.render_job_activated(id),
        ViewChange::JobRemoved(id) => view.render_job_removed(id),
        ViewChange::IssuesPage(page) => view.render_issues_page(page),
        ViewChange::Stats(stats) => view.render_stats(stats),
        ViewChange::IssueDetail(detail) => view.render_issue_detail(detail.as_ref()),
        ViewChange::Connection(state) => view.render_connection(*state),
    }
}

/// Plain line-oriented rendering to any writer.
pub struct TerminalView<W: Write> {
    out: W,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Err(err) = writeln!(self.out, "{args}") {
            watch_warn!("Failed to write view output: {}", err);
        }
    }
}

impl<W: Write> ViewAdapter for TerminalView<W> {
    fn render_job_created(&mut self, job: &JobRow) {
        let subject = match (&job.fuzzer, &job.issue_id) {
            (Some(fuzzer), _) => fuzzer.as_str(),
            (None, Some(issue_id)) => issue_id.as_str(),
            (None, None) => "-",
        };
        self.line(format_args!(
            "+ job {} [{}] {} on {} ({:?}, {}/{})",
            job.id, job.kind, subject, job.sut, job.status, job.progress_current, job.progress_max
        ));
    }

    fn render_job_progress(&mut self, id: &JobId, percent: u8) {
        self.line(format_args!("~ job {id} {percent}%"));
    }

    fn render_job_activated(&mut self, id: &JobId) {
        self.line(format_args!("> job {id} active"));
    }

    fn render_job_removed(&mut self, id: &JobId) {
        self.line(format_args!("- job {id}"));
    }

    fn render_issues_page(&mut self, page: &IssuePage) {
        self.line(format_args!(
            "issues page {}/{} ({} total)",
            page.page_index,
            page.page_count.max(1),
            page.total_count
        ));
        for issue in &page.issues {
            let mut flags = String::new();
            if issue.reduced {
                flags.push_str(" reduced");
            }
            if issue.reported {
                flags.push_str(" reported");
            }
            self.line(format_args!(
                "  {} [{}] {}/{} x{} first {} last {}{}",
                issue.id,
                issue.internal_id,
                issue.sut,
                issue.fuzzer,
                issue.count,
                issue.first_seen,
                issue.last_seen,
                flags
            ));
        }
    }

    fn render_stats(&mut self, stats: &BTreeMap<String, StatEntry>) {
        self.line(format_args!("stats ({} fuzzers)", stats.len()));
        for entry in stats.values() {
            self.line(format_args!(
                "  {}: exec {} issues {} unique {}",
                entry.fuzzer, entry.executed, entry.failed, entry.unique
            ));
        }
    }

    fn render_issue_detail(&mut self, detail: Option<&IssueDetailView>) {
        let Some(detail) = detail else {
            self.line(format_args!("issue detail: none"));
            return;
        };
        self.line(format_args!(
            "issue {}",
            detail.internal_id.as_deref().unwrap_or("?")
        ));
        for row in &detail.rows {
            let indent = "  ".repeat(row.depth + 1);
            match &row.value {
                Some(value) => self.line(format_args!("{indent}{}: {value}", row.key)),
                None => self.line(format_args!("{indent}{}:", row.key)),
            }
        }
    }

    fn render_connection(&mut self, state: ConnectionState) {
        self.line(format_args!("connection: {}", connection_label(state)));
    }

    fn flush(&mut self, view: &AppViewModel) {
        self.line(format_args!("{}", status_line(view)));
        if let Err(err) = self.out.flush() {
            watch_warn!("Failed to flush view output: {}", err);
        }
    }
}

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Online => "online",
    }
}

/// One-line summary printed after each batch of changes.
fn status_line(view: &AppViewModel) -> String {
    let mut line = format!(
        "[{}] jobs {} | issues page {}/{}",
        connection_label(view.connection),
        view.job_count,
        view.issues.page_index,
        view.issues.page_count.max(1)
    );
    if let Some(page) = view.requested_page {
        line.push_str(&format!(" (loading {page})"));
    }
    line.push_str(&format!(" | fuzzers {}", view.stats.len()));
    let hidden: Vec<&str> = Projection::ALL
        .into_iter()
        .filter(|projection| !view.hot.contains(projection))
        .map(projection_label)
        .collect();
    if !hidden.is_empty() {
        line.push_str(&format!(" | hidden {}", hidden.join(",")));
    }
    if let Some(detail) = &view.selected_issue {
        line.push_str(&format!(
            " | detail {}",
            detail.internal_id.as_deref().unwrap_or("?")
        ));
    }
    line
}

fn projection_label(projection: Projection) -> &'static str {
    match projection {
        Projection::Jobs => "jobs",
        Projection::Issues => "issues",
        Projection::Stats => "stats",
    }
}
