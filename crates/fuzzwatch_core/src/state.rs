use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::detail::flatten;
use crate::pagination::{clamp_page, page_count, PAGE_SIZE};
use crate::view_model::{AppViewModel, IssueDetailView, IssuePage, JobRow};
use crate::{ConnectionState, Issue, IssueBatch, Job, JobId, JobKind, Projection, StatEntry};

/// Authoritative in-memory model of the campaign.
///
/// Mutators report whether they changed anything so `update` can decide
/// which notifications to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    connection: ConnectionState,
    jobs: BTreeMap<JobId, Job>,
    /// Visible issue window, most recent first.
    issues: Vec<Issue>,
    /// Every internal id seen so far, on any page.
    known_issue_ids: BTreeSet<String>,
    total_issues: u64,
    page_index: u32,
    requested_page: Option<u32>,
    stats: BTreeMap<String, StatEntry>,
    hidden: BTreeSet<Projection>,
    selected_issue: Option<Map<String, Value>>,
    /// Set while the reply to a resync `get_jobs` may still be arriving.
    awaiting_running_jobs: bool,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            jobs: BTreeMap::new(),
            issues: Vec::new(),
            known_issue_ids: BTreeSet::new(),
            total_issues: 0,
            page_index: 1,
            requested_page: None,
            stats: BTreeMap::new(),
            hidden: BTreeSet::new(),
            selected_issue: None,
            awaiting_running_jobs: false,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn job(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn total_issues(&self) -> u64 {
        self.total_issues
    }

    pub fn current_page(&self) -> u32 {
        self.page_index
    }

    pub fn requested_page(&self) -> Option<u32> {
        self.requested_page
    }

    pub fn stats(&self) -> &BTreeMap<String, StatEntry> {
        &self.stats
    }

    pub fn is_hot(&self, projection: Projection) -> bool {
        !self.hidden.contains(&projection)
    }

    /// Page descriptor for the visible issue window.
    pub fn issue_page(&self) -> IssuePage {
        IssuePage {
            issues: self.issues.clone(),
            total_count: self.total_issues,
            page_index: self.page_index,
            page_count: page_count(self.total_issues),
        }
    }

    pub fn selected_issue(&self) -> Option<IssueDetailView> {
        self.selected_issue.as_ref().map(|document| IssueDetailView {
            internal_id: document.get("_id").and_then(text_of),
            rows: flatten_map(document),
        })
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            connection: self.connection,
            jobs: self.jobs.values().map(job_row).collect(),
            job_count: self.jobs.len(),
            issues: self.issue_page(),
            requested_page: self.requested_page,
            stats: self.stats.values().cloned().collect(),
            hot: Projection::ALL
                .into_iter()
                .filter(|projection| self.is_hot(*projection))
                .collect(),
            selected_issue: self.selected_issue(),
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_connection(&mut self, connection: ConnectionState) -> bool {
        if self.connection == connection {
            return false;
        }
        self.connection = connection;
        true
    }

    /// Inserts a job unless one with the same id already exists.
    pub(crate) fn insert_job(&mut self, job: Job) -> Option<JobRow> {
        if self.jobs.contains_key(&job.id) {
            return None;
        }
        let row = job_row(&job);
        self.jobs.insert(job.id.clone(), job);
        Some(row)
    }

    /// Returns the new percentage when the job exists and its progress moved.
    pub(crate) fn apply_progress(&mut self, id: &JobId, progress: u64) -> Option<u8> {
        let job = self.jobs.get_mut(id)?;
        job.set_progress(progress).then(|| job.percent())
    }

    pub(crate) fn activate_job(&mut self, id: &JobId) -> bool {
        self.jobs.get_mut(id).is_some_and(Job::activate)
    }

    pub(crate) fn remove_job(&mut self, id: &JobId) -> bool {
        self.jobs.remove(id).is_some()
    }

    /// Drops every job, returning the removed ids.
    pub(crate) fn clear_jobs(&mut self) -> Vec<JobId> {
        std::mem::take(&mut self.jobs).into_keys().collect()
    }

    pub(crate) fn awaiting_running_jobs(&self) -> bool {
        self.awaiting_running_jobs
    }

    pub(crate) fn set_awaiting_running_jobs(&mut self, awaiting: bool) {
        self.awaiting_running_jobs = awaiting;
    }

    pub(crate) fn replace_stats(&mut self, stats: BTreeMap<String, StatEntry>) {
        self.stats = stats;
    }

    pub(crate) fn patch_stats(&mut self, patch: BTreeMap<String, StatEntry>) -> bool {
        let mut changed = false;
        for (fuzzer, entry) in patch {
            if self.stats.get(&fuzzer) != Some(&entry) {
                self.stats.insert(fuzzer, entry);
                changed = true;
            }
        }
        changed
    }

    pub(crate) fn replace_issue_page(&mut self, batch: IssueBatch) {
        // A bare list is the whole collection; slice out the current page.
        let whole_collection = batch.total_count.is_none() && batch.page_index.is_none();
        let total = batch.total_count.unwrap_or(batch.issues.len() as u64);
        // Replies without a page id answer the page asked for last.
        let wanted = batch
            .page_index
            .or(self.requested_page)
            .unwrap_or(self.page_index);
        let page = clamp_page(wanted, total);

        self.known_issue_ids
            .extend(batch.issues.iter().map(|issue| issue.internal_id.clone()));

        let skip = if whole_collection {
            (page as usize - 1) * PAGE_SIZE
        } else {
            0
        };
        self.issues = batch
            .issues
            .into_iter()
            .skip(skip)
            .take(PAGE_SIZE)
            .collect();
        self.total_issues = total.max(self.issues.len() as u64);
        self.page_index = page;
        self.requested_page = None;
    }

    /// Records a freshly pushed issue. Returns `false` for an id seen before.
    pub(crate) fn push_issue(&mut self, issue: Issue) -> bool {
        if !self.known_issue_ids.insert(issue.internal_id.clone()) {
            return false;
        }
        self.total_issues += 1;
        // Later pages shift by one; their window is refreshed on the next fetch.
        if self.page_index == 1 {
            self.issues.insert(0, issue);
            self.issues.truncate(PAGE_SIZE);
        }
        true
    }

    /// Lets a deleted issue be reported again under the same id.
    pub(crate) fn forget_issue(&mut self, internal_id: &str) {
        self.known_issue_ids.remove(internal_id);
    }

    pub(crate) fn request_page(&mut self, requested: u32) -> u32 {
        let page = clamp_page(requested, self.total_issues);
        self.requested_page = Some(page);
        page
    }

    /// Marks a projection hot or cold. Returns whether it flipped.
    pub(crate) fn set_hot(&mut self, projection: Projection, hot: bool) -> bool {
        if hot {
            self.hidden.remove(&projection)
        } else {
            self.hidden.insert(projection)
        }
    }

    pub(crate) fn set_selected_issue(&mut self, document: Option<Map<String, Value>>) {
        self.selected_issue = document;
    }

    pub(crate) fn selected_issue_id(&self) -> Option<String> {
        self.selected_issue
            .as_ref()
            .and_then(|document| document.get("_id"))
            .and_then(text_of)
    }
}

fn job_row(job: &Job) -> JobRow {
    let issue_id = match &job.kind {
        JobKind::Reduce { issue_id, .. } | JobKind::Validate { issue_id } => Some(issue_id.clone()),
        JobKind::Fuzz { .. } | JobKind::Update => None,
    };
    JobRow {
        id: job.id.clone(),
        kind: job.kind.label(),
        fuzzer: job.fuzzer.clone(),
        sut: job.sut.clone(),
        issue_id,
        status: job.status(),
        progress_current: job.progress_current(),
        progress_max: job.progress_max(),
        percent: job.percent(),
    }
}

fn flatten_map(document: &Map<String, Value>) -> Vec<crate::DetailRow> {
    let root = Value::Object(document.clone());
    flatten(&root).collect()
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
