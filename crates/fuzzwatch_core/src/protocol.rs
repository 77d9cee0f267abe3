//! Wire protocol: decoding server frames into typed events and encoding
//! client requests.
//!
//! Every frame is a JSON object `{ "action": <string>, "data": <any> }`.
//! Payloads are decoded completely before anything touches the state, so a
//! malformed push is rejected as a whole instead of being half applied.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::model::{lenient_count, lenient_string};
use crate::{Issue, Job, JobId, JobKind, JobStatus, StatEntry};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("frame has no string `action` field")]
    MissingAction,
    #[error("malformed `{action}` payload: {source}")]
    Payload {
        action: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A decoded server push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// `get_stats` / `set_stats`: the complete stats map.
    StatsReplaced(BTreeMap<String, StatEntry>),
    /// `update_fuzz_stat`: entries to overwrite, others untouched.
    StatsPatched(BTreeMap<String, StatEntry>),
    /// `get_issues` / `set_issues`.
    IssuesPage(IssueBatch),
    /// A `new_*_job` push. `status_reported` is false when the payload had
    /// no `status` field and the job defaulted to pending.
    JobCreated { job: Job, status_reported: bool },
    JobProgress { id: JobId, progress: u64 },
    JobActivated(JobId),
    JobRemoved(JobId),
    IssueFound(Issue),
    /// `get_issue`: the full issue document, or `None` when the server found nothing.
    IssueDetail(Option<Map<String, Value>>),
    Unknown(String),
}

/// Issues carried by a page reply.
///
/// `total_count` and `page_index` are absent when the server sends a bare
/// list; that list is then the whole collection rather than one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueBatch {
    pub issues: Vec<Issue>,
    pub total_count: Option<u64>,
    pub page_index: Option<u32>,
}

/// Client to server requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    GetIssues { page: Option<u32> },
    GetStats,
    GetJobs,
    GetIssue { internal_id: String },
    DeleteIssue { internal_id: String },
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::GetIssues { .. } => "get_issues",
            Request::GetStats => "get_stats",
            Request::GetJobs => "get_jobs",
            Request::GetIssue { .. } => "get_issue",
            Request::DeleteIssue { .. } => "delete_issue",
        }
    }

    pub fn to_frame(&self) -> String {
        let frame = match self {
            Request::GetIssues { page: Some(page) } => {
                json!({ "action": self.action(), "data": page })
            }
            Request::GetIssues { page: None } | Request::GetStats | Request::GetJobs => {
                json!({ "action": self.action() })
            }
            // The server reads the issue key from the top level, not from `data`.
            Request::GetIssue { internal_id } | Request::DeleteIssue { internal_id } => {
                json!({ "action": self.action(), "_id": internal_id })
            }
        };
        frame.to_string()
    }
}

pub fn decode_frame(text: &str) -> Result<ServerEvent, FrameError> {
    let frame: Value = serde_json::from_str(text).map_err(FrameError::Json)?;
    let Value::Object(mut fields) = frame else {
        return Err(FrameError::MissingAction);
    };
    let action = match fields.remove("action") {
        Some(Value::String(action)) => action,
        _ => return Err(FrameError::MissingAction),
    };
    let data = fields.remove("data").unwrap_or(Value::Null);
    decode_event(action, data)
}

fn decode_event(action: String, data: Value) -> Result<ServerEvent, FrameError> {
    let result = match action.as_str() {
        "get_stats" | "set_stats" => decode_stats(data).map(ServerEvent::StatsReplaced),
        "update_fuzz_stat" => decode_stats(data).map(ServerEvent::StatsPatched),
        "get_issues" | "set_issues" => decode_issue_batch(data).map(ServerEvent::IssuesPage),
        "new_fuzz_job" => from_data::<WireFuzzJob>(data).map(|job| {
            job_created(
                Job::new(
                    job.ident,
                    JobKind::Fuzz { batch: job.batch },
                    Some(job.fuzzer),
                    job.sut,
                    job.status.unwrap_or_default(),
                ),
                job.status.is_some(),
            )
        }),
        "new_reduce_job" => from_data::<WireReduceJob>(data).map(|job| {
            job_created(
                Job::new(
                    job.ident,
                    JobKind::Reduce {
                        issue_id: job.issue_id,
                        size: job.size,
                    },
                    None,
                    job.sut,
                    job.status.unwrap_or_default(),
                ),
                job.status.is_some(),
            )
        }),
        "new_validate_job" => from_data::<WireValidateJob>(data).map(|job| {
            job_created(
                Job::new(
                    job.ident,
                    JobKind::Validate {
                        issue_id: job.issue_id,
                    },
                    None,
                    job.sut,
                    job.status.unwrap_or_default(),
                ),
                job.status.is_some(),
            )
        }),
        "new_update_job" => from_data::<WireUpdateJob>(data).map(|job| {
            job_created(
                Job::new(
                    job.ident,
                    JobKind::Update,
                    None,
                    job.sut,
                    job.status.unwrap_or_default(),
                ),
                job.status.is_some(),
            )
        }),
        "job_progress" => from_data::<WireProgress>(data).map(|progress| {
            ServerEvent::JobProgress {
                id: progress.ident,
                progress: progress.progress,
            }
        }),
        "activate_job" => from_data::<WireIdent>(data).map(|job| ServerEvent::JobActivated(job.ident)),
        "remove_job" => from_data::<WireIdent>(data).map(|job| ServerEvent::JobRemoved(job.ident)),
        "new_issue" => from_data::<WireNewIssue>(data).and_then(|wrapper| {
            wrapper
                .issue
                .into_issue(None)
                .map(ServerEvent::IssueFound)
        }),
        "get_issue" => from_data::<Option<Map<String, Value>>>(data).map(ServerEvent::IssueDetail),
        _ => return Ok(ServerEvent::Unknown(action.clone())),
    };
    result.map_err(|source| FrameError::Payload { action, source })
}

fn job_created(job: Job, status_reported: bool) -> ServerEvent {
    ServerEvent::JobCreated {
        job,
        status_reported,
    }
}

fn from_data<T: DeserializeOwned>(data: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(data)
}

fn decode_stats(data: Value) -> Result<BTreeMap<String, StatEntry>, serde_json::Error> {
    let raw: BTreeMap<String, WireStat> = from_data(data)?;
    Ok(raw
        .into_iter()
        .map(|(fuzzer, stat)| {
            let entry = StatEntry {
                fuzzer: fuzzer.clone(),
                executed: stat.exec,
                failed: stat.issues,
                unique: stat.unique,
            };
            (fuzzer, entry)
        })
        .collect())
}

fn decode_issue_batch(data: Value) -> Result<IssueBatch, serde_json::Error> {
    match data {
        Value::Array(items) => Ok(IssueBatch {
            issues: decode_issue_list(items)?,
            total_count: None,
            page_index: None,
        }),
        other => {
            let page: WirePage = from_data(other)?;
            let issues = match page.issues {
                Value::Array(items) => decode_issue_list(items)?,
                Value::Object(keyed) => keyed
                    .into_iter()
                    .map(|(key, value)| from_data::<WireIssue>(value)?.into_issue(Some(key)))
                    .collect::<Result<_, _>>()?,
                _ => {
                    return Err(serde::de::Error::custom(
                        "`issues` must be a list or an object keyed by issue id",
                    ))
                }
            };
            Ok(IssueBatch {
                issues,
                total_count: page.issues_size,
                page_index: page.page_id,
            })
        }
    }
}

fn decode_issue_list(items: Vec<Value>) -> Result<Vec<Issue>, serde_json::Error> {
    items
        .into_iter()
        .map(|value| from_data::<WireIssue>(value)?.into_issue(None))
        .collect()
}

#[derive(Deserialize)]
struct WireStat {
    #[serde(deserialize_with = "lenient_count")]
    exec: u64,
    #[serde(deserialize_with = "lenient_count")]
    issues: u64,
    #[serde(deserialize_with = "lenient_count")]
    unique: u64,
}

#[derive(Deserialize)]
struct WirePage {
    issues: Value,
    #[serde(default, deserialize_with = "optional_count")]
    issues_size: Option<u64>,
    #[serde(default)]
    page_id: Option<u32>,
}

#[derive(Deserialize)]
struct WireIssue {
    #[serde(rename = "_id", default, deserialize_with = "optional_string")]
    internal_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    sut: String,
    fuzzer: String,
    first_seen: String,
    #[serde(default)]
    last_seen: Option<String>,
    #[serde(default, deserialize_with = "optional_count")]
    count: Option<u64>,
    #[serde(default)]
    reduced: bool,
    #[serde(default)]
    reported: bool,
}

impl WireIssue {
    /// `fallback_key` is the map key the issue was filed under, if any.
    fn into_issue(self, fallback_key: Option<String>) -> Result<Issue, serde_json::Error> {
        let internal_id = self
            .internal_id
            .or(fallback_key)
            .ok_or_else(|| <serde_json::Error as serde::de::Error>::missing_field("_id"))?;
        let last_seen = self.last_seen.unwrap_or_else(|| self.first_seen.clone());
        Ok(Issue {
            id: self.id,
            internal_id,
            sut: self.sut,
            fuzzer: self.fuzzer,
            first_seen: self.first_seen,
            last_seen,
            count: self.count.unwrap_or(1).max(1),
            reduced: self.reduced,
            reported: self.reported,
        })
    }
}

#[derive(Deserialize)]
struct WireNewIssue {
    issue: WireIssue,
}

#[derive(Deserialize)]
struct WireFuzzJob {
    ident: JobId,
    fuzzer: String,
    sut: String,
    #[serde(deserialize_with = "lenient_count")]
    batch: u64,
    #[serde(default)]
    status: Option<JobStatus>,
}

#[derive(Deserialize)]
struct WireReduceJob {
    ident: JobId,
    sut: String,
    #[serde(deserialize_with = "lenient_string")]
    issue_id: String,
    #[serde(deserialize_with = "lenient_count")]
    size: u64,
    #[serde(default)]
    status: Option<JobStatus>,
}

#[derive(Deserialize)]
struct WireValidateJob {
    ident: JobId,
    sut: String,
    #[serde(deserialize_with = "lenient_string")]
    issue_id: String,
    #[serde(default)]
    status: Option<JobStatus>,
}

#[derive(Deserialize)]
struct WireUpdateJob {
    ident: JobId,
    sut: String,
    #[serde(default)]
    status: Option<JobStatus>,
}

#[derive(Deserialize)]
struct WireProgress {
    ident: JobId,
    #[serde(deserialize_with = "lenient_count")]
    progress: u64,
}

#[derive(Deserialize)]
struct WireIdent {
    ident: JobId,
}

fn optional_string<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    lenient_string(deserializer).map(Some)
}

fn optional_count<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    lenient_count(deserializer).map(Some)
}
