use std::fmt;

use serde::{Deserialize, Deserializer};

/// Merge key shared by every job-related event.
///
/// The server is free to send idents as JSON strings or as non-negative
/// integers; both normalize to the same decimal string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient_string(deserializer).map(JobId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    Fuzz { batch: u64 },
    Reduce { issue_id: String, size: u64 },
    Validate { issue_id: String },
    Update,
}

impl JobKind {
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Fuzz { .. } => "fuzz",
            JobKind::Reduce { .. } => "reduce",
            JobKind::Validate { .. } => "validate",
            JobKind::Update => "update",
        }
    }

    /// Upper bound for progress reports; kinds without a natural size count as one step.
    fn progress_max(&self) -> u64 {
        match self {
            JobKind::Fuzz { batch } => *batch,
            JobKind::Reduce { size, .. } => *size,
            JobKind::Validate { .. } | JobKind::Update => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Active,
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw.eq_ignore_ascii_case("active") {
            JobStatus::Active
        } else {
            JobStatus::Pending
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub fuzzer: Option<String>,
    pub sut: String,
    status: JobStatus,
    progress_current: u64,
    progress_max: u64,
}

impl Job {
    pub fn new(
        id: JobId,
        kind: JobKind,
        fuzzer: Option<String>,
        sut: impl Into<String>,
        status: JobStatus,
    ) -> Self {
        let progress_max = kind.progress_max().max(1);
        Self {
            id,
            kind,
            fuzzer,
            sut: sut.into(),
            status,
            progress_current: 0,
            progress_max,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress_current(&self) -> u64 {
        self.progress_current
    }

    pub fn progress_max(&self) -> u64 {
        self.progress_max
    }

    /// Completion in whole percent, 0..=100.
    pub fn percent(&self) -> u8 {
        // progress_current <= progress_max, so the quotient is at most 100.
        let percent = u128::from(self.progress_current) * 100 / u128::from(self.progress_max);
        percent as u8
    }

    /// Applies an absolute progress report, clamped to `progress_max`.
    /// Returns whether anything changed.
    pub(crate) fn set_progress(&mut self, value: u64) -> bool {
        let clamped = value.min(self.progress_max);
        if clamped == self.progress_current {
            return false;
        }
        self.progress_current = clamped;
        true
    }

    pub(crate) fn activate(&mut self) -> bool {
        if self.status == JobStatus::Active {
            return false;
        }
        self.status = JobStatus::Active;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Display id assigned by the fuzzer.
    pub id: String,
    /// Database key; unique across the campaign.
    pub internal_id: String,
    pub sut: String,
    pub fuzzer: String,
    pub first_seen: String,
    pub last_seen: String,
    pub count: u64,
    pub reduced: bool,
    pub reported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatEntry {
    pub fuzzer: String,
    pub executed: u64,
    pub failed: u64,
    pub unique: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Online,
}

/// Derived views that can be shown or hidden by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Projection {
    Jobs,
    Issues,
    Stats,
}

impl Projection {
    pub const ALL: [Projection; 3] = [Projection::Jobs, Projection::Issues, Projection::Stats];
}

/// Accepts a JSON string or number and yields its textual form.
pub(crate) fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

/// Accepts a non-negative integer, or a finite non-negative float (truncated).
pub(crate) fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    use serde::de::Error;

    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(value) = number.as_u64() {
        return Ok(value);
    }
    match number.as_f64() {
        Some(value) if value.is_finite() && value >= 0.0 => Ok(value as u64),
        _ => Err(D::Error::custom(format!("expected a non-negative count, got {number}"))),
    }
}
