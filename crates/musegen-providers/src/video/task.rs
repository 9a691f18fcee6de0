//! Task model for asynchronous video generation.
//!
//! A submission yields a [`TaskHandle`] (vendor task id, modality, status).
//! The modality is fixed at submission and decides the poll endpoint, so a
//! task can never be polled on the wrong one. Vendor responses are
//! normalized here, right after parsing, into a [`TaskHandle`] or a
//! [`PollObservation`]; the poll loop never touches raw JSON.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProviderError, Result};

// ─────────────────────────────────────────────
// Modality
// ─────────────────────────────────────────────

/// Which submission/poll endpoint pair a task uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskModality {
    #[serde(rename = "text2video")]
    TextToVideo,
    #[serde(rename = "image2video")]
    ImageToVideo,
}

impl TaskModality {
    /// Image-to-video whenever reference media is supplied, regardless of model.
    pub fn for_references(references: &[String]) -> Self {
        if references.is_empty() {
            Self::TextToVideo
        } else {
            Self::ImageToVideo
        }
    }

    /// Path segment of the submission and poll endpoints.
    pub fn endpoint_segment(&self) -> &'static str {
        match self {
            Self::TextToVideo => "text2video",
            Self::ImageToVideo => "image2video",
        }
    }
}

impl std::fmt::Display for TaskModality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.endpoint_segment())
    }
}

impl std::str::FromStr for TaskModality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "text2video" | "text_to_video" => Ok(Self::TextToVideo),
            "image2video" | "image_to_video" => Ok(Self::ImageToVideo),
            other => Err(format!(
                "unknown task modality '{other}' (expected text2video or image2video)"
            )),
        }
    }
}

// ─────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────

/// Lifecycle state of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Submitted,
    Processing,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Map a vendor status string. `None` for anything unrecognized.
    pub fn from_vendor(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "submitted" => Some(Self::Submitted),
            "processing" => Some(Self::Processing),
            "succeed" | "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Status after observing `next`. Terminal states absorb everything and
    /// an in-progress task never moves back to `Submitted`.
    pub fn advance(self, next: TaskStatus) -> TaskStatus {
        match (self, next) {
            (current, _) if current.is_terminal() => current,
            (Self::Processing, Self::Submitted) => Self::Processing,
            (_, next) => next,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────
// Handle + task
// ─────────────────────────────────────────────

/// Identity of one in-flight job. Serializable so it can be stored and
/// checked later with a single fetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
    pub modality: TaskModality,
    pub status: TaskStatus,
}

impl TaskHandle {
    /// Handle for a task submitted elsewhere; status starts at `Submitted`.
    pub fn new(task_id: impl Into<String>, modality: TaskModality) -> Self {
        Self {
            task_id: task_id.into(),
            modality,
            status: TaskStatus::Submitted,
        }
    }
}

/// A submitted task, tracked by the poll loop of a single `generate` call.
#[derive(Debug)]
pub struct GenerationTask {
    handle: TaskHandle,
    submitted_at: Instant,
    polls: u32,
    pauses: u32,
    result_url: Option<String>,
    error_message: Option<String>,
}

impl GenerationTask {
    pub(crate) fn new(handle: TaskHandle) -> Self {
        Self {
            handle,
            submitted_at: Instant::now(),
            polls: 0,
            pauses: 0,
            result_url: None,
            error_message: None,
        }
    }

    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    pub fn task_id(&self) -> &str {
        &self.handle.task_id
    }

    pub fn status(&self) -> TaskStatus {
        self.handle.status
    }

    /// Time since submission.
    pub fn elapsed(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    /// Number of status polls applied so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Number of interval sleeps between polls.
    pub fn pauses(&self) -> u32 {
        self.pauses
    }

    /// Sleep one poll interval.
    pub(crate) async fn pause(&mut self, interval: Duration) {
        tokio::time::sleep(interval).await;
        self.pauses += 1;
    }

    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Fold one poll observation into the task.
    pub(crate) fn apply(&mut self, observation: &PollObservation) {
        self.polls += 1;
        if self.handle.status.is_terminal() {
            return;
        }
        match observation {
            PollObservation::InProgress(status) => {
                self.handle.status = self.handle.status.advance(*status);
            }
            PollObservation::Succeeded { url } => {
                self.handle.status = TaskStatus::Succeeded;
                self.result_url = url.clone();
            }
            PollObservation::Failed { message } => {
                self.handle.status = TaskStatus::Failed;
                self.error_message = Some(message.clone());
            }
            PollObservation::Unrecognized { .. } => {}
        }
    }
}

/// Result of a single-shot status fetch.
#[derive(Clone, Debug, Serialize)]
pub struct TaskSnapshot {
    /// Handle with the status as of this fetch.
    pub handle: TaskHandle,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
    /// The vendor's `data` object, untouched.
    pub raw: Value,
}

// ─────────────────────────────────────────────
// Response normalization
// ─────────────────────────────────────────────

/// What one status poll reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollObservation {
    /// Still running (`Submitted` or `Processing`).
    InProgress(TaskStatus),
    /// Vendor reports success. `url` is the first artifact, if any.
    Succeeded { url: Option<String> },
    /// Vendor reports failure.
    Failed { message: String },
    /// Well-formed response without a usable status; treated as transient.
    Unrecognized { raw_status: Option<String> },
}

impl PollObservation {
    /// Normalize a 2xx poll response body.
    ///
    /// `data.task_status` decides, whatever the envelope `code` says; only a
    /// missing or unknown status is unrecognized.
    pub fn from_response(body: &Value) -> Self {
        let data = &body["data"];
        let raw_status = data["task_status"].as_str();

        match raw_status.and_then(TaskStatus::from_vendor) {
            Some(TaskStatus::Succeeded) => Self::Succeeded {
                url: data["task_result"]["videos"]
                    .as_array()
                    .and_then(|videos| videos.first())
                    .and_then(|video| non_empty_str(&video["url"])),
            },
            Some(TaskStatus::Failed) => Self::Failed {
                message: non_empty_str(&data["task_status_msg"])
                    .unwrap_or_else(|| "Unknown error".to_string()),
            },
            Some(status) => Self::InProgress(status),
            None => Self::Unrecognized {
                raw_status: raw_status.map(str::to_string),
            },
        }
    }
}

/// Normalize a submission response into a handle.
///
/// The task id is accepted flat (`data.task_id`) or nested
/// (`data.task.id`); likewise the status. A missing id is a remote error.
pub(crate) fn normalize_submission(body: &Value, modality: TaskModality) -> Result<TaskHandle> {
    let data = &body["data"];

    let task_id = non_empty_str(&data["task_id"]).or_else(|| non_empty_str(&data["task"]["id"]));
    let Some(task_id) = task_id else {
        return Err(match non_empty_str(&body["message"]) {
            Some(message) if !envelope_reports_success(body) => {
                ProviderError::remote(format!("API error: {message}"))
            }
            _ => ProviderError::remote("No task ID in response"),
        });
    };

    let status = data["task_status"]
        .as_str()
        .or_else(|| data["task"]["status"].as_str())
        .and_then(TaskStatus::from_vendor)
        .filter(|status| !status.is_terminal())
        .unwrap_or(TaskStatus::Submitted);

    Ok(TaskHandle {
        task_id,
        modality,
        status,
    })
}

/// Envelope check: `code == 0`, `status == 200` or `result == 1`. A body
/// with none of those markers relies on the HTTP status alone.
fn envelope_reports_success(body: &Value) -> bool {
    let code = body.get("code");
    let status = body.get("status");
    let result = body.get("result");

    if code.is_none() && status.is_none() && result.is_none() {
        return true;
    }

    code.and_then(Value::as_i64) == Some(0)
        || status.and_then(Value::as_i64) == Some(200)
        || result.and_then(Value::as_i64) == Some(1)
}

/// String or number field as a non-empty string.
fn non_empty_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
