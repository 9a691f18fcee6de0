//! Task lifecycle manager: submit → poll until terminal → download.
//!
//! Polling is a fixed-interval loop bounded by an elapsed-time budget
//! measured from submission. The budget is checked before every poll, so
//! once it is spent no further polls or downloads happen. Submission is
//! never retried; HTTP failures during polling end the loop.

use std::time::Duration;

use musegen_core::config::VideoConfig;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::task::{
    normalize_submission, GenerationTask, PollObservation, TaskHandle, TaskModality, TaskSnapshot,
};
use crate::error::{ProviderError, Result};
use crate::http::{download, ensure_success};

/// Upper bound on the submission request.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Fixed poll interval and total wait budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub budget: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            budget: Duration::from_secs(300),
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, budget: Duration) -> Self {
        Self { interval, budget }
    }

    pub fn from_config(config: &VideoConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_secs),
            budget: Duration::from_secs(config.max_polling_secs),
        }
    }
}

/// Drives asynchronous jobs against a `{endpoint_base}/{modality}` API.
pub struct TaskManager {
    client: reqwest::Client,
    endpoint_base: String,
    api_key: String,
    policy: PollPolicy,
}

impl TaskManager {
    /// `endpoint_base` is the URL the modality segment is appended to,
    /// e.g. `https://api.302.ai/klingai/v1/videos`.
    pub fn new(
        client: reqwest::Client,
        endpoint_base: impl Into<String>,
        api_key: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            client,
            endpoint_base: endpoint_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            policy,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub(crate) fn set_policy(&mut self, policy: PollPolicy) {
        self.policy = policy;
    }

    fn endpoint(&self, modality: TaskModality) -> String {
        format!("{}/{}", self.endpoint_base, modality.endpoint_segment())
    }

    /// POST the job once and return the tracked task.
    pub async fn submit(&self, modality: TaskModality, body: &Value) -> Result<GenerationTask> {
        let url = self.endpoint(modality);
        debug!(url = %url, modality = %modality, "submitting task");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(SUBMIT_TIMEOUT)
            .json(body)
            .send()
            .await?;

        let response = ensure_success(response).await.inspect_err(|e| {
            error!(modality = %modality, error = %e, "task submission rejected");
        })?;
        let body: Value = response.json().await?;
        debug!(response = %body, "submission response");

        let handle = normalize_submission(&body, modality).inspect_err(|e| {
            error!(modality = %modality, error = %e, response = %body, "unusable submission response");
        })?;

        info!(
            task_id = %handle.task_id,
            modality = %modality,
            status = %handle.status,
            "task submitted"
        );
        Ok(GenerationTask::new(handle))
    }

    /// One status GET on the endpoint matching the handle's modality.
    /// Returns the observation and the vendor's `data` object.
    pub async fn poll_once(&self, handle: &TaskHandle) -> Result<(PollObservation, Value)> {
        let url = format!("{}/{}", self.endpoint(handle.modality), handle.task_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let mut body: Value = response.json().await?;

        let observation = PollObservation::from_response(&body);
        let data = body.get_mut("data").map(Value::take).unwrap_or(Value::Null);
        Ok((observation, data))
    }

    /// Poll until the task reaches a terminal state and return the artifact
    /// URL. Sleeps `interval` after every non-terminal observation.
    pub async fn wait(&self, task: &mut GenerationTask) -> Result<String> {
        loop {
            let elapsed = task.elapsed();
            if elapsed > self.policy.budget {
                warn!(
                    task_id = %task.task_id(),
                    status = %task.status(),
                    elapsed_secs = elapsed.as_secs(),
                    polls = task.polls(),
                    "poll budget exhausted, abandoning task"
                );
                return Err(ProviderError::Timeout {
                    task_id: task.task_id().to_string(),
                    elapsed,
                });
            }

            let (observation, _) = self.poll_once(task.handle()).await.inspect_err(|e| {
                error!(task_id = %task.task_id(), error = %e, "status poll failed");
            })?;
            task.apply(&observation);

            match observation {
                PollObservation::Succeeded { url: Some(url) } => {
                    info!(
                        task_id = %task.task_id(),
                        url = %url,
                        elapsed_secs = task.elapsed().as_secs(),
                        "task succeeded"
                    );
                    return Ok(url);
                }
                PollObservation::Succeeded { url: None } => {
                    error!(task_id = %task.task_id(), "task succeeded without a video URL");
                    return Err(ProviderError::remote("No video URL in completed task"));
                }
                PollObservation::Failed { message } => {
                    error!(task_id = %task.task_id(), message = %message, "task failed");
                    return Err(ProviderError::remote(format!(
                        "Video generation failed: {message}"
                    )));
                }
                PollObservation::InProgress(status) => {
                    debug!(
                        task_id = %task.task_id(),
                        status = %status,
                        elapsed_secs = task.elapsed().as_secs(),
                        "task in progress"
                    );
                }
                PollObservation::Unrecognized { raw_status } => {
                    debug!(
                        task_id = %task.task_id(),
                        raw_status = ?raw_status,
                        "unrecognized poll response, retrying"
                    );
                }
            }

            task.pause(self.policy.interval).await;
        }
    }

    /// Single-shot status check, no looping.
    pub async fn fetch(&self, handle: &TaskHandle) -> Result<TaskSnapshot> {
        let (observation, raw) = self.poll_once(handle).await?;

        let mut task = GenerationTask::new(handle.clone());
        task.apply(&observation);
        debug!(task_id = %handle.task_id, status = %task.status(), "task fetched");

        Ok(TaskSnapshot {
            result_url: task.result_url().map(str::to_string),
            error_message: task.error_message().map(str::to_string),
            handle: task.handle().clone(),
            raw,
        })
    }

    /// GET the artifact and return its bytes verbatim.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        download(&self.client, url).await
    }

    /// Full lifecycle for one job.
    pub async fn run(&self, modality: TaskModality, body: &Value) -> Result<Vec<u8>> {
        let mut task = self.submit(modality, body).await?;
        let url = self.wait(&mut task).await?;
        let bytes = self.download(&url).await?;
        info!(
            task_id = %task.task_id(),
            bytes = bytes.len(),
            polls = task.polls(),
            "task artifact downloaded"
        );
        Ok(bytes)
    }
}
