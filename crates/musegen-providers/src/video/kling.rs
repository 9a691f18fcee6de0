//! 302.AI Kling video provider (text-to-video and image-to-video).

use async_trait::async_trait;
use musegen_core::config::{ProviderConfig, VideoConfig};
use musegen_core::utils::truncate_string;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::lifecycle::{PollPolicy, TaskManager};
use super::task::{TaskHandle, TaskModality, TaskSnapshot};
use crate::error::{ProviderError, Result};
use crate::http::{merge_extra, require_prompt};
use crate::registry::KLING;
use crate::traits::{VideoOptions, VideoProvider};

/// Models that reject reference images.
const TEXT_ONLY_MODELS: &[&str] = &["kling-v2-5-turbo", "kling-v2-1-master"];
/// Substituted for a text-only model when reference images are supplied.
const IMAGE_FALLBACK_MODEL: &str = "kling-v1-6";

const DURATIONS: &[u32] = &[5, 10];
const ASPECT_RATIOS: &[&str] = &["16:9", "9:16", "1:1"];
const MODES: &[&str] = &["std", "pro"];

const DEFAULT_DURATION: u32 = 5;
const DEFAULT_ASPECT_RATIO: &str = "16:9";
const DEFAULT_MODE: &str = "std";

const VIDEOS_PATH: &str = "/klingai/v1/videos";

/// Kling video generation through the 302.AI gateway.
pub struct KlingVideoProvider {
    api_key: String,
    model: String,
    tasks: TaskManager,
}

impl KlingVideoProvider {
    /// `config` should already carry the 302.AI key fallback
    /// (see `ProvidersConfig::resolve`).
    pub fn new(config: &ProviderConfig, video: &VideoConfig) -> Self {
        let tasks = TaskManager::new(
            reqwest::Client::new(),
            format!("{}{}", KLING.api_base(config), VIDEOS_PATH),
            config.api_key.clone(),
            PollPolicy::from_config(video),
        );

        let model = KLING.model(config);
        if config.is_configured() {
            info!(provider = KLING.name, model = %model, "video provider initialized");
        } else {
            debug!(provider = KLING.name, "no API key configured, provider unavailable");
        }

        Self {
            api_key: config.api_key.clone(),
            model,
            tasks,
        }
    }

    /// Override the poll interval and budget.
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.tasks.set_policy(policy);
        self
    }

    /// Submit a job and return its handle without waiting.
    pub async fn submit(&self, prompt: &str, options: &VideoOptions) -> Result<TaskHandle> {
        let (modality, body) = self.prepare(prompt, options)?;
        let task = self.tasks.submit(modality, &body).await?;
        Ok(task.handle().clone())
    }

    /// Fetch the current state of a previously submitted task once.
    pub async fn fetch_task(&self, handle: &TaskHandle) -> Result<TaskSnapshot> {
        self.ensure_available()?;
        self.tasks.fetch(handle).await
    }

    fn ensure_available(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Configuration(format!(
                "{} has no API key (set {} or THIRTYTWO_API_KEY)",
                KLING.display_name, KLING.env_key
            )));
        }
        Ok(())
    }

    /// Validate options and build the submission body. No network I/O.
    fn prepare(&self, prompt: &str, options: &VideoOptions) -> Result<(TaskModality, Value)> {
        self.ensure_available()?;
        require_prompt(prompt)?;

        let duration = options.duration_secs.unwrap_or(DEFAULT_DURATION);
        if !DURATIONS.contains(&duration) {
            return Err(ProviderError::Validation(format!(
                "duration must be 5 or 10, got {duration}"
            )));
        }

        let aspect_ratio = options.aspect_ratio.as_deref().unwrap_or(DEFAULT_ASPECT_RATIO);
        if !ASPECT_RATIOS.contains(&aspect_ratio) {
            return Err(ProviderError::Validation(format!(
                "aspect_ratio must be one of {}, got '{aspect_ratio}'",
                ASPECT_RATIOS.join(", ")
            )));
        }

        let mode = options.mode.as_deref().unwrap_or(DEFAULT_MODE);
        if !MODES.contains(&mode) {
            return Err(ProviderError::Validation(format!(
                "mode must be std or pro, got '{mode}'"
            )));
        }

        let modality = TaskModality::for_references(&options.reference_images);
        let model = self.select_model(options.model.as_deref(), modality);

        let mut body = match modality {
            TaskModality::ImageToVideo => {
                let image_list: Vec<Value> = options
                    .reference_images
                    .iter()
                    .map(|url| json!({ "image": url }))
                    .collect();
                json!({
                    "model_name": model,
                    "image_list": image_list,
                    "mode": mode,
                    "prompt": prompt,
                    "aspect_ratio": aspect_ratio,
                    "duration": duration,
                })
            }
            TaskModality::TextToVideo => json!({
                "prompt": prompt,
                "model_name": model,
                "aspect_ratio": aspect_ratio,
                "duration": duration,
            }),
        };
        merge_extra(&mut body, &options.extra);

        info!(
            provider = KLING.name,
            modality = %modality,
            model = %model,
            prompt = %truncate_string(prompt, 50),
            "submitting video generation"
        );
        Ok((modality, body))
    }

    /// Requested model, swapped for one that accepts images when needed.
    fn select_model(&self, requested: Option<&str>, modality: TaskModality) -> String {
        let selected = requested.unwrap_or(&self.model);
        if modality == TaskModality::ImageToVideo && TEXT_ONLY_MODELS.contains(&selected) {
            info!(
                requested = %selected,
                substitute = IMAGE_FALLBACK_MODEL,
                "model does not support image input, substituting"
            );
            return IMAGE_FALLBACK_MODEL.to_string();
        }
        selected.to_string()
    }
}

#[async_trait]
impl VideoProvider for KlingVideoProvider {
    async fn generate(&self, prompt: &str, options: &VideoOptions) -> Result<Vec<u8>> {
        let (modality, body) = self.prepare(prompt, options)?;
        self.tasks.run(modality, &body).await
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        KLING.display_name
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
