//! 302.AI Google Nano-Banana image provider.
//!
//! Synchronous mode: one POST returns output URLs, the first is downloaded.

use async_trait::async_trait;
use musegen_core::config::ProviderConfig;
use musegen_core::utils::truncate_string;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::error::{ProviderError, Result};
use crate::http::{download, ensure_success, merge_extra, require_prompt};
use crate::registry::NANO_BANANA;
use crate::traits::{ImageOptions, ImageProvider};

const RESOLUTIONS: &[&str] = &["1k", "2k", "4k"];
const DEFAULT_RESOLUTION: &str = "2k";
const DEFAULT_ASPECT_RATIO: &str = "3:4";

/// Nano-Banana image generation and editing.
pub struct NanoBananaProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl NanoBananaProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        let model = NANO_BANANA.model(config);
        if config.is_configured() {
            info!(provider = NANO_BANANA.name, model = %model, "image provider initialized");
        } else {
            debug!(provider = NANO_BANANA.name, "no API key configured, provider unavailable");
        }

        Self {
            client: reqwest::Client::new(),
            api_base: NANO_BANANA.api_base(config),
            api_key: config.api_key.clone(),
            model,
        }
    }

    /// `text-to-image`, or `edit` when reference images are given.
    fn endpoint(&self, model: &str, editing: bool) -> String {
        let action = if editing { "edit" } else { "text-to-image" };
        format!("{}/ws/api/v3/{}/{}", self.api_base, model, action)
    }

    fn build_body(&self, prompt: &str, options: &ImageOptions) -> Result<Value> {
        let resolution = options.resolution.as_deref().unwrap_or(DEFAULT_RESOLUTION);
        if !RESOLUTIONS.contains(&resolution) {
            return Err(ProviderError::Validation(format!(
                "resolution must be one of {}, got '{resolution}'",
                RESOLUTIONS.join(", ")
            )));
        }

        let mut body = json!({
            "prompt": prompt,
            "resolution": resolution,
            "aspect_ratio": options.aspect_ratio.as_deref().unwrap_or(DEFAULT_ASPECT_RATIO),
            "enable_base64_output": false,
            "enable_sync_mode": true,
        });
        if !options.reference_images.is_empty() {
            body["images"] = json!(options.reference_images);
        }
        merge_extra(&mut body, &options.extra);
        Ok(body)
    }
}

/// First output URL of a `code == 200` envelope.
fn first_output(body: &Value) -> Result<String> {
    if body["code"].as_i64() != Some(200) {
        let message = body["message"].as_str().unwrap_or("Unknown error");
        return Err(ProviderError::remote(format!("API error: {message}")));
    }
    body["data"]["outputs"]
        .as_array()
        .and_then(|outputs| outputs.first())
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::remote("No image URL in response"))
}

#[async_trait]
impl ImageProvider for NanoBananaProvider {
    async fn generate(&self, prompt: &str, options: &ImageOptions) -> Result<Vec<u8>> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Configuration(format!(
                "{} has no API key (set {} or THIRTYTWO_API_KEY)",
                NANO_BANANA.display_name, NANO_BANANA.env_key
            )));
        }
        require_prompt(prompt)?;
        let body = self.build_body(prompt, options)?;

        let editing = !options.reference_images.is_empty();
        let model = options.model.as_deref().unwrap_or(&self.model);
        info!(
            provider = NANO_BANANA.name,
            mode = if editing { "image-to-image" } else { "text-to-image" },
            prompt = %truncate_string(prompt, 50),
            "generating image"
        );

        let response = self
            .client
            .post(self.endpoint(model, editing))
            .bearer_auth(&self.api_key)
            .timeout(super::REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await.inspect_err(|e| {
            error!(provider = NANO_BANANA.name, error = %e, "API error");
        })?;
        let envelope: Value = response.json().await?;

        let url = first_output(&envelope).inspect_err(|e| {
            error!(provider = NANO_BANANA.name, error = %e, "image generation failed");
        })?;
        info!(provider = NANO_BANANA.name, url = %url, "image generated");

        download(&self.client, &url).await
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        NANO_BANANA.display_name
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}
