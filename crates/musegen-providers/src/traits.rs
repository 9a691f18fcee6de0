//! Provider traits: one capability interface per modality.
//!
//! Every vendor client implements exactly one of [`TextProvider`],
//! [`ImageProvider`] or [`VideoProvider`]. Options are modality-specific
//! structs; each vendor applies its own defaults to fields left unset and
//! rejects values outside its supported set with
//! [`ProviderError::Validation`](crate::ProviderError::Validation).

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

// ─────────────────────────────────────────────
// Text
// ─────────────────────────────────────────────

/// Depth of reasoning requested from models that support it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThinkingLevel {
    Minimal,
    Low,
    Medium,
    High,
}

impl ThinkingLevel {
    /// Lowercase name, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for ThinkingLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!(
                "unknown thinking level '{other}' (expected minimal, low, medium or high)"
            )),
        }
    }
}

/// Options for one text generation call.
#[derive(Clone, Debug)]
pub struct TextOptions {
    /// Sampling temperature (0.0 to 2.0).
    pub temperature: f64,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Request extended reasoning. Vendors without levels treat any
    /// `Some` as "enabled".
    pub thinking: Option<ThinkingLevel>,
    /// Stream the answer and concatenate the fragments (OpenAI-compatible
    /// vendors only; others ignore it).
    pub stream: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            max_tokens: 65536,
            thinking: None,
            stream: false,
        }
    }
}

/// Trait that all text (LLM) providers implement.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate a completion for a single user prompt.
    async fn generate(&self, prompt: &str, options: &TextOptions) -> Result<String>;

    /// The model this instance calls.
    fn model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;

    /// Whether a credential was found at construction.
    fn is_available(&self) -> bool;
}

// ─────────────────────────────────────────────
// Image
// ─────────────────────────────────────────────

/// Options for one image generation call.
#[derive(Clone, Debug, Default)]
pub struct ImageOptions {
    /// Reference image URLs. Non-empty switches to image-to-image.
    pub reference_images: Vec<String>,
    /// Aspect ratio such as `"16:9"`.
    pub aspect_ratio: Option<String>,
    /// Resolution tier such as `"2k"`.
    pub resolution: Option<String>,
    /// Explicit pixel size such as `"2048x2048"`; wins over the aspect ratio.
    pub size: Option<String>,
    /// `"url"` or `"b64_json"`.
    pub response_format: Option<String>,
    /// Ask the vendor to watermark the result.
    pub watermark: bool,
    /// Model override for this call.
    pub model: Option<String>,
    /// Vendor-specific fields merged verbatim into the request body.
    pub extra: Map<String, Value>,
}

impl ImageOptions {
    /// Add a reference image.
    pub fn with_reference_image(mut self, url: impl Into<String>) -> Self {
        self.reference_images.push(url.into());
        self
    }

    /// Set the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }

    /// Set the resolution tier.
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    /// Set the response format.
    pub fn with_response_format(mut self, format: impl Into<String>) -> Self {
        self.response_format = Some(format.into());
        self
    }

    /// Add a vendor-specific field.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Trait that all image providers implement.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate an image and return its raw bytes.
    async fn generate(&self, prompt: &str, options: &ImageOptions) -> Result<Vec<u8>>;

    /// The default model of this instance.
    fn model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;

    /// Whether a credential was found at construction.
    fn is_available(&self) -> bool;
}

// ─────────────────────────────────────────────
// Video
// ─────────────────────────────────────────────

/// Options for one video generation call.
#[derive(Clone, Debug, Default)]
pub struct VideoOptions {
    /// Reference image URLs. Non-empty switches to image-to-video.
    pub reference_images: Vec<String>,
    /// Model override for this call.
    pub model: Option<String>,
    /// Generation mode (`"std"` or `"pro"`).
    pub mode: Option<String>,
    /// Aspect ratio such as `"16:9"`.
    pub aspect_ratio: Option<String>,
    /// Clip length in seconds.
    pub duration_secs: Option<u32>,
    /// Vendor-specific fields merged verbatim into the request body.
    pub extra: Map<String, Value>,
}

impl VideoOptions {
    /// Add a reference image.
    pub fn with_reference_image(mut self, url: impl Into<String>) -> Self {
        self.reference_images.push(url.into());
        self
    }

    /// Set the model for this call.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }

    /// Set the clip length in seconds.
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Add a vendor-specific field.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Trait that all video providers implement.
///
/// `generate` blocks (asynchronously) until the artifact is downloaded or
/// the vendor's poll budget is spent.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Generate a video and return its raw bytes.
    async fn generate(&self, prompt: &str, options: &VideoOptions) -> Result<Vec<u8>>;

    /// The default model of this instance.
    fn model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;

    /// Whether a credential was found at construction.
    fn is_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thinking_level_parse() {
        assert_eq!("HIGH".parse::<ThinkingLevel>(), Ok(ThinkingLevel::High));
        assert_eq!("minimal".parse::<ThinkingLevel>(), Ok(ThinkingLevel::Minimal));
        assert!("extreme".parse::<ThinkingLevel>().is_err());
    }

    #[test]
    fn test_text_options_default() {
        let options = TextOptions::default();
        assert_eq!(options.temperature, 1.0);
        assert_eq!(options.max_tokens, 65536);
        assert!(options.thinking.is_none());
        assert!(!options.stream);
    }

    #[test]
    fn test_video_options_builder() {
        let options = VideoOptions::default()
            .with_reference_image("https://example.com/a.png")
            .with_reference_image("https://example.com/b.png")
            .with_aspect_ratio("9:16")
            .with_duration(10)
            .with_extra("cfg_scale", serde_json::json!(0.5));
        assert_eq!(options.reference_images.len(), 2);
        assert_eq!(options.aspect_ratio.as_deref(), Some("9:16"));
        assert_eq!(options.duration_secs, Some(10));
        assert_eq!(options.extra["cfg_scale"], 0.5);
    }
}
