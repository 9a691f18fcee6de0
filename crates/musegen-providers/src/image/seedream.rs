//! 302.AI Doubao Seedream image provider.

use async_trait::async_trait;
use base64::Engine;
use musegen_core::config::ProviderConfig;
use musegen_core::utils::truncate_string;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::error::{ProviderError, Result};
use crate::http::{download, ensure_success, merge_extra, require_prompt};
use crate::registry::SEEDREAM;
use crate::traits::{ImageOptions, ImageProvider};

const GENERATIONS_PATH: &str = "/doubao/images/generations";

/// Pixel size sent for each supported aspect ratio.
pub const ASPECT_RATIO_SIZES: &[(&str, &str)] = &[
    ("1:1", "2048x2048"),
    ("4:3", "2304x1728"),
    ("3:4", "1728x2304"),
    ("16:9", "2560x1440"),
    ("9:16", "1440x2560"),
    ("3:2", "2496x1664"),
    ("2:3", "1664x2496"),
    ("21:9", "3024x1296"),
];

const DEFAULT_ASPECT_RATIO: &str = "1:1";
const RESPONSE_FORMATS: &[&str] = &["url", "b64_json"];

/// Seedream text-to-image, image-to-image and multi-image fusion.
pub struct SeedreamProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

/// Size for an aspect ratio, or a validation error listing the options.
fn size_for_aspect_ratio(ratio: &str) -> Result<&'static str> {
    ASPECT_RATIO_SIZES
        .iter()
        .find(|(r, _)| *r == ratio)
        .map(|(_, size)| *size)
        .ok_or_else(|| {
            let supported: Vec<_> = ASPECT_RATIO_SIZES.iter().map(|(r, _)| *r).collect();
            ProviderError::Validation(format!(
                "unsupported aspect_ratio '{ratio}', supported values: {}",
                supported.join(", ")
            ))
        })
}

impl SeedreamProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        let model = SEEDREAM.model(config);
        if config.is_configured() {
            info!(provider = SEEDREAM.name, model = %model, "image provider initialized");
        } else {
            debug!(provider = SEEDREAM.name, "no API key configured, provider unavailable");
        }

        Self {
            client: reqwest::Client::new(),
            api_base: SEEDREAM.api_base(config),
            api_key: config.api_key.clone(),
            model,
        }
    }

    fn build_body(&self, prompt: &str, options: &ImageOptions) -> Result<Value> {
        // explicit size wins over the aspect ratio
        let size = match options.size.as_deref() {
            Some(size) => size,
            None => size_for_aspect_ratio(
                options.aspect_ratio.as_deref().unwrap_or(DEFAULT_ASPECT_RATIO),
            )?,
        };

        let mut body = json!({
            "model": options.model.as_deref().unwrap_or(&self.model),
            "prompt": prompt,
            "size": size,
            "watermark": options.watermark,
            "response_format": options.response_format.as_deref().unwrap_or("url"),
        });
        match options.reference_images.as_slice() {
            [] => {}
            [single] => body["image"] = json!(single),
            several => body["image"] = json!(several),
        }
        merge_extra(&mut body, &options.extra);

        // checked after extras, which may override it
        let response_format = &body["response_format"];
        if !response_format
            .as_str()
            .is_some_and(|format| RESPONSE_FORMATS.contains(&format))
        {
            return Err(ProviderError::Validation(format!(
                "response_format must be url or b64_json, got {response_format}"
            )));
        }
        Ok(body)
    }

    async fn extract_image(&self, body: &Value, response_format: &str) -> Result<Vec<u8>> {
        if let Some(err) = body.get("error") {
            let code = match &err["code"] {
                Value::String(s) => s.clone(),
                Value::Null => "unknown".to_string(),
                other => other.to_string(),
            };
            let message = err["message"].as_str().unwrap_or("Unknown error");
            return Err(ProviderError::remote(format!("({code}): {message}")));
        }

        let first = body["data"]
            .as_array()
            .and_then(|images| images.first())
            .ok_or_else(|| ProviderError::remote("No image data in response"))?;

        if response_format == "b64_json" {
            let encoded = first["b64_json"]
                .as_str()
                .ok_or_else(|| ProviderError::remote("No base64 image data in response"))?;
            return base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| ProviderError::Remote {
                    status: None,
                    message: format!("invalid base64 image data: {e}"),
                    source: Some(Box::new(e)),
                });
        }

        let url = first["url"]
            .as_str()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ProviderError::remote("No image URL in response"))?;
        info!(provider = SEEDREAM.name, url = %url, "image generated");
        download(&self.client, url).await
    }
}

#[async_trait]
impl ImageProvider for SeedreamProvider {
    async fn generate(&self, prompt: &str, options: &ImageOptions) -> Result<Vec<u8>> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Configuration(format!(
                "{} has no API key (set {} or THIRTYTWO_API_KEY)",
                SEEDREAM.display_name, SEEDREAM.env_key
            )));
        }
        require_prompt(prompt)?;
        let body = self.build_body(prompt, options)?;

        let mode = match options.reference_images.len() {
            0 => "text-to-image",
            1 => "image-to-image",
            _ => "multiple-images-to-image",
        };
        info!(
            provider = SEEDREAM.name,
            mode,
            size = body["size"].as_str().unwrap_or_default(),
            prompt = %truncate_string(prompt, 50),
            "generating image"
        );

        let response = self
            .client
            .post(format!("{}{}", self.api_base, GENERATIONS_PATH))
            .bearer_auth(&self.api_key)
            .timeout(super::REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await.inspect_err(|e| {
            error!(provider = SEEDREAM.name, error = %e, "API error");
        })?;
        let envelope: Value = response.json().await?;

        let response_format = body["response_format"].as_str().unwrap_or("url");
        self.extract_image(&envelope, response_format)
            .await
            .inspect_err(|e| {
                error!(provider = SEEDREAM.name, error = %e, "image generation failed");
            })
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        SEEDREAM.display_name
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> SeedreamProvider {
        SeedreamProvider::new(&ProviderConfig {
            api_key: "sd-key".into(),
            api_base: Some(server.uri()),
            model: None,
        })
    }

    #[test]
    fn test_size_map() {
        assert_eq!(size_for_aspect_ratio("16:9").unwrap(), "2560x1440");
        assert_eq!(size_for_aspect_ratio("21:9").unwrap(), "3024x1296");
        let err = size_for_aspect_ratio("5:4").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("1:1"));
    }

    #[test]
    fn test_body_defaults() {
        let provider = SeedreamProvider::new(&ProviderConfig::default());
        let body = provider.build_body("p", &ImageOptions::default()).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "doubao-seedream-5-0-260128",
                "prompt": "p",
                "size": "2048x2048",
                "watermark": false,
                "response_format": "url"
            })
        );
    }

    #[test]
    fn test_body_reference_images() {
        let provider = SeedreamProvider::new(&ProviderConfig::default());

        let one = ImageOptions::default().with_reference_image("https://x/a.jpg");
        let body = provider.build_body("p", &one).unwrap();
        assert_eq!(body["image"], "https://x/a.jpg");

        let two = one.with_reference_image("https://x/b.jpg");
        let body = provider.build_body("p", &two).unwrap();
        assert_eq!(body["image"], json!(["https://x/a.jpg", "https://x/b.jpg"]));
    }

    #[test]
    fn test_explicit_size_wins() {
        let provider = SeedreamProvider::new(&ProviderConfig::default());
        let options = ImageOptions {
            size: Some("2K".into()),
            aspect_ratio: Some("not-a-ratio".into()),
            ..Default::default()
        };
        assert_eq!(provider.build_body("p", &options).unwrap()["size"], "2K");
    }

    #[test]
    fn test_invalid_response_format() {
        let provider = SeedreamProvider::new(&ProviderConfig::default());
        let options = ImageOptions::default().with_response_format("png");
        let err = provider.build_body("p", &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_response_format_from_extras_is_validated() {
        let provider = SeedreamProvider::new(&ProviderConfig::default());

        let options = ImageOptions::default().with_extra("response_format", json!("xyz"));
        let err = provider.build_body("p", &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let options = ImageOptions::default().with_extra("response_format", json!("b64_json"));
        let body = provider.build_body("p", &options).unwrap();
        assert_eq!(body["response_format"], "b64_json");
    }

    #[tokio::test]
    async fn test_b64_json_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/doubao/images/generations"))
            .and(body_partial_json(json!({"response_format": "b64_json", "size": "2560x1440"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"b64_json": "aGVsbG8="}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let options = ImageOptions::default()
            .with_aspect_ratio("16:9")
            .with_response_format("b64_json");
        let bytes = provider(&server).generate("p", &options).await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn test_url_is_downloaded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/doubao/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"url": format!("{}/img/1.jpeg", server.uri())}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/1.jpeg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"JPEG".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let bytes = provider(&server)
            .generate("p", &ImageOptions::default())
            .await
            .unwrap();
        assert_eq!(bytes, b"JPEG");
    }

    #[tokio::test]
    async fn test_error_object_is_remote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"code": "InvalidParameter", "message": "size too large"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate("p", &ImageOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(err.to_string(), "remote error: (InvalidParameter): size too large");
    }
}
