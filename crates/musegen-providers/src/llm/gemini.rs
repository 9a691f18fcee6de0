//! Google Gemini via the native `generateContent` API.

use async_trait::async_trait;
use musegen_core::config::ProviderConfig;
use musegen_core::utils::truncate_string;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, Result};
use crate::http::{ensure_success, require_prompt};
use crate::llm::validate_text_options;
use crate::registry::GEMINI;
use crate::traits::{TextOptions, TextProvider};

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_level: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, thought summaries excluded.
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────
// GeminiProvider
// ─────────────────────────────────────────────

/// Text provider for Google Gemini.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        let model = GEMINI.model(config);
        if config.is_configured() {
            info!(provider = GEMINI.name, model = %model, "text provider initialized");
        } else {
            debug!(provider = GEMINI.name, "no API key configured, provider unavailable");
        }

        Self {
            client: reqwest::Client::new(),
            api_base: GEMINI.api_base(config),
            api_key: config.api_key.clone(),
            model,
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    async fn send(&self, prompt: &str, options: &TextOptions, with_thinking: bool) -> Result<String> {
        let thinking_config = options
            .thinking
            .filter(|_| with_thinking)
            .map(|level| ThinkingConfig {
                thinking_level: level.as_str().to_uppercase(),
            });

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                thinking_config,
            },
        };

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .timeout(super::REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body: GenerateResponse = response.json().await?;
        Ok(body.text())
    }
}

/// Whether a failure looks like the model rejecting `thinkingConfig`.
fn rejects_thinking(err: &ProviderError) -> bool {
    match err {
        ProviderError::Remote {
            status: Some(_),
            message,
            ..
        } => message.to_lowercase().contains("thinking"),
        _ => false,
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    async fn generate(&self, prompt: &str, options: &TextOptions) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Configuration(format!(
                "{} has no API key (set {})",
                GEMINI.display_name, GEMINI.env_key
            )));
        }
        require_prompt(prompt)?;
        validate_text_options(options)?;
        if options.stream {
            debug!(provider = GEMINI.name, "streaming not supported, ignoring");
        }

        info!(
            provider = GEMINI.name,
            model = %self.model,
            thinking = options.thinking.map(|level| level.as_str()),
            prompt = %truncate_string(prompt, 50),
            "generating text"
        );

        let text = match self.send(prompt, options, true).await {
            Ok(text) => text,
            Err(e) if options.thinking.is_some() && rejects_thinking(&e) => {
                warn!(
                    provider = GEMINI.name,
                    model = %self.model,
                    error = %e,
                    "model rejected thinking config, retrying without it"
                );
                self.send(prompt, options, false).await.inspect_err(|e| {
                    error!(provider = GEMINI.name, error = %e, "retry without thinking failed");
                })?
            }
            Err(e) => {
                error!(provider = GEMINI.name, error = %e, "generation failed");
                return Err(e);
            }
        };

        info!(
            provider = GEMINI.name,
            response = %truncate_string(&text, 200),
            "text generated"
        );
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        GEMINI.display_name
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ThinkingLevel;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> GeminiProvider {
        GeminiProvider::new(&ProviderConfig {
            api_key: "g-key".into(),
            api_base: Some(server.uri()),
            model: Some("gemini-3-pro-preview".into()),
        })
    }

    fn candidate(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"text": "hidden reasoning", "thought": true},
                {"text": text}
            ]}}]
        }))
    }

    #[test]
    fn test_generate_url() {
        let provider = GeminiProvider::new(&ProviderConfig {
            api_key: "k".into(),
            ..Default::default()
        });
        assert_eq!(
            provider.generate_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_sends_native_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-3-pro-preview:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_partial_json(json!({
                "contents": [{"role": "user", "parts": [{"text": "Hi"}]}],
                "generationConfig": {
                    "temperature": 1.0,
                    "maxOutputTokens": 65536,
                    "thinkingConfig": {"thinkingLevel": "HIGH"}
                }
            })))
            .respond_with(candidate("Hello!"))
            .expect(1)
            .mount(&server)
            .await;

        let options = TextOptions {
            thinking: Some(ThinkingLevel::High),
            ..Default::default()
        };
        let text = provider(&server).generate("Hi", &options).await.unwrap();
        assert_eq!(text, "Hello!");
    }

    #[tokio::test]
    async fn test_retries_once_without_thinking() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "generationConfig": {"thinkingConfig": {"thinkingLevel": "LOW"}}
            })))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "Thinking level is not supported for this model."}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(candidate("plain answer"))
            .expect(1)
            .mount(&server)
            .await;

        let options = TextOptions {
            thinking: Some(ThinkingLevel::Low),
            ..Default::default()
        };
        let text = provider(&server).generate("q", &options).await.unwrap();
        assert_eq!(text, "plain answer");

        let requests = server.received_requests().await.unwrap();
        let retry: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert!(retry["generationConfig"].get("thinkingConfig").is_none());
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key invalid"))
            .expect(1)
            .mount(&server)
            .await;

        let options = TextOptions {
            thinking: Some(ThinkingLevel::High),
            ..Default::default()
        };
        let err = provider(&server).generate("q", &options).await.unwrap_err();
        assert!(matches!(err, ProviderError::Remote { status: Some(403), .. }));
    }

    #[tokio::test]
    async fn test_no_candidates_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let text = provider(&server)
            .generate("q", &TextOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_missing_key() {
        let provider = GeminiProvider::new(&ProviderConfig::default());
        assert!(!provider.is_available());
        let err = provider
            .generate("q", &TextOptions::default())
            .await
            .unwrap_err();
        assert!(err.never_started());
    }
}
