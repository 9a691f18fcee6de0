//! OpenAI-compatible `/chat/completions` client.
//!
//! Serves Zhipu GLM and the 302.AI gateway. Both take a bearer key and a
//! single user message; Zhipu additionally understands a `thinking` toggle.

use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use musegen_core::config::ProviderConfig;
use musegen_core::utils::truncate_string;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, Result};
use crate::http::{ensure_success, require_prompt};
use crate::llm::validate_text_options;
use crate::registry::{VendorSpec, ZHIPU};
use crate::traits::{TextOptions, TextProvider};

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingToggle>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ThinkingToggle {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

// ─────────────────────────────────────────────
// ChatCompletionsProvider
// ─────────────────────────────────────────────

/// Text provider for any OpenAI-compatible vendor in the registry.
pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    spec: &'static VendorSpec,
}

impl std::fmt::Debug for ChatCompletionsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsProvider")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("provider", &self.spec.display_name)
            .finish()
    }
}

impl ChatCompletionsProvider {
    pub fn new(config: &ProviderConfig, spec: &'static VendorSpec) -> Self {
        let model = spec.model(config);
        if config.is_configured() {
            info!(provider = spec.name, model = %model, "text provider initialized");
        } else {
            debug!(provider = spec.name, "no API key configured, provider unavailable");
        }

        Self {
            client: reqwest::Client::new(),
            api_base: spec.api_base(config),
            api_key: config.api_key.clone(),
            model,
            spec,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    /// Only Zhipu accepts the `thinking` toggle.
    fn thinking_toggle(&self, options: &TextOptions) -> Option<ThinkingToggle> {
        match options.thinking {
            Some(_) if self.spec.name == ZHIPU.name => Some(ThinkingToggle { kind: "enabled" }),
            Some(level) => {
                debug!(
                    provider = self.spec.name,
                    level = level.as_str(),
                    "thinking not supported, ignoring"
                );
                None
            }
            None => None,
        }
    }
}

/// Concatenate the `choices[0].delta.content` fragments of an SSE body,
/// stopping at `[DONE]`. Events are decoded across chunk boundaries.
async fn collect_deltas<S, B, E>(chunks: S) -> Result<String>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ProviderError> + std::fmt::Display,
{
    let mut events = std::pin::pin!(chunks.eventsource());
    let mut content = String::new();

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(EventStreamError::Transport(e)) => return Err(e.into()),
            Err(e) => return Err(ProviderError::remote(format!("malformed event stream: {e}"))),
        };
        if append_delta(&event.data, &mut content) {
            break;
        }
    }
    Ok(content)
}

/// Append the delta carried by one event's data. Returns true on `[DONE]`.
fn append_delta(data: &str, content: &mut String) -> bool {
    let data = data.trim();
    if data == "[DONE]" {
        return true;
    }
    if data.is_empty() {
        return false;
    }
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => {
            if let Some(text) = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
            {
                content.push_str(&text);
            }
        }
        Err(e) => warn!(error = %e, "skipping malformed stream chunk"),
    }
    false
}

#[async_trait]
impl TextProvider for ChatCompletionsProvider {
    async fn generate(&self, prompt: &str, options: &TextOptions) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Configuration(format!(
                "{} has no API key (set {})",
                self.spec.display_name, self.spec.env_key
            )));
        }
        require_prompt(prompt)?;
        validate_text_options(options)?;

        info!(
            provider = self.spec.name,
            model = %self.model,
            stream = options.stream,
            prompt = %truncate_string(prompt, 50),
            "generating text"
        );

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: options.stream,
            thinking: self.thinking_toggle(options),
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .timeout(super::REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .inspect_err(|e| {
                error!(provider = self.spec.name, error = %e, "HTTP request failed");
            })?;

        let response = ensure_success(response).await.inspect_err(|e| {
            error!(provider = self.spec.name, error = %e, "API error");
        })?;

        let content = if options.stream {
            collect_deltas(response.bytes_stream()).await?
        } else {
            let body: ChatResponse = response.json().await?;
            match body.choices.into_iter().next() {
                Some(choice) => {
                    if let Some(reasoning) = choice.message.reasoning_content.as_deref() {
                        debug!(reasoning = %truncate_string(reasoning, 100), "reasoning received");
                    }
                    choice.message.content.unwrap_or_default()
                }
                None => {
                    warn!(provider = self.spec.name, "empty response");
                    String::new()
                }
            }
        };

        info!(
            provider = self.spec.name,
            response = %truncate_string(&content, 200),
            "text generated"
        );
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::THIRTYTWO;
    use crate::traits::ThinkingLevel;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_config(api_key: &str, api_base: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            api_key: api_key.to_string(),
            api_base: api_base.map(String::from),
            model: None,
        }
    }

    // ── Unit tests ──

    #[test]
    fn test_completions_url_trailing_slash() {
        let config = make_config("key", Some("https://api.302.ai/v1/"));
        let provider = ChatCompletionsProvider::new(&config, &THIRTYTWO);
        assert_eq!(
            provider.completions_url(),
            "https://api.302.ai/v1/chat/completions"
        );
    }

    #[test]
    fn test_default_base_and_model() {
        let provider = ChatCompletionsProvider::new(&make_config("key", None), &ZHIPU);
        assert_eq!(provider.api_base, "https://open.bigmodel.cn/api/paas/v4");
        assert_eq!(provider.model(), "glm-4.7-flash");
        assert_eq!(provider.display_name(), "Zhipu GLM");
    }

    #[test]
    fn test_unavailable_without_key() {
        let provider = ChatCompletionsProvider::new(&make_config("", None), &THIRTYTWO);
        assert!(!provider.is_available());
    }

    #[test]
    fn test_delta_parsing() {
        let mut content = String::new();
        assert!(!append_delta(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#, &mut content));
        assert!(!append_delta(r#"{"choices":[{"delta":{}}]}"#, &mut content));
        assert!(!append_delta("not json", &mut content));
        assert!(!append_delta(r#"{"choices":[{"delta":{"content":"lo"}}]}"#, &mut content));
        assert!(append_delta("[DONE]", &mut content));
        assert_eq!(content, "Hello");
    }

    #[tokio::test]
    async fn test_stream_keeps_characters_split_across_chunks() {
        let frame = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n\n".as_bytes();
        // cut one byte into the first character
        let split = frame.iter().position(|&b| b == 0xE4).unwrap() + 1;
        let chunks = vec![
            Ok::<_, ProviderError>(frame[..split].to_vec()),
            Ok(frame[split..].to_vec()),
            Ok(b": keep-alive\n\ndata: [DONE]\n\n".to_vec()),
        ];

        let content = collect_deltas(futures_util::stream::iter(chunks)).await.unwrap();
        assert_eq!(content, "你好");
    }

    #[tokio::test]
    async fn test_stream_transport_error_propagates() {
        let chunks = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n".to_vec()),
            Err(ProviderError::remote("connection reset")),
        ];

        let err = collect_deltas(futures_util::stream::iter(chunks)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(err.to_string().contains("connection reset"));
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn test_generate_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key-123"))
            .and(body_partial_json(json!({
                "model": "gemini-2.5-flash",
                "messages": [{"role": "user", "content": "Hello"}],
                "max_tokens": 65536
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-test",
                "choices": [{
                    "message": {"content": "Hi there."},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = make_config("test-key-123", Some(&mock_server.uri()));
        let provider = ChatCompletionsProvider::new(&config, &THIRTYTWO);

        let text = provider
            .generate("Hello", &TextOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "Hi there.");
    }

    #[tokio::test]
    async fn test_zhipu_thinking_toggle() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"thinking": {"type": "enabled"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "content": "42",
                        "reasoning_content": "Let me think step by step..."
                    }
                }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = make_config("zp-key", Some(&mock_server.uri()));
        let provider = ChatCompletionsProvider::new(&config, &ZHIPU);
        let options = TextOptions {
            thinking: Some(ThinkingLevel::High),
            ..Default::default()
        };

        assert_eq!(provider.generate("meaning?", &options).await.unwrap(), "42");
    }

    #[tokio::test]
    async fn test_thinking_omitted_for_gateway() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .mount(&mock_server)
            .await;

        let config = make_config("key", Some(&mock_server.uri()));
        let provider = ChatCompletionsProvider::new(&config, &THIRTYTWO);
        let options = TextOptions {
            thinking: Some(ThinkingLevel::Low),
            ..Default::default()
        };
        provider.generate("q", &options).await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("thinking").is_none());
        assert!(body.get("stream").is_none());
    }

    #[tokio::test]
    async fn test_null_content_is_empty_string() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": null}}]
            })))
            .mount(&mock_server)
            .await;

        let config = make_config("key", Some(&mock_server.uri()));
        let provider = ChatCompletionsProvider::new(&config, &ZHIPU);
        assert_eq!(
            provider.generate("q", &TextOptions::default()).await.unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn test_stream_concatenates_deltas() {
        let mock_server = MockServer::start().await;

        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Quantum \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"bits.\"}}]}\n\n",
            "data: [DONE]\n\n"
        );
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = make_config("key", Some(&mock_server.uri()));
        let provider = ChatCompletionsProvider::new(&config, &THIRTYTWO);
        let options = TextOptions {
            stream: true,
            ..Default::default()
        };
        assert_eq!(
            provider.generate("explain", &options).await.unwrap(),
            "Quantum bits."
        );
    }

    #[tokio::test]
    async fn test_api_error_is_remote() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit exceeded", "type": "rate_limit_error"}
            })))
            .mount(&mock_server)
            .await;

        let config = make_config("key", Some(&mock_server.uri()));
        let provider = ChatCompletionsProvider::new(&config, &THIRTYTWO);
        let err = provider
            .generate("Hello", &TextOptions::default())
            .await
            .unwrap_err();

        match err {
            ProviderError::Remote { status, message, .. } => {
                assert_eq!(status, Some(429));
                assert!(message.contains("Rate limit exceeded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_network_error_keeps_source() {
        // Point to a port that's not listening
        let config = make_config("key", Some("http://127.0.0.1:1"));
        let provider = ChatCompletionsProvider::new(&config, &THIRTYTWO);

        let err = provider
            .generate("Hello", &TextOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_validation_before_network() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let config = make_config("key", Some(&mock_server.uri()));
        let provider = ChatCompletionsProvider::new(&config, &ZHIPU);
        let options = TextOptions {
            temperature: 3.5,
            ..Default::default()
        };
        let err = provider.generate("q", &options).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = provider
            .generate("", &TextOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let provider = ChatCompletionsProvider::new(&make_config("", None), &ZHIPU);
        let err = provider
            .generate("q", &TextOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
