//! HTTP plumbing shared by all vendor clients.

use std::time::Duration;

use musegen_core::utils::truncate_string;
use reqwest::Response;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::{ProviderError, Result};

/// Upper bound on a single artifact download.
pub(crate) const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Error bodies are cut to this many characters before they reach an error.
const MAX_ERROR_BODY: usize = 500;

/// Turn a non-2xx response into a [`ProviderError::Remote`] carrying the
/// status and (truncated) body.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    Err(ProviderError::http_status(
        status.as_u16(),
        truncate_string(&body, MAX_ERROR_BODY),
    ))
}

/// Fetch an artifact URL and return the body verbatim.
pub(crate) async fn download(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    debug!(url = %url, "downloading artifact");

    let response = client.get(url).timeout(DOWNLOAD_TIMEOUT).send().await?;
    let response = ensure_success(response).await.inspect_err(|e| {
        error!(url = %url, error = %e, "artifact download failed");
    })?;

    let bytes = response.bytes().await?;
    debug!(url = %url, bytes = bytes.len(), "artifact downloaded");
    Ok(bytes.to_vec())
}

/// Merge vendor extras into a JSON object body. Extras win on conflicts.
pub(crate) fn merge_extra(body: &mut Value, extra: &Map<String, Value>) {
    if let Value::Object(map) = body {
        for (key, value) in extra {
            map.insert(key.clone(), value.clone());
        }
    }
}

/// Reject an empty prompt before any network call.
pub(crate) fn require_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(ProviderError::Validation("prompt is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_merge_extra_overrides() {
        let mut body = json!({"prompt": "a", "duration": 5});
        let mut extra = Map::new();
        extra.insert("duration".into(), json!(10));
        extra.insert("camera_control".into(), json!({"type": "simple"}));

        merge_extra(&mut body, &extra);

        assert_eq!(body["duration"], 10);
        assert_eq!(body["camera_control"]["type"], "simple");
        assert_eq!(body["prompt"], "a");
    }

    #[test]
    fn test_require_prompt() {
        assert!(require_prompt("a cat").is_ok());
        assert!(matches!(
            require_prompt("   "),
            Err(ProviderError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_download_returns_body_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 1, 2, 255]))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let bytes = download(&client, &format!("{}/video.mp4", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![0u8, 1, 2, 255]);
    }

    #[tokio::test]
    async fn test_download_non_success_is_remote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("expired"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = download(&client, &format!("{}/gone.mp4", server.uri()))
            .await
            .unwrap_err();
        match err {
            ProviderError::Remote { status, message, .. } => {
                assert_eq!(status, Some(403));
                assert_eq!(message, "expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
