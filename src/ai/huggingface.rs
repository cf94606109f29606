//! Hugging Face Inference API caption client.
//!
//! Posts raw image bytes to an image-to-text model (BLIP by default). The
//! hosted model may still be loading when the first request arrives, in which
//! case the API answers `503` and the call is retried.

use super::{clean_caption, CaptionService};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";
const LOADING_RETRIES: usize = 3;

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

pub struct HuggingFaceCaptionClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    retry_interval: Duration,
}

impl HuggingFaceCaptionClient {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self::new_with_client(api_key, model, Client::new())
    }

    pub fn new_with_client(api_key: Option<String>, model: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            retry_interval: Duration::from_millis(2000),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[cfg(test)]
    fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    async fn request_caption(&self, image_bytes: &[u8], mime_type: &str) -> Result<String> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        let mut request = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Content-Type", mime_type)
            .body(image_bytes.to_vec());
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to send request to Hugging Face: {}", e);
            e
        })?;

        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Caption model {} is not ready yet: {}", self.model, body);
            return Err(Error::ModelUnavailable(format!(
                "{} is loading (status {}): {}",
                self.model, status, body
            )));
        }
        if !status.is_success() {
            let error_text = response.text().await?;
            tracing::error!("Hugging Face API error (status {}): {}", status, error_text);
            return Err(Error::AiProvider(format!(
                "Hugging Face API error (status {}): {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        let generated: Vec<GeneratedText> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Hugging Face response: {}\nBody: {}", e, body);
            Error::AiProvider(format!("Failed to parse Hugging Face response: {}", e))
        })?;

        let text = generated
            .first()
            .map(|g| g.generated_text.as_str())
            .ok_or_else(|| Error::AiProvider("No caption in Hugging Face response".to_string()))?;

        clean_caption(text, "Hugging Face")
    }
}

#[async_trait]
impl CaptionService for HuggingFaceCaptionClient {
    async fn describe(&self, image_bytes: &[u8], mime_type: &str) -> Result<String> {
        tracing::debug!(
            "Captioning image ({} bytes) via Hugging Face model {}",
            image_bytes.len(),
            self.model
        );

        let strategy = FixedInterval::new(self.retry_interval).take(LOADING_RETRIES);
        RetryIf::spawn(
            strategy,
            || self.request_caption(image_bytes, mime_type),
            |e: &Error| matches!(e, Error::ModelUnavailable(_)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "Salesforce/blip-image-captioning-base";

    fn client(server: &MockServer, api_key: Option<&str>) -> HuggingFaceCaptionClient {
        HuggingFaceCaptionClient::new(api_key.map(str::to_string), MODEL.to_string())
            .with_base_url(server.uri())
            .with_retry_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_describe_returns_generated_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/models/{}", MODEL)))
            .and(header("authorization", "Bearer hf-test"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "generated_text": "a man in a suit and tie " }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let caption = client(&server, Some("hf-test"))
            .describe(&[0x89, 0x50, 0x4E, 0x47], "image/png")
            .await
            .unwrap();
        assert_eq!(caption, "a man in a suit and tie");
    }

    #[tokio::test]
    async fn test_describe_forwards_mime_type() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("content-type", "image/jpeg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "generated_text": "a woman in a blazer" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let caption = client(&server, None)
            .describe(&[0xFF, 0xD8, 0xFF], "image/jpeg")
            .await
            .unwrap();
        assert_eq!(caption, "a woman in a blazer");
    }

    #[tokio::test]
    async fn test_describe_retries_while_model_loads() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/models/{}", MODEL)))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": "Model is currently loading",
                "estimated_time": 20.0
            })))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(format!("/models/{}", MODEL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "generated_text": "a woman in athletic shorts" }
            ])))
            .mount(&server)
            .await;

        let caption = client(&server, None).describe(&[0x89, 0x50], "image/png").await.unwrap();
        assert_eq!(caption, "a woman in athletic shorts");
    }

    #[tokio::test]
    async fn test_describe_gives_up_after_retries() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading"))
            .expect(1 + LOADING_RETRIES as u64)
            .mount(&server)
            .await;

        let err = client(&server, None).describe(&[0x89, 0x50], "image/png").await.unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad image"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, None).describe(&[0x00], "image/png").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
        assert!(err.to_string().contains("bad image"));
    }

    #[tokio::test]
    async fn test_empty_response_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let err = client(&server, None).describe(&[0x89, 0x50], "image/png").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }
}
