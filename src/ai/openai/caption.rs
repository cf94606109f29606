use super::client::OpenAiHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage, ChatMessageContent, MessagePart};
use crate::ai::{clean_caption, CaptionService};
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct OpenAiCaptionClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiCaptionClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: OpenAiHttpClient::new_with_client(api_key, Duration::from_secs(30), client),
            model,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn build_request(&self, image_bytes: &[u8], mime_type: &str) -> ChatCompletionRequest {
        use base64::Engine as _;
        let base64_image = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let data_url = format!("data:{};base64,{}", mime_type, base64_image);

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(ChatMessageContent::Text(
                        prompts::CAPTION_SYSTEM.trim().to_string(),
                    )),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(ChatMessageContent::Parts(vec![
                        MessagePart::text(prompts::CAPTION_USER.trim()),
                        MessagePart::image(data_url),
                    ])),
                },
            ],
            max_completion_tokens: 100,
        }
    }
}

#[async_trait]
impl CaptionService for OpenAiCaptionClient {
    async fn describe(&self, image_bytes: &[u8], mime_type: &str) -> Result<String> {
        tracing::debug!(
            "Captioning image ({} bytes) via OpenAI model {}",
            image_bytes.len(),
            self.model
        );

        let response = self
            .http
            .chat_completion(&self.build_request(image_bytes, mime_type))
            .await?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| Error::AiProvider("No response from OpenAI".to_string()))?;

        if let Some(reason) = &choice.finish_reason {
            if reason != "stop" {
                tracing::warn!("OpenAI caption finished with reason '{}'", reason);
            }
        }

        match &choice.message.content {
            Some(ChatMessageContent::Text(text)) => clean_caption(text, "OpenAI"),
            _ => Err(Error::AiProvider(
                "OpenAI response contained no caption text".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_describe_sends_image_part() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_string_contains("\"image_url\""))
            .and(body_string_contains("data:image/png;base64,"))
            .and(body_string_contains("\"model\":\"gpt-4o-mini\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "a man wearing a navy blazer." },
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiCaptionClient::new("sk-test".to_string(), "gpt-4o-mini".to_string())
            .with_base_url(server.uri());

        let caption = client.describe(&[0x89, 0x50, 0x4E, 0x47], "image/png").await.unwrap();
        assert_eq!(caption, "a man wearing a navy blazer.");
    }

    #[tokio::test]
    async fn test_api_error_returns_ai_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = OpenAiCaptionClient::new("bad".to_string(), "gpt-4o-mini".to_string())
            .with_base_url(server.uri());

        let err = client.describe(&[0x89, 0x50], "image/png").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_no_choices_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let client = OpenAiCaptionClient::new("k".to_string(), "gpt-4o-mini".to_string())
            .with_base_url(server.uri());

        assert!(client.describe(&[0x89, 0x50], "image/png").await.is_err());
    }
}
