use super::client::GeminiHttpClient;
use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};
use crate::ai::{clean_caption, CaptionService};
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct GeminiCaptionClient {
    http: GeminiHttpClient,
}

impl GeminiCaptionClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(
                api_key,
                model,
                Duration::from_secs(30),
                client,
            ),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl CaptionService for GeminiCaptionClient {
    async fn describe(&self, image_bytes: &[u8], mime_type: &str) -> Result<String> {
        tracing::debug!(
            "Captioning image ({} bytes) via Gemini model {}",
            image_bytes.len(),
            self.http.model()
        );

        use base64::Engine as _;
        let base64_image = base64::engine::general_purpose::STANDARD.encode(image_bytes);

        let request = GenerateContentRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::Text {
                    text: prompts::CAPTION_SYSTEM.trim().to_string(),
                }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: base64_image,
                        },
                    },
                    Part::Text {
                        text: prompts::CAPTION_USER.trim().to_string(),
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(100),
            }),
        };

        let response: GenerateContentResponse = self.http.generate_content(&request).await?;
        let text = response
            .first_text()
            .ok_or_else(|| Error::AiProvider("No caption in Gemini response".to_string()))?;

        clean_caption(text, "Gemini")
    }
}
