//! Caption service integration
//!
//! Provides a single `describe` contract over the captioning backends: the
//! Hugging Face Inference API (BLIP by default), OpenAI vision chat, Gemini
//! `generateContent`, and an in-process mock.

pub mod gemini;
pub mod huggingface;
pub mod mock;
pub mod openai;

pub use gemini::GeminiCaptionClient;
pub use huggingface::HuggingFaceCaptionClient;
pub use mock::MockCaptionClient;
pub use openai::OpenAiCaptionClient;

use crate::{Error, Result};
use async_trait::async_trait;

#[async_trait]
pub trait CaptionService: Send + Sync {
    /// Describe the subject of an encoded image in natural language.
    async fn describe(&self, image_bytes: &[u8], mime_type: &str) -> Result<String>;
}

/// Trim a provider caption and reject empty output.
pub(crate) fn clean_caption(raw: &str, provider: &str) -> Result<String> {
    let caption = raw.trim().trim_matches('"').trim();
    if caption.is_empty() {
        return Err(Error::AiProvider(format!(
            "{} returned an empty caption",
            provider
        )));
    }
    Ok(caption.to_string())
}
