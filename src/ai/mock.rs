use super::CaptionService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

pub const DEFAULT_MOCK_CAPTION: &str = "a person wearing a casual outfit";

pub struct MockCaptionClient {
    captions: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
    last_image: Arc<Mutex<Option<Vec<u8>>>>,
    last_mime_type: Arc<Mutex<Option<String>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockCaptionClient {
    pub fn new() -> Self {
        Self {
            captions: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            last_image: Arc::new(Mutex::new(None)),
            last_mime_type: Arc::new(Mutex::new(None)),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_caption(self, caption: String) -> Self {
        self.captions.lock().unwrap().push(caption);
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_image(&self) -> Option<Vec<u8>> {
        self.last_image.lock().unwrap().clone()
    }

    pub fn last_mime_type(&self) -> Option<String> {
        self.last_mime_type.lock().unwrap().clone()
    }
}

impl Default for MockCaptionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptionService for MockCaptionClient {
    async fn describe(&self, image_bytes: &[u8], mime_type: &str) -> Result<String> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        *self.last_image.lock().unwrap() = Some(image_bytes.to_vec());
        *self.last_mime_type.lock().unwrap() = Some(mime_type.to_string());

        if *self.should_fail.lock().unwrap() {
            return Err(Error::AiProvider("Mock caption failure".to_string()));
        }

        let captions = self.captions.lock().unwrap();
        if captions.is_empty() {
            Ok(DEFAULT_MOCK_CAPTION.to_string())
        } else {
            let index = (*count - 1) % captions.len();
            Ok(captions[index].clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_caption_default() {
        let client = MockCaptionClient::new();
        let caption = client.describe(&[0x89, 0x50], "image/png").await.unwrap();
        assert_eq!(caption, DEFAULT_MOCK_CAPTION);
        assert_eq!(client.last_image(), Some(vec![0x89, 0x50]));
        assert_eq!(client.last_mime_type().as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_mock_caption_cycles() {
        let client = MockCaptionClient::new()
            .with_caption("a man in a suit".to_string())
            .with_caption("a woman in sneakers".to_string());

        assert_eq!(client.describe(&[], "image/png").await.unwrap(), "a man in a suit");
        assert_eq!(client.describe(&[], "image/png").await.unwrap(), "a woman in sneakers");

        // Should cycle back
        assert_eq!(client.describe(&[], "image/png").await.unwrap(), "a man in a suit");
        assert_eq!(client.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_caption_failure() {
        let client = MockCaptionClient::new().with_failure(true);
        let err = client.describe(&[], "image/png").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
        assert_eq!(client.get_call_count(), 1);
    }
}
