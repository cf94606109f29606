use crate::{Error, Result};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

const DATA_URL_MARKER: &str = "base64,";

// Clients are inconsistent about padding, so accept it either way.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Normalized image ready for captioning.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// RGB8 PNG encoding of the upload.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    pub fn mime_type(&self) -> &'static str {
        ImageFormat::Png.to_mime_type()
    }
}

pub struct ImageDecoder {
    max_dimension: u32,
}

impl ImageDecoder {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    /// Drop a `data:<mime>;base64,` prefix when present.
    pub fn strip_data_url(payload: &str) -> &str {
        match payload.split_once(DATA_URL_MARKER) {
            Some((_, data)) => data,
            None => payload,
        }
    }

    /// Base64-decode an upload payload, ignoring embedded whitespace.
    pub fn decode_base64(payload: &str) -> Result<Vec<u8>> {
        let data = Self::strip_data_url(payload);
        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        Ok(LENIENT_STANDARD.decode(compact)?)
    }

    fn normalize_sync(bytes: Vec<u8>, max_dimension: u32) -> Result<DecodedImage> {
        let img = image::load_from_memory(&bytes)?;

        let img = if img.width() > max_dimension || img.height() > max_dimension {
            tracing::debug!(
                "Downscaling {}x{} upload to fit {}px",
                img.width(),
                img.height(),
                max_dimension
            );
            img.resize(
                max_dimension,
                max_dimension,
                image::imageops::FilterType::Lanczos3,
            )
        } else {
            img
        };

        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut encoded = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)?;

        Ok(DecodedImage {
            bytes: encoded,
            width: rgb.width(),
            height: rgb.height(),
        })
    }

    /// Decode a client payload into a normalized RGB PNG.
    pub async fn decode(&self, payload: &str) -> Result<DecodedImage> {
        let raw = Self::decode_base64(payload)?;
        tracing::debug!("Decoded {} bytes of image data", raw.len());

        let max_dimension = self.max_dimension;
        tokio::task::spawn_blocking(move || Self::normalize_sync(raw, max_dimension))
            .await
            .map_err(|e| Error::Invariant(format!("Image decoding task join error: {}", e)))?
    }
}
