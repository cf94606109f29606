//! Data models and configuration
//!
//! Defines the caption provider selection and the environment-driven
//! service configuration.

use crate::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Backend used to turn an image into a text description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionProvider {
    HuggingFace,
    OpenAi,
    Gemini,
    Mock,
}

impl CaptionProvider {
    pub fn default_model(self) -> &'static str {
        match self {
            CaptionProvider::HuggingFace => "Salesforce/blip-image-captioning-base",
            CaptionProvider::OpenAi => "gpt-4o-mini",
            CaptionProvider::Gemini => "gemini-2.0-flash",
            CaptionProvider::Mock => "mock",
        }
    }
}

impl FromStr for CaptionProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(CaptionProvider::HuggingFace),
            "openai" => Ok(CaptionProvider::OpenAi),
            "gemini" => Ok(CaptionProvider::Gemini),
            "mock" => Ok(CaptionProvider::Mock),
            other => Err(Error::Config(format!(
                "Unknown CAPTION_PROVIDER '{}'. Expected huggingface, openai, gemini or mock",
                other
            ))),
        }
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub caption_provider: CaptionProvider,
    pub caption_model: String,
    pub huggingface_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub advice_rules_path: Option<PathBuf>,
    pub advice_seed: Option<u64>,
    pub expose_error_details: bool,
    pub max_image_dimension: u32,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            caption_provider: CaptionProvider::HuggingFace,
            caption_model: CaptionProvider::HuggingFace.default_model().to_string(),
            huggingface_api_key: None,
            openai_api_key: None,
            gemini_api_key: None,
            advice_rules_path: None,
            advice_seed: None,
            expose_error_details: true,
            max_image_dimension: 1024,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from the process environment (after `.env`).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup, validating required keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let caption_provider = match var("CAPTION_PROVIDER") {
            Some(value) => value.parse()?,
            None => defaults.caption_provider,
        };

        let config = Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", var("PORT"))?.unwrap_or(defaults.port),
            caption_provider,
            caption_model: var("CAPTION_MODEL")
                .unwrap_or_else(|| caption_provider.default_model().to_string()),
            huggingface_api_key: var("HF_API_TOKEN"),
            openai_api_key: var("OPENAI_API_KEY"),
            gemini_api_key: var("GEMINI_API_KEY"),
            advice_rules_path: var("ADVICE_RULES_PATH").map(PathBuf::from),
            advice_seed: parse_var("ADVICE_SEED", var("ADVICE_SEED"))?,
            expose_error_details: parse_bool("EXPOSE_ERROR_DETAILS", var("EXPOSE_ERROR_DETAILS"))?
                .unwrap_or(defaults.expose_error_details),
            max_image_dimension: parse_var("MAX_IMAGE_DIMENSION", var("MAX_IMAGE_DIMENSION"))?
                .unwrap_or(defaults.max_image_dimension),
            max_body_bytes: parse_var("MAX_BODY_BYTES", var("MAX_BODY_BYTES"))?
                .unwrap_or(defaults.max_body_bytes),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.caption_provider {
            CaptionProvider::OpenAi if self.openai_api_key.is_none() => {
                return Err(Error::Config(
                    "OPENAI_API_KEY is required when CAPTION_PROVIDER=openai".to_string(),
                ));
            }
            CaptionProvider::Gemini if self.gemini_api_key.is_none() => {
                return Err(Error::Config(
                    "GEMINI_API_KEY is required when CAPTION_PROVIDER=gemini".to_string(),
                ));
            }
            _ => {}
        }

        if self.port == 0 {
            return Err(Error::Config("PORT must be non-zero".to_string()));
        }
        if self.max_image_dimension == 0 {
            return Err(Error::Config(
                "MAX_IMAGE_DIMENSION must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|_| Error::Config(format!("Invalid value for {}: '{}'", key, v)))
        })
        .transpose()
}

fn parse_bool(key: &str, value: Option<String>) -> Result<Option<bool>> {
    value
        .map(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(Error::Config(format!("Invalid value for {}: '{}'", key, v))),
        })
        .transpose()
}
