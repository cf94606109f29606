//! Request and response bodies for the stylist API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_OCCASION: &str = "casual";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StylistResponse {
    pub response: String,
    pub image_description: String,
}

/// Outcome of reading a stylist request body.
#[derive(Debug, PartialEq)]
pub enum StylistRequest {
    /// No usable `image` field.
    MissingImage,
    Analyze { image: String, occasion: String },
}

impl StylistRequest {
    /// Interpret a parsed JSON body.
    ///
    /// Bodies that are `null`, not an object, or carry a null `image` count
    /// as missing. A non-string `image` is an error; a non-string or absent
    /// `occasion` falls back to `casual`.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let Some(body) = value.as_object() else {
            return Ok(StylistRequest::MissingImage);
        };

        let image = match body.get("image") {
            // `"image": null` counts as missing (400) rather than a processing failure.
            None | Some(Value::Null) => return Ok(StylistRequest::MissingImage),
            Some(Value::String(image)) => image.clone(),
            Some(other) => {
                return Err(format!(
                    "Field 'image' must be a string, got {}",
                    json_type_name(other)
                ))
            }
        };

        let occasion = body
            .get("occasion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_OCCASION)
            .to_string();

        Ok(StylistRequest::Analyze { image, occasion })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
