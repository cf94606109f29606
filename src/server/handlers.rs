//! HTTP handlers for the stylist API.

use std::fmt::Display;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::advice::AdviceSelector;
use crate::ai::CaptionService;
use crate::image::ImageDecoder;
use crate::Result;

use super::dto::{ErrorResponse, StatusResponse, StylistRequest, StylistResponse};

pub const STATUS_MESSAGE: &str = "Reese AI Server is running!";
pub const MISSING_IMAGE_MESSAGE: &str = "No image provided";
pub const GENERIC_ERROR_MESSAGE: &str = "Internal server error";

// ════════════════════════════════════════════════════════════════════════════════
// Error Type
// ════════════════════════════════════════════════════════════════════════════════

/// Stylist API error that implements IntoResponse.
#[derive(Debug, PartialEq)]
pub enum ApiError {
    MissingImage,
    Processing(String),
    /// Body could not be read, e.g. it exceeds the configured limit.
    Rejected { status: StatusCode, message: String },
}

impl ApiError {
    fn processing(request_id: Uuid, err: impl Display, expose_details: bool) -> Self {
        error!(%request_id, "Stylist request failed: {}", err);
        if expose_details {
            ApiError::Processing(err.to_string())
        } else {
            ApiError::Processing(GENERIC_ERROR_MESSAGE.to_string())
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::MissingImage => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(MISSING_IMAGE_MESSAGE),
            ),
            ApiError::Processing(msg) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(msg)),
            ApiError::Rejected { status, message } => (status, ErrorResponse::new(message)),
        };
        (status, Json(error)).into_response()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Read-only state built once at startup and shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub caption: Arc<dyn CaptionService>,
    pub advice: Arc<AdviceSelector>,
    pub decoder: Arc<ImageDecoder>,
    pub expose_error_details: bool,
}

impl AppState {
    /// Decode, caption and advise for one upload.
    async fn analyze(&self, image: &str, occasion: &str) -> Result<StylistResponse> {
        let decoded = self.decoder.decode(image).await?;
        debug!(
            "Decoded upload to {}x{} {}",
            decoded.width,
            decoded.height,
            decoded.mime_type()
        );
        let description = self
            .caption
            .describe(&decoded.bytes, decoded.mime_type())
            .await?;
        let response = self.advice.advise(&description, occasion);

        Ok(StylistResponse {
            response,
            image_description: description,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: STATUS_MESSAGE.to_string(),
    })
}

/// Answers bare `OPTIONS` requests that the CORS layer does not intercept.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn stylist(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> std::result::Result<Json<StylistResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let expose = state.expose_error_details;

    let body = body.map_err(|rejection| {
        warn!(%request_id, "Rejected stylist request body: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;

    // An empty body is treated like a body without `image` (400), not as a
    // JSON parse failure (500).
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::processing(request_id, crate::Error::from(e), expose))?
    };

    let (image, occasion) = match StylistRequest::from_value(&value) {
        Ok(StylistRequest::Analyze { image, occasion }) => (image, occasion),
        Ok(StylistRequest::MissingImage) => {
            warn!(%request_id, "Stylist request without image");
            return Err(ApiError::MissingImage);
        }
        Err(msg) => return Err(ApiError::processing(request_id, msg, expose)),
    };

    info!(
        %request_id,
        %occasion,
        payload_len = image.len(),
        "Analyzing outfit"
    );

    let response = state
        .analyze(&image, &occasion)
        .await
        .map_err(|e| ApiError::processing(request_id, e, expose))?;

    info!(
        %request_id,
        description = %response.image_description,
        "Generated advice"
    );

    Ok(Json(response))
}
