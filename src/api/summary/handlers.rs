use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::api::summary::client::{ModelError, VisionModel};
use crate::api::summary::models::{
    SummaryApiError, SummaryRequest, SummaryResponse, WHITEBOARD_PROMPT,
};
use crate::metrics::METRICS;

/// Summary API state
#[derive(Clone)]
pub struct SummaryState {
    pub model: Arc<dyn VisionModel>,
}

impl SummaryState {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }
}

/// Summary endpoint failures
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("Missing imageUrl")]
    MissingImageUrl,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Model invocation failed: {0}")]
    Model(#[from] ModelError),
}

impl IntoResponse for SummaryError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingImageUrl => (
                StatusCode::BAD_REQUEST,
                Json(SummaryApiError::new(self.to_string())),
            )
                .into_response(),
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(SummaryApiError::new(self.to_string())),
            )
                .into_response(),
            // The model error stays in the server log
            Self::Model(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SummaryResponse::unavailable()),
            )
                .into_response(),
        }
    }
}

/// Summarize a whiteboard photo
///
/// POST /api/summarize
pub async fn summarize(
    State(state): State<SummaryState>,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();

    let response = run_summary(&state, payload).await.into_response();

    METRICS.record_request("summarize", response.status().as_u16(), start.elapsed());
    response
}

async fn run_summary(
    state: &SummaryState,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>, SummaryError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(SummaryError::PayloadTooLarge);
        }
        Err(rejection) => {
            debug!("Unreadable summary request body: {}", rejection);
            SummaryRequest::default()
        }
    };

    let image_url = request.image_url().ok_or(SummaryError::MissingImageUrl)?;

    info!("Summary request: image reference of {} bytes", image_url.len());

    match state.model.describe(WHITEBOARD_PROMPT, image_url).await {
        Ok(summary) => Ok(Json(SummaryResponse { summary })),
        Err(e) => {
            error!("Summary generation failed: {}", e);
            Err(SummaryError::Model(e))
        }
    }
}
