use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use modeler_core::builder::{BuildError, SkippedStep};
use modeler_core::export::ExportError;
use modeler_core::plan::dxf::{self, DxfPlanError};
use modeler_core::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::AppState;

pub const SKIPPED_STEPS_HEADER: &str = "x-skipped-steps";
pub const SKIPPED_STEPS_DETAIL_HEADER: &str = "x-skipped-steps-detail";

const METHOD_NOT_ALLOWED_MESSAGE: &str =
    "Method Not Allowed. Please use a POST request with a JSON body.";

pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/modeler", post(build_model).fallback(method_not_allowed))
        .route("/api/parser", post(parse_drawing).fallback(method_not_allowed))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": modeler_core::version(),
    }))
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        METHOD_NOT_ALLOWED_MESSAGE,
    )
}

async fn build_model(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("build_model", %request_id, body_len = body.len());

    // Kernel work is CPU-bound; keep it off the async workers.
    let output = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        state.builder.build_from_slice(&body)
    })
    .await
    .map_err(|e| ApiError::Worker(e.to_string()))??;

    for skipped in &output.skipped {
        info!(%request_id, "skipped {}", skipped);
    }
    let detail = skip_detail(&output.skipped)?;

    let payload = output.payload;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, payload.content_type)
        .header(header::CONTENT_DISPOSITION, payload.content_disposition())
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(SKIPPED_STEPS_HEADER, output.skipped.len().to_string())
        .header(SKIPPED_STEPS_DETAIL_HEADER, detail)
        .body(Body::from(payload.bytes))
        .map_err(|e| ApiError::Worker(e.to_string()))
}

/// Skipped steps as a JSON array, e.g.
/// `[{"position":2,"reason":"missing_field","field":"depth"}]`.
/// Non-ASCII characters are written as `\uXXXX` escapes so the text is a
/// valid header value.
fn skip_detail(skipped: &[SkippedStep]) -> Result<HeaderValue, ApiError> {
    let json = serde_json::to_string(skipped).map_err(|e| ApiError::Worker(e.to_string()))?;

    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && !c.is_ascii_control() {
            escaped.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units).iter() {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    HeaderValue::from_str(&escaped).map_err(|e| ApiError::Worker(e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrawingUpload {
    file_name: String,
    /// Base64-encoded DXF file.
    file_content: String,
}

async fn parse_drawing(body: Bytes) -> Result<Json<Value>, ApiError> {
    let upload: DrawingUpload = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Upload(format!("expected {{ fileName, fileContent }}: {e}")))?;
    let bytes = STANDARD
        .decode(upload.file_content.trim())
        .map_err(|e| ApiError::Upload(format!("fileContent is not valid base64: {e}")))?;

    let span = info_span!("parse_drawing", file_name = %upload.file_name, len = bytes.len());
    let plan = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        dxf::plan_from_dxf(&bytes, &upload.file_name)
    })
    .await
    .map_err(|e| ApiError::Worker(e.to_string()))??;

    Ok(Json(plan))
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Drawing(#[from] DxfPlanError),

    #[error("invalid drawing upload: {0}")]
    Upload(String),

    #[error("build worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<&'static str>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Model(ModelError::Input(_)) => StatusCode::BAD_REQUEST,
            ApiError::Model(ModelError::Build(BuildError::Kernel { .. })) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Model(ModelError::Build(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Model(ModelError::Export(ExportError::EmptyGeometry { .. })) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Model(ModelError::Export(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::Drawing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, step) = match self {
            ApiError::Model(ModelError::Input(_)) => {
                ("Invalid or missing modeling_plan in request body.", None)
            }
            ApiError::Model(ModelError::Build(err)) => ("Failed to create 3D model.", err.step()),
            ApiError::Upload(_) => ("Invalid or missing fileName/fileContent in request body.", None),
            ApiError::Drawing(_) => ("Failed to read the drawing.", None),
            _ => ("Failed to create 3D model.", None),
        };
        ErrorBody {
            error,
            details: self.to_string(),
            step: step.map(|(position, _)| position),
            action: step.map(|(_, action)| action),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(%status, error = %self, "request failed");
        } else {
            info!(%status, error = %self, "request rejected");
        }

        let mut response = (status, Json(self.body())).into_response();
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        response
    }
}
