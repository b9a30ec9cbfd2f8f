use crate::error::OcrError;
use crate::llm_client::LlmClient;
use crate::models::{AnalyzeResponse, ErrorDetail, ErrorResponse};
use crate::pipeline::{analyze_upload, reject_upload};
use crate::render::{PageContext, render_page};
use crate::session::{SessionId, SessionStore, attach_session};
use crate::upload::UploadedImage;
use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct AppState {
    pub llm_client: Arc<LlmClient>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    fn page_context(&self) -> PageContext<'_> {
        PageContext {
            backend: self.llm_client.backend_label(),
            model: self.llm_client.model(),
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(upload_page))
        .route("/api/analyze", post(analyze_api))
        .route("/api/result", get(result_api))
        .route("/api/session", axum::routing::delete(end_session))
        .route("/health", get(|| async { "OK" }))
        .layer(axum::middleware::from_fn(attach_session))
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Re-render from session state; never reaches the backend.
#[axum_macros::debug_handler]
pub async fn index(State(app_state): State<AppState>, Extension(session_id): Extension<SessionId>) -> Html<String> {
    let session = app_state.sessions.get_or_create(&session_id);
    let session = session.lock().await;
    Html(render_page(&app_state.page_context(), &session))
}

#[axum_macros::debug_handler]
pub async fn upload_page(
    State(app_state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    multipart: Multipart,
) -> Response {
    let upload = UploadedImage::from_multipart(multipart).await;

    let session = app_state.sessions.get_or_create(&session_id);
    let mut session = session.lock().await;
    let status = match upload {
        Ok(image) => match analyze_upload(&mut session, image, &app_state.llm_client).await {
            Ok(_) => StatusCode::OK,
            Err(e) => e.status_code(),
        },
        Err(e) => {
            reject_upload(&mut session, &e);
            e.status_code()
        }
    };

    (status, Html(render_page(&app_state.page_context(), &session))).into_response()
}

#[axum_macros::debug_handler]
pub async fn analyze_api(
    State(app_state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, OcrError> {
    let image = UploadedImage::from_multipart(multipart).await?;

    let session = app_state.sessions.get_or_create(&session_id);
    let mut session = session.lock().await;
    let analysis = analyze_upload(&mut session, image, &app_state.llm_client).await?;
    info!("Analyzed '{}' (cached: {})", analysis.filename, analysis.cached);

    Ok(Json(AnalyzeResponse {
        filename: analysis.filename,
        markdown: analysis.result.markdown,
        cached: analysis.cached,
        model: analysis.result.model,
        backend: app_state.llm_client.backend_label().to_string(),
    }))
}

#[axum_macros::debug_handler]
pub async fn result_api(State(app_state): State<AppState>, Extension(session_id): Extension<SessionId>) -> Response {
    let session = app_state.sessions.get_or_create(&session_id);
    let session = session.lock().await;

    match (&session.last_uploaded_filename, &session.ocr_result) {
        (Some(filename), Some(result)) => Json(AnalyzeResponse {
            filename: filename.clone(),
            markdown: result.markdown.clone(),
            cached: true,
            model: result.model.clone(),
            backend: app_state.llm_client.backend_label().to_string(),
        })
        .into_response(),
        _ => {
            debug!("No result cached for session {}", session_id.0);
            let error_response = ErrorResponse {
                error: ErrorDetail {
                    message: "No image has been analyzed in this session".to_string(),
                    r#type: "invalid_request_error".to_string(),
                    code: Some("no_result".to_string()),
                },
            };
            (StatusCode::NOT_FOUND, Json(error_response)).into_response()
        }
    }
}

#[axum_macros::debug_handler]
pub async fn end_session(State(app_state): State<AppState>, Extension(session_id): Extension<SessionId>) -> StatusCode {
    if app_state.sessions.remove(&session_id) {
        info!("Session {} ended", session_id.0);
    }
    StatusCode::NO_CONTENT
}
