use crate::model::{GenerationEvent, GenerationLog};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderName, HeaderValue, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_embed::RustEmbed;
use slidesmith_core::{AiProvider, GenerationRequest, Pipeline, SlidesmithError};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Response header carrying the id to look up under `/api/generations/:id`.
pub const GENERATION_ID_HEADER: HeaderName = HeaderName::from_static("x-generation-id");

#[derive(RustEmbed)]
#[folder = "ui/"]
struct Assets;

/// Shared handler state.
pub struct AppState<P: AiProvider> {
    pub pipeline: Arc<Pipeline<P>>,
    pub log: GenerationLog,
}

impl<P: AiProvider> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            log: self.log.clone(),
        }
    }
}

pub struct SlidesmithServer<P: AiProvider> {
    state: AppState<P>,
}

impl<P: AiProvider + 'static> SlidesmithServer<P> {
    /// Wrap a pipeline; its generations are recorded in a fresh log.
    pub fn new(pipeline: Pipeline<P>) -> Self {
        let log = GenerationLog::new();
        let pipeline = pipeline.with_observer(Arc::new(log.clone()));
        Self {
            state: AppState {
                pipeline: Arc::new(pipeline),
                log,
            },
        }
    }

    pub fn log(&self) -> &GenerationLog {
        &self.state.log
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/generate", post(generate::<P>))
            .route("/api/settings", get(settings::<P>))
            .route("/api/generations", get(list_generations::<P>))
            .route("/api/generations/:id", get(get_generation::<P>))
            .route("/health", get(health))
            .fallback(static_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    pub async fn start(self, addr: SocketAddr) -> std::io::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Slidesmith available at http://{}", listener.local_addr()?);
        axum::serve(listener, app).await
    }
}

/// JSON error body with a status chosen by error category.
pub struct ApiError(pub SlidesmithError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            e if e.is_user_error() => StatusCode::BAD_REQUEST,
            SlidesmithError::NetworkError(_)
            | SlidesmithError::ProviderError(_)
            | SlidesmithError::EmptyResponse
            | SlidesmithError::Validation(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Generation failed: {}", self.0);
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<SlidesmithError> for ApiError {
    fn from(e: SlidesmithError) -> Self {
        Self(e)
    }
}

async fn generate<P: AiProvider + 'static>(
    State(state): State<AppState<P>>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Response {
    let id = Uuid::new_v4();
    let mut response = match payload {
        Ok(Json(request)) => match state.pipeline.run_as(id, request).await {
            Ok(artifact) => (
                [
                    (header::CONTENT_TYPE, artifact.mime_type().to_string()),
                    (header::CONTENT_DISPOSITION, artifact.content_disposition()),
                ],
                artifact.bytes,
            )
                .into_response(),
            Err(e) => ApiError(e).into_response(),
        },
        Err(rejection) => ApiError(SlidesmithError::InvalidRequest(rejection.body_text())).into_response(),
    };

    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(GENERATION_ID_HEADER, value);
    }
    response
}

/// Limits the form needs to mirror the server.
async fn settings<P: AiProvider + 'static>(State(state): State<AppState<P>>) -> Json<serde_json::Value> {
    let config = state.pipeline.config();
    Json(serde_json::json!({
        "max_slides": config.max_slides,
        "default_mode": config.mode,
    }))
}

async fn list_generations<P: AiProvider + 'static>(
    State(state): State<AppState<P>>,
) -> Json<Vec<GenerationEvent>> {
    Json(state.log.list())
}

async fn get_generation<P: AiProvider + 'static>(
    Path(id): Path<String>,
    State(state): State<AppState<P>>,
) -> Result<Json<GenerationEvent>, StatusCode> {
    state.log.get(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn static_handler(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');

    if path.is_empty() || path == "index.html" {
        return index_html().await;
    }

    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

async fn index_html() -> Response {
    match Assets::get("index.html") {
        Some(content) => Html(content.data).into_response(),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use slidesmith_core::{MockProvider, SlidesmithConfig, PPTX_MIME};
    use tower::ServiceExt;

    const TWO_SLIDES: &str = r#"{"slides": [
        {"layout": "title", "title": "Cats"},
        {"layout": "content", "title": "Care", "bullets": [{"text": "Food"}]}
    ]}"#;

    fn server(provider: MockProvider, work_dir: &std::path::Path) -> SlidesmithServer<MockProvider> {
        let config = SlidesmithConfig::default().with_work_dir(work_dir).with_syntax_check(false);
        SlidesmithServer::new(Pipeline::new(provider, config).unwrap())
    }

    fn post_json(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_form_is_served() {
        let dir = tempfile::tempdir().unwrap();
        let app = server(MockProvider::new(), dir.path()).router();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8_lossy(&bytes);
        assert!(html.contains("content_description"));
        assert!(html.contains("type=\"password\""));
    }

    #[tokio::test]
    async fn test_generate_returns_pptx() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(MockProvider::new().with_reply(TWO_SLIDES), dir.path());
        let app = server.router();

        let response = app
            .oneshot(post_json(serde_json::json!({
                "slide_count": 2,
                "background_color": "#336699",
                "content_description": "Intro to cats",
                "api_key": "sk-form"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], PPTX_MIME);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"generated_presentation.pptx\""
        );
        let id = response.headers()[GENERATION_ID_HEADER].to_str().unwrap().to_string();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let events = server.log().list();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, id);
        assert_eq!(events[0].status, crate::EventStatus::Success);

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/generations/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "Success");
    }

    #[tokio::test]
    async fn test_missing_credential_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(MockProvider::new().with_reply(TWO_SLIDES), dir.path());

        let response = server
            .router()
            .oneshot(post_json(serde_json::json!({
                "slide_count": 2,
                "background_color": "#336699",
                "content_description": "Intro to cats",
                "api_key": ""
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("Please provide an OpenAI API key"));
        assert!(server.state.pipeline.provider().calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = server(MockProvider::new(), dir.path()).router();

        let response = app
            .oneshot(post_json(serde_json::json!({
                "slide_count": 2,
                "background_color": "blue",
                "content_description": "Intro to cats"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_model_fault_is_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let app = server(MockProvider::new().with_reply("not a deck"), dir.path()).router();

        let response = app
            .oneshot(post_json(serde_json::json!({
                "slide_count": 2,
                "background_color": "#336699",
                "content_description": "Intro to cats",
                "api_key": "sk-form"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().contains_key(GENERATION_ID_HEADER));
    }

    #[tokio::test]
    async fn test_settings_follow_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SlidesmithConfig::default().with_work_dir(dir.path()).with_syntax_check(false);
        config.max_slides = 8;
        let app = SlidesmithServer::new(Pipeline::new(MockProvider::new(), config).unwrap()).router();

        let response = app
            .oneshot(Request::builder().uri("/api/settings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["max_slides"], 8);
        assert_eq!(body["default_mode"], "structured");
    }

    #[tokio::test]
    async fn test_generation_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let app = server(MockProvider::new(), dir.path()).router();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/generations/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["status"], "ok");
    }
}
