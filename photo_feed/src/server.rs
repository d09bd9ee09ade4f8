//! HTTP server exposing paginated views of the photo store.

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir};
use tracing::{info, instrument, warn};

use crate::{
    middleware::{
        create_cors_layer, panic_response, reject_bare_options_middleware,
        request_logging_middleware, security_headers_middleware,
    },
    query::{self, PageRequest, PageResult},
    refresh::{RefreshConfig, RefreshWorker},
    settings::Settings,
    source::HttpPhotoSource,
    store::PhotoStore,
};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PhotoStore>,
    pub settings: Settings,
}

/// The `{status, message, data}` wrapper every response body uses.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: &'static str,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: "OK",
            data,
        }
    }
}

impl Envelope<Value> {
    /// Error envelope with an empty `data` object.
    pub fn error(status: StatusCode) -> Self {
        Self {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Error"),
            data: json!({}),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Create the HTTP router with all endpoints and middleware
pub fn create_router(state: AppState) -> Router {
    let cors_layer = create_cors_layer(&state.settings.server);

    // Unsupported methods on /photos get the same 404 envelope as unknown paths
    let router = Router::new().route("/photos", get(list_photos).fallback(not_found));

    let router = match &state.settings.server.static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir)
                .call_fallback_on_method_not_allowed(true)
                .not_found_service(not_found.into_service()),
        ),
        None => router.fallback(not_found),
    };

    let router = router
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response));

    let router = match cors_layer {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router
        .layer(middleware::from_fn(reject_bare_options_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_logging_middleware))
}

/// `GET /photos?limit=&page=&orderBy=field:direction`
#[instrument(skip_all)]
async fn list_photos(
    State(state): State<AppState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Envelope<PageResult> {
    // A query string that does not decode is treated like an empty one
    let pairs = params.map(|Query(pairs)| pairs).unwrap_or_default();
    let request = PageRequest::from_pairs(&pairs);

    let snapshot = state.store.snapshot();
    Envelope::ok(query::query(&snapshot, &request))
}

async fn not_found() -> Envelope<Value> {
    Envelope::error(StatusCode::NOT_FOUND)
}

/// Start the refresh worker and HTTP server, and wait for a shutdown signal
pub async fn serve(settings: &Settings) -> Result<()> {
    let addr = settings.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    run(listener, settings.clone(), wait_for_shutdown()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// The refresh schedule starts before the first request is accepted and is
/// cancelled once the server has drained.
pub async fn run<F>(listener: TcpListener, settings: Settings, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = Arc::new(PhotoStore::new());
    let source = HttpPhotoSource::new(
        settings.refresh.source_url.clone(),
        Duration::from_secs(settings.refresh.timeout_seconds),
    )?;
    let refresh = RefreshWorker::new(
        store.clone(),
        Arc::new(source),
        RefreshConfig::from(&settings.refresh),
    )
    .spawn();

    let app = create_router(AppState { store, settings });

    info!("HTTP server listening on {}", listener.local_addr()?);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error");

    refresh.shutdown().await;
    info!("HTTP server shutdown complete");
    result
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), shutting down gracefully"),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Photo;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state(n: u64) -> AppState {
        let store = Arc::new(PhotoStore::new());
        store.merge((1..=n).map(|id| Photo::new(id).with_title(format!("photo {id:02}"))));
        AppState {
            store,
            settings: Settings::default(),
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_photos_envelope() {
        let (status, body) = get_json(create_router(test_state(3)), "/photos?limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], 200);
        assert_eq!(body["message"], "OK");
        assert_eq!(body["data"]["limit"], 2);
        assert_eq!(body["data"]["page"], 1);
        assert_eq!(body["data"]["total"], 3);
        assert_eq!(body["data"]["photos"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_envelope() {
        let (status, body) = get_json(create_router(test_state(1)), "/anything-else").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "status": 404, "message": "Not Found", "data": {} }));
    }

    #[tokio::test]
    async fn test_wrong_method_on_photos_is_404_envelope() {
        let response = create_router(test_state(1))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/photos")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn options_request(uri: &str, preflight: bool) -> Request<Body> {
        let mut builder = Request::builder().method("OPTIONS").uri(uri);
        if preflight {
            builder = builder
                .header("origin", "https://example.com")
                .header("access-control-request-method", "GET");
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_bare_options_is_404_envelope() {
        for uri in ["/anything-else", "/photos"] {
            let response = create_router(test_state(1))
                .oneshot(options_request(uri, false))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {uri}");
            assert_eq!(response.headers()["x-content-type-options"], "nosniff");

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body, json!({ "status": 404, "message": "Not Found", "data": {} }));
        }
    }

    #[tokio::test]
    async fn test_cors_preflight_is_answered_when_enabled() {
        let response = create_router(test_state(1))
            .oneshot(options_request("/photos", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_preflight_is_404_when_cors_disabled() {
        let mut state = test_state(1);
        state.settings.server.enable_cors = false;

        let response = create_router(state)
            .oneshot(options_request("/photos", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_carries_cors_header() {
        let response = create_router(test_state(1))
            .oneshot(
                Request::builder()
                    .uri("/photos")
                    .header("origin", "https://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_undecodable_query_falls_back_to_defaults() {
        let (status, body) = get_json(create_router(test_state(12)), "/photos?limit=%ZZ&page").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["limit"], 10);
        assert_eq!(body["data"]["page"], 1);
    }

    #[tokio::test]
    async fn test_static_dir_serves_index_without_shadowing_photos() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>photos</h1>").unwrap();

        let mut state = test_state(2);
        state.settings.server.static_dir = Some(dir.path().to_path_buf());
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, body) = get_json(app.clone(), "/photos").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 2);

        let (status, body) = get_json(app, "/missing.css").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Not Found");
    }
}
