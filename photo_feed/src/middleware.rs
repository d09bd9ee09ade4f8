//! HTTP middleware: CORS, security headers, request logging and panic isolation.

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::time::Instant;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tracing::{debug, error, warn};

use crate::server::Envelope;
use crate::settings::ServerSettings;

/// Create CORS layer from server configuration, or `None` when CORS is disabled
pub fn create_cors_layer(config: &ServerSettings) -> Option<CorsLayer> {
    if !config.enable_cors {
        return None;
    }

    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE]);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return Some(cors.allow_origin(AnyOrigin));
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    Some(cors.allow_origin(origins))
}

/// Answer an `OPTIONS` request that is not a CORS preflight with the 404 envelope.
///
/// `CorsLayer` treats every `OPTIONS` request as a preflight, so this has to
/// sit outside it.
pub async fn reject_bare_options_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS
        && !request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
    {
        return Envelope::error(StatusCode::NOT_FOUND).into_response();
    }

    next.run(request).await
}

/// Security headers middleware
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("strict-origin-when-cross-origin"));

    response
}

/// Log every request with its status and latency
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        warn!(%method, %uri, status = status.as_u16(), elapsed_ms, "Request failed");
    } else {
        debug!(%method, %uri, status = status.as_u16(), elapsed_ms, "Request served");
    }

    response
}

/// Turn a handler panic into a 500 envelope so the listener keeps serving.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!("Handler panicked: {}", detail);

    Envelope::error(StatusCode::INTERNAL_SERVER_ERROR).into_response()
}
