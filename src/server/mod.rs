//! HTTP server setup and shared application state.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::error::Error;
use crate::registry::is_language_code;
use crate::translator::Translator;

/// Shared application state for the HTTP server.
pub struct AppState {
    translator: Arc<Translator>,
    is_ready: AtomicBool,
}

impl AppState {
    /// Create a new application state with readiness unset.
    pub fn new(translator: Arc<Translator>) -> Self {
        Self {
            translator,
            is_ready: AtomicBool::new(false),
        }
    }

    /// Mark the server as ready to accept requests.
    pub fn mark_ready(&self) {
        self.is_ready.store(true, Ordering::SeqCst);
    }

    /// Access the translator for downstream handlers.
    pub fn translator(&self) -> Arc<Translator> {
        self.translator.clone()
    }
}

/// Translation request body.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslateRequest {
    /// Text to translate.
    pub text: String,
    /// Source language code, e.g. `"en"`.
    pub from_lang: String,
    /// Target language code, e.g. `"de"`.
    pub to_lang: String,
}

/// Translation response body.
#[derive(Debug, Clone, Serialize)]
pub struct TranslateResponse {
    /// The translated text.
    pub translated_text: String,
}

/// Supported language pairs response body.
#[derive(Debug, Clone, Serialize)]
pub struct SupportedLanguagesResponse {
    /// Pair keys in catalog order, e.g. `["en-de", "de-en"]`.
    pub supported_languages: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

/// Build the HTTP router for the service.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/translate", post(translate))
        .route("/supported-languages", get(supported_languages))
        .route("/healthz", get(health))
        .route("/readyz", get(readiness))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the router until a shutdown signal arrives.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    tracing::info!("Translation server listening on http://{}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn translate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    validate_request(&request)?;

    let translated_text = state
        .translator()
        .translate(&request.from_lang, &request.to_lang, &request.text)
        .await?;

    Ok(Json(TranslateResponse { translated_text }))
}

async fn supported_languages(
    State(state): State<Arc<AppState>>,
) -> Json<SupportedLanguagesResponse> {
    Json(SupportedLanguagesResponse {
        supported_languages: state.translator().supported_pairs().keys(),
    })
}

/// Liveness probe endpoint.
async fn health() -> &'static str {
    "OK"
}

/// Readiness probe endpoint.
async fn readiness(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.is_ready.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Schema-level validation, mirroring the request model the service has
/// always exposed: non-blank text, two-letter (optionally region-suffixed)
/// lowercase language codes.
fn validate_request(request: &TranslateRequest) -> Result<(), Error> {
    if request.text.trim().is_empty() {
        return Err(Error::InvalidRequest("text must not be empty".to_string()));
    }
    if !is_language_code(&request.from_lang) {
        return Err(Error::InvalidRequest(format!(
            "invalid source language code: '{}'",
            request.from_lang
        )));
    }
    if !is_language_code(&request.to_lang) {
        return Err(Error::InvalidRequest(format!(
            "invalid target language code: '{}'",
            request.to_lang
        )));
    }
    Ok(())
}

/// Wrapper mapping service errors onto HTTP responses.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            warn!("Rejected request: {}", self.0);
            StatusCode::BAD_REQUEST
        } else {
            error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = Json(ErrorBody {
            detail: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

/// Wait for a shutdown signal.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LanguagePair;

    fn request(text: &str, from_lang: &str, to_lang: &str) -> TranslateRequest {
        TranslateRequest {
            text: text.to_string(),
            from_lang: from_lang.to_string(),
            to_lang: to_lang.to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_request() {
        assert!(validate_request(&request("Hello, how are you?", "en", "de")).is_ok());
        assert!(validate_request(&request("你好", "zh-cn", "en")).is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_text() {
        let err = validate_request(&request("   ", "en", "de")).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_validate_rejects_malformed_codes() {
        assert!(validate_request(&request("Hi", "english", "de")).is_err());
        assert!(validate_request(&request("Hi", "en", "DE")).is_err());
    }

    #[test]
    fn test_client_errors_map_to_400() {
        let response =
            ApiError(Error::UnsupportedPair(LanguagePair::new("xx", "yy"))).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError(Error::InvalidRequest("bad".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_server_errors_map_to_500() {
        let response = ApiError(Error::ModelUnavailable {
            pair: LanguagePair::new("en", "ja"),
            source: anyhow::anyhow!("offline"),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response =
            ApiError(Error::TranslationFailed(anyhow::anyhow!("decoder blew up"))).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
