use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use snippet_exec::{Dispatcher, ExecutionRequest, ExecutorConfig, LanguageInfo, ResultEnvelope};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Method name the bridge accepts on `/invoke`
pub const EXECUTE_METHOD: &str = "executeCode";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Method not implemented: {0}")]
    NotImplemented(String),
    #[error("Setup error: {0}")]
    Setup(#[from] snippet_exec::Error),
    #[error("Server error: {0}")]
    ServerError(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::NotImplemented(_) => {
                (StatusCode::NOT_IMPLEMENTED, "not implemented".to_string())
            }
            ServerError::Setup(_) | ServerError::ServerError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// A method call as sent by the client shell
#[derive(Debug, Deserialize, Serialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: ExecutionRequest,
}

#[derive(Clone)]
pub struct AppState {
    dispatcher: Dispatcher,
}

pub fn create_app(config: &ExecutorConfig) -> Result<Router, ServerError> {
    let dispatcher = Dispatcher::from_config(config)?;
    Ok(router(dispatcher))
}

pub fn router(dispatcher: Dispatcher) -> Router {
    let state = AppState { dispatcher };

    Router::new()
        .route("/health", get(health_check))
        .route("/languages", get(languages))
        .route("/execute", post(execute))
        .route("/invoke", post(invoke))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    info!("Starting snippet execution server on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn languages(State(state): State<AppState>) -> Json<Vec<LanguageInfo>> {
    Json(state.dispatcher.languages().to_vec())
}

async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ExecutionRequest>,
) -> Json<ResultEnvelope> {
    Json(state.dispatcher.handle(request).await)
}

async fn invoke(
    State(state): State<AppState>,
    Json(call): Json<MethodCall>,
) -> Result<Json<ResultEnvelope>, ServerError> {
    if call.method != EXECUTE_METHOD {
        warn!("Unknown bridge method: {}", call.method);
        return Err(ServerError::NotImplemented(call.method));
    }
    Ok(Json(state.dispatcher.handle(call.arguments).await))
}
