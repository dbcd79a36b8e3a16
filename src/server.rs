//! HTTP query server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/chat` | Run the retrieval chain for one question |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `POST /api/chat` takes the question plus the prior turns as
//! `[question, answer]` pairs:
//!
//! ```json
//! { "question": "Who maintains it?", "history": [["What is Rust?", "A language."]] }
//! ```
//!
//! and answers with the chain output:
//!
//! ```json
//! { "text": "...", "sourceDocuments": [{ "id": "...", "score": 0.82, "pageContent": "...", "metadata": { ... } }] }
//! ```
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `query_failed` (500).

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::chain::ConversationalRetrievalChain;
use crate::config::Config;
use crate::error::RagError;
use crate::models::{ChainOutput, ChatTurn};

/// Binds to `[server].bind` and serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let chain = ConversationalRetrievalChain::from_config(config).await?;
    let app = router(Arc::new(chain));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("server listening on http://{}", listener.local_addr()?);
    tracing::info!(
        bind = %config.server.bind,
        namespace = %config.index.namespace,
        "server started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Routes with CORS open to all origins, methods and headers.
pub fn router(chain: Arc<ConversationalRetrievalChain>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(chain)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::EmptyQuestion => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "bad_request".to_string(),
                message: RagError::EmptyQuestion.to_string(),
            },
            other => {
                tracing::error!(error = %other.root_cause(), "chat request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "query_failed".to_string(),
                    message: format!("{}: {}", other, other.root_cause()),
                }
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/chat ============

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub history: Vec<(String, String)>,
}

async fn handle_chat(
    State(chain): State<Arc<ConversationalRetrievalChain>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChainOutput>, AppError> {
    let history: Vec<ChatTurn> = req.history.into_iter().map(ChatTurn::from).collect();
    let output = chain.call(&req.question, &history).await?;
    Ok(Json(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_accepts_pair_history() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"question": "and then?", "history": [["first?", "an answer"]]}"#,
        )
        .unwrap();
        assert_eq!(req.history.len(), 1);
        assert_eq!(ChatTurn::from(req.history[0].clone()).answer, "an answer");
    }

    #[test]
    fn chat_request_history_defaults_to_empty() {
        let req: ChatRequest = serde_json::from_str(r#"{"question": "q"}"#).unwrap();
        assert!(req.history.is_empty());
    }

    #[test]
    fn empty_question_maps_to_bad_request() {
        let err = AppError::from(RagError::EmptyQuestion);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");
    }

    #[test]
    fn query_failure_maps_to_500_with_cause() {
        let err = AppError::from(RagError::QueryFailed(Box::new(RagError::index("down"))));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("down"));
    }
}
