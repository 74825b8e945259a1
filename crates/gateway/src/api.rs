//! JSON API used by the browser chat page.
//!
//! - `POST /api/chat`    run one conversation turn
//! - `POST /api/tts`     speak arbitrary text
//! - `GET  /api/history` read the current session

use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use murmur_agent::SubmitOptions;
use murmur_core::Error;
use murmur_core::message::Role;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

const NO_PROMPT: &str = "No prompt provided";
const NO_TEXT: &str = "No text provided";

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/tts", post(tts_handler))
        .route("/api/history", get(history_handler))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// --- Chat ---

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
    /// Voice the reply on the server's speaker
    #[serde(default)]
    pub speak: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(reason = %rejection.body_text(), "Rejected chat request body");
        api_error(StatusCode::BAD_REQUEST, NO_PROMPT)
    })?;

    if request.prompt.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, NO_PROMPT));
    }

    info!(prompt_len = request.prompt.len(), speak = request.speak, "Chat request received");

    let options = SubmitOptions {
        speak: request.speak,
    };
    match state.engine.submit_with(&request.prompt, options).await {
        Ok(reply) => Ok(Json(ChatResponse {
            response: reply.text,
        })),
        Err(Error::EmptyInput) => Err(api_error(StatusCode::BAD_REQUEST, NO_PROMPT)),
        Err(Error::GenerationFailed(e)) => {
            Err(api_error(StatusCode::BAD_GATEWAY, e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "Chat turn failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// --- Speech ---

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TtsResponse {
    pub status: &'static str,
}

async fn tts_handler(
    State(state): State<AppState>,
    payload: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Json<TtsResponse>, ApiError> {
    let Json(request) = payload.map_err(|_| api_error(StatusCode::BAD_REQUEST, NO_TEXT))?;

    let text = request.text.trim();
    if text.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, NO_TEXT));
    }

    state.engine.speech().speak(text);
    Ok(Json(TtsResponse { status: "speaking" }))
}

// --- History ---

#[derive(Debug, Serialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<HistoryMessage>,
}

async fn history_handler(State(state): State<AppState>) -> Json<HistoryResponse> {
    let messages = state
        .engine
        .history_snapshot()
        .await
        .into_iter()
        .map(|u| HistoryMessage {
            role: u.role(),
            text: u.text().to_string(),
            timestamp: u.timestamp(),
        })
        .collect();

    Json(HistoryResponse { messages })
}
