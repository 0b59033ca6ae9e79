//! HTTP request handlers

use super::sse::{turn_stream, TurnEnd};
use super::types::{
    CancelResponse, ErrorResponse, HistoryResponse, ToolsResponse, TurnDoneResponse, TurnRequest,
};
use super::AppState;
use crate::multiplexer::FinalResult;
use crate::present::present;
use crate::runtime::{gather_context, StoreError, TurnHandle};
use crate::state_machine::{ChatMessage, TurnInput};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::oneshot;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Turns
        .route("/api/conversations/:id/turns", post(start_turn))
        .route("/api/conversations/:id/cancel", post(cancel_turn))
        // History
        .route("/api/conversations/:id/history", get(get_history))
        // Capabilities
        .route("/api/tools", get(list_tools))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Turns
// ============================================================

async fn start_turn(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(req): Json<TurnRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = req.input.trim().to_string();
    if input.is_empty() {
        return Err(AppError::BadRequest("input must not be empty".to_string()));
    }

    let Some(cancel) = state.begin_turn(&conversation_id).await else {
        return Err(AppError::Conflict(
            "a turn is already running for this conversation".to_string(),
        ));
    };

    let history = match state.store.history(&conversation_id).await {
        Ok(history) => history,
        Err(e) => {
            state.end_turn(&conversation_id).await;
            return Err(e.into());
        }
    };
    let context = gather_context(&state.context, &conversation_id, &input).await;
    let turn = context.apply(TurnInput::new(input.clone(), history));

    tracing::info!(conversation_id = %conversation_id, "Turn started");
    let TurnHandle { ui, result, .. } = state.runtime.run_turn_with_cancel(turn, cancel);

    // Persisting does not depend on the client staying connected
    let (end_tx, end_rx) = oneshot::channel();
    tokio::spawn(finish_turn(state, conversation_id, input, result, end_tx));

    Ok(turn_stream(ui, end_rx))
}

async fn finish_turn(
    state: AppState,
    conversation_id: String,
    input: String,
    result: FinalResult,
    end: oneshot::Sender<TurnEnd>,
) {
    let outcome = match result.await {
        Ok(final_payload) => {
            let text = final_payload.as_ref().and_then(present);
            if let Some(text) = &text {
                if let Err(e) = state
                    .store
                    .append_turn(
                        &conversation_id,
                        ChatMessage::user(input),
                        ChatMessage::assistant(text.as_str()),
                    )
                    .await
                {
                    tracing::error!(conversation_id = %conversation_id, error = %e, "Failed to persist turn");
                }
            }
            tracing::info!(conversation_id = %conversation_id, persisted = text.is_some(), "Turn finished");
            TurnEnd::Done(TurnDoneResponse {
                final_payload,
                text,
            })
        }
        Err(fault) => {
            tracing::warn!(conversation_id = %conversation_id, error = %fault, "Turn stream faulted");
            TurnEnd::Failed {
                message: fault.to_string(),
            }
        }
    };

    state.end_turn(&conversation_id).await;
    if end.send(outcome).is_err() {
        tracing::debug!(conversation_id = %conversation_id, "Client left before the turn ended");
    }
}

async fn cancel_turn(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    if state.cancel_turn(&conversation_id).await {
        tracing::info!(conversation_id = %conversation_id, "Turn cancellation requested");
        Ok(Json(CancelResponse { ok: true }))
    } else {
        Err(AppError::NotFound(format!(
            "no running turn for conversation '{conversation_id}'"
        )))
    }
}

// ============================================================
// History & Capabilities
// ============================================================

async fn get_history(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let messages = state.store.history(&conversation_id).await?;
    Ok(Json(HistoryResponse { messages }))
}

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.runtime.tools().definitions(),
    })
}

async fn get_version() -> &'static str {
    concat!("turnstream ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound(err.to_string()),
            StoreError::Backend(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
