use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Local;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::boards;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::progress::HistoryStore;
use crate::speech;
use crate::state::AppState;

#[derive(Deserialize, Validate)]
pub struct SpeakRequest {
    #[validate(length(min = 1, max = 250, message = "input_data must be 1 to 250 characters"))]
    pub input_data: String,
    pub board_id: i64,
}

#[derive(Serialize)]
pub struct SpeakResponse {
    pub success: bool,
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/speak", post(speak))
}

/// POST /speak
/// Logs the utterance to history, then hands it to the synthesizer without waiting.
async fn speak(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> AppResult<Json<SpeakResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let text = req.input_data.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation("input_data is required".into()));
    }

    boards::find_board(&state.db, req.board_id)?
        .ok_or_else(|| AppError::NotFound("Board not found".into()))?;

    let now = Local::now();
    let history_id = HistoryStore::new(state.db.clone()).record(
        user.id,
        Some(req.board_id),
        &text,
        now.date_naive(),
        now.time(),
    )?;
    tracing::debug!("Recorded history {} for user {}", history_id, user.id);

    speech::speak_detached(state.speech.clone(), text);

    Ok(Json(SpeakResponse {
        success: true,
        message: "Spoken.".to_string(),
    }))
}
