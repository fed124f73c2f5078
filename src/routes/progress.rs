use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::{Role, RoleLookup, SqliteRoleLookup};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::progress::{HistoryView, ProgressAggregator, ProgressError};
use crate::progress::domain::{self, HOURS_PER_DAY};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct BarsQuery {
    #[serde(default)]
    pub bar_date: Option<String>,
}

#[derive(Serialize)]
pub struct BarsResponse {
    pub bar: [u32; HOURS_PER_DAY],
}

#[derive(Serialize)]
pub struct ProgressResponse {
    pub histories: Vec<HistoryView>,
    pub is_recipient: bool,
    pub board_names: Vec<String>,
    pub board_representation: Vec<f64>,
}

impl From<ProgressError> for AppError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::MissingDate | ProgressError::InvalidDate(_) => {
                AppError::InvalidArgument(err.to_string())
            }
            ProgressError::Repository(e) => AppError::from(e),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/progress", get(progress))
        .route("/progress/bars", get(bars))
}

/// GET /progress/bars?bar_date=YYYY-MM-DD
/// Words spoken per hour on the given date
async fn bars(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<BarsQuery>, QueryRejection>,
) -> AppResult<Json<BarsResponse>> {
    let Query(query) = query?;
    let date = domain::parse_date(query.bar_date.as_deref().unwrap_or_default())?;

    let bar = ProgressAggregator::new(state.db.clone()).hourly_word_counts(user.id, date)?;
    Ok(Json(BarsResponse { bar }))
}

/// GET /progress
async fn progress(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ProgressResponse>> {
    let summary = ProgressAggregator::new(state.db.clone()).user_progress(user.id)?;
    let role = SqliteRoleLookup::new(state.db.clone())
        .role_of(user.id)
        .await?;

    Ok(Json(ProgressResponse {
        histories: summary.histories,
        is_recipient: role == Role::Recipient,
        board_names: summary.board_names,
        board_representation: summary.board_representation,
    }))
}
