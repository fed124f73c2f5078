// Pairing endpoints - pure domain in crate::pairing, side effects at the edges
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Local;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::SqliteRoleLookup;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::pairing::{PairingCode, PairingError, PairingService, SqlitePairingRepository};
use crate::state::AppState;

// -- Request/Response types --

#[derive(Serialize)]
pub struct GenerateCodeResponse {
    pub code: String,
    pub time: String,
    pub message: String,
}

#[derive(Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(length(min = 1, max = 10, message = "code_check must be 1 to 10 characters"))]
    pub code_check: String,
}

/// The six single-digit boxes of the verification form.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct VerifyDigitsRequest {
    pub d1: String,
    pub d2: String,
    pub d3: String,
    pub d4: String,
    pub d5: String,
    pub d6: String,
}

#[derive(Serialize)]
pub struct VerifyCodeResponse {
    pub success: bool,
    pub message: String,
}

// -- Error conversion --

impl From<PairingError> for AppError {
    fn from(err: PairingError) -> Self {
        match err {
            PairingError::CodeNotFound => AppError::NotFound(err.to_string()),
            PairingError::RoleNotRecognized => AppError::RoleNotRecognized,
            PairingError::CounterpartMissing => AppError::NotFound(err.to_string()),
            PairingError::CodeSpaceExhausted => AppError::Internal(err.to_string()),
            PairingError::Repository(e) => AppError::from(e),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/codes", post(generate_code))
        .route("/codes/verify", post(verify_code))
        .route("/codes/verify/digits", post(verify_digits))
}

fn pairing_service(state: &AppState) -> PairingService {
    PairingService::new(
        Arc::new(SqlitePairingRepository::new(state.db.clone())),
        Arc::new(SqliteRoleLookup::new(state.db.clone())),
    )
}

// -- Handlers --

/// POST /codes
/// Replaces the caller's pairing code with a fresh one
async fn generate_code(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<(StatusCode, Json<GenerateCodeResponse>)> {
    let issued = pairing_service(&state)
        .generate_code(user.id, Local::now().time())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateCodeResponse {
            code: issued.code.to_string(),
            time: issued.time_string(),
            message: "Code generated successfully.".to_string(),
        }),
    ))
}

/// POST /codes/verify
/// Links the caller with whoever issued the code
async fn verify_code(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<VerifyCodeRequest>, JsonRejection>,
) -> AppResult<Json<VerifyCodeResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    link(&state, &user, &req.code_check).await
}

/// POST /codes/verify/digits
async fn verify_digits(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<VerifyDigitsRequest>, JsonRejection>,
) -> AppResult<Json<VerifyCodeResponse>> {
    let Json(req) = payload?;
    // An incomplete form still goes through the role check before failing on the code
    let code_check = PairingCode::from_digits([
        req.d1.as_str(),
        req.d2.as_str(),
        req.d3.as_str(),
        req.d4.as_str(),
        req.d5.as_str(),
        req.d6.as_str(),
    ])
    .map(|code| code.to_string())
    .unwrap_or_default();

    link(&state, &user, &code_check).await
}

async fn link(
    state: &AppState,
    user: &CurrentUser,
    code_check: &str,
) -> AppResult<Json<VerifyCodeResponse>> {
    pairing_service(state).verify_code(user.id, code_check).await?;

    Ok(Json(VerifyCodeResponse {
        success: true,
        message: "Code verified successfully.".to_string(),
    }))
}
