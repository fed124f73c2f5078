use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::auth::accounts;
use crate::auth::{Role, RoleLookup, SqliteRoleLookup};
use crate::db::models::LinkedProfile;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::pairing::{PairingRepository, SqlitePairingRepository};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_cg: bool,
    pub is_cr: bool,
    pub number_id: String,
}

#[derive(Serialize)]
pub struct RecipientsResponse {
    pub recipients: Vec<LinkedProfile>,
}

#[derive(Serialize)]
pub struct CaregiversResponse {
    pub caregivers: Vec<LinkedProfile>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/caregiver/recipients", get(recipients))
        .route("/recipient/caregivers", get(caregivers))
}

/// GET /profile
async fn profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ProfileResponse>> {
    let role = SqliteRoleLookup::new(state.db.clone())
        .role_of(user.id)
        .await?;
    if role == Role::Unknown {
        return Err(AppError::RoleNotRecognized);
    }
    let found = accounts::find_user(&state.db, user.id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(ProfileResponse {
        number_id: found.number_id(),
        username: found.username,
        email: found.email,
        first_name: found.first_name,
        last_name: found.last_name,
        role,
        is_cg: role == Role::Caregiver,
        is_cr: role == Role::Recipient,
    }))
}

/// GET /caregiver/recipients
/// Recipients linked to the calling caregiver
async fn recipients(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<RecipientsResponse>> {
    let repo = SqlitePairingRepository::new(state.db.clone());
    let caregiver_id = repo
        .caregiver_profile(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Caregiver profile not found".into()))?;

    Ok(Json(RecipientsResponse {
        recipients: repo.recipients_of(caregiver_id).await?,
    }))
}

/// GET /recipient/caregivers
async fn caregivers(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<CaregiversResponse>> {
    let repo = SqlitePairingRepository::new(state.db.clone());
    let recipient_id = repo
        .recipient_profile(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipient profile not found".into()))?;

    Ok(Json(CaregiversResponse {
        caregivers: repo.caregivers_of(recipient_id).await?,
    }))
}
