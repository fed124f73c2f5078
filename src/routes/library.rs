use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::db::models::{Category, Image};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::library::{self, NewCategory, NewImage};
use crate::state::AppState;

#[derive(Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

#[derive(Serialize)]
pub struct ImagesResponse {
    pub images: Vec<Image>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/{id}/images", get(category_images))
        .route("/images", post(create_image))
}

async fn list_categories(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<CategoriesResponse>> {
    let categories = library::visible_categories(&state.db, user.viewer())?;
    Ok(Json(CategoriesResponse { categories }))
}

async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let Json(new) = payload?;
    let category = library::create_category(&state.db, user.viewer(), &new)?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn category_images(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(category_id): Path<i64>,
) -> AppResult<Json<ImagesResponse>> {
    let images = library::category_images(&state.db, user.viewer(), category_id)?;
    Ok(Json(ImagesResponse { images }))
}

/// POST /images
/// Registers an already-uploaded file in the library.
async fn create_image(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<NewImage>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Image>)> {
    let Json(new) = payload?;
    let image = library::create_image(&state.db, user.viewer(), &new)?;
    Ok((StatusCode::CREATED, Json(image)))
}
