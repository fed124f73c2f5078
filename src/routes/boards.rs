use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::boards::{self, NewBoard, NewPlacement, NewTab};
use crate::db::models::{Board, ImagePosition, Tab};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BoardsResponse {
    pub boards: Vec<Board>,
}

#[derive(Serialize)]
pub struct TabsResponse {
    pub tabs: Vec<Tab>,
}

#[derive(Serialize)]
pub struct PlacementResponse {
    #[serde(flatten)]
    pub position: ImagePosition,
    pub created: bool,
}

#[derive(Serialize)]
pub struct PlacementsResponse {
    pub images: Vec<ImagePosition>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/boards", get(list_boards).post(create_board))
        .route("/boards/{id}/tabs", get(list_tabs).post(create_tab))
        .route("/tabs/{id}/images", get(tab_images).post(place_image))
}

/// 201 when something was created, 200 when an existing row was returned.
fn created_status(created: bool) -> StatusCode {
    if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

async fn list_boards(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<BoardsResponse>> {
    let boards = boards::list_boards(&state.db, user.id)?;
    Ok(Json(BoardsResponse { boards }))
}

async fn create_board(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<NewBoard>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Board>)> {
    let Json(new) = payload?;
    let (board, created) = boards::create_board(&state.db, user.id, &new)?;
    if created {
        tracing::info!("User {} created board {} ({})", user.id, board.id, board.name);
    }
    Ok((created_status(created), Json(board)))
}

async fn list_tabs(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(board_id): Path<i64>,
) -> AppResult<Json<TabsResponse>> {
    let tabs = boards::list_tabs(&state.db, user.id, board_id)?;
    Ok(Json(TabsResponse { tabs }))
}

async fn create_tab(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(board_id): Path<i64>,
    payload: Result<Json<NewTab>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Tab>)> {
    let Json(new) = payload?;
    let (tab, created) = boards::create_tab(&state.db, user.id, board_id, &new)?;
    Ok((created_status(created), Json(tab)))
}

async fn tab_images(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(tab_id): Path<i64>,
) -> AppResult<Json<PlacementsResponse>> {
    let images = boards::owned_tab_images(&state.db, user.id, tab_id)?;
    Ok(Json(PlacementsResponse { images }))
}

async fn place_image(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(tab_id): Path<i64>,
    payload: Result<Json<NewPlacement>, JsonRejection>,
) -> AppResult<(StatusCode, Json<PlacementResponse>)> {
    let Json(new) = payload?;
    let (position, created) = boards::place_image(&state.db, user.id, tab_id, &new)?;
    Ok((
        created_status(created),
        Json(PlacementResponse { position, created }),
    ))
}
