use rusqlite::{params, OptionalExtension};
use serde::Deserialize;
use validator::Validate;

use crate::db::models::{Board, ImagePosition, Tab};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub const DEFAULT_BOARD_COLOR: &str = "#cc4b48";
pub const DEFAULT_TAB_COLOR: &str = "#619451";
pub const DEFAULT_TAB_NAME: &str = "Main";
pub const DEFAULT_TAB_STRAPS: i64 = 5;

#[derive(Debug, Deserialize, Validate)]
pub struct NewBoard {
    #[validate(length(min = 1, max = 100, message = "Board name is required"))]
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewTab {
    #[validate(length(max = 50))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 5, message = "straps_num must be between 1 and 5"))]
    pub straps_num: i64,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewPlacement {
    pub image_id: i64,
    #[validate(length(max = 50))]
    pub position_x: Option<String>,
    #[validate(length(max = 50))]
    pub position_y: Option<String>,
}

fn map_board(row: &rusqlite::Row<'_>) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get(0)?,
        name: row.get(1)?,
        creator_id: row.get(2)?,
        color: row.get(3)?,
    })
}

fn map_tab(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tab> {
    Ok(Tab {
        id: row.get(0)?,
        name: row.get(1)?,
        straps_num: row.get(2)?,
        board_id: row.get(3)?,
        color: row.get(4)?,
    })
}

fn map_position(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImagePosition> {
    Ok(ImagePosition {
        id: row.get(0)?,
        image_id: row.get(1)?,
        position_x: row.get(2)?,
        position_y: row.get(3)?,
        tab_id: row.get(4)?,
    })
}

/// Get-or-create a board by (name, creator). A new board gets its "Main" tab.
/// Returns the board and whether it was created.
pub fn create_board(pool: &DbPool, creator_id: i64, new: &NewBoard) -> AppResult<(Board, bool)> {
    new.validate()?;
    let color = new.color.as_deref().unwrap_or(DEFAULT_BOARD_COLOR);

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let existing = tx
        .query_row(
            "SELECT id, name, creator_id, color FROM boards WHERE name = ?1 AND creator_id = ?2",
            params![new.name, creator_id],
            map_board,
        )
        .optional()?;
    if let Some(board) = existing {
        return Ok((board, false));
    }

    tx.execute(
        "INSERT INTO boards (name, creator_id, color) VALUES (?1, ?2, ?3)",
        params![new.name, creator_id, color],
    )?;
    let board_id = tx.last_insert_rowid();
    tx.execute(
        "INSERT INTO tabs (name, straps_num, board_id, color) VALUES (?1, ?2, ?3, ?4)",
        params![
            DEFAULT_TAB_NAME,
            DEFAULT_TAB_STRAPS,
            board_id,
            DEFAULT_TAB_COLOR
        ],
    )?;
    tx.commit()?;

    tracing::info!("Created board {} ({}) for user {}", new.name, board_id, creator_id);

    Ok((
        Board {
            id: board_id,
            name: new.name.clone(),
            creator_id,
            color: color.to_string(),
        },
        true,
    ))
}

pub fn list_boards(pool: &DbPool, creator_id: i64) -> AppResult<Vec<Board>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, name, creator_id, color FROM boards WHERE creator_id = ?1 ORDER BY id",
    )?;
    let boards = stmt
        .query_map(params![creator_id], map_board)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(boards)
}

pub fn find_board(pool: &DbPool, board_id: i64) -> AppResult<Option<Board>> {
    let conn = pool.get()?;
    let board = conn
        .query_row(
            "SELECT id, name, creator_id, color FROM boards WHERE id = ?1",
            params![board_id],
            map_board,
        )
        .optional()?;
    Ok(board)
}

fn owned_board(pool: &DbPool, board_id: i64, user_id: i64) -> AppResult<Board> {
    find_board(pool, board_id)?
        .filter(|b| b.creator_id == user_id)
        .ok_or_else(|| AppError::NotFound("Board not found".into()))
}

/// Get-or-create a tab on a board the user owns.
pub fn create_tab(
    pool: &DbPool,
    user_id: i64,
    board_id: i64,
    new: &NewTab,
) -> AppResult<(Tab, bool)> {
    new.validate()?;
    owned_board(pool, board_id, user_id)?;
    let color = new.color.as_deref().unwrap_or(DEFAULT_TAB_COLOR);

    let conn = pool.get()?;
    let existing = conn
        .query_row(
            "SELECT id, name, straps_num, board_id, color FROM tabs
             WHERE name IS ?1 AND board_id = ?2 AND color = ?3 AND straps_num = ?4",
            params![new.name, board_id, color, new.straps_num],
            map_tab,
        )
        .optional()?;
    if let Some(tab) = existing {
        return Ok((tab, false));
    }

    conn.execute(
        "INSERT INTO tabs (name, straps_num, board_id, color) VALUES (?1, ?2, ?3, ?4)",
        params![new.name, new.straps_num, board_id, color],
    )?;

    Ok((
        Tab {
            id: conn.last_insert_rowid(),
            name: new.name.clone(),
            straps_num: new.straps_num,
            board_id,
            color: color.to_string(),
        },
        true,
    ))
}

pub fn list_tabs(pool: &DbPool, user_id: i64, board_id: i64) -> AppResult<Vec<Tab>> {
    owned_board(pool, board_id, user_id)?;

    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, name, straps_num, board_id, color FROM tabs WHERE board_id = ?1 ORDER BY id",
    )?;
    let tabs = stmt
        .query_map(params![board_id], map_tab)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tabs)
}

/// Place an image on a tab. Placing the same image at the same spot twice is a no-op.
pub fn place_image(
    pool: &DbPool,
    user_id: i64,
    tab_id: i64,
    new: &NewPlacement,
) -> AppResult<(ImagePosition, bool)> {
    new.validate()?;
    let x = new.position_x.as_deref().unwrap_or("0");
    let y = new.position_y.as_deref().unwrap_or("0");

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let owner: Option<i64> = tx
        .query_row(
            "SELECT b.creator_id FROM tabs t JOIN boards b ON b.id = t.board_id WHERE t.id = ?1",
            params![tab_id],
            |row| row.get(0),
        )
        .optional()?;
    if owner != Some(user_id) {
        return Err(AppError::NotFound("Tab not found".into()));
    }

    // Same visibility as the library: a public category (or the user's own)
    // and a public image (or the user's own)
    let image_visible: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM images i
         JOIN categories c ON c.id = i.category_id
         JOIN users u ON u.id = c.creator_id
         WHERE i.id = ?1
           AND (u.is_staff = 1 OR c.creator_id = ?2)
           AND (i.public = 1 OR i.creator_id = ?2)",
        params![new.image_id, user_id],
        |row| row.get(0),
    )?;
    if !image_visible {
        return Err(AppError::NotFound("Image not found".into()));
    }

    let existing = tx
        .query_row(
            "SELECT id, image_id, position_x, position_y, tab_id FROM image_positions
             WHERE tab_id = ?1 AND image_id = ?2 AND position_x = ?3 AND position_y = ?4",
            params![tab_id, new.image_id, x, y],
            map_position,
        )
        .optional()?;
    if let Some(position) = existing {
        return Ok((position, false));
    }

    tx.execute(
        "INSERT INTO image_positions (image_id, position_x, position_y, tab_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![new.image_id, x, y, tab_id],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    Ok((
        ImagePosition {
            id,
            image_id: new.image_id,
            position_x: x.to_string(),
            position_y: y.to_string(),
            tab_id,
        },
        true,
    ))
}

/// Placements on a tab, provided the tab sits on one of the user's boards.
pub fn owned_tab_images(pool: &DbPool, user_id: i64, tab_id: i64) -> AppResult<Vec<ImagePosition>> {
    let owner: Option<i64> = pool
        .get()?
        .query_row(
            "SELECT b.creator_id FROM tabs t JOIN boards b ON b.id = t.board_id WHERE t.id = ?1",
            params![tab_id],
            |row| row.get(0),
        )
        .optional()?;
    if owner != Some(user_id) {
        return Err(AppError::NotFound("Tab not found".into()));
    }
    tab_images(pool, tab_id)
}

fn tab_images(pool: &DbPool, tab_id: i64) -> AppResult<Vec<ImagePosition>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, image_id, position_x, position_y, tab_id FROM image_positions
         WHERE tab_id = ?1 ORDER BY id",
    )?;
    let positions = stmt
        .query_map(params![tab_id], map_position)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(positions)
}
