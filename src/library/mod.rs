// Shared image library. Staff-created content is public, everything else is private.
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;
use validator::Validate;

use crate::db::models::{Category, Image};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

const PRIVATE_SUFFIX: &str = " (private)";

#[derive(Debug, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 100, message = "Category name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewImage {
    #[validate(length(min = 1, max = 50, message = "Label is required"))]
    pub label: String,
    pub category_id: i64,
    #[validate(length(min = 1, message = "image_path is required"))]
    pub image_path: String,
    #[serde(default = "default_public")]
    pub public: bool,
}

fn default_public() -> bool {
    true
}

/// Who is asking, as far as visibility rules care.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub user_id: i64,
    pub is_staff: bool,
}

fn category_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    let name: String = row.get(1)?;
    let creator_is_staff: bool = row.get(3)?;
    let display_name = if creator_is_staff {
        name.clone()
    } else {
        format!("{}{}", name, PRIVATE_SUFFIX)
    };
    Ok(Category {
        id: row.get(0)?,
        name,
        creator_id: row.get(2)?,
        is_private: !creator_is_staff,
        display_name,
    })
}

fn image_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Image> {
    Ok(Image {
        id: row.get(0)?,
        label: row.get(1)?,
        image_path: row.get(2)?,
        category_id: row.get(3)?,
        public: row.get(4)?,
        creator_id: row.get(5)?,
    })
}

pub fn create_category(pool: &DbPool, viewer: Viewer, new: &NewCategory) -> AppResult<Category> {
    new.validate()?;

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO categories (name, creator_id) VALUES (?1, ?2)",
        params![new.name, viewer.user_id],
    )?;
    let id = conn.last_insert_rowid();
    drop(conn);

    find_category(pool, id)?
        .ok_or_else(|| AppError::Internal(format!("Category {} vanished after insert", id)))
}

pub fn find_category(pool: &DbPool, category_id: i64) -> AppResult<Option<Category>> {
    let conn = pool.get()?;
    let category = conn
        .query_row(
            "SELECT c.id, c.name, c.creator_id, u.is_staff FROM categories c
             JOIN users u ON u.id = c.creator_id
             WHERE c.id = ?1",
            params![category_id],
            category_from_row,
        )
        .optional()?;
    Ok(category)
}

/// Public categories, then (for non-staff) the viewer's own private ones. Each group by name.
pub fn visible_categories(pool: &DbPool, viewer: Viewer) -> AppResult<Vec<Category>> {
    let conn = pool.get()?;

    let mut public = conn.prepare(
        "SELECT c.id, c.name, c.creator_id, u.is_staff FROM categories c
         JOIN users u ON u.id = c.creator_id
         WHERE u.is_staff = 1
         ORDER BY c.name",
    )?;
    let mut categories = public
        .query_map([], category_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    if !viewer.is_staff {
        let mut private = conn.prepare(
            "SELECT c.id, c.name, c.creator_id, u.is_staff FROM categories c
             JOIN users u ON u.id = c.creator_id
             WHERE c.creator_id = ?1
             ORDER BY c.name",
        )?;
        let own = private
            .query_map(params![viewer.user_id], category_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        categories.extend(own);
    }

    Ok(categories)
}

fn is_visible(category: &Category, viewer: Viewer) -> bool {
    !category.is_private || category.creator_id == viewer.user_id
}

/// Store image metadata. Uploads from non-staff users are always private.
pub fn create_image(pool: &DbPool, viewer: Viewer, new: &NewImage) -> AppResult<Image> {
    new.validate()?;

    let category = find_category(pool, new.category_id)?
        .filter(|c| is_visible(c, viewer))
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    let public = viewer.is_staff && new.public;

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO images (label, image_path, category_id, public, creator_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.label,
            new.image_path,
            category.id,
            public,
            viewer.user_id
        ],
    )?;

    Ok(Image {
        id: conn.last_insert_rowid(),
        label: new.label.clone(),
        image_path: new.image_path.clone(),
        category_id: category.id,
        public,
        creator_id: viewer.user_id,
    })
}

pub fn category_images(pool: &DbPool, viewer: Viewer, category_id: i64) -> AppResult<Vec<Image>> {
    find_category(pool, category_id)?
        .filter(|c| is_visible(c, viewer))
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, label, image_path, category_id, public, creator_id FROM images
         WHERE category_id = ?1 AND (public = 1 OR creator_id = ?2)
         ORDER BY id",
    )?;
    let images = stmt
        .query_map(params![category_id, viewer.user_id], image_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(images)
}
