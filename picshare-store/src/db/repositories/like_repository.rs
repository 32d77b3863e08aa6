use rusqlite::{OptionalExtension, Row};

use picshare_types::{Like, RowId};

use super::write_error;
use crate::db::error::StoreResult;
use crate::db::{timestamp, DbPool};

const SELECT_LIKE: &str = "SELECT id, user_id, post_id, created_at FROM \"like\"";

fn map_like(row: &Row<'_>) -> rusqlite::Result<Like> {
    Ok(Like {
        id: row.get(0)?,
        user_id: row.get(1)?,
        post_id: row.get(2)?,
        created_at: timestamp::column(row, 3)?,
    })
}

pub struct LikeRepository {
    pool: DbPool,
}

impl LikeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Like a post. A second like of the same post by the same user fails
    /// with a uniqueness violation on `uq_like_user_post`.
    pub fn like(&self, user_id: RowId, post_id: RowId) -> StoreResult<Like> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO \"like\" (user_id, post_id) VALUES (?, ?)",
            (user_id, post_id),
        )
        .map_err(|e| write_error("like post", e))?;

        let id = conn.last_insert_rowid();
        let like = conn.query_row(&format!("{SELECT_LIKE} WHERE id = ?"), [id], map_like)?;
        Ok(like)
    }

    /// Remove a like. Returns the number of rows removed (0 or 1).
    pub fn unlike(&self, user_id: RowId, post_id: RowId) -> StoreResult<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute(
                "DELETE FROM \"like\" WHERE user_id = ? AND post_id = ?",
                (user_id, post_id),
            )
            .map_err(|e| write_error("unlike post", e))?;
        Ok(rows)
    }

    /// Get a user's like on a post
    pub fn get(&self, user_id: RowId, post_id: RowId) -> StoreResult<Option<Like>> {
        let conn = self.pool.get()?;
        let like = conn
            .query_row(
                &format!("{SELECT_LIKE} WHERE user_id = ? AND post_id = ?"),
                (user_id, post_id),
                map_like,
            )
            .optional()?;
        Ok(like)
    }

    pub fn has_liked(&self, user_id: RowId, post_id: RowId) -> StoreResult<bool> {
        Ok(self.get(user_id, post_id)?.is_some())
    }

    pub fn count_for_post(&self, post_id: RowId) -> StoreResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM \"like\" WHERE post_id = ?",
            [post_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Likes on a post, oldest first
    pub fn list_for_post(&self, post_id: RowId) -> StoreResult<Vec<Like>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_LIKE} WHERE post_id = ? ORDER BY created_at ASC, id ASC"
        ))?;
        let likes = stmt
            .query_map([post_id], map_like)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(likes)
    }
}
