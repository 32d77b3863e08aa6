use rusqlite::{Connection, OptionalExtension, Row};

use picshare_types::{NewPost, Post, RowId};

use super::write_error;
use crate::db::error::StoreResult;
use crate::db::{timestamp, DbPool};

const SELECT_POST: &str = "SELECT id, user_id, image_url, caption, created_at FROM \"post\"";

fn map_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        image_url: row.get(2)?,
        caption: row.get(3)?,
        created_at: timestamp::column(row, 4)?,
    })
}

fn fetch(conn: &Connection, post_id: RowId) -> rusqlite::Result<Option<Post>> {
    conn.query_row(&format!("{SELECT_POST} WHERE id = ?"), [post_id], map_post)
        .optional()
}

pub struct PostRepository {
    pool: DbPool,
}

impl PostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new post. The author must exist.
    pub fn create(&self, new_post: &NewPost) -> StoreResult<Post> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO \"post\" (user_id, image_url, caption, created_at)
             VALUES (?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP))",
            (
                new_post.user_id,
                &new_post.image_url,
                &new_post.caption,
                new_post.created_at.as_ref().map(timestamp::to_sql),
            ),
        )
        .map_err(|e| write_error("create post", e))?;

        let id = conn.last_insert_rowid();
        fetch(&conn, id)?.ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
    }

    /// Get a single post by ID
    pub fn get_by_id(&self, post_id: RowId) -> StoreResult<Option<Post>> {
        let conn = self.pool.get()?;
        Ok(fetch(&conn, post_id)?)
    }

    /// Most recent posts by one user, newest first. Served by
    /// `ix_post_user_created`.
    pub fn recent_by_user(&self, user_id: RowId, limit: u32) -> StoreResult<Vec<Post>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_POST} WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?"
        ))?;
        let posts = stmt
            .query_map((user_id, limit), map_post)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    /// Number of posts by a user
    pub fn count_by_user(&self, user_id: RowId) -> StoreResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM \"post\" WHERE user_id = ?",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Delete a post together with its comments and likes (by cascade).
    pub fn delete(&self, post_id: RowId) -> StoreResult<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute("DELETE FROM \"post\" WHERE id = ?", [post_id])
            .map_err(|e| write_error("delete post", e))?;
        Ok(rows)
    }
}
