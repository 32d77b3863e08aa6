use rusqlite::Row;

use picshare_types::{Follower, RowId};

use super::write_error;
use crate::db::error::StoreResult;
use crate::db::{timestamp, DbPool};

const SELECT_FOLLOWER: &str =
    "SELECT id, user_from_id, user_to_id, created_at FROM \"follower\"";

fn map_follower(row: &Row<'_>) -> rusqlite::Result<Follower> {
    Ok(Follower {
        id: row.get(0)?,
        user_from_id: row.get(1)?,
        user_to_id: row.get(2)?,
        created_at: timestamp::column(row, 3)?,
    })
}

/// Directed follow edges between users.
pub struct FollowerRepository {
    pool: DbPool,
}

impl FollowerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// `user_from_id` starts following `user_to_id`.
    ///
    /// Fails with a uniqueness violation if the edge already exists and with
    /// a check violation (`ck_no_self_follow`) if both ids are equal.
    pub fn follow(&self, user_from_id: RowId, user_to_id: RowId) -> StoreResult<Follower> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO \"follower\" (user_from_id, user_to_id) VALUES (?, ?)",
            (user_from_id, user_to_id),
        )
        .map_err(|e| write_error("follow user", e))?;

        let id = conn.last_insert_rowid();
        let edge = conn.query_row(&format!("{SELECT_FOLLOWER} WHERE id = ?"), [id], map_follower)?;
        Ok(edge)
    }

    /// Remove a follow edge
    pub fn unfollow(&self, user_from_id: RowId, user_to_id: RowId) -> StoreResult<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute(
                "DELETE FROM \"follower\" WHERE user_from_id = ? AND user_to_id = ?",
                (user_from_id, user_to_id),
            )
            .map_err(|e| write_error("unfollow user", e))?;
        Ok(rows)
    }

    /// Check if user A is following user B
    pub fn is_following(&self, user_from_id: RowId, user_to_id: RowId) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM \"follower\" WHERE user_from_id = ? AND user_to_id = ?",
            (user_from_id, user_to_id),
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Check if users follow each other
    pub fn are_mutual(&self, user_a: RowId, user_b: RowId) -> StoreResult<bool> {
        Ok(self.is_following(user_a, user_b)? && self.is_following(user_b, user_a)?)
    }

    /// Users this user follows, most recent first
    pub fn get_following(&self, user_id: RowId) -> StoreResult<Vec<RowId>> {
        self.edge_ids(
            "SELECT user_to_id FROM \"follower\" WHERE user_from_id = ? ORDER BY created_at DESC, id DESC",
            user_id,
        )
    }

    /// Users following this user, most recent first
    pub fn get_followers(&self, user_id: RowId) -> StoreResult<Vec<RowId>> {
        self.edge_ids(
            "SELECT user_from_id FROM \"follower\" WHERE user_to_id = ? ORDER BY created_at DESC, id DESC",
            user_id,
        )
    }

    /// Every edge touching a user, in either direction
    pub fn edges_for_user(&self, user_id: RowId) -> StoreResult<Vec<Follower>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_FOLLOWER} WHERE user_from_id = ?1 OR user_to_id = ?1 ORDER BY id"
        ))?;
        let edges = stmt
            .query_map([user_id], map_follower)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    pub fn follower_count(&self, user_id: RowId) -> StoreResult<usize> {
        self.edge_count(
            "SELECT COUNT(*) FROM \"follower\" WHERE user_to_id = ?",
            user_id,
        )
    }

    pub fn following_count(&self, user_id: RowId) -> StoreResult<usize> {
        self.edge_count(
            "SELECT COUNT(*) FROM \"follower\" WHERE user_from_id = ?",
            user_id,
        )
    }

    fn edge_count(&self, sql: &str, user_id: RowId) -> StoreResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(sql, [user_id], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn edge_ids(&self, sql: &str, user_id: RowId) -> StoreResult<Vec<RowId>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
            .query_map([user_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
