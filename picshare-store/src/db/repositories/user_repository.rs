use rusqlite::{Connection, OptionalExtension, Row};

use picshare_types::{NewUser, RowId, User};

use super::write_error;
use crate::db::error::StoreResult;
use crate::db::{timestamp, DbPool};

const SELECT_USER: &str = "SELECT id, username, email, password, created_at FROM \"user\"";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        created_at: timestamp::column(row, 4)?,
    })
}

fn fetch(conn: &Connection, user_id: RowId) -> rusqlite::Result<Option<User>> {
    conn.query_row(&format!("{SELECT_USER} WHERE id = ?"), [user_id], map_user)
        .optional()
}

pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a user. Fails with a uniqueness violation when the username or
    /// email is taken.
    pub fn create(&self, new_user: &NewUser) -> StoreResult<User> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO \"user\" (username, email, password, created_at)
             VALUES (?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP))",
            (
                &new_user.username,
                &new_user.email,
                &new_user.password,
                new_user.created_at.as_ref().map(timestamp::to_sql),
            ),
        )
        .map_err(|e| write_error("create user", e))?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Created user {} ({})", id, new_user.username);
        fetch(&conn, id)?.ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
    }

    /// Get user by ID
    pub fn get_by_id(&self, user_id: RowId) -> StoreResult<Option<User>> {
        let conn = self.pool.get()?;
        Ok(fetch(&conn, user_id)?)
    }

    /// Get user by username
    pub fn get_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(&format!("{SELECT_USER} WHERE username = ?"), [username], map_user)
            .optional()?;
        Ok(user)
    }

    /// Get user by email
    pub fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(&format!("{SELECT_USER} WHERE email = ?"), [email], map_user)
            .optional()?;
        Ok(user)
    }

    /// Get all users ordered by username
    pub fn list_all(&self) -> StoreResult<Vec<User>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!("{SELECT_USER} ORDER BY username"))?;
        let users = stmt
            .query_map([], map_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Delete a user. The storage engine cascades to their posts, comments,
    /// likes and follow edges. Returns the number of users removed.
    pub fn delete(&self, user_id: RowId) -> StoreResult<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute("DELETE FROM \"user\" WHERE id = ?", [user_id])
            .map_err(|e| write_error("delete user", e))?;
        Ok(rows)
    }
}
