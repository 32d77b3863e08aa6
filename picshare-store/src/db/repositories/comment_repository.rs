use rusqlite::{Connection, OptionalExtension, Row};

use picshare_types::{Comment, NewComment, RowId};

use super::write_error;
use crate::db::error::StoreResult;
use crate::db::{timestamp, DbPool};

const SELECT_COMMENT: &str =
    "SELECT id, user_id, post_id, content, created_at FROM \"comment\"";

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        post_id: row.get(2)?,
        content: row.get(3)?,
        created_at: timestamp::column(row, 4)?,
    })
}

fn fetch(conn: &Connection, comment_id: RowId) -> rusqlite::Result<Option<Comment>> {
    conn.query_row(&format!("{SELECT_COMMENT} WHERE id = ?"), [comment_id], map_comment)
        .optional()
}

pub struct CommentRepository {
    pool: DbPool,
}

impl CommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add a comment. Both the author and the post must exist.
    pub fn create(&self, new_comment: &NewComment) -> StoreResult<Comment> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO \"comment\" (user_id, post_id, content, created_at)
             VALUES (?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP))",
            (
                new_comment.user_id,
                new_comment.post_id,
                &new_comment.content,
                new_comment.created_at.as_ref().map(timestamp::to_sql),
            ),
        )
        .map_err(|e| write_error("create comment", e))?;

        let id = conn.last_insert_rowid();
        fetch(&conn, id)?.ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
    }

    pub fn get_by_id(&self, comment_id: RowId) -> StoreResult<Option<Comment>> {
        let conn = self.pool.get()?;
        Ok(fetch(&conn, comment_id)?)
    }

    /// Comments on a post, oldest first
    pub fn list_for_post(&self, post_id: RowId) -> StoreResult<Vec<Comment>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COMMENT} WHERE post_id = ? ORDER BY created_at ASC, id ASC"
        ))?;
        let comments = stmt
            .query_map([post_id], map_comment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    pub fn count_for_post(&self, post_id: RowId) -> StoreResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM \"comment\" WHERE post_id = ?",
            [post_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn delete(&self, comment_id: RowId) -> StoreResult<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute("DELETE FROM \"comment\" WHERE id = ?", [comment_id])
            .map_err(|e| write_error("delete comment", e))?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{PostRepository, UserRepository};
    use crate::db::Database;
    use picshare_types::{NewPost, NewUser};

    fn setup_test_db() -> (Database, CommentRepository, RowId, RowId) {
        let db = Database::in_memory().expect("Failed to create test database");
        db.initialize().expect("Failed to initialize schema");
        let user = UserRepository::new(db.pool.clone())
            .create(&NewUser::new("ana", "ana@x.com", "hash"))
            .expect("Failed to create user");
        let post = PostRepository::new(db.pool.clone())
            .create(&NewPost::new(user.id))
            .expect("Failed to create post");
        let repo = CommentRepository::new(db.pool.clone());
        (db, repo, user.id, post.id)
    }

    #[test]
    fn test_comment_lifecycle() {
        let (_db, repo, user_id, post_id) = setup_test_db();

        let first = repo.create(&NewComment::new(user_id, post_id, "first!")).unwrap();
        let second = repo.create(&NewComment::new(user_id, post_id, "second")).unwrap();

        let listed: Vec<_> = repo
            .list_for_post(post_id)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(listed, [first.id, second.id]);
        assert_eq!(repo.get_by_id(first.id).unwrap().map(|c| c.content), Some("first!".to_string()));

        assert_eq!(repo.delete(first.id).unwrap(), 1);
        assert_eq!(repo.count_for_post(post_id).unwrap(), 1);
    }

    #[test]
    fn test_comment_requires_existing_parents() {
        let (_db, repo, user_id, post_id) = setup_test_db();

        let missing_post = repo.create(&NewComment::new(user_id, post_id + 100, "hi")).unwrap_err();
        assert!(missing_post.is_foreign_key_violation(), "unexpected error: {missing_post:?}");

        let missing_user = repo.create(&NewComment::new(user_id + 100, post_id, "hi")).unwrap_err();
        assert!(missing_user.is_foreign_key_violation(), "unexpected error: {missing_user:?}");
    }

    #[test]
    fn test_long_content_is_allowed() {
        let (_db, repo, user_id, post_id) = setup_test_db();
        let essay = "word ".repeat(5_000);
        let comment = repo.create(&NewComment::new(user_id, post_id, essay.clone())).unwrap();
        assert_eq!(comment.content, essay);
    }
}
