use rusqlite::ffi;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the storage layer.
///
/// The integrity variants are produced by SQLite while it enforces the
/// declared constraints; nothing here re-checks them in Rust.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("uniqueness violation on {table}({})", .columns.join(", "))]
    UniqueViolation { table: String, columns: Vec<String> },

    #[error("check constraint violation: {constraint}")]
    CheckViolation { constraint: String },

    #[error("referential integrity violation: referenced row does not exist")]
    ForeignKeyViolation,

    #[error("required column is missing: {column}")]
    NotNullViolation { column: String },

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }

    pub fn is_check_violation(&self) -> bool {
        matches!(self, StoreError::CheckViolation { .. })
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, StoreError::ForeignKeyViolation)
    }

    /// True for errors raised by a declared constraint rather than by the
    /// engine or the pool.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            StoreError::UniqueViolation { .. }
                | StoreError::CheckViolation { .. }
                | StoreError::ForeignKeyViolation
                | StoreError::NotNullViolation { .. }
        )
    }
}

/// Split `"like.user_id, like.post_id"` into the table and its columns.
fn parse_qualified_columns(detail: &str) -> (String, Vec<String>) {
    let mut table = String::new();
    let mut columns = Vec::new();
    for part in detail.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('.') {
            Some((t, c)) => {
                if table.is_empty() {
                    table = t.to_string();
                }
                columns.push(c.to_string());
            }
            None => columns.push(part.to_string()),
        }
    }
    (table, columns)
}

fn detail_after<'a>(message: &'a str, prefix: &str) -> &'a str {
    message
        .find(prefix)
        .map(|at| message[at + prefix.len()..].trim())
        .unwrap_or("")
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        let Some(failure) = err.sqlite_error().copied() else {
            return StoreError::Sqlite(err);
        };
        if failure.code != rusqlite::ErrorCode::ConstraintViolation {
            return StoreError::Sqlite(err);
        }
        let message = match &err {
            rusqlite::Error::SqliteFailure(_, Some(message)) => message.clone(),
            _ => String::new(),
        };
        let detail = detail_after(&message, "constraint failed:");

        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                let (table, columns) = parse_qualified_columns(detail);
                StoreError::UniqueViolation { table, columns }
            }
            ffi::SQLITE_CONSTRAINT_CHECK => StoreError::CheckViolation {
                constraint: detail.to_string(),
            },
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => StoreError::ForeignKeyViolation,
            ffi::SQLITE_CONSTRAINT_NOTNULL => StoreError::NotNullViolation {
                column: detail.to_string(),
            },
            _ => StoreError::Sqlite(err),
        }
    }
}
