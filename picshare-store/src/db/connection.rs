use anyhow::{bail, Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::{Path, PathBuf};

use super::schema::{entities, schema_sql, SAMPLE_DATA};

/// SQLite in-memory database identifier
const MEMORY_DB_PATH: &str = ":memory:";

/// Run on every pooled connection. SQLite leaves foreign keys off by default.
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Where a connection string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Memory,
    File(PathBuf),
}

impl DatabaseTarget {
    /// Parse a connection string.
    ///
    /// Accepts `sqlite:///relative.db`, `sqlite:////abs/path.db`,
    /// `sqlite://:memory:`, `sqlite::memory:`, `:memory:` and bare paths.
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            bail!("Empty database connection string");
        }

        let location = if let Some(rest) = trimmed.strip_prefix("sqlite://") {
            // sqlite:///foo.db -> foo.db, sqlite:////tmp/foo.db -> /tmp/foo.db
            rest.strip_prefix('/').unwrap_or(rest)
        } else if let Some(rest) = trimmed.strip_prefix("sqlite:") {
            rest
        } else if let Some((scheme, _)) = trimmed.split_once("://") {
            bail!("Unsupported storage backend '{}': only sqlite is available", scheme);
        } else {
            trimmed
        };

        if location.is_empty() || location.eq_ignore_ascii_case(MEMORY_DB_PATH) {
            Ok(DatabaseTarget::Memory)
        } else {
            Ok(DatabaseTarget::File(PathBuf::from(location)))
        }
    }
}

/// Database wrapper with connection pooling support
#[derive(Clone)]
pub struct Database {
    pub pool: DbPool,
}

impl Database {
    /// Open the database a connection string points at
    pub fn from_url(url: &str) -> Result<Self> {
        match DatabaseTarget::parse(url)? {
            DatabaseTarget::Memory => Self::in_memory(),
            DatabaseTarget::File(path) => Self::new(path),
        }
    }

    /// Create a new database connection pool
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let is_memory = path_str.trim().eq_ignore_ascii_case(MEMORY_DB_PATH);

        let manager = Self::create_connection_manager(path.as_ref())
            .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));

        // Each in-memory connection is its own database, so keep exactly one
        let max_size = if is_memory { 1 } else { 8 };
        let pool = Pool::builder()
            .max_size(max_size)
            .build(manager)
            .context("Failed to create database connection pool")?;

        tracing::debug!("Opened database pool for {} (max {} connections)", path_str, max_size);
        Ok(Self { pool })
    }

    /// Create appropriate connection manager based on path
    ///
    /// # Arguments
    /// * `path` - Database file path or ":memory:" for in-memory database
    fn create_connection_manager(path: &Path) -> SqliteConnectionManager {
        let path_str = path.to_string_lossy();
        if path_str.trim().eq_ignore_ascii_case(MEMORY_DB_PATH) {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path)
        }
    }

    /// Create an in-memory database pool (useful for testing)
    pub fn in_memory() -> Result<Self> {
        Self::new(MEMORY_DB_PATH)
    }

    /// Create every table and index. Idempotent.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.connection()?;
        let script = schema_sql()?;
        tracing::debug!("Applying schema:\n{}", script);
        conn.execute_batch(&script)
            .context("Failed to initialize database schema")?;
        tracing::info!("Database schema ready ({} tables)", entities().len());
        Ok(())
    }

    /// Seed the database with sample rows
    pub fn seed_sample_data(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(SAMPLE_DATA)
            .context("Failed to seed sample data")?;
        tracing::info!("Sample data seeded");
        Ok(())
    }

    /// Names of the schema tables that exist in this database
    pub fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .context("Failed to list tables")?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables
            .into_iter()
            .filter(|name| entities().iter().any(|e| e.table == name.as_str()))
            .collect())
    }

    /// Get a connection from the pool
    pub fn connection(&self) -> Result<DbConnection> {
        self.pool
            .get()
            .context("Failed to get database connection from pool")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(conn: &DbConnection, sql: &str) -> Vec<String> {
        let mut stmt = conn.prepare(sql).expect("Failed to prepare statement");
        stmt.query_map([], |row| row.get(0))
            .expect("Failed to query")
            .collect::<Result<Vec<_>, _>>()
            .expect("Failed to collect rows")
    }

    #[test]
    fn test_database_creation() {
        let db = Database::in_memory().expect("Failed to create database");
        db.initialize().expect("Failed to initialize schema");

        let tables = db.table_names().expect("Failed to list tables");
        assert_eq!(tables, ["comment", "follower", "like", "post", "user"]);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let db = Database::in_memory().expect("Failed to create database");
        db.initialize().expect("Failed to initialize schema");
        db.initialize().expect("Second initialize should be a no-op");
    }

    #[test]
    fn test_indexes_created() {
        let db = Database::in_memory().expect("Failed to create database");
        db.initialize().expect("Failed to initialize schema");
        let conn = db.connection().expect("Failed to get connection");

        let indexes = list(
            &conn,
            "SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'ix_%' ORDER BY name",
        );
        for expected in [
            "ix_comment_post_id",
            "ix_comment_user_id",
            "ix_follower_user_from_id",
            "ix_follower_user_to_id",
            "ix_like_post_id",
            "ix_like_user_id",
            "ix_post_user_created",
            "ix_post_user_id",
            "ix_user_email",
            "ix_user_username",
        ] {
            assert!(indexes.contains(&expected.to_string()), "missing index {}", expected);
        }
    }

    #[test]
    fn test_foreign_keys_enabled_on_pooled_connections() {
        let db = Database::in_memory().expect("Failed to create database");
        let conn = db.connection().expect("Failed to get connection");
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .expect("Failed to read pragma");
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_seed_sample_data() {
        let db = Database::in_memory().expect("Failed to create database");
        db.initialize().expect("Failed to initialize schema");
        db.seed_sample_data().expect("Failed to seed sample data");
        // Seeding twice must not trip the unique constraints
        db.seed_sample_data().expect("Failed to reseed sample data");

        let conn = db.connection().expect("Failed to get connection");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM \"user\"", [], |row| row.get(0))
            .expect("Failed to count users");
        assert_eq!(count, 3);
    }

    #[test]
    fn test_connection_string_parsing() {
        assert_eq!(DatabaseTarget::parse("sqlite:///instagram.db").unwrap(), DatabaseTarget::File("instagram.db".into()));
        assert_eq!(DatabaseTarget::parse("sqlite:////tmp/x.db").unwrap(), DatabaseTarget::File("/tmp/x.db".into()));
        assert_eq!(DatabaseTarget::parse("sqlite://:memory:").unwrap(), DatabaseTarget::Memory);
        assert_eq!(DatabaseTarget::parse("sqlite::memory:").unwrap(), DatabaseTarget::Memory);
        assert_eq!(DatabaseTarget::parse(" :MEMORY: ").unwrap(), DatabaseTarget::Memory);
        assert_eq!(DatabaseTarget::parse("data/app.db").unwrap(), DatabaseTarget::File("data/app.db".into()));
        assert!(DatabaseTarget::parse("postgres://localhost/app").is_err());
        assert!(DatabaseTarget::parse("  ").is_err());
    }

    #[test]
    fn test_memory_database_detection() {
        // Test various memory database path formats
        let memory_paths = [":memory:", " :memory: ", ":MEMORY:", " :Memory: "];

        for path in &memory_paths {
            let db = Database::new(path).expect("Failed to create memory database");
            db.initialize().expect("Failed to initialize schema");
        }

        // Test file database path
        let temp_path = std::env::temp_dir().join("picshare_connection_test.db");
        let db = Database::from_url(&format!("sqlite:///{}", temp_path.display()))
            .expect("Failed to create file database");
        db.initialize().expect("Failed to initialize file schema");
        assert!(temp_path.exists());

        // Cleanup
        drop(db);
        let _ = std::fs::remove_file(temp_path);
    }
}
