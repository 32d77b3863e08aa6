use anyhow::{Context, Result};
use clap::Parser;
use picshare_store::config::Settings;
use picshare_store::db::schema::{ddl, entities, quote_ident, EntityDef};
use picshare_store::db::{Database, DatabaseTarget};
use rusqlite::Connection;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Database Schema Inspector
///
/// This tool inspects a SQLite database and reports which picshare tables
/// and indexes exist, along with their columns and row counts.
#[derive(Parser, Debug)]
#[command(name = "inspect-db")]
#[command(about = "Inspect picshare database schema", long_about = None)]
struct Args {
    /// Connection string (defaults to database.url from settings)
    #[arg(short, long)]
    database: Option<String>,
}

#[derive(Debug)]
struct TableInfo {
    name: &'static str,
    exists: bool,
    columns: Vec<ColumnInfo>,
    rows: Option<i64>,
}

#[derive(Debug, PartialEq)]
struct ColumnInfo {
    name: String,
    type_name: String,
    not_null: bool,
    pk: bool,
}

/// Index names the schema declares for an entity
fn expected_indexes(def: &EntityDef) -> Vec<String> {
    def.fields
        .iter()
        .filter(|f| f.indexed)
        .map(|f| ddl::column_index_name(def.table, f.name))
        .chain(def.indexes.iter().map(|ix| ix.name.to_string()))
        .collect()
}

fn inspect(conn: &Connection) -> Result<Vec<TableInfo>> {
    let mut infos = Vec::new();
    for def in entities() {
        let exists = check_table_exists(conn, def.table)?;
        let (columns, rows) = if exists {
            (get_table_columns(conn, def.table)?, Some(count_records(conn, def.table)?))
        } else {
            (Vec::new(), None)
        };
        infos.push(TableInfo {
            name: def.table,
            exists,
            columns,
            rows,
        });
    }
    Ok(infos)
}

/// `RUST_LOG` if set, otherwise store logs at info
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "picshare_store=info".into())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let url = match args.database {
        Some(url) => url,
        None => Settings::new().context("Failed to load settings")?.database.url,
    };

    println!("Picshare Database Schema Inspector");
    println!("==================================");
    println!();
    println!("Database: {}", url);
    println!();

    if let DatabaseTarget::File(path) = DatabaseTarget::parse(&url)? {
        if !path.exists() {
            println!("❌ Database file not found: {}", path.display());
            return Ok(());
        }
    }

    let db = Database::from_url(&url).context("Failed to open database connection")?;
    let conn = db.connection()?;

    println!("✓ Database is accessible");
    println!();

    println!("Checking for schema tables:");
    println!("---------------------------");

    let table_infos = inspect(&conn)?;
    for info in &table_infos {
        match info.rows {
            Some(rows) => println!("  ✓ {} ({} records)", info.name, rows),
            None => println!("  ❌ {} (MISSING)", info.name),
        }
    }

    println!();
    println!("Table Details:");
    println!("--------------");

    for info in table_infos.iter().filter(|t| t.exists) {
        println!();
        println!("Table: {}", info.name);
        println!("Columns:");
        for col in &info.columns {
            let pk_marker = if col.pk { " (PRIMARY KEY)" } else { "" };
            let null_marker = if col.not_null { " NOT NULL" } else { "" };
            println!("  - {} : {}{}{}", col.name, col.type_name, null_marker, pk_marker);
        }
    }

    println!();
    println!("Checking for indexes:");
    println!("---------------------");

    for def in entities() {
        for index_name in expected_indexes(def) {
            if check_index_exists(&conn, &index_name)? {
                println!("  ✓ {}", index_name);
            } else {
                println!("  ❌ {} (MISSING)", index_name);
            }
        }
    }

    println!();
    println!("Summary:");
    println!("--------");

    if table_infos.iter().all(|t| t.exists) {
        println!("✓ All schema tables exist");
    } else {
        println!("❌ Some schema tables are missing");
        println!();
        println!("To fix this, run: picshare-migrate init --database {}", url);
    }

    Ok(())
}

fn check_table_exists(conn: &Connection, table_name: &str) -> Result<bool> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
        [table_name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn check_index_exists(conn: &Connection, index_name: &str) -> Result<bool> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name=?",
        [index_name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn get_table_columns(conn: &Connection, table_name: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table_name)))?;

    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                type_name: row.get(2)?,
                not_null: row.get::<_, i32>(3)? != 0,
                pk: row.get::<_, i32>(5)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(columns)
}

fn count_records(conn: &Connection, table_name: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table_name)),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_empty_database() {
        let db = Database::in_memory().expect("Failed to create database");
        let conn = db.connection().unwrap();
        let infos = inspect(&conn).unwrap();
        assert_eq!(infos.len(), 5);
        assert!(infos.iter().all(|t| !t.exists && t.rows.is_none()));
    }

    #[test]
    fn test_inspect_seeded_database() {
        let db = Database::in_memory().expect("Failed to create database");
        db.initialize().unwrap();
        db.seed_sample_data().unwrap();
        let conn = db.connection().unwrap();

        let infos = inspect(&conn).unwrap();
        let user = infos.iter().find(|t| t.name == "user").unwrap();
        assert_eq!(user.rows, Some(3));
        assert_eq!(
            user.columns[1],
            ColumnInfo {
                name: "username".to_string(),
                type_name: "VARCHAR(50)".to_string(),
                not_null: true,
                pk: false,
            }
        );
        assert!(user.columns[0].pk);

        for def in entities() {
            for index_name in expected_indexes(def) {
                assert!(check_index_exists(&conn, &index_name).unwrap(), "missing {}", index_name);
            }
        }
    }

    #[test]
    fn test_log_filter_defaults_to_store_info() {
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(log_filter().to_string(), "picshare_store=info");
        }
    }
}
