use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use picshare_store::config::Settings;
use picshare_store::db::schema::{entities, schema_sql};
use picshare_store::db::{Database, DatabaseTarget};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Picshare Schema Utility
///
/// Creates the picshare tables in a SQLite database and prints the schema
/// as SQL or JSON.
#[derive(Parser, Debug)]
#[command(name = "picshare-migrate")]
#[command(about = "Create and describe the picshare database schema", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create every table and index at the target database
    Init {
        /// Connection string, e.g. sqlite:///instagram.db
        /// (defaults to database.url from settings)
        #[arg(short, long)]
        database: Option<String>,

        /// Insert the sample users, posts, comments, likes and follows
        #[arg(long)]
        seed: bool,
    },
    /// Print the schema
    Schema {
        #[arg(short, long, value_enum, default_value_t = SchemaFormat::Sql)]
        format: SchemaFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SchemaFormat {
    Sql,
    Json,
}

/// Statistics reported after `init`
#[derive(Debug, Default)]
struct InitReport {
    tables: Vec<String>,
    seeded: bool,
}

fn resolve_database_url(database: Option<String>) -> Result<String> {
    match database {
        Some(url) => Ok(url),
        None => {
            let settings = Settings::new().context("Failed to load settings")?;
            Ok(settings.database.url)
        }
    }
}

fn init_database(url: &str, seed: bool) -> Result<InitReport> {
    if let DatabaseTarget::File(path) = DatabaseTarget::parse(url)? {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let db = Database::from_url(url).context("Failed to open database connection")?;
    db.initialize()?;
    if seed {
        db.seed_sample_data()?;
    }

    Ok(InitReport {
        tables: db.table_names()?,
        seeded: seed,
    })
}

fn render_schema(format: SchemaFormat) -> Result<String> {
    match format {
        SchemaFormat::Sql => schema_sql(),
        SchemaFormat::Json => {
            serde_json::to_string_pretty(entities()).context("Failed to serialize schema")
        }
    }
}

/// Display init results in a formatted way
fn display_report(url: &str, report: &InitReport) {
    println!();
    println!("Schema Summary");
    println!("==============");
    println!();
    println!("Database: {}", url);
    println!("Tables ({}): {}", report.tables.len(), report.tables.join(", "));
    if report.seeded {
        println!("Sample data: inserted");
    }
    println!();
    println!("Schema created successfully!");
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "picshare_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Init { database, seed } => {
            let url = resolve_database_url(database)?;
            let report = init_database(&url, seed)?;
            display_report(&url, &report);
        }
        Command::Schema { format } => {
            println!("{}", render_schema(format)?);
        }
    }

    Ok(())
}
