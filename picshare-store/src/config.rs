use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:///instagram.db";
pub const DEFAULT_DIAGRAM_OUTPUT: &str = "diagram.png";

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Diagram {
    pub output: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: Database,
    pub diagram: Diagram,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("database.url", DEFAULT_DATABASE_URL)?
            .set_default("diagram.output", DEFAULT_DIAGRAM_OUTPUT)?;

        // settings.toml is optional; the working directory wins over the
        // crate directory used during development
        let config_file_name = "settings.toml";
        for path in [
            PathBuf::from("picshare-store").join(config_file_name),
            PathBuf::from(config_file_name),
        ] {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        // Environment variables have the highest priority
        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }
        if let Ok(output) = std::env::var("DIAGRAM_OUTPUT") {
            builder = builder.set_override("diagram.output", output)?;
        }

        builder.build()?.try_deserialize()
    }
}
