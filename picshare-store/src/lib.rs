//! Storage layer for picshare: the schema metadata, its SQLite binding,
//! typed repositories and ER diagram rendering.

pub mod config;
pub mod db;
pub mod diagram;
