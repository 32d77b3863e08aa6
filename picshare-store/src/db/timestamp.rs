use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;

/// SQLite's `CURRENT_TIMESTAMP` layout plus optional fractional seconds.
/// `%.f` emits nothing for whole seconds, so values still sort as text
/// against column defaults.
const SQLITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Format a timestamp the way SQLite stores column defaults, keeping any
/// sub-second part.
pub fn to_sql(ts: &DateTime<Utc>) -> String {
    ts.format(SQLITE_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts SQLite's default format (with or
/// without fractional seconds) and RFC 3339.
pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        Ok(naive) => Ok(naive.and_utc()),
        Err(_) => DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)),
    }
}

/// Read a timestamp column from a row.
pub fn column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
