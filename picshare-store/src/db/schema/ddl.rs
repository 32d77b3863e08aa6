//! SQLite DDL compiled from the entity metadata.

use anyhow::{bail, Result};

use super::definition::{ColumnType, EntityDef, FieldDef};

/// Quote an identifier. `user` and `like` are SQL keywords.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Name of the length check generated for a bounded string column.
pub fn length_check_name(table: &str, column: &str) -> String {
    format!("ck_{}_{}_length", table, column)
}

/// Name of the single-column index generated for an indexed column.
pub fn column_index_name(table: &str, column: &str) -> String {
    format!("ix_{}_{}", table, column)
}

fn column_sql(field: &FieldDef) -> String {
    let mut sql = format!("{} {}", quote_ident(field.name), field.column_type.sql_type());
    if field.primary_key {
        // INTEGER PRIMARY KEY makes the column an alias for the rowid
        sql.push_str(" PRIMARY KEY");
        return sql;
    }
    if !field.nullable {
        sql.push_str(" NOT NULL");
    }
    // Unique + indexed columns get a named unique index instead
    if field.unique && !field.indexed {
        sql.push_str(" UNIQUE");
    }
    if let Some(default) = field.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default.sql());
    }
    sql
}

/// `CREATE TABLE` statement for one entity. Foreign key targets are
/// resolved against `known` (or `def` itself) and must be present.
pub fn create_table_sql(def: &EntityDef, known: &[EntityDef]) -> Result<String> {
    let mut lines: Vec<String> = def.fields.iter().map(column_sql).collect();

    // SQLite does not enforce VARCHAR lengths
    for field in def.fields {
        if let ColumnType::String(max) = field.column_type {
            lines.push(format!(
                "CONSTRAINT {} CHECK (length({}) <= {})",
                quote_ident(&length_check_name(def.table, field.name)),
                quote_ident(field.name),
                max
            ));
        }
    }

    for unique in def.unique_constraints {
        let columns: Vec<String> = unique.columns.iter().map(|c| quote_ident(c)).collect();
        lines.push(format!(
            "CONSTRAINT {} UNIQUE ({})",
            quote_ident(unique.name),
            columns.join(", ")
        ));
    }

    for check in def.check_constraints {
        lines.push(format!(
            "CONSTRAINT {} CHECK ({})",
            quote_ident(check.name),
            check.expression
        ));
    }

    for (field, fk) in def.foreign_keys() {
        let Some(target) = std::iter::once(def)
            .chain(known)
            .find(|e| e.name == fk.entity)
        else {
            bail!(
                "{}.{} references unknown entity '{}'",
                def.name,
                field.name,
                fk.entity
            );
        };
        let target_table = target.table;
        lines.push(format!(
            "FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {}",
            quote_ident(field.name),
            quote_ident(target_table),
            quote_ident(fk.column),
            fk.on_delete.sql()
        ));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        quote_ident(def.table),
        lines.join(",\n    ")
    ))
}

/// `CREATE INDEX` statements for one entity: indexed columns first, then
/// composite indexes.
pub fn create_index_sql(def: &EntityDef) -> Vec<String> {
    let mut statements = Vec::new();

    for field in def.fields.iter().filter(|f| f.indexed && !f.primary_key) {
        let kind = if field.unique { "UNIQUE INDEX" } else { "INDEX" };
        statements.push(format!(
            "CREATE {} IF NOT EXISTS {} ON {} ({});",
            kind,
            quote_ident(&column_index_name(def.table, field.name)),
            quote_ident(def.table),
            quote_ident(field.name)
        ));
    }

    for index in def.indexes {
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name), c.direction.sql()))
            .collect();
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
            quote_ident(index.name),
            quote_ident(def.table),
            columns.join(", ")
        ));
    }

    statements
}

/// Full schema script for the given entities, in order. Every foreign key
/// has to point at one of `entities`.
pub fn compile(entities: &[EntityDef]) -> Result<String> {
    let mut script = String::new();
    for def in entities {
        script.push_str(&format!("-- {}\n", def.name));
        script.push_str(&create_table_sql(def, entities)?);
        script.push('\n');
        for statement in create_index_sql(def) {
            script.push_str(&statement);
            script.push('\n');
        }
        script.push('\n');
    }
    Ok(script)
}
