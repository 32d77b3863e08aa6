//! Backend-agnostic schema metadata.
//!
//! Entities are described as static, read-only data. The SQLite DDL compiler
//! and the diagram renderer both walk these definitions; nothing here talks
//! to a database.

use serde::Serialize;

/// Semantic column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "max_length", rename_all = "snake_case")]
pub enum ColumnType {
    /// Surrogate keys and foreign keys
    Integer,
    /// Bounded string with a maximum length in characters
    String(u32),
    /// Unbounded text
    Text,
    /// Date and time, stored in UTC
    Timestamp,
}

impl ColumnType {
    /// SQLite declared type.
    pub fn sql_type(&self) -> String {
        match self {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::String(len) => format!("VARCHAR({})", len),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Timestamp => "DATETIME".to_string(),
        }
    }

    /// Short type label used in diagrams.
    pub fn label(&self) -> String {
        match self {
            ColumnType::Integer => "integer".to_string(),
            ColumnType::String(len) => format!("varchar({})", len),
            ColumnType::Text => "text".to_string(),
            ColumnType::Timestamp => "datetime".to_string(),
        }
    }

    pub fn max_length(&self) -> Option<u32> {
        match self {
            ColumnType::String(len) => Some(*len),
            _ => None,
        }
    }
}

/// Rule applied when an insert omits the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// Row creation time, filled in by the storage engine
    CurrentTimestamp,
}

impl DefaultValue {
    pub fn sql(&self) -> &'static str {
        match self {
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP",
        }
    }
}

/// What happens to dependent rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
}

impl OnDelete {
    pub fn sql(&self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
        }
    }
}

/// Reference from a column to another entity's column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    /// Target entity name (e.g., "User")
    pub entity: &'static str,
    /// Target column, always the surrogate key here
    pub column: &'static str,
    pub on_delete: OnDelete,
}

/// A single column of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub nullable: bool,
    pub unique: bool,
    pub indexed: bool,
    pub default: Option<DefaultValue>,
    pub references: Option<ForeignKey>,
    /// Role of a foreign key when an entity references the same target
    /// twice (e.g., "follower" / "followed").
    pub role: Option<&'static str>,
}

impl FieldDef {
    /// Nullable column with no constraints. Tweak with the builder methods.
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            primary_key: false,
            nullable: true,
            unique: false,
            indexed: false,
            default: None,
            references: None,
            role: None,
        }
    }

    /// Surrogate integer primary key.
    pub const fn id() -> Self {
        let mut field = Self::new("id", ColumnType::Integer);
        field.primary_key = true;
        field.nullable = false;
        field
    }

    /// Required, indexed foreign key with cascading delete.
    pub const fn foreign_key(name: &'static str, entity: &'static str) -> Self {
        let mut field = Self::new(name, ColumnType::Integer);
        field.nullable = false;
        field.indexed = true;
        field.references = Some(ForeignKey {
            entity,
            column: "id",
            on_delete: OnDelete::Cascade,
        });
        field
    }

    /// Required creation timestamp defaulting to now.
    pub const fn created_at() -> Self {
        let mut field = Self::new("created_at", ColumnType::Timestamp);
        field.nullable = false;
        field.default = Some(DefaultValue::CurrentTimestamp);
        field
    }

    pub const fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub const fn role(mut self, role: &'static str) -> Self {
        self.role = Some(role);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexColumn {
    pub name: &'static str,
    pub direction: SortDirection,
}

/// Index spanning several columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompositeIndex {
    pub name: &'static str,
    pub columns: &'static [IndexColumn],
}

/// Multi-column uniqueness rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UniqueConstraint {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

/// Row-level predicate every insert and update must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckConstraint {
    pub name: &'static str,
    /// SQL boolean expression over the row's columns
    pub expression: &'static str,
}

/// A complete entity (one table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityDef {
    /// Entity name (e.g., "User")
    pub name: &'static str,
    /// Table name (e.g., "user")
    pub table: &'static str,
    pub fields: &'static [FieldDef],
    pub unique_constraints: &'static [UniqueConstraint],
    pub check_constraints: &'static [CheckConstraint],
    pub indexes: &'static [CompositeIndex],
}

impl EntityDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Fields that reference another entity, in declaration order.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&FieldDef, &ForeignKey)> {
        self.fields
            .iter()
            .filter_map(|f| f.references.as_ref().map(|fk| (f, fk)))
    }

    /// True when the entity only links two rows of one other entity, like
    /// a follow edge between two users.
    pub fn is_self_association(&self) -> bool {
        let mut targets = self.foreign_keys().map(|(_, fk)| fk.entity);
        match targets.next() {
            Some(first) => {
                let rest: Vec<_> = targets.collect();
                !rest.is_empty() && rest.iter().all(|t| *t == first)
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToMany,
    ManyToMany,
}

impl Cardinality {
    pub fn label(&self) -> &'static str {
        match self {
            Cardinality::OneToMany => "1:N",
            Cardinality::ManyToMany => "N:N",
        }
    }
}

/// Edge between two entities, derived from foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Relationship {
    /// The "one" side for 1:N, the associated entity for N:N
    pub parent: &'static str,
    /// The "many" side for 1:N, the associated entity for N:N
    pub child: &'static str,
    pub cardinality: Cardinality,
    /// Foreign key column (1:N) or association entity (N:N)
    pub via: &'static str,
    /// Column on the parent that `via` references (1:N only)
    pub target_column: Option<&'static str>,
    pub role: Option<&'static str>,
    pub on_delete: Option<OnDelete>,
}
