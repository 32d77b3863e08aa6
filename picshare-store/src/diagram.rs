//! Entity-relationship diagrams rendered from the schema metadata.
//!
//! DOT and Mermaid are produced as text. Image formats are DOT handed to the
//! Graphviz `dot` executable by the caller.

use std::fmt::Write;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};

use crate::db::schema::{Cardinality, EntityDef, FieldDef, Relationship};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramFormat {
    Dot,
    Mermaid,
    Png,
    Svg,
}

impl DiagramFormat {
    /// Infer the format from a file extension (`diagram.png`, `schema.mmd`).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| anyhow!("Cannot infer diagram format from '{}'", path.display()))?;
        ext.parse()
    }

    /// True when the output has to go through Graphviz.
    pub fn is_image(&self) -> bool {
        matches!(self, DiagramFormat::Png | DiagramFormat::Svg)
    }

    /// Argument for `dot -T<format>`.
    pub fn graphviz_format(&self) -> Option<&'static str> {
        match self {
            DiagramFormat::Png => Some("png"),
            DiagramFormat::Svg => Some("svg"),
            _ => None,
        }
    }
}

impl FromStr for DiagramFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dot" | "gv" => Ok(DiagramFormat::Dot),
            "mermaid" | "mmd" => Ok(DiagramFormat::Mermaid),
            "png" => Ok(DiagramFormat::Png),
            "svg" => Ok(DiagramFormat::Svg),
            other => bail!("Unknown diagram format '{}'", other),
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn field_markers(field: &FieldDef) -> Vec<&'static str> {
    let mut markers = Vec::new();
    if field.primary_key {
        markers.push("PK");
    }
    if field.references.is_some() {
        markers.push("FK");
    }
    if field.unique {
        markers.push("UK");
    }
    markers
}

fn dot_field_row(field: &FieldDef) -> String {
    let name = if field.primary_key {
        format!("<U>{}</U>", escape_html(field.name))
    } else {
        escape_html(field.name)
    };
    let mut cell = format!("{} [{}]", name, escape_html(&field.column_type.label()));
    let markers = field_markers(field);
    if !markers.is_empty() {
        let _ = write!(cell, " {}", markers.join(","));
    }
    if !field.nullable {
        cell.push_str(" NOT NULL");
    }
    format!(
        "<TR><TD ALIGN=\"LEFT\" PORT=\"{}\">{}</TD></TR>",
        field.name, cell
    )
}

fn edge_label(rel: &Relationship) -> String {
    match rel.role {
        Some(role) => format!("{} {}", rel.cardinality.label(), role),
        None => format!("{} {}", rel.cardinality.label(), rel.via),
    }
}

/// Graphviz digraph with one HTML-like table per entity and one edge per
/// relationship.
pub fn render_dot(entities: &[EntityDef], relationships: &[Relationship]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph picshare {{");
    let _ = writeln!(out, "    graph [rankdir=LR];");
    let _ = writeln!(out, "    node [shape=plaintext, fontname=\"Helvetica\"];");
    let _ = writeln!(out, "    edge [fontname=\"Helvetica\", fontsize=10];");

    for def in entities {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "    \"{}\" [label=<<TABLE BORDER=\"0\" CELLBORDER=\"1\" CELLSPACING=\"0\">",
            def.name
        );
        let _ = writeln!(
            out,
            "        <TR><TD BGCOLOR=\"lightgrey\"><B>{}</B></TD></TR>",
            escape_html(def.name)
        );
        for field in def.fields {
            let _ = writeln!(out, "        {}", dot_field_row(field));
        }
        let _ = writeln!(out, "    </TABLE>>];");
    }

    if !relationships.is_empty() {
        let _ = writeln!(out);
    }
    for rel in relationships {
        match rel.cardinality {
            Cardinality::OneToMany => {
                let tail = match rel.target_column {
                    Some(column) => format!("\"{}\":{}", rel.parent, column),
                    None => format!("\"{}\"", rel.parent),
                };
                let _ = writeln!(
                    out,
                    "    {} -> \"{}\":{} [label=\"{}\", arrowhead=crow];",
                    tail,
                    rel.child,
                    rel.via,
                    edge_label(rel)
                );
            }
            Cardinality::ManyToMany => {
                let _ = writeln!(
                    out,
                    "    \"{}\" -> \"{}\" [label=\"{}\", dir=both, arrowhead=crow, arrowtail=crow, style=dashed];",
                    rel.parent,
                    rel.child,
                    edge_label(rel)
                );
            }
        }
    }

    out.push_str("}\n");
    out
}

fn mermaid_type(field: &FieldDef) -> &'static str {
    use crate::db::schema::ColumnType;
    match field.column_type {
        ColumnType::Integer => "integer",
        ColumnType::String(_) => "varchar",
        ColumnType::Text => "text",
        ColumnType::Timestamp => "datetime",
    }
}

fn mermaid_comment(field: &FieldDef) -> Option<String> {
    let mut notes = Vec::new();
    if let Some(len) = field.column_type.max_length() {
        notes.push(format!("max {}", len));
    }
    if field.nullable && !field.primary_key {
        notes.push("nullable".to_string());
    }
    if notes.is_empty() {
        None
    } else {
        Some(notes.join(", "))
    }
}

/// Mermaid `erDiagram` with the same content as [`render_dot`].
pub fn render_mermaid(entities: &[EntityDef], relationships: &[Relationship]) -> String {
    let mut out = String::from("erDiagram\n");

    for def in entities {
        let _ = writeln!(out, "    {} {{", def.name);
        for field in def.fields {
            let _ = write!(out, "        {} {}", mermaid_type(field), field.name);
            let markers = field_markers(field);
            if !markers.is_empty() {
                let _ = write!(out, " {}", markers.join(","));
            }
            if let Some(comment) = mermaid_comment(field) {
                let _ = write!(out, " \"{}\"", comment);
            }
            out.push('\n');
        }
        let _ = writeln!(out, "    }}");
    }

    for rel in relationships {
        let connector = match rel.cardinality {
            Cardinality::OneToMany => "||--o{",
            Cardinality::ManyToMany => "}o..o{",
        };
        let _ = writeln!(
            out,
            "    {} {} {} : \"{}\"",
            rel.parent,
            connector,
            rel.child,
            edge_label(rel)
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{entities, relationships};

    #[test]
    fn test_format_from_name_and_extension() {
        assert_eq!("DOT".parse::<DiagramFormat>().unwrap(), DiagramFormat::Dot);
        assert_eq!("mmd".parse::<DiagramFormat>().unwrap(), DiagramFormat::Mermaid);
        assert_eq!(
            DiagramFormat::from_path(Path::new("out/diagram.png")).unwrap(),
            DiagramFormat::Png
        );
        assert!(DiagramFormat::from_path(Path::new("diagram")).is_err());
        assert!("pdf".parse::<DiagramFormat>().is_err());

        assert!(DiagramFormat::Svg.is_image());
        assert!(!DiagramFormat::Mermaid.is_image());
        assert_eq!(DiagramFormat::Png.graphviz_format(), Some("png"));
        assert_eq!(DiagramFormat::Dot.graphviz_format(), None);
    }

    #[test]
    fn test_dot_has_every_entity_and_edge() {
        let rels = relationships();
        let dot = render_dot(entities(), &rels);

        assert!(dot.starts_with("digraph picshare {"));
        assert!(dot.trim_end().ends_with('}'));
        for def in entities() {
            assert!(dot.contains(&format!("\"{}\" [label=<", def.name)), "missing {}", def.name);
        }
        assert_eq!(dot.matches(" -> ").count(), rels.len());

        assert!(dot.contains("<U>id</U> [integer] PK NOT NULL"));
        assert!(dot.contains("username [varchar(50)] UK NOT NULL"));
        assert!(dot.contains("caption [varchar(2200)]</TD>"));
        assert!(dot.contains("\"User\":id -> \"Follower\":user_from_id [label=\"1:N follower\""));
        assert!(dot.contains("\"User\" -> \"User\" [label=\"N:N Follower\""));
    }

    #[test]
    fn test_mermaid_output() {
        let mermaid = render_mermaid(entities(), &relationships());

        assert!(mermaid.starts_with("erDiagram\n"));
        assert!(mermaid.contains("    Like {\n"));
        assert!(mermaid.contains("        integer post_id FK\n"));
        assert!(mermaid.contains("        varchar email UK \"max 120\"\n"));
        assert!(mermaid.contains("        varchar image_url \"max 255, nullable\"\n"));
        assert!(mermaid.contains("    Post ||--o{ Comment : \"1:N post_id\""));
        assert!(mermaid.contains("    User }o..o{ User : \"N:N Follower\""));
    }

    #[test]
    fn test_dot_edge_tail_uses_referenced_column() {
        let rels = [
            Relationship {
                parent: "User",
                child: "Post",
                cardinality: Cardinality::OneToMany,
                via: "author_handle",
                target_column: Some("username"),
                role: None,
                on_delete: None,
            },
            Relationship {
                parent: "User",
                child: "Post",
                cardinality: Cardinality::OneToMany,
                via: "user_id",
                target_column: None,
                role: None,
                on_delete: None,
            },
        ];
        let dot = render_dot(&[], &rels);
        assert!(dot.contains("    \"User\":username -> \"Post\":author_handle [label=\"1:N author_handle\""));
        assert!(dot.contains("    \"User\" -> \"Post\":user_id [label=\"1:N user_id\""));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(render_dot(&[], &[]).lines().last(), Some("}"));
        assert_eq!(render_mermaid(&[], &[]), "erDiagram\n");
    }
}
