//! Canonical structural contract for the picshare tables.
//!
//! The five entities live in [`entities`] as static metadata. Storage (the
//! SQLite DDL in [`ddl`]) and the diagram renderer are both derived from it.

pub mod ddl;
pub mod definition;
pub mod entities;

pub use ddl::{create_index_sql, create_table_sql, quote_ident};
pub use definition::{
    Cardinality, CheckConstraint, ColumnType, CompositeIndex, DefaultValue, EntityDef, FieldDef,
    ForeignKey, IndexColumn, OnDelete, Relationship, SortDirection, UniqueConstraint,
};
pub use entities::{COMMENT, ENTITIES, FOLLOWER, LIKE, POST, USER};

/// All entity definitions, each listed after every entity it references.
pub fn entities() -> &'static [EntityDef] {
    ENTITIES
}

/// Look up an entity by entity name ("Like") or table name ("like").
pub fn entity(name: &str) -> Option<&'static EntityDef> {
    ENTITIES
        .iter()
        .find(|e| e.name == name || e.table == name)
}

/// Relationship edges derived from the foreign keys.
///
/// Every foreign key yields a one-to-many edge from the referenced entity to
/// the referencing one. An entity whose foreign keys all point at the same
/// target also yields a many-to-many edge on that target.
pub fn relationships() -> Vec<Relationship> {
    let mut edges = Vec::new();
    for def in ENTITIES {
        for (field, fk) in def.foreign_keys() {
            edges.push(Relationship {
                parent: fk.entity,
                child: def.name,
                cardinality: Cardinality::OneToMany,
                via: field.name,
                target_column: Some(fk.column),
                role: field.role,
                on_delete: Some(fk.on_delete),
            });
        }
        if def.is_self_association() {
            if let Some((_, fk)) = def.foreign_keys().next() {
                edges.push(Relationship {
                    parent: fk.entity,
                    child: fk.entity,
                    cardinality: Cardinality::ManyToMany,
                    via: def.name,
                    target_column: None,
                    role: None,
                    on_delete: None,
                });
            }
        }
    }
    edges
}

/// Foreign keys in other entities that point at `name`, as
/// `(referencing entity, column)` pairs. These are the rows a delete of
/// `name` cascades to directly.
pub fn dependents(name: &str) -> Vec<(&'static EntityDef, &'static FieldDef)> {
    let Some(target) = entity(name) else {
        return Vec::new();
    };
    let target_name = target.name;
    ENTITIES
        .iter()
        .flat_map(move |def| {
            def.fields
                .iter()
                .filter(move |f| f.references.is_some_and(|fk| fk.entity == target_name))
                .map(move |f| (def, f))
        })
        .collect()
}

/// SQL script creating every table and index. Safe to run repeatedly.
pub fn schema_sql() -> anyhow::Result<String> {
    ddl::compile(ENTITIES)
}

/// Sample rows for local development
/// - 3 users (ana, bo, cy)
/// - a few posts, comments and likes
/// - follow edges in both directions between ana and bo
pub const SAMPLE_DATA: &str = r#"
INSERT OR IGNORE INTO "user" (id, username, email, password, created_at) VALUES
    (1, 'ana', 'ana@x.com', 'not-a-real-hash-1', '2024-01-01 09:00:00'),
    (2, 'bo', 'bo@x.com', 'not-a-real-hash-2', '2024-01-02 09:00:00'),
    (3, 'cy', 'cy@x.com', 'not-a-real-hash-3', '2024-01-03 09:00:00');

INSERT OR IGNORE INTO "post" (id, user_id, image_url, caption, created_at) VALUES
    (10, 1, 'https://img.example/ana/beach.jpg', 'First light at the beach', '2024-01-10 07:30:00'),
    (11, 1, 'https://img.example/ana/coffee.jpg', NULL, '2024-01-11 08:15:00'),
    (12, 2, 'https://img.example/bo/trail.jpg', 'Trail run before work', '2024-01-11 06:45:00'),
    (13, 3, NULL, 'Text-only post', '2024-01-12 20:00:00');

INSERT OR IGNORE INTO "comment" (id, user_id, post_id, content, created_at) VALUES
    (100, 2, 10, 'Gorgeous colors!', '2024-01-10 08:00:00'),
    (101, 3, 10, 'Which beach is this?', '2024-01-10 09:12:00'),
    (102, 1, 12, 'How far did you go?', '2024-01-11 07:05:00');

INSERT OR IGNORE INTO "like" (id, user_id, post_id, created_at) VALUES
    (1000, 2, 10, '2024-01-10 08:01:00'),
    (1001, 3, 10, '2024-01-10 09:10:00'),
    (1002, 1, 12, '2024-01-11 07:00:00'),
    (1003, 2, 13, '2024-01-12 21:00:00');

INSERT OR IGNORE INTO "follower" (id, user_from_id, user_to_id, created_at) VALUES
    (1, 1, 2, '2024-01-04 10:00:00'),
    (2, 2, 1, '2024-01-04 10:05:00'),
    (3, 3, 1, '2024-01-05 12:00:00');
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_entities_in_dependency_order() {
        let names: Vec<_> = entities().iter().map(|e| e.name).collect();
        assert_eq!(names, ["User", "Post", "Comment", "Like", "Follower"]);

        for (position, def) in entities().iter().enumerate() {
            for (_, fk) in def.foreign_keys() {
                let target = entities()
                    .iter()
                    .position(|e| e.name == fk.entity)
                    .expect("foreign key target must be declared");
                assert!(target < position, "{} references {} before it exists", def.name, fk.entity);
            }
        }
    }

    #[test]
    fn test_entity_lookup_by_name_or_table() {
        assert_eq!(entity("Like").map(|e| e.table), Some("like"));
        assert_eq!(entity("follower").map(|e| e.name), Some("Follower"));
        assert!(entity("hashtag").is_none());
    }

    #[test]
    fn test_user_columns() {
        let user = entity("User").unwrap();
        let username = user.field("username").unwrap();
        assert_eq!(username.column_type, ColumnType::String(50));
        assert!(username.unique && username.indexed && !username.nullable);

        let email = user.field("email").unwrap();
        assert_eq!(email.column_type, ColumnType::String(120));
        assert!(email.unique && email.indexed && !email.nullable);

        let password = user.field("password").unwrap();
        assert_eq!(password.column_type, ColumnType::String(255));
        assert!(!password.nullable && !password.unique);

        assert_eq!(user.primary_key().map(|f| f.name), Some("id"));
    }

    #[test]
    fn test_every_entity_has_surrogate_key_and_created_at() {
        for def in entities() {
            let pk = def.primary_key().expect("primary key");
            assert_eq!(pk.name, "id");
            assert_eq!(pk.column_type, ColumnType::Integer);

            let created = def.field("created_at").expect("created_at");
            assert_eq!(created.column_type, ColumnType::Timestamp);
            assert_eq!(created.default, Some(DefaultValue::CurrentTimestamp));
            assert!(!created.nullable);
        }
    }

    #[test]
    fn test_optional_post_columns() {
        let post = entity("Post").unwrap();
        assert!(post.field("image_url").unwrap().nullable);
        assert_eq!(post.field("caption").unwrap().column_type, ColumnType::String(2200));
        assert_eq!(entity("Comment").unwrap().field("content").unwrap().column_type, ColumnType::Text);
    }

    #[test]
    fn test_every_foreign_key_cascades() {
        for def in entities() {
            for (field, fk) in def.foreign_keys() {
                assert_eq!(fk.on_delete, OnDelete::Cascade, "{}.{}", def.name, field.name);
                assert!(field.indexed, "{}.{} should be indexed", def.name, field.name);
                assert!(!field.nullable, "{}.{} should be required", def.name, field.name);
            }
        }
    }

    #[test]
    fn test_declared_constraints() {
        assert!(entity("User").unwrap().unique_constraints.is_empty());

        let like = entity("Like").unwrap();
        assert_eq!(like.unique_constraints.len(), 1);
        assert_eq!(like.unique_constraints[0].columns, ["user_id", "post_id"]);

        let follower = entity("Follower").unwrap();
        assert_eq!(follower.unique_constraints[0].name, "uq_follow_unique");
        assert_eq!(follower.unique_constraints[0].columns, ["user_from_id", "user_to_id"]);
        assert_eq!(follower.check_constraints[0].name, "ck_no_self_follow");

        let post = entity("Post").unwrap();
        assert_eq!(post.indexes[0].name, "ix_post_user_created");
        assert_eq!(post.indexes[0].columns[1].direction, SortDirection::Desc);

        assert!(entity("Comment").unwrap().check_constraints.is_empty());
    }

    #[test]
    fn test_relationships() {
        let edges = relationships();
        let one_to_many: Vec<_> = edges
            .iter()
            .filter(|r| r.cardinality == Cardinality::OneToMany)
            .map(|r| (r.parent, r.child, r.via))
            .collect();

        assert_eq!(
            one_to_many,
            [
                ("User", "Post", "user_id"),
                ("User", "Comment", "user_id"),
                ("Post", "Comment", "post_id"),
                ("User", "Like", "user_id"),
                ("Post", "Like", "post_id"),
                ("User", "Follower", "user_from_id"),
                ("User", "Follower", "user_to_id"),
            ]
        );

        let many_to_many: Vec<_> = edges
            .iter()
            .filter(|r| r.cardinality == Cardinality::ManyToMany)
            .collect();
        assert_eq!(many_to_many.len(), 1);
        assert_eq!(many_to_many[0].parent, "User");
        assert_eq!(many_to_many[0].child, "User");
        assert_eq!(many_to_many[0].via, "Follower");

        assert!(edges
            .iter()
            .filter(|r| r.cardinality == Cardinality::OneToMany)
            .all(|r| r.target_column == Some("id")));
        assert_eq!(many_to_many[0].target_column, None);

        let roles: Vec<_> = edges.iter().filter_map(|r| r.role).collect();
        assert_eq!(roles, ["follower", "followed"]);
    }

    #[test]
    fn test_dependents() {
        let user_deps: Vec<_> = dependents("User")
            .into_iter()
            .map(|(def, field)| (def.name, field.name))
            .collect();
        assert_eq!(
            user_deps,
            [
                ("Post", "user_id"),
                ("Comment", "user_id"),
                ("Like", "user_id"),
                ("Follower", "user_from_id"),
                ("Follower", "user_to_id"),
            ]
        );

        let post_deps: Vec<_> = dependents("post").into_iter().map(|(def, _)| def.name).collect();
        assert_eq!(post_deps, ["Comment", "Like"]);

        assert!(dependents("Follower").is_empty());
        assert!(dependents("missing").is_empty());
    }

    #[test]
    fn test_metadata_serializes_to_json() {
        let json = serde_json::to_value(entities()).expect("Failed to serialize schema");
        assert_eq!(json[0]["table"], "user");
        assert_eq!(json[0]["fields"][1]["column_type"]["kind"], "string");
        assert_eq!(json[0]["fields"][1]["column_type"]["max_length"], 50);
        assert_eq!(json[4]["check_constraints"][0]["name"], "ck_no_self_follow");
    }
}
