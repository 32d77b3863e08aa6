use super::definition::{
    CheckConstraint, ColumnType, CompositeIndex, EntityDef, FieldDef, IndexColumn, SortDirection,
    UniqueConstraint,
};

pub const USER: EntityDef = EntityDef {
    name: "User",
    table: "user",
    fields: &[
        FieldDef::id(),
        FieldDef::new("username", ColumnType::String(50))
            .required()
            .unique()
            .indexed(),
        FieldDef::new("email", ColumnType::String(120))
            .required()
            .unique()
            .indexed(),
        FieldDef::new("password", ColumnType::String(255)).required(),
        FieldDef::created_at(),
    ],
    unique_constraints: &[],
    check_constraints: &[],
    indexes: &[],
};

pub const POST: EntityDef = EntityDef {
    name: "Post",
    table: "post",
    fields: &[
        FieldDef::id(),
        FieldDef::foreign_key("user_id", "User"),
        FieldDef::new("image_url", ColumnType::String(255)),
        FieldDef::new("caption", ColumnType::String(2200)),
        FieldDef::created_at(),
    ],
    unique_constraints: &[],
    check_constraints: &[],
    // "most recent posts by user"
    indexes: &[CompositeIndex {
        name: "ix_post_user_created",
        columns: &[
            IndexColumn {
                name: "user_id",
                direction: SortDirection::Asc,
            },
            IndexColumn {
                name: "created_at",
                direction: SortDirection::Desc,
            },
        ],
    }],
};

pub const COMMENT: EntityDef = EntityDef {
    name: "Comment",
    table: "comment",
    fields: &[
        FieldDef::id(),
        FieldDef::foreign_key("user_id", "User"),
        FieldDef::foreign_key("post_id", "Post"),
        FieldDef::new("content", ColumnType::Text).required(),
        FieldDef::created_at(),
    ],
    unique_constraints: &[],
    check_constraints: &[],
    indexes: &[],
};

pub const LIKE: EntityDef = EntityDef {
    name: "Like",
    table: "like",
    fields: &[
        FieldDef::id(),
        FieldDef::foreign_key("user_id", "User"),
        FieldDef::foreign_key("post_id", "Post"),
        FieldDef::created_at(),
    ],
    unique_constraints: &[UniqueConstraint {
        name: "uq_like_user_post",
        columns: &["user_id", "post_id"],
    }],
    check_constraints: &[],
    indexes: &[],
};

pub const FOLLOWER: EntityDef = EntityDef {
    name: "Follower",
    table: "follower",
    fields: &[
        FieldDef::id(),
        FieldDef::foreign_key("user_from_id", "User").role("follower"),
        FieldDef::foreign_key("user_to_id", "User").role("followed"),
        FieldDef::created_at(),
    ],
    unique_constraints: &[UniqueConstraint {
        name: "uq_follow_unique",
        columns: &["user_from_id", "user_to_id"],
    }],
    check_constraints: &[CheckConstraint {
        name: "ck_no_self_follow",
        expression: "user_from_id <> user_to_id",
    }],
    indexes: &[],
};

/// Every entity, parents before children.
pub const ENTITIES: &[EntityDef] = &[USER, POST, COMMENT, LIKE, FOLLOWER];
