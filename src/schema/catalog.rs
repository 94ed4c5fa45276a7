//! The service's catalog: users, their preferences, posts and categories.

use super::types::*;
use ColumnType::*;

pub const USER: &str = "user";
pub const USER_PREFERENCES: &str = "user_preferences";
pub const POST: &str = "post";
pub const CATEGORY: &str = "category";
pub const POST_CATEGORY: &str = "post_category";

pub const USER_ROLE: &str = "user_role";

/// Build the catalog with every table and type placed in `namespace`.
pub fn app_catalog(namespace: &str) -> Catalog {
    Catalog {
        namespace: namespace.to_string(),
        enums: vec![EnumDef {
            name: USER_ROLE,
            values: vec!["ADMIN", "BASIC"],
        }],
        entities: vec![user(), user_preferences(), post(), category(), post_category()],
        relations: relations(),
    }
}

fn id_column() -> ColumnDef {
    ColumnDef::new("id", Uuid).default(ColumnDefault::RandomUuid)
}

fn user() -> EntityDef {
    EntityDef {
        name: USER,
        columns: vec![
            id_column(),
            ColumnDef::new("name", Varchar(255)),
            ColumnDef::new("age", Integer),
            ColumnDef::new("email", Varchar(255)),
            ColumnDef::new("role", Enum(USER_ROLE)).default(ColumnDefault::Literal("'BASIC'")),
        ],
        primary_key: vec!["id"],
        unique: vec![
            UniqueConstraint {
                name: "user_name_age_unique",
                columns: vec!["name", "age"],
            },
            UniqueConstraint {
                name: "user_email_unique",
                columns: vec!["email"],
            },
        ],
        foreign_keys: vec![],
    }
}

fn user_preferences() -> EntityDef {
    EntityDef {
        name: USER_PREFERENCES,
        columns: vec![
            id_column(),
            ColumnDef::new("email_updates", Boolean).default(ColumnDefault::Literal("false")),
            ColumnDef::new("user_id", Uuid),
        ],
        primary_key: vec!["id"],
        unique: vec![],
        foreign_keys: vec![ForeignKey {
            column: "user_id",
            references: USER,
            references_column: "id",
            on_delete: OnDelete::Cascade,
        }],
    }
}

fn post() -> EntityDef {
    EntityDef {
        name: POST,
        columns: vec![
            id_column(),
            ColumnDef::new("title", Varchar(255)),
            ColumnDef::new("average_rating", Real).default(ColumnDefault::Literal("0")),
            ColumnDef::new("created_at", Timestamp).default(ColumnDefault::Now),
            ColumnDef::new("updated_at", Timestamp).default(ColumnDefault::Now),
            ColumnDef::new("author_id", Uuid),
        ],
        primary_key: vec!["id"],
        unique: vec![],
        foreign_keys: vec![ForeignKey {
            column: "author_id",
            references: USER,
            references_column: "id",
            on_delete: OnDelete::NoAction,
        }],
    }
}

fn category() -> EntityDef {
    EntityDef {
        name: CATEGORY,
        columns: vec![id_column(), ColumnDef::new("name", Varchar(255))],
        primary_key: vec!["id"],
        unique: vec![],
        foreign_keys: vec![],
    }
}

fn post_category() -> EntityDef {
    EntityDef {
        name: POST_CATEGORY,
        columns: vec![ColumnDef::new("post_id", Uuid), ColumnDef::new("category_id", Uuid)],
        primary_key: vec!["post_id", "category_id"],
        unique: vec![],
        foreign_keys: vec![
            ForeignKey {
                column: "post_id",
                references: POST,
                references_column: "id",
                on_delete: OnDelete::NoAction,
            },
            ForeignKey {
                column: "category_id",
                references: CATEGORY,
                references_column: "id",
                on_delete: OnDelete::NoAction,
            },
        ],
    }
}

fn rel(
    name: &'static str,
    source: &'static str,
    target: &'static str,
    cardinality: Cardinality,
    source_column: &'static str,
    target_column: &'static str,
) -> RelationDef {
    RelationDef {
        name,
        source,
        target,
        cardinality,
        source_column,
        target_column,
        through: None,
    }
}

fn relations() -> Vec<RelationDef> {
    use Cardinality::*;
    let via_post_category = |source_column, target_column| JoinThrough {
        entity: POST_CATEGORY,
        source_column,
        target_column,
    };
    vec![
        rel("preferences", USER, USER_PREFERENCES, OneToOne, "id", "user_id"),
        rel("posts", USER, POST, OneToMany, "id", "author_id"),
        rel("user", USER_PREFERENCES, USER, ManyToOne, "user_id", "id"),
        rel("author", POST, USER, ManyToOne, "author_id", "id"),
        rel("postCategories", POST, POST_CATEGORY, OneToMany, "id", "post_id"),
        RelationDef {
            through: Some(via_post_category("post_id", "category_id")),
            ..rel("categories", POST, CATEGORY, ManyToMany, "id", "id")
        },
        rel("postCategories", CATEGORY, POST_CATEGORY, OneToMany, "id", "category_id"),
        RelationDef {
            through: Some(via_post_category("category_id", "post_id")),
            ..rel("posts", CATEGORY, POST, ManyToMany, "id", "id")
        },
        rel("post", POST_CATEGORY, POST, ManyToOne, "post_id", "id"),
        rel("category", POST_CATEGORY, CATEGORY, ManyToOne, "category_id", "id"),
    ]
}
