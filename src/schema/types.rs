//! Static catalog metadata: entities, columns, constraints, relations.

/// Semantic column type. Drives DDL, parameter casts and how values are read back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    Varchar(u32),
    Integer,
    Boolean,
    Real,
    Timestamp,
    /// Named enum type declared in the catalog.
    Enum(&'static str),
}

impl ColumnType {
    /// Type as written in CREATE TABLE.
    pub fn ddl(&self, namespace: &str) -> String {
        match self {
            ColumnType::Varchar(n) => format!("varchar({})", n),
            _ => self.cast(namespace),
        }
    }

    /// Type used in `$n::type` parameter casts. Varchar is cast without its length so
    /// oversize input fails on assignment instead of being truncated by the cast.
    pub fn cast(&self, namespace: &str) -> String {
        match self {
            ColumnType::Uuid => "uuid".into(),
            ColumnType::Varchar(_) => "varchar".into(),
            ColumnType::Integer => "integer".into(),
            ColumnType::Boolean => "boolean".into(),
            ColumnType::Real => "real".into(),
            ColumnType::Timestamp => "timestamp".into(),
            ColumnType::Enum(name) => super::qualified(namespace, name),
        }
    }

    /// Enum values come back as text; sqlx cannot decode a custom type into String.
    pub fn read_as_text(&self) -> bool {
        matches!(self, ColumnType::Enum(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnDefault {
    RandomUuid,
    Now,
    /// SQL literal, written verbatim into DDL (e.g. `false`, `0`, `'BASIC'`).
    Literal(&'static str),
}

impl ColumnDefault {
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnDefault::RandomUuid => "gen_random_uuid()",
            ColumnDefault::Now => "now()",
            ColumnDefault::Literal(s) => s,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    /// Every column in the app catalog is NOT NULL; the flag is kept so DDL reflects the model.
    pub nullable: bool,
    pub default: Option<ColumnDefault>,
}

impl ColumnDef {
    pub fn new(name: &'static str, ty: ColumnType) -> Self {
        ColumnDef {
            name,
            ty,
            nullable: false,
            default: None,
        }
    }

    pub fn default(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnDelete {
    NoAction,
    Cascade,
}

impl OnDelete {
    pub fn sql(&self) -> &'static str {
        match self {
            OnDelete::NoAction => "NO ACTION",
            OnDelete::Cascade => "CASCADE",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: &'static str,
    pub references_column: &'static str,
    pub on_delete: OnDelete,
}

#[derive(Clone, Debug)]
pub struct UniqueConstraint {
    pub name: &'static str,
    pub columns: Vec<&'static str>,
}

#[derive(Clone, Debug)]
pub struct EntityDef {
    /// Entity name, also the table name.
    pub name: &'static str,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<&'static str>,
    pub unique: Vec<UniqueConstraint>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl EntityDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Single-column primary key, if the entity has one.
    pub fn single_pk(&self) -> Option<&ColumnDef> {
        match self.primary_key.as_slice() {
            [pk] => self.column(pk),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    /// Whether the related side materializes as an array.
    pub fn is_to_many(&self) -> bool {
        matches!(self, Cardinality::OneToMany | Cardinality::ManyToMany)
    }
}

/// Join entity a many-to-many relation passes through.
#[derive(Clone, Debug)]
pub struct JoinThrough {
    pub entity: &'static str,
    /// Column on the join entity matching `RelationDef::source_column`.
    pub source_column: &'static str,
    /// Column on the join entity matching `RelationDef::target_column`.
    pub target_column: &'static str,
}

#[derive(Clone, Debug)]
pub struct RelationDef {
    /// Name under which related rows appear in nested results.
    pub name: &'static str,
    pub source: &'static str,
    pub target: &'static str,
    pub cardinality: Cardinality,
    pub source_column: &'static str,
    pub target_column: &'static str,
    pub through: Option<JoinThrough>,
}

#[derive(Clone, Debug)]
pub struct EnumDef {
    pub name: &'static str,
    pub values: Vec<&'static str>,
}

#[derive(Clone, Debug)]
pub struct Catalog {
    /// Postgres schema all tables and types live in.
    pub namespace: String,
    pub enums: Vec<EnumDef>,
    /// In dependency order: referenced entities come first.
    pub entities: Vec<EntityDef>,
    pub relations: Vec<RelationDef>,
}

impl Catalog {
    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn relation(&self, source: &str, name: &str) -> Option<&RelationDef> {
        self.relations
            .iter()
            .find(|r| r.source == source && r.name == name)
    }

    pub fn relations_from<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a RelationDef> + 'a {
        self.relations.iter().filter(move |r| r.source == source)
    }

    /// Schema-qualified, quoted table name.
    pub fn table(&self, entity: &EntityDef) -> String {
        super::qualified(&self.namespace, entity.name)
    }
}
