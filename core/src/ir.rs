//! Schema intermediate representation.
//!
//! Pure value types with no I/O, parsing, or SQL-dialect awareness beyond the
//! closed [`FieldType`] vocabulary. The loader builds these; the differ,
//! codegen, and runtime registry all consume them read-only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named record type: fields, edges, indexes, and a query spec.
///
/// Invariant: exactly one field has `primary = true`. The loader enforces
/// this by inserting a UUIDv7 `id` primary at position 0 when the author
/// declares none (spec §4.1 default-field pass).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub fields: Vec<Field>,
    pub edges: Vec<Edge>,
    pub indexes: Vec<Index>,
    pub query: QuerySpec,
    pub annotations: Annotations,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Entity {
            name: name.into(),
            fields: Vec::new(),
            edges: Vec::new(),
            indexes: Vec::new(),
            query: QuerySpec::default(),
            annotations: Annotations::default(),
        }
    }

    pub fn primary_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary)
    }

    pub fn find_edge(&self, name: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.name == name)
    }

    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Free-form annotation map, ordered for deterministic serialisation.
pub type Annotations = BTreeMap<String, String>;

/// The closed semantic type vocabulary for a [`Field`], plus an `Other`
/// escape hatch for raw SQL type fragments the closed set doesn't name
/// (grounded on the teacher's DDL type-category fallback in
/// `types/src/postgres/sql_type.rs` — additive, not a relaxation of the
/// named types' behaviour).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    Uuid,
    Text,
    Varchar(Option<u32>),
    Char(Option<u32>),
    Bool,
    SmallInt,
    Int,
    BigInt,
    Serial,
    SmallSerial,
    BigSerial,
    Identity,
    Decimal { precision: Option<u32>, scale: Option<u32> },
    Numeric { precision: Option<u32>, scale: Option<u32> },
    Real,
    DoublePrecision,
    Money,
    Bytea,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Interval,
    Json,
    Jsonb,
    Xml,
    Inet,
    Cidr,
    MacAddr,
    MacAddr8,
    Bit(Option<u32>),
    VarBit(Option<u32>),
    TsVector,
    TsQuery,
    Point,
    Line,
    Lseg,
    Box,
    Path,
    Polygon,
    Circle,
    Int4Range,
    Int8Range,
    NumRange,
    TsRange,
    TsTzRange,
    DateRange,
    Array(Box<FieldType>),
    Geometry { srid: Option<i32> },
    Geography { srid: Option<i32> },
    Vector(u32),
    /// Escape hatch: a raw SQL type fragment the closed set above omits.
    Other(String),
}

impl FieldType {
    /// Render the Postgres type name as it appears in DDL. Best-effort:
    /// callers needing exact `ALTER ... TYPE` semantics should also consult
    /// [`FieldType::is_serial`] (serial/identity columns are never altered
    /// in place).
    pub fn sql_name(&self) -> String {
        match self {
            FieldType::Uuid => "uuid".into(),
            FieldType::Text => "text".into(),
            FieldType::Varchar(Some(n)) => format!("varchar({n})"),
            FieldType::Varchar(None) => "varchar".into(),
            FieldType::Char(Some(n)) => format!("char({n})"),
            FieldType::Char(None) => "char".into(),
            FieldType::Bool => "boolean".into(),
            FieldType::SmallInt => "smallint".into(),
            FieldType::Int => "integer".into(),
            FieldType::BigInt => "bigint".into(),
            FieldType::Serial => "serial".into(),
            FieldType::SmallSerial => "smallserial".into(),
            FieldType::BigSerial => "bigserial".into(),
            FieldType::Identity => "integer generated by default as identity".into(),
            FieldType::Decimal { precision: Some(p), scale: Some(s) } => format!("decimal({p},{s})"),
            FieldType::Decimal { .. } => "decimal".into(),
            FieldType::Numeric { precision: Some(p), scale: Some(s) } => format!("numeric({p},{s})"),
            FieldType::Numeric { .. } => "numeric".into(),
            FieldType::Real => "real".into(),
            FieldType::DoublePrecision => "double precision".into(),
            FieldType::Money => "money".into(),
            FieldType::Bytea => "bytea".into(),
            FieldType::Date => "date".into(),
            FieldType::Time => "time".into(),
            FieldType::TimeTz => "timetz".into(),
            FieldType::Timestamp => "timestamp".into(),
            FieldType::TimestampTz => "timestamptz".into(),
            FieldType::Interval => "interval".into(),
            FieldType::Json => "json".into(),
            FieldType::Jsonb => "jsonb".into(),
            FieldType::Xml => "xml".into(),
            FieldType::Inet => "inet".into(),
            FieldType::Cidr => "cidr".into(),
            FieldType::MacAddr => "macaddr".into(),
            FieldType::MacAddr8 => "macaddr8".into(),
            FieldType::Bit(Some(n)) => format!("bit({n})"),
            FieldType::Bit(None) => "bit".into(),
            FieldType::VarBit(Some(n)) => format!("varbit({n})"),
            FieldType::VarBit(None) => "varbit".into(),
            FieldType::TsVector => "tsvector".into(),
            FieldType::TsQuery => "tsquery".into(),
            FieldType::Point => "point".into(),
            FieldType::Line => "line".into(),
            FieldType::Lseg => "lseg".into(),
            FieldType::Box => "box".into(),
            FieldType::Path => "path".into(),
            FieldType::Polygon => "polygon".into(),
            FieldType::Circle => "circle".into(),
            FieldType::Int4Range => "int4range".into(),
            FieldType::Int8Range => "int8range".into(),
            FieldType::NumRange => "numrange".into(),
            FieldType::TsRange => "tsrange".into(),
            FieldType::TsTzRange => "tstzrange".into(),
            FieldType::DateRange => "daterange".into(),
            FieldType::Array(inner) => format!("{}[]", inner.sql_name()),
            FieldType::Geometry { srid: Some(s) } => format!("geometry(Geometry,{s})"),
            FieldType::Geometry { srid: None } => "geometry".into(),
            FieldType::Geography { srid: Some(s) } => format!("geography(Geography,{s})"),
            FieldType::Geography { srid: None } => "geography".into(),
            FieldType::Vector(dim) => format!("vector({dim})"),
            FieldType::Other(raw) => raw.clone(),
        }
    }

    pub fn is_serial(&self) -> bool {
        matches!(
            self,
            FieldType::Serial | FieldType::SmallSerial | FieldType::BigSerial | FieldType::Identity
        )
    }
}

/// A computed column's dependency list and materialisation mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Computed {
    pub expression: String,
    pub stored: bool,
    /// Dependency extraction at the field level (spec §9 design note):
    /// the generator uses this to order column emission.
    pub depends_on: Vec<String>,
}

/// A single column on an [`Entity`].
///
/// Invariant: computed fields are always read-only in write paths — enforced
/// by [`Field::is_writable`] rather than by trusting callers to check
/// `computed.is_some()` everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub column: Option<String>,
    pub ty: FieldType,
    pub primary: bool,
    pub nullable: bool,
    pub unique: bool,
    pub has_default_now: bool,
    pub has_update_now: bool,
    pub default_expression: Option<String>,
    pub computed: Option<Computed>,
    pub annotations: Annotations,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Field {
            name: name.into(),
            column: None,
            ty,
            primary: false,
            nullable: false,
            unique: false,
            has_default_now: false,
            has_update_now: false,
            default_expression: None,
            computed: None,
            annotations: Annotations::default(),
        }
    }

    /// Column name, defaulting to `snake_case(name)`.
    pub fn column_name(&self) -> String {
        self.column
            .clone()
            .unwrap_or_else(|| crate::naming::to_snake_case(&self.name))
    }

    /// Computed fields are always read-only in write paths (invariant,
    /// spec §3). A non-computed field is writable unless the read-only flag
    /// would make no sense for it (e.g. a serial primary is still "writable"
    /// at the type level; callers may still choose to omit it from inserts).
    pub fn is_writable(&self) -> bool {
        self.computed.is_none()
    }
}

/// A relationship declaration between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub name: String,
    pub kind: EdgeKind,
    pub target: String,
    pub fk_column: Option<String>,
    pub ref_column: Option<String>,
    pub through_table: Option<String>,
    pub nullable: bool,
    pub unique: bool,
    pub inverse_name: Option<String>,
    pub polymorphic_targets: Vec<PolymorphicTarget>,
    pub cascade: Cascade,
}

impl Edge {
    pub fn new(name: impl Into<String>, kind: EdgeKind, target: impl Into<String>) -> Self {
        Edge {
            name: name.into(),
            kind,
            target: target.into(),
            fk_column: None,
            ref_column: None,
            through_table: None,
            nullable: false,
            unique: false,
            inverse_name: None,
            polymorphic_targets: Vec::new(),
            cascade: Cascade::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    ToOne,
    ToMany,
    ManyToMany,
}

/// Polymorphic target: an opaque SQL predicate the core never evaluates or
/// validates (spec §4.1 open question — preserved deliberately).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolymorphicTarget {
    pub entity: String,
    pub condition: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cascade {
    #[default]
    Unset,
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl Cascade {
    pub fn sql_fragment(&self) -> Option<&'static str> {
        match self {
            Cascade::Unset => None,
            Cascade::NoAction => Some("NO ACTION"),
            Cascade::Restrict => Some("RESTRICT"),
            Cascade::Cascade => Some("CASCADE"),
            Cascade::SetNull => Some("SET NULL"),
            Cascade::SetDefault => Some("SET DEFAULT"),
        }
    }
}

/// An index declaration. Invariant: index names are globally unique within a
/// schema snapshot — enforced by the loader/differ, not by this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub partial_where: Option<String>,
    pub method: IndexMethod,
    pub nulls_not_distinct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexMethod {
    #[default]
    Btree,
    Ivfflat,
    Gin,
    Gist,
    Hash,
    Brin,
    SpGist,
}

impl IndexMethod {
    pub fn sql_name(&self) -> &'static str {
        match self {
            IndexMethod::Btree => "btree",
            IndexMethod::Ivfflat => "ivfflat",
            IndexMethod::Gin => "gin",
            IndexMethod::Gist => "gist",
            IndexMethod::Hash => "hash",
            IndexMethod::Brin => "brin",
            IndexMethod::SpGist => "spgist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    ILike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl CompareOp {
    pub fn sql_operator(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Like => "LIKE",
            CompareOp::ILike => "ILIKE",
            CompareOp::In => "IN",
            CompareOp::NotIn => "NOT IN",
            CompareOp::IsNull => "IS NULL",
            CompareOp::IsNotNull => "IS NOT NULL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPredicate {
    pub name: String,
    pub field: String,
    pub op: CompareOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedOrder {
    pub name: String,
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedAggregate {
    pub name: String,
    pub function: AggregateFn,
    pub field: Option<String>,
    pub result_type: FieldType,
}

/// Named predicates/orders/aggregates plus limit defaults (spec §3).
///
/// Invariant: every generated query path clamps a caller-supplied limit to
/// `max_limit` when set — enforced by [`QuerySpec::clamp_limit`], the single
/// function both codegen and the runtime query builder call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub predicates: Vec<NamedPredicate>,
    pub orders: Vec<NamedOrder>,
    pub aggregates: Vec<NamedAggregate>,
    pub default_limit: u32,
    pub max_limit: Option<u32>,
}

impl Default for QuerySpec {
    fn default() -> Self {
        QuerySpec {
            predicates: Vec::new(),
            orders: Vec::new(),
            aggregates: Vec::new(),
            default_limit: 20,
            max_limit: None,
        }
    }
}

impl QuerySpec {
    /// Fill missing predicates/orders/aggregates with the defaults named in
    /// spec §4.1 step 2, and set `default_limit` to 20 when zero.
    pub fn apply_defaults(&mut self, primary_field: &str) {
        if self.predicates.is_empty() {
            self.predicates.push(NamedPredicate {
                name: format!("{primary_field}_eq"),
                field: primary_field.to_string(),
                op: CompareOp::Eq,
            });
        }
        if self.orders.is_empty() {
            self.orders.push(NamedOrder {
                name: format!("{primary_field}_asc"),
                field: primary_field.to_string(),
                direction: SortDirection::Asc,
            });
        }
        if self.aggregates.is_empty() {
            self.aggregates.push(NamedAggregate {
                name: "count".to_string(),
                function: AggregateFn::Count,
                field: None,
                result_type: FieldType::BigInt,
            });
        }
        if self.default_limit == 0 {
            self.default_limit = 20;
        }
    }

    /// Clamp a caller-supplied limit to `max_limit`, if one is set.
    pub fn clamp_limit(&self, requested: u32) -> u32 {
        match self.max_limit {
            Some(max) if requested > max => max,
            _ => requested,
        }
    }
}
