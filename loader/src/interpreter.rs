//! The restricted, total-function evaluator (spec §9 design note) that turns
//! parsed [`crate::ast::Chain`]s into [`erm_core::ir`] values. Every builder
//! symbol is resolved against a fixed function table; there is no general
//! expression evaluation, no host-language escape hatch, and no recursion
//! beyond the one level chained methods already provide.

use crate::ast::{Call, Chain, Literal};
use erm_core::{
    AggregateFn, Cascade, Computed, CompareOp, Edge, EdgeKind, Entity, Field, FieldType, Index,
    IndexMethod, NamedAggregate, NamedOrder, NamedPredicate, PolymorphicTarget, QuerySpec,
    SortDirection,
};
use erm_core::ErmError;

pub fn interpret_entity(name: &str, statements: &[Chain]) -> Result<Entity, ErmError> {
    let mut entity = Entity::new(name);

    for chain in statements {
        match chain.root.method.as_str() {
            "field" => entity.fields.push(interpret_field(name, chain)?),
            "edge" => entity.edges.push(interpret_edge(name, chain)?),
            "index" => entity.indexes.push(interpret_index(name, chain)?),
            "query" => entity.query = interpret_query(name, chain)?,
            other => {
                return Err(unknown_symbol(name, other));
            }
        }
    }

    Ok(entity)
}

fn unknown_symbol(entity: &str, symbol: &str) -> ErmError {
    ErmError::schema_discovery(
        entity,
        symbol,
        format!("unknown builder symbol `{symbol}`"),
    )
}

fn type_mismatch(entity: &str, method: &str, detail: impl Into<String>) -> ErmError {
    ErmError::schema_discovery(entity, method, detail.into())
}

fn arg_str<'a>(entity: &str, method: &str, args: &'a [Literal], idx: usize) -> Result<&'a str, ErmError> {
    args.get(idx)
        .and_then(Literal::as_str)
        .ok_or_else(|| type_mismatch(entity, method, format!("argument {idx} must be a string")))
}

fn arg_ident<'a>(entity: &str, method: &str, args: &'a [Literal], idx: usize) -> Result<&'a str, ErmError> {
    args.get(idx)
        .and_then(Literal::as_ident)
        .ok_or_else(|| type_mismatch(entity, method, format!("argument {idx} must be an identifier")))
}

fn arg_num(entity: &str, method: &str, args: &[Literal], idx: usize) -> Result<f64, ErmError> {
    args.get(idx)
        .and_then(Literal::as_num)
        .ok_or_else(|| type_mismatch(entity, method, format!("argument {idx} must be a number")))
}

// ---------------------------------------------------------------------------
// field(name, Type, ...) . modifiers
// ---------------------------------------------------------------------------

fn interpret_field(entity: &str, chain: &Chain) -> Result<Field, ErmError> {
    let root = &chain.root;
    let name = arg_str(entity, "field", &root.args, 0)?;
    let type_name = arg_ident(entity, "field", &root.args, 1)?;
    let ty = resolve_field_type(entity, type_name, &root.args[2..])?;

    let mut field = Field::new(name, ty);

    for call in &chain.calls {
        apply_field_method(entity, &mut field, call)?;
    }

    Ok(field)
}

fn resolve_field_type(entity: &str, type_name: &str, extra: &[Literal]) -> Result<FieldType, ErmError> {
    let num = |idx: usize| extra.get(idx).and_then(Literal::as_num).map(|n| n as u32);
    let inner_ident = |idx: usize| extra.get(idx).and_then(Literal::as_ident);

    Ok(match type_name {
        "Uuid" => FieldType::Uuid,
        "Text" => FieldType::Text,
        "Varchar" => FieldType::Varchar(num(0)),
        "Char" => FieldType::Char(num(0)),
        "Bool" => FieldType::Bool,
        "SmallInt" => FieldType::SmallInt,
        "Int" => FieldType::Int,
        "BigInt" => FieldType::BigInt,
        "Serial" => FieldType::Serial,
        "SmallSerial" => FieldType::SmallSerial,
        "BigSerial" => FieldType::BigSerial,
        "Identity" => FieldType::Identity,
        "Decimal" => FieldType::Decimal { precision: num(0), scale: num(1) },
        "Numeric" => FieldType::Numeric { precision: num(0), scale: num(1) },
        "Real" => FieldType::Real,
        "DoublePrecision" => FieldType::DoublePrecision,
        "Money" => FieldType::Money,
        "Bytea" => FieldType::Bytea,
        "Date" => FieldType::Date,
        "Time" => FieldType::Time,
        "TimeTz" => FieldType::TimeTz,
        "Timestamp" => FieldType::Timestamp,
        "TimestampTz" => FieldType::TimestampTz,
        "Interval" => FieldType::Interval,
        "Json" => FieldType::Json,
        "Jsonb" => FieldType::Jsonb,
        "Xml" => FieldType::Xml,
        "Inet" => FieldType::Inet,
        "Cidr" => FieldType::Cidr,
        "MacAddr" => FieldType::MacAddr,
        "MacAddr8" => FieldType::MacAddr8,
        "Bit" => FieldType::Bit(num(0)),
        "VarBit" => FieldType::VarBit(num(0)),
        "TsVector" => FieldType::TsVector,
        "TsQuery" => FieldType::TsQuery,
        "Point" => FieldType::Point,
        "Line" => FieldType::Line,
        "Lseg" => FieldType::Lseg,
        "Box" => FieldType::Box,
        "Path" => FieldType::Path,
        "Polygon" => FieldType::Polygon,
        "Circle" => FieldType::Circle,
        "Int4Range" => FieldType::Int4Range,
        "Int8Range" => FieldType::Int8Range,
        "NumRange" => FieldType::NumRange,
        "TsRange" => FieldType::TsRange,
        "TsTzRange" => FieldType::TsTzRange,
        "DateRange" => FieldType::DateRange,
        "Array" => {
            let inner = inner_ident(0).ok_or_else(|| {
                type_mismatch(entity, "field", "Array requires an element type argument")
            })?;
            FieldType::Array(Box::new(resolve_field_type(entity, inner, &extra[1..])?))
        }
        "Geometry" => FieldType::Geometry { srid: num(0).map(|n| n as i32) },
        "Geography" => FieldType::Geography { srid: num(0).map(|n| n as i32) },
        "Vector" => {
            let dim = num(0).ok_or_else(|| {
                type_mismatch(entity, "field", "Vector requires a dimension argument")
            })?;
            FieldType::Vector(dim)
        }
        // Escape hatch: an explicit, opaque SQL type fragment the closed set
        // doesn't name (spec §3 supplement).
        other => FieldType::Other(other.to_string()),
    })
}

fn apply_field_method(entity: &str, field: &mut Field, call: &Call) -> Result<(), ErmError> {
    match call.method.as_str() {
        "primary" => field.primary = true,
        "nullable" => field.nullable = true,
        "unique" => field.unique = true,
        "default_now" => field.has_default_now = true,
        "update_now" => field.has_update_now = true,
        "column" => field.column = Some(arg_str(entity, "column", &call.args, 0)?.to_string()),
        "default" => {
            field.default_expression = Some(arg_str(entity, "default", &call.args, 0)?.to_string())
        }
        "computed" => {
            let expression = arg_str(entity, "computed", &call.args, 0)?.to_string();
            let stored = call
                .args
                .get(1)
                .and_then(Literal::as_bool)
                .unwrap_or(false);
            let depends_on = call
                .args
                .get(2)
                .and_then(Literal::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Literal::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            field.computed = Some(Computed { expression, stored, depends_on });
        }
        "annotate" => {
            let key = arg_str(entity, "annotate", &call.args, 0)?.to_string();
            let value = arg_str(entity, "annotate", &call.args, 1)?.to_string();
            field.annotations.insert(key, value);
        }
        other => return Err(unknown_symbol(entity, other)),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// edge(name, Kind, target) . modifiers
// ---------------------------------------------------------------------------

fn interpret_edge(entity: &str, chain: &Chain) -> Result<Edge, ErmError> {
    let root = &chain.root;
    let name = arg_str(entity, "edge", &root.args, 0)?;
    let kind_name = arg_ident(entity, "edge", &root.args, 1)?;
    let kind = match kind_name {
        "ToOne" => EdgeKind::ToOne,
        "ToMany" => EdgeKind::ToMany,
        "ManyToMany" => EdgeKind::ManyToMany,
        other => {
            return Err(type_mismatch(
                entity,
                "edge",
                format!("unknown edge kind `{other}`"),
            ));
        }
    };
    let target = arg_str(entity, "edge", &root.args, 2)?;

    let mut edge = Edge::new(name, kind, target);

    for call in &chain.calls {
        apply_edge_method(entity, &mut edge, call)?;
    }

    Ok(edge)
}

fn apply_edge_method(entity: &str, edge: &mut Edge, call: &Call) -> Result<(), ErmError> {
    match call.method.as_str() {
        "fk_column" => edge.fk_column = Some(arg_str(entity, "fk_column", &call.args, 0)?.to_string()),
        "ref_column" => edge.ref_column = Some(arg_str(entity, "ref_column", &call.args, 0)?.to_string()),
        "through" => edge.through_table = Some(arg_str(entity, "through", &call.args, 0)?.to_string()),
        "nullable" => edge.nullable = true,
        "unique" => edge.unique = true,
        "inverse" => edge.inverse_name = Some(arg_str(entity, "inverse", &call.args, 0)?.to_string()),
        "on_delete" => edge.cascade = resolve_cascade(entity, arg_ident(entity, "on_delete", &call.args, 0)?)?,
        "polymorphic" => {
            let target_entity = arg_str(entity, "polymorphic", &call.args, 0)?.to_string();
            let condition = arg_str(entity, "polymorphic", &call.args, 1)?.to_string();
            // Opaque SQL predicate: never validated or evaluated (spec §4.1, §9 open question).
            edge.polymorphic_targets.push(PolymorphicTarget {
                entity: target_entity,
                condition,
            });
        }
        other => return Err(unknown_symbol(entity, other)),
    }
    Ok(())
}

fn resolve_cascade(entity: &str, name: &str) -> Result<Cascade, ErmError> {
    Ok(match name {
        "NoAction" => Cascade::NoAction,
        "Restrict" => Cascade::Restrict,
        "Cascade" => Cascade::Cascade,
        "SetNull" => Cascade::SetNull,
        "SetDefault" => Cascade::SetDefault,
        other => {
            return Err(type_mismatch(
                entity,
                "on_delete",
                format!("unknown cascade action `{other}`"),
            ));
        }
    })
}

// ---------------------------------------------------------------------------
// index([columns]) . modifiers
// ---------------------------------------------------------------------------

fn interpret_index(entity: &str, chain: &Chain) -> Result<Index, ErmError> {
    let root = &chain.root;
    let columns_lit = root.args.first().and_then(Literal::as_array).ok_or_else(|| {
        type_mismatch(entity, "index", "expected an array of column names")
    })?;
    let columns: Vec<String> = columns_lit
        .iter()
        .map(|l| match l {
            Literal::Str(s) => Ok(s.clone()),
            Literal::Ident(s) => Ok(s.clone()),
            _ => Err(type_mismatch(entity, "index", "column names must be strings")),
        })
        .collect::<Result<_, _>>()?;

    let default_name = format!("idx_{}_{}", entity.to_lowercase(), columns.join("_"));
    let name = root
        .args
        .get(1)
        .and_then(Literal::as_str)
        .map(str::to_string)
        .unwrap_or(default_name);

    let mut index = Index {
        name,
        columns,
        unique: false,
        partial_where: None,
        method: IndexMethod::Btree,
        nulls_not_distinct: false,
    };

    for call in &chain.calls {
        match call.method.as_str() {
            "unique" => index.unique = true,
            "name" => index.name = arg_str(entity, "name", &call.args, 0)?.to_string(),
            "partial_where" => {
                index.partial_where = Some(arg_str(entity, "partial_where", &call.args, 0)?.to_string())
            }
            "method" => {
                index.method = resolve_index_method(entity, arg_ident(entity, "method", &call.args, 0)?)?
            }
            "nulls_not_distinct" => index.nulls_not_distinct = true,
            other => return Err(unknown_symbol(entity, other)),
        }
    }

    Ok(index)
}

fn resolve_index_method(entity: &str, name: &str) -> Result<IndexMethod, ErmError> {
    Ok(match name {
        "Btree" => IndexMethod::Btree,
        "Ivfflat" => IndexMethod::Ivfflat,
        "Gin" => IndexMethod::Gin,
        "Gist" => IndexMethod::Gist,
        "Hash" => IndexMethod::Hash,
        "Brin" => IndexMethod::Brin,
        "SpGist" => IndexMethod::SpGist,
        other => {
            return Err(type_mismatch(entity, "method", format!("unknown index method `{other}`")));
        }
    })
}

// ---------------------------------------------------------------------------
// query() . modifiers
// ---------------------------------------------------------------------------

fn interpret_query(entity: &str, chain: &Chain) -> Result<QuerySpec, ErmError> {
    let mut spec = QuerySpec {
        predicates: Vec::new(),
        orders: Vec::new(),
        aggregates: Vec::new(),
        default_limit: 0,
        max_limit: None,
    };

    for call in &chain.calls {
        match call.method.as_str() {
            "predicate" => {
                let name = arg_str(entity, "predicate", &call.args, 0)?.to_string();
                let field = arg_str(entity, "predicate", &call.args, 1)?.to_string();
                let op = resolve_compare_op(entity, arg_ident(entity, "predicate", &call.args, 2)?)?;
                spec.predicates.push(NamedPredicate { name, field, op });
            }
            "order" => {
                let name = arg_str(entity, "order", &call.args, 0)?.to_string();
                let field = arg_str(entity, "order", &call.args, 1)?.to_string();
                let direction = match arg_ident(entity, "order", &call.args, 2)? {
                    "Asc" => SortDirection::Asc,
                    "Desc" => SortDirection::Desc,
                    other => {
                        return Err(type_mismatch(entity, "order", format!("unknown direction `{other}`")));
                    }
                };
                spec.orders.push(NamedOrder { name, field, direction });
            }
            "aggregate" => {
                let name = arg_str(entity, "aggregate", &call.args, 0)?.to_string();
                let function = resolve_aggregate_fn(entity, arg_ident(entity, "aggregate", &call.args, 1)?)?;
                let field = call.args.get(2).and_then(Literal::as_str).map(str::to_string);
                spec.aggregates.push(NamedAggregate {
                    name,
                    function,
                    field,
                    result_type: FieldType::BigInt,
                });
            }
            "default_limit" => {
                spec.default_limit = arg_num(entity, "default_limit", &call.args, 0)? as u32
            }
            "max_limit" => spec.max_limit = Some(arg_num(entity, "max_limit", &call.args, 0)? as u32),
            other => return Err(unknown_symbol(entity, other)),
        }
    }

    Ok(spec)
}

fn resolve_compare_op(entity: &str, name: &str) -> Result<CompareOp, ErmError> {
    Ok(match name {
        "Eq" => CompareOp::Eq,
        "Ne" => CompareOp::Ne,
        "Lt" => CompareOp::Lt,
        "Lte" => CompareOp::Lte,
        "Gt" => CompareOp::Gt,
        "Gte" => CompareOp::Gte,
        "Like" => CompareOp::Like,
        "ILike" => CompareOp::ILike,
        "In" => CompareOp::In,
        "NotIn" => CompareOp::NotIn,
        "IsNull" => CompareOp::IsNull,
        "IsNotNull" => CompareOp::IsNotNull,
        other => {
            return Err(type_mismatch(entity, "predicate", format!("unknown comparison operator `{other}`")));
        }
    })
}

fn resolve_aggregate_fn(entity: &str, name: &str) -> Result<AggregateFn, ErmError> {
    Ok(match name {
        "Count" => AggregateFn::Count,
        "Sum" => AggregateFn::Sum,
        "Avg" => AggregateFn::Avg,
        "Min" => AggregateFn::Min,
        "Max" => AggregateFn::Max,
        other => {
            return Err(type_mismatch(entity, "aggregate", format!("unknown aggregate function `{other}`")));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::EntityDef;

    #[test]
    fn interprets_fields_edges_indexes_and_query() {
        let src = r#"
            entity User {
                field("id", Uuid).primary()
                field("email", Text).unique().default_now()
                edge("posts", ToMany, "Post").inverse("author")
                index(["email"]).unique()
                query().default_limit(10).max_limit(50)
            }
        "#;
        let entities: Vec<EntityDef> = crate::parser::parse(src).unwrap();
        let entity = interpret_entity(&entities[0].name, &entities[0].statements).unwrap();

        assert_eq!(entity.fields.len(), 2);
        assert!(entity.fields[0].primary);
        assert!(entity.fields[1].unique);
        assert!(entity.fields[1].has_default_now);
        assert_eq!(entity.edges.len(), 1);
        assert_eq!(entity.edges[0].inverse_name.as_deref(), Some("author"));
        assert_eq!(entity.indexes.len(), 1);
        assert!(entity.indexes[0].unique);
        assert_eq!(entity.query.default_limit, 10);
        assert_eq!(entity.query.max_limit, Some(50));
    }

    #[test]
    fn rejects_unknown_field_type_as_escape_hatch_not_error() {
        let src = r#"entity X { field("weird", Hstore) }"#;
        let entities = crate::parser::parse(src).unwrap();
        let entity = interpret_entity(&entities[0].name, &entities[0].statements).unwrap();
        assert_eq!(entity.fields[0].ty, FieldType::Other("Hstore".to_string()));
    }

    #[test]
    fn rejects_unknown_method_with_suggestion() {
        let src = r#"entity X { field("id", Uuid).frobnicate() }"#;
        let entities = crate::parser::parse(src).unwrap();
        let err = interpret_entity(&entities[0].name, &entities[0].statements).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("frobnicate"));
    }
}
