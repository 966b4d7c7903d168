//! Typed client/model/registry emitter (spec §2 "emits typed clients").
//!
//! For each [`Entity`] this renders one Rust source file: a plain model
//! struct, an `entity_spec()` constructor mirroring [`erm_core::Registry`]'s
//! expectations, and one query-spec builder function per named predicate —
//! grounded on `erm_core::registry` (the runtime-facing shape codegen must
//! match) and `erm_query::select` (the builder types the generated helpers
//! return).

use erm_core::{Entity, FieldType};
use heck::{ToSnakeCase, ToUpperCamelCase};

/// One generated model file plus the module name it should be mounted under.
pub struct ClientFile {
    pub module_name: String,
    pub source: String,
}

pub fn emit_client(entity: &Entity, table_name: &str) -> ClientFile {
    let struct_name = entity.name.to_upper_camel_case();
    let module_name = entity.name.to_snake_case();

    let mut out = String::new();
    out.push_str("// Generated by erm. Do not edit by hand.\n");
    out.push_str("#![allow(dead_code)]\n\n");

    render_model_struct(&mut out, entity, &struct_name);
    out.push('\n');
    render_entity_spec_fn(&mut out, entity, table_name);
    out.push('\n');
    render_query_helpers(&mut out, entity, table_name, &struct_name);

    ClientFile { module_name, source: out }
}

fn rust_type(ty: &FieldType, nullable: bool) -> String {
    let base = match ty {
        FieldType::Uuid => "uuid::Uuid".to_string(),
        FieldType::Text | FieldType::Varchar(_) | FieldType::Char(_) | FieldType::Xml => "String".to_string(),
        FieldType::Bool => "bool".to_string(),
        FieldType::SmallInt | FieldType::SmallSerial => "i16".to_string(),
        FieldType::Int | FieldType::Serial | FieldType::Identity => "i32".to_string(),
        FieldType::BigInt | FieldType::BigSerial => "i64".to_string(),
        FieldType::Real => "f32".to_string(),
        FieldType::DoublePrecision => "f64".to_string(),
        FieldType::Decimal { .. } | FieldType::Numeric { .. } | FieldType::Money => "rust_decimal::Decimal".to_string(),
        FieldType::Bytea => "Vec<u8>".to_string(),
        FieldType::Date => "chrono::NaiveDate".to_string(),
        FieldType::Time | FieldType::TimeTz => "chrono::NaiveTime".to_string(),
        FieldType::Timestamp => "chrono::NaiveDateTime".to_string(),
        FieldType::TimestampTz => "chrono::DateTime<chrono::Utc>".to_string(),
        FieldType::Json | FieldType::Jsonb => "serde_json::Value".to_string(),
        FieldType::Array(inner) => return format!("Vec<{}>", rust_type(inner, false)),
        FieldType::Other(raw) => format!("/* {raw} */ String"),
        _ => "String".to_string(),
    };
    if nullable {
        format!("Option<{base}>")
    } else {
        base
    }
}

fn render_model_struct(out: &mut String, entity: &Entity, struct_name: &str) {
    out.push_str("#[derive(Debug, Clone)]\n");
    out.push_str(&format!("pub struct {struct_name} {{\n"));
    for field in &entity.fields {
        out.push_str(&format!(
            "    pub {}: {},\n",
            field.column_name(),
            rust_type(&field.ty, field.nullable)
        ));
    }
    out.push_str("}\n");
}

fn render_entity_spec_fn(out: &mut String, entity: &Entity, table_name: &str) {
    out.push_str("pub fn entity_spec() -> erm_core::EntitySpec {\n");
    out.push_str(&format!("    let mut entity = erm_core::Entity::new({:?});\n", entity.name));
    for field in &entity.fields {
        out.push_str("    entity.fields.push({\n");
        out.push_str(&format!(
            "        let mut f = erm_core::Field::new({:?}, {});\n",
            field.name,
            field_type_ctor(&field.ty)
        ));
        if let Some(column) = &field.column {
            out.push_str(&format!("        f.column = Some({column:?}.to_string());\n"));
        }
        out.push_str(&format!("        f.primary = {};\n", field.primary));
        out.push_str(&format!("        f.nullable = {};\n", field.nullable));
        out.push_str(&format!("        f.unique = {};\n", field.unique));
        out.push_str("        f\n    });\n");
    }
    for edge in &entity.edges {
        out.push_str(&format!(
            "    entity.edges.push(erm_core::Edge::new({:?}, {}, {:?}));\n",
            edge.name,
            edge_kind_ctor(edge.kind),
            edge.target
        ));
    }
    out.push_str(&format!("    erm_core::EntitySpec::from_entity(&entity, {table_name:?})\n"));
    out.push_str("}\n");
}

fn field_type_ctor(ty: &FieldType) -> String {
    match ty {
        FieldType::Uuid => "erm_core::FieldType::Uuid".to_string(),
        FieldType::Text => "erm_core::FieldType::Text".to_string(),
        FieldType::Bool => "erm_core::FieldType::Bool".to_string(),
        FieldType::Int => "erm_core::FieldType::Int".to_string(),
        FieldType::BigInt => "erm_core::FieldType::BigInt".to_string(),
        FieldType::TimestampTz => "erm_core::FieldType::TimestampTz".to_string(),
        FieldType::Jsonb => "erm_core::FieldType::Jsonb".to_string(),
        other => format!("erm_core::FieldType::Other({:?}.to_string())", other.sql_name()),
    }
}

fn edge_kind_ctor(kind: erm_core::EdgeKind) -> &'static str {
    match kind {
        erm_core::EdgeKind::ToOne => "erm_core::EdgeKind::ToOne",
        erm_core::EdgeKind::ToMany => "erm_core::EdgeKind::ToMany",
        erm_core::EdgeKind::ManyToMany => "erm_core::EdgeKind::ManyToMany",
    }
}

fn render_query_helpers(out: &mut String, entity: &Entity, table_name: &str, struct_name: &str) {
    for predicate in &entity.query.predicates {
        let field = entity.find_field(&predicate.field);
        let (param_ty, value_ctor) = field
            .map(|f| (rust_type(&f.ty, false), value_from("value")))
            .unwrap_or_else(|| ("String".to_string(), value_from("value")));
        let column = field.map(|f| f.column_name()).unwrap_or_else(|| predicate.field.clone());

        out.push_str(&format!(
            "/// `{struct_name}` query: `{field_name}` {op:?}.\n",
            field_name = predicate.field,
            op = predicate.op
        ));
        out.push_str(&format!("pub fn {}(value: {param_ty}) -> erm_query::SelectSpec {{\n", predicate.name));
        out.push_str("    erm_query::SelectSpec {\n");
        out.push_str(&format!("        table: {table_name:?}.to_string(),\n"));
        out.push_str("        columns: Vec::new(),\n");
        out.push_str("        predicates: vec![erm_query::Predicate {\n");
        out.push_str(&format!("            column: {column:?}.to_string(),\n"));
        out.push_str(&format!("            op: {},\n", compare_op_ctor(predicate.op)));
        out.push_str(&format!("            value: Some({value_ctor}),\n"));
        out.push_str("        }],\n");
        out.push_str("        order: Vec::new(),\n");
        out.push_str("        limit: None,\n");
        out.push_str("        offset: None,\n");
        out.push_str("    }\n}\n\n");
    }
}

fn value_from(binding: &str) -> String {
    format!("erm_query::Value::from({binding})")
}

fn compare_op_ctor(op: erm_core::CompareOp) -> &'static str {
    match op {
        erm_core::CompareOp::Eq => "erm_core::CompareOp::Eq",
        erm_core::CompareOp::Ne => "erm_core::CompareOp::Ne",
        erm_core::CompareOp::Lt => "erm_core::CompareOp::Lt",
        erm_core::CompareOp::Lte => "erm_core::CompareOp::Lte",
        erm_core::CompareOp::Gt => "erm_core::CompareOp::Gt",
        erm_core::CompareOp::Gte => "erm_core::CompareOp::Gte",
        erm_core::CompareOp::Like => "erm_core::CompareOp::Like",
        erm_core::CompareOp::ILike => "erm_core::CompareOp::ILike",
        erm_core::CompareOp::In => "erm_core::CompareOp::In",
        erm_core::CompareOp::NotIn => "erm_core::CompareOp::NotIn",
        erm_core::CompareOp::IsNull => "erm_core::CompareOp::IsNull",
        erm_core::CompareOp::IsNotNull => "erm_core::CompareOp::IsNotNull",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erm_core::{Entity, Field, FieldType};

    fn sample_entity() -> Entity {
        let mut entity = Entity::new("User");
        let mut id = Field::new("id", FieldType::Uuid);
        id.primary = true;
        entity.fields.push(id);
        entity.fields.push(Field::new("email", FieldType::Text));
        entity.query.apply_defaults("id");
        entity
    }

    #[test]
    fn emits_a_model_struct_with_every_field() {
        let entity = sample_entity();
        let file = emit_client(&entity, "users");
        assert!(file.source.contains("pub struct User"));
        assert!(file.source.contains("pub id: uuid::Uuid"));
        assert!(file.source.contains("pub email: String"));
    }

    #[test]
    fn emits_one_query_helper_per_named_predicate() {
        let entity = sample_entity();
        let file = emit_client(&entity, "users");
        assert!(file.source.contains("pub fn id_eq"));
    }
}
