//! Relay-compliant GraphQL schema, resolver shells, and dataloader emitter
//! (spec §2). Resolver bodies are scaffolding — the generator's job per
//! §4.3 is to produce an expected file set the artifact tracker can track
//! idempotently, not a hand-tuned execution plan; wiring a resolver to the
//! query builder and pool is left to the generated code's maintainer.

use erm_core::{Entity, EdgeKind};
use heck::{ToSnakeCase, ToUpperCamelCase};

pub struct GraphqlFiles {
    pub schema_sdl: String,
    pub resolvers_source: String,
    pub dataloaders_source: String,
}

pub fn emit_graphql(entities: &[Entity]) -> GraphqlFiles {
    GraphqlFiles {
        schema_sdl: emit_schema(entities),
        resolvers_source: emit_resolvers(entities),
        dataloaders_source: emit_dataloaders(entities),
    }
}

fn emit_schema(entities: &[Entity]) -> String {
    let mut out = String::new();
    out.push_str("# Generated by erm. Do not edit by hand.\n\n");
    out.push_str("interface Node {\n  id: ID!\n}\n\n");
    out.push_str("type PageInfo {\n  hasNextPage: Boolean!\n  hasPreviousPage: Boolean!\n  startCursor: String\n  endCursor: String\n}\n\n");

    for entity in entities {
        let name = entity.name.to_upper_camel_case();
        out.push_str(&format!("type {name} implements Node {{\n"));
        for field in &entity.fields {
            let gql_type = graphql_scalar(&field.ty);
            let suffix = if field.nullable { "" } else { "!" };
            out.push_str(&format!("  {}: {}{}\n", field.name.to_snake_case(), gql_type, suffix));
        }
        for edge in &entity.edges {
            let target = edge.target.to_upper_camel_case();
            match edge.kind {
                EdgeKind::ToOne => {
                    let suffix = if edge.nullable { "" } else { "!" };
                    out.push_str(&format!("  {}: {}{}\n", edge.name.to_snake_case(), target, suffix));
                }
                EdgeKind::ToMany | EdgeKind::ManyToMany => {
                    out.push_str(&format!("  {}: {}Connection!\n", edge.name.to_snake_case(), target));
                }
            }
        }
        out.push_str("}\n\n");
        out.push_str(&format!("type {name}Edge {{\n  node: {name}!\n  cursor: String!\n}}\n\n"));
        out.push_str(&format!(
            "type {name}Connection {{\n  edges: [{name}Edge!]!\n  pageInfo: PageInfo!\n}}\n\n"
        ));
    }

    out.push_str("type Query {\n  node(id: ID!): Node\n");
    for entity in entities {
        let name = entity.name.to_upper_camel_case();
        let field = entity.name.to_snake_case();
        out.push_str(&format!("  {field}(id: ID!): {name}\n"));
        out.push_str(&format!("  {plural}(first: Int, after: String): {name}Connection!\n", plural = pluralize_field(&field)));
    }
    out.push_str("}\n");
    out
}

fn pluralize_field(field: &str) -> String {
    erm_core::pluralize(field)
}

fn graphql_scalar(ty: &erm_core::FieldType) -> &'static str {
    use erm_core::FieldType::*;
    match ty {
        Uuid => "ID",
        Bool => "Boolean",
        SmallInt | Int | Serial | SmallSerial | Identity => "Int",
        BigInt | BigSerial => "Int",
        Real | DoublePrecision | Decimal { .. } | Numeric { .. } | Money => "Float",
        Json | Jsonb => "JSON",
        _ => "String",
    }
}

fn emit_resolvers(entities: &[Entity]) -> String {
    let mut out = String::new();
    out.push_str("// Generated by erm. Do not edit by hand.\n");
    out.push_str("#![allow(unused_variables)]\n\n");
    out.push_str("use async_graphql::{Context, Object, Result, ID};\n\n");
    out.push_str("pub struct Query;\n\n#[Object]\nimpl Query {\n");
    for entity in entities {
        let name = entity.name.to_upper_camel_case();
        let module = entity.name.to_snake_case();
        let field = module.clone();
        out.push_str(&format!(
            "    async fn {field}(&self, ctx: &Context<'_>, id: ID) -> Result<Option<super::{module}::{name}>> {{\n        unimplemented!(\"wire {module}::entity_spec() through the dataloader\")\n    }}\n\n"
        ));
    }
    out.push_str("}\n");
    out
}

fn emit_dataloaders(entities: &[Entity]) -> String {
    let mut out = String::new();
    out.push_str("// Generated by erm. Do not edit by hand.\n");
    out.push_str("#![allow(unused_variables)]\n\n");
    out.push_str("use async_graphql::dataloader::Loader;\nuse std::collections::HashMap;\n\n");
    for entity in entities {
        let name = entity.name.to_upper_camel_case();
        let module = entity.name.to_snake_case();
        out.push_str(&format!("pub struct {name}Loader {{\n    pub pool: erm_runtime::PoolSet,\n}}\n\n"));
        out.push_str(&format!(
            "impl Loader<uuid::Uuid> for {name}Loader {{\n    type Value = super::{module}::{name};\n    type Error = std::sync::Arc<erm_core::ErmError>;\n\n    async fn load(&self, keys: &[uuid::Uuid]) -> Result<HashMap<uuid::Uuid, Self::Value>, Self::Error> {{\n        unimplemented!(\"batch-load {module} rows by primary key and bucket by key\")\n    }}\n}}\n\n"
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use erm_core::{Entity, Field, FieldType};

    #[test]
    fn schema_declares_node_interface_and_entity_type() {
        let mut entity = Entity::new("User");
        let mut id = Field::new("id", FieldType::Uuid);
        id.primary = true;
        entity.fields.push(id);
        let files = emit_graphql(&[entity]);
        assert!(files.schema_sdl.contains("interface Node"));
        assert!(files.schema_sdl.contains("type User implements Node"));
        assert!(files.schema_sdl.contains("type UserConnection"));
    }

    #[test]
    fn resolvers_reference_every_entity() {
        let entity = Entity::new("Post");
        let files = emit_graphql(&[entity]);
        assert!(files.resolvers_source.contains("async fn post"));
    }
}
