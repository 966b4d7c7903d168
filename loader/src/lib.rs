//! Reads a directory of declarative entity definitions (`*.edl` files,
//! evaluated through [`parser`] and [`interpreter`]), applies the
//! default-field and default-query passes, synthesises missing inverse
//! edges, and returns the finished [`erm_core::Entity`] list in name order.

pub mod ast;
pub mod defaults;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod synthesis;

use erm_core::{naming, Entity, ErmError};
use std::collections::HashSet;
use std::path::Path;

const SCHEMA_EXTENSION: &str = "edl";

pub fn load_dir(dir: &Path) -> Result<Vec<Entity>, ErmError> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(SCHEMA_EXTENSION))
        .collect();
    paths.sort();

    let mut entities = Vec::new();
    for path in &paths {
        let source = std::fs::read_to_string(path).map_err(ErmError::Io)?;
        let defs = parser::parse(&source)?;
        for def in defs {
            entities.push(interpreter::interpret_entity(&def.name, &def.statements)?);
        }
    }

    resolve_edges(&mut entities)?;

    for entity in &mut entities {
        defaults::apply_default_field(entity);
    }
    for entity in &mut entities {
        defaults::apply_default_query(entity);
    }
    synthesis::synthesize_inverse_edges(&mut entities)?;

    entities.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entities)
}

/// Resolve FK columns and through-tables that weren't spelled out explicitly,
/// and reject the edge shapes spec §4.1 names as loader failures: a
/// reference to an undeclared entity, a self-reference with no explicit
/// column, and two edges on one entity sharing both target and FK column.
fn resolve_edges(entities: &mut [Entity]) -> Result<(), ErmError> {
    let known: HashSet<String> = entities.iter().map(|e| e.name.clone()).collect();

    for entity in entities.iter_mut() {
        let entity_name = entity.name.clone();
        for edge in entity.edges.iter_mut() {
            if !known.contains(&edge.target) {
                return Err(ErmError::schema_discovery(
                    &entity_name,
                    &edge.name,
                    format!("edge targets unknown entity `{}`", edge.target),
                ));
            }

            let is_self_reference = edge.target == entity_name;
            if edge.fk_column.is_none() && edge.through_table.is_none() {
                if is_self_reference {
                    return Err(ErmError::schema_discovery(
                        &entity_name,
                        &edge.name,
                        "self-referential edge requires an explicit fk_column or ref_column",
                    ));
                }
                match edge.kind {
                    erm_core::EdgeKind::ManyToMany => {
                        edge.through_table = Some(through_table_name(&entity_name, &edge.target));
                    }
                    _ => {
                        edge.fk_column = Some(format!("{}_id", naming::to_snake_case(&edge.name)));
                    }
                }
            }
        }

        let mut seen: HashSet<(String, String)> = HashSet::new();
        for edge in &entity.edges {
            if let Some(fk) = &edge.fk_column {
                let key = (edge.target.clone(), fk.clone());
                if !seen.insert(key) {
                    return Err(ErmError::schema_discovery(
                        &entity_name,
                        &edge.name,
                        format!(
                            "conflicting edges to `{}` using the same FK column `{}`",
                            edge.target, fk
                        ),
                    ));
                }
            }
        }
    }

    Ok(())
}

fn through_table_name(a: &str, b: &str) -> String {
    let mut names = [naming::pluralize(&naming::to_snake_case(a)), naming::pluralize(&naming::to_snake_case(b))];
    names.sort();
    format!("{}_{}", names[0], names[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_schema(dir: &Path, name: &str, contents: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_entities_applies_defaults_and_synthesises_inverse_edges() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(
            dir.path(),
            "user.edl",
            r#"entity User { field("email", Text).unique() }"#,
        );
        write_schema(
            dir.path(),
            "post.edl",
            r#"
            entity Post {
                field("title", Text)
                edge("author", ToOne, "User").fk_column("author_id").inverse("posts")
            }
            "#,
        );

        let entities = load_dir(dir.path()).unwrap();
        assert_eq!(entities.len(), 2);

        let post = entities.iter().find(|e| e.name == "Post").unwrap();
        assert!(post.primary_field().is_some());
        assert_eq!(post.query.predicates.len(), 1);

        let user = entities.iter().find(|e| e.name == "User").unwrap();
        let mirrored = user.find_edge("posts").unwrap();
        assert_eq!(mirrored.target, "Post");
    }

    #[test]
    fn rejects_edge_to_unknown_entity() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(
            dir.path(),
            "post.edl",
            r#"entity Post { edge("author", ToOne, "Ghost").fk_column("author_id") }"#,
        );
        assert!(load_dir(dir.path()).is_err());
    }

    #[test]
    fn rejects_self_reference_without_explicit_column() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(
            dir.path(),
            "category.edl",
            r#"entity Category { edge("parent", ToOne, "Category") }"#,
        );
        assert!(load_dir(dir.path()).is_err());
    }

    #[test]
    fn derives_many_to_many_through_table_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(dir.path(), "tag.edl", r#"entity Tag { field("name", Text) }"#);
        write_schema(
            dir.path(),
            "post.edl",
            r#"entity Post { edge("tags", ManyToMany, "Tag").inverse("posts") }"#,
        );

        let entities = load_dir(dir.path()).unwrap();
        let post = entities.iter().find(|e| e.name == "Post").unwrap();
        let edge = post.find_edge("tags").unwrap();
        assert_eq!(edge.through_table.as_deref(), Some("posts_tags"));
    }
}
