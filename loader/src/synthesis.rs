//! Inverse-edge synthesis (spec §4.1 step 3): for every edge with a
//! non-empty inverse name, ensure the target entity carries a reciprocal
//! edge back, synthesising one when the author didn't declare it by hand.

use erm_core::{naming, Edge, EdgeKind, Entity, ErmError};
use std::collections::HashMap;

pub fn synthesize_inverse_edges(entities: &mut [Entity]) -> Result<(), ErmError> {
    let index_by_name: HashMap<String, usize> = entities
        .iter()
        .enumerate()
        .map(|(i, e)| (e.name.clone(), i))
        .collect();

    // Snapshot the (source_idx, edge) pairs needing synthesis before
    // mutating, since the target entity may be any entity in the slice
    // including the source itself (self-referential edges).
    let mut to_synthesize = Vec::new();
    for (source_idx, entity) in entities.iter().enumerate() {
        for edge in &entity.edges {
            let Some(inverse_name) = edge.inverse_name.clone() else {
                continue;
            };
            let target_idx = *index_by_name.get(&edge.target).ok_or_else(|| {
                ErmError::schema_discovery(
                    &entity.name,
                    &edge.name,
                    format!("inverse edge targets unknown entity `{}`", edge.target),
                )
            })?;
            to_synthesize.push((source_idx, target_idx, inverse_name, edge.clone()));
        }
    }

    for (source_idx, target_idx, inverse_name, source_edge) in to_synthesize {
        let already_present = entities[target_idx]
            .edges
            .iter()
            .any(|e| e.name == inverse_name);
        if already_present {
            continue;
        }

        let source_name = entities[source_idx].name.clone();
        let mirror = mirror_edge(&source_name, &inverse_name, &source_edge);
        entities[target_idx].edges.push(mirror);
    }

    Ok(())
}

fn mirror_edge(source_entity: &str, inverse_name: &str, source_edge: &Edge) -> Edge {
    let kind = match source_edge.kind {
        EdgeKind::ToOne if source_edge.unique => EdgeKind::ToOne,
        EdgeKind::ToOne => EdgeKind::ToMany,
        EdgeKind::ToMany => EdgeKind::ToOne,
        EdgeKind::ManyToMany => EdgeKind::ManyToMany,
    };

    let mut mirror = Edge::new(inverse_name, kind, source_entity);
    mirror.cascade = source_edge.cascade;
    mirror.polymorphic_targets = source_edge.polymorphic_targets.clone();
    mirror.nullable = source_edge.nullable;
    mirror.unique = source_edge.unique;

    match kind {
        EdgeKind::ManyToMany => {
            mirror.through_table = source_edge.through_table.clone();
        }
        _ => {
            let fk_column = source_edge.fk_column.clone().unwrap_or_else(|| {
                format!("{}_id", naming::to_snake_case(&naming::singularize(source_entity)))
            });
            mirror.fk_column = Some(fk_column);
            mirror.ref_column = source_edge.ref_column.clone();
        }
    }

    mirror
}

#[cfg(test)]
mod tests {
    use super::*;
    use erm_core::{Entity, Field, FieldType};

    fn entity_with_id(name: &str) -> Entity {
        let mut e = Entity::new(name);
        let mut id = Field::new("id", FieldType::Uuid);
        id.primary = true;
        e.fields.push(id);
        e
    }

    #[test]
    fn synthesizes_to_many_mirror_for_to_one_edge() {
        let mut post = entity_with_id("Post");
        let mut edge = Edge::new("author", EdgeKind::ToOne, "User");
        edge.inverse_name = Some("posts".to_string());
        edge.fk_column = Some("author_id".to_string());
        post.edges.push(edge);
        let user = entity_with_id("User");

        let mut entities = vec![post, user];
        synthesize_inverse_edges(&mut entities).unwrap();

        let user = entities.iter().find(|e| e.name == "User").unwrap();
        let mirrored = user.find_edge("posts").unwrap();
        assert_eq!(mirrored.kind, EdgeKind::ToMany);
        assert_eq!(mirrored.target, "Post");
        assert_eq!(mirrored.fk_column.as_deref(), Some("author_id"));
    }

    #[test]
    fn is_a_no_op_when_target_already_declares_the_inverse() {
        let mut post = entity_with_id("Post");
        let mut edge = Edge::new("author", EdgeKind::ToOne, "User");
        edge.inverse_name = Some("posts".to_string());
        post.edges.push(edge);

        let mut user = entity_with_id("User");
        user.edges.push(Edge::new("posts", EdgeKind::ToMany, "Post"));

        let mut entities = vec![post, user];
        synthesize_inverse_edges(&mut entities).unwrap();

        let user = entities.iter().find(|e| e.name == "User").unwrap();
        assert_eq!(user.edges.len(), 1);
    }

    #[test]
    fn preserves_to_one_when_source_is_a_unique_to_one() {
        let mut profile = entity_with_id("Profile");
        let mut edge = Edge::new("user", EdgeKind::ToOne, "User");
        edge.inverse_name = Some("profile".to_string());
        edge.unique = true;
        edge.fk_column = Some("user_id".to_string());
        profile.edges.push(edge);
        let user = entity_with_id("User");

        let mut entities = vec![profile, user];
        synthesize_inverse_edges(&mut entities).unwrap();

        let user = entities.iter().find(|e| e.name == "User").unwrap();
        let mirrored = user.find_edge("profile").unwrap();
        assert_eq!(mirrored.kind, EdgeKind::ToOne);
    }

    #[test]
    fn mirrors_many_to_many_with_same_through_table() {
        let mut post = entity_with_id("Post");
        let mut edge = Edge::new("tags", EdgeKind::ManyToMany, "Tag");
        edge.inverse_name = Some("posts".to_string());
        edge.through_table = Some("posts_tags".to_string());
        post.edges.push(edge);
        let tag = entity_with_id("Tag");

        let mut entities = vec![post, tag];
        synthesize_inverse_edges(&mut entities).unwrap();

        let tag = entities.iter().find(|e| e.name == "Tag").unwrap();
        let mirrored = tag.find_edge("posts").unwrap();
        assert_eq!(mirrored.kind, EdgeKind::ManyToMany);
        assert_eq!(mirrored.through_table.as_deref(), Some("posts_tags"));
    }
}
