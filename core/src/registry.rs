//! Runtime registry: per-entity specs resolved at startup from generated
//! code, consulted by the query builder and runtime for table/column
//! resolution and edge metadata (spec §3 `Registry`).

use crate::ir::{Cascade, Edge, EdgeKind, Field};
use std::collections::HashMap;

/// Edge metadata as the runtime needs it — enough to resolve join columns
/// and cascade behaviour without re-reading the full [`crate::ir::Entity`].
#[derive(Debug, Clone)]
pub struct EdgeSpec {
    pub name: String,
    pub kind: EdgeKind,
    pub target_table: String,
    pub fk_column: Option<String>,
    pub ref_column: Option<String>,
    pub through_table: Option<String>,
    pub cascade: Cascade,
}

impl From<&Edge> for EdgeSpec {
    fn from(edge: &Edge) -> Self {
        EdgeSpec {
            name: edge.name.clone(),
            kind: edge.kind,
            target_table: edge.target.clone(),
            fk_column: edge.fk_column.clone(),
            ref_column: edge.ref_column.clone(),
            through_table: edge.through_table.clone(),
            cascade: edge.cascade,
        }
    }
}

/// The resolved, runtime-facing view of an [`crate::ir::Entity`]: table name,
/// column names keyed by field name, primary key column, and edges by name.
#[derive(Debug, Clone)]
pub struct EntitySpec {
    pub entity_name: String,
    pub table_name: String,
    pub primary_column: String,
    pub columns: HashMap<String, String>,
    pub writable_columns: Vec<String>,
    pub edges: HashMap<String, EdgeSpec>,
}

impl EntitySpec {
    pub fn from_entity(entity: &crate::ir::Entity, table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        let mut columns = HashMap::new();
        let mut writable_columns = Vec::new();
        let mut primary_column = String::new();

        for field in &entity.fields {
            let col = field.column_name();
            if field.primary {
                primary_column = col.clone();
            }
            if field.is_writable() {
                writable_columns.push(col.clone());
            }
            columns.insert(field.name.clone(), col);
        }

        let edges = entity
            .edges
            .iter()
            .map(|e| (e.name.clone(), EdgeSpec::from(e)))
            .collect();

        EntitySpec {
            entity_name: entity.name.clone(),
            table_name,
            primary_column,
            columns,
            writable_columns,
            edges,
        }
    }

    pub fn column_for(&self, field: &Field) -> Option<&str> {
        self.columns.get(&field.name).map(String::as_str)
    }
}

/// Process-wide registry of per-entity specs, initialised once at program
/// start from generated code (spec §3 lifecycle) and read thereafter.
#[derive(Debug, Default)]
pub struct Registry {
    entities: HashMap<String, EntitySpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: EntitySpec) {
        self.entities.insert(spec.entity_name.clone(), spec);
    }

    pub fn get(&self, entity_name: &str) -> Option<&EntitySpec> {
        self.entities.get(entity_name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Entity, Field, FieldType};

    #[test]
    fn registry_resolves_table_and_columns() {
        let mut entity = Entity::new("User");
        let mut id = Field::new("id", FieldType::Uuid);
        id.primary = true;
        entity.fields.push(id);
        entity.fields.push(Field::new("email", FieldType::Text));

        let spec = EntitySpec::from_entity(&entity, "users");
        let mut registry = Registry::new();
        registry.register(spec);

        let resolved = registry.get("User").unwrap();
        assert_eq!(resolved.table_name, "users");
        assert_eq!(resolved.primary_column, "id");
        assert_eq!(resolved.columns.get("email").unwrap(), "email");
    }
}
