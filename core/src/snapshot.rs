//! The canonical, persisted schema snapshot (spec §3 `SchemaSnapshot`).
//!
//! A snapshot is a deterministic function of the [`crate::ir`] the loader
//! produces: running the generator twice without a schema change must yield
//! a byte-identical `schema.snapshot.json`. Determinism here means every
//! collection is sorted before serialisation — never insertion order.

use crate::ir::{Entity, EdgeKind};
use crate::naming;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    pub nullable: bool,
    pub unique: bool,
    pub default: Option<String>,
    pub identity: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub method: String,
    pub partial_where: Option<String>,
    pub nulls_not_distinct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeySnapshot {
    pub constraint_name: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    pub columns: Vec<ColumnSnapshot>,
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexSnapshot>,
    pub foreign_keys: Vec<ForeignKeySnapshot>,
    pub hypertable_column: Option<String>,
    pub is_join_table: bool,
}

impl TableSnapshot {
    /// Sort columns/indexes/foreign-keys in place for deterministic
    /// serialisation. Column order is preserved (it reflects declaration and
    /// computed-column dependency order); indexes and FKs sort by name.
    pub fn canonicalize(&mut self) {
        self.indexes.sort_by(|a, b| a.name.cmp(&b.name));
        self.foreign_keys
            .sort_by(|a, b| a.constraint_name.cmp(&b.constraint_name));
    }
}

/// Sorted list of [`TableSnapshot`]s (non-join tables first, then join
/// tables, each group sorted by name) plus sorted extension names.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableSnapshot>,
    pub extensions: Vec<String>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project a loaded entity list into the table/column/index/FK shape the
    /// differ compares (spec §4.2 input). Table names come from
    /// `pluralize(snake_case(entity.name))`; many-to-many edges fold into a
    /// single join table per unordered entity pair, keyed by through-table
    /// name so both sides of an inverse pair contribute one table.
    pub fn from_entities(entities: &[Entity]) -> Self {
        let mut tables: BTreeMap<String, TableSnapshot> = BTreeMap::new();

        for entity in entities {
            let table_name = naming::pluralize(&naming::to_snake_case(&entity.name));
            let mut table = TableSnapshot {
                name: table_name.clone(),
                columns: Vec::new(),
                primary_key: Vec::new(),
                indexes: Vec::new(),
                foreign_keys: Vec::new(),
                hypertable_column: None,
                is_join_table: false,
            };

            for field in &entity.fields {
                let col = field.column_name();
                if field.primary {
                    table.primary_key.push(col.clone());
                }
                table.columns.push(ColumnSnapshot {
                    name: col,
                    sql_type: field.ty.sql_name(),
                    nullable: field.nullable,
                    unique: field.unique,
                    default: field.default_expression.clone(),
                    identity: field.ty.is_serial(),
                });
            }

            for index in &entity.indexes {
                table.indexes.push(IndexSnapshot {
                    name: index.name.clone(),
                    columns: index.columns.clone(),
                    unique: index.unique,
                    method: index.method.sql_name().to_string(),
                    partial_where: index.partial_where.clone(),
                    nulls_not_distinct: index.nulls_not_distinct,
                });
            }

            for edge in &entity.edges {
                match edge.kind {
                    EdgeKind::ToOne => {
                        if let Some(fk_column) = &edge.fk_column {
                            let ref_table = naming::pluralize(&naming::to_snake_case(&edge.target));
                            table.foreign_keys.push(ForeignKeySnapshot {
                                constraint_name: format!("{table_name}_{fk_column}_fkey"),
                                column: fk_column.clone(),
                                ref_table,
                                ref_column: edge.ref_column.clone().unwrap_or_else(|| "id".to_string()),
                                on_delete: edge.cascade.sql_fragment().map(str::to_string),
                                on_update: None,
                            });
                        }
                    }
                    EdgeKind::ManyToMany => {
                        if let Some(through) = &edge.through_table {
                            tables.entry(through.clone()).or_insert_with(|| {
                                join_table(through, &entity.name, &edge.target)
                            });
                        }
                    }
                    EdgeKind::ToMany => {}
                }
            }

            tables.insert(table_name, table);
        }

        let mut snapshot = SchemaSnapshot {
            tables: tables.into_values().collect(),
            extensions: Vec::new(),
        };
        snapshot.canonicalize();
        snapshot
    }

    /// Sort tables (non-join first, then join, each group lexically by
    /// name) and extensions, and canonicalize every table. Call this before
    /// persisting or diffing so two independently-built snapshots compare
    /// equal whenever their content is equal.
    pub fn canonicalize(&mut self) {
        for table in &mut self.tables {
            table.canonicalize();
        }
        self.tables.sort_by(|a, b| {
            a.is_join_table
                .cmp(&b.is_join_table)
                .then_with(|| a.name.cmp(&b.name))
        });
        self.extensions.sort();
        self.extensions.dedup();
    }

    pub fn find_table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Pretty-printed, stable-key-order JSON with a trailing newline, per
    /// spec §6 snapshot file format.
    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        let mut s = serde_json::to_string_pretty(self)?;
        s.push('\n');
        Ok(s)
    }

    pub fn from_json(text: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

/// A many-to-many join table for an unordered `(a, b)` entity pair: one FK
/// column per side, named after the singular snake_case entity name, and a
/// composite primary key over both.
fn join_table(through_table: &str, a: &str, b: &str) -> TableSnapshot {
    let col_a = format!("{}_id", naming::singularize(&naming::to_snake_case(a)));
    let col_b = format!("{}_id", naming::singularize(&naming::to_snake_case(b)));
    let ref_a = naming::pluralize(&naming::to_snake_case(a));
    let ref_b = naming::pluralize(&naming::to_snake_case(b));

    TableSnapshot {
        name: through_table.to_string(),
        columns: vec![
            ColumnSnapshot {
                name: col_a.clone(),
                sql_type: "uuid".to_string(),
                nullable: false,
                unique: false,
                default: None,
                identity: false,
            },
            ColumnSnapshot {
                name: col_b.clone(),
                sql_type: "uuid".to_string(),
                nullable: false,
                unique: false,
                default: None,
                identity: false,
            },
        ],
        primary_key: vec![col_a.clone(), col_b.clone()],
        indexes: Vec::new(),
        foreign_keys: vec![
            ForeignKeySnapshot {
                constraint_name: format!("{through_table}_{col_a}_fkey"),
                column: col_a,
                ref_table: ref_a,
                ref_column: "id".to_string(),
                on_delete: Some("CASCADE".to_string()),
                on_update: None,
            },
            ForeignKeySnapshot {
                constraint_name: format!("{through_table}_{col_b}_fkey"),
                column: col_b,
                ref_table: ref_b,
                ref_column: "id".to_string(),
                on_delete: Some("CASCADE".to_string()),
                on_update: None,
            },
        ],
        hypertable_column: None,
        is_join_table: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, EdgeKind, Field, FieldType};

    #[test]
    fn from_entities_derives_table_names_and_foreign_keys() {
        let mut user = Entity::new("User");
        let mut id = Field::new("id", FieldType::Uuid);
        id.primary = true;
        user.fields.push(id);

        let mut post = Entity::new("Post");
        let mut post_id = Field::new("id", FieldType::Uuid);
        post_id.primary = true;
        post.fields.push(post_id);
        let mut author = Edge::new("author", EdgeKind::ToOne, "User");
        author.fk_column = Some("author_id".to_string());
        post.edges.push(author);

        let snapshot = SchemaSnapshot::from_entities(&[user, post]);
        assert!(snapshot.find_table("users").is_some());
        let posts = snapshot.find_table("posts").unwrap();
        assert_eq!(posts.foreign_keys.len(), 1);
        assert_eq!(posts.foreign_keys[0].ref_table, "users");
    }

    #[test]
    fn from_entities_folds_many_to_many_edge_pairs_into_one_join_table() {
        let mut post = Entity::new("Post");
        let mut tags = Edge::new("tags", EdgeKind::ManyToMany, "Tag");
        tags.through_table = Some("posts_tags".to_string());
        post.edges.push(tags);

        let mut tag = Entity::new("Tag");
        let mut posts = Edge::new("posts", EdgeKind::ManyToMany, "Post");
        posts.through_table = Some("posts_tags".to_string());
        tag.edges.push(posts);

        let snapshot = SchemaSnapshot::from_entities(&[post, tag]);
        let joins: Vec<_> = snapshot.tables.iter().filter(|t| t.is_join_table).collect();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].name, "posts_tags");
    }

    fn sample() -> SchemaSnapshot {
        let mut snap = SchemaSnapshot::new();
        snap.tables.push(TableSnapshot {
            name: "users".into(),
            columns: vec![ColumnSnapshot {
                name: "id".into(),
                sql_type: "uuid".into(),
                nullable: false,
                unique: false,
                default: None,
                identity: false,
            }],
            primary_key: vec!["id".into()],
            indexes: vec![],
            foreign_keys: vec![],
            hypertable_column: None,
            is_join_table: false,
        });
        snap.extensions.push("pgcrypto".into());
        snap.canonicalize();
        snap
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snap = sample();
        let json = snap.to_json_pretty().unwrap();
        assert!(json.ends_with('\n'));
        let parsed = SchemaSnapshot::from_json(&json).unwrap();
        assert_eq!(parsed, snap);
    }

    #[test]
    fn canonicalize_is_idempotent_and_deterministic() {
        let mut a = sample();
        let mut b = sample();
        a.canonicalize();
        b.canonicalize();
        assert_eq!(a, b);
        assert_eq!(a.to_json_pretty().unwrap(), b.to_json_pretty().unwrap());
    }

    #[test]
    fn join_tables_sort_after_non_join_tables() {
        let mut snap = SchemaSnapshot::new();
        snap.tables.push(TableSnapshot {
            name: "posts_tags".into(),
            columns: vec![],
            primary_key: vec![],
            indexes: vec![],
            foreign_keys: vec![],
            hypertable_column: None,
            is_join_table: true,
        });
        snap.tables.push(TableSnapshot {
            name: "users".into(),
            columns: vec![],
            primary_key: vec![],
            indexes: vec![],
            foreign_keys: vec![],
            hypertable_column: None,
            is_join_table: false,
        });
        snap.canonicalize();
        assert_eq!(snap.tables[0].name, "users");
        assert_eq!(snap.tables[1].name, "posts_tags");
    }
}
