//! Snapshot diffing (spec §4.2). The created/deleted/altered three-way split
//! per collection mirrors the teacher's PostgreSQL differ
//! (`migrations/src/postgres/diff.rs` in the teacher workspace), generalised
//! from `HashMap<String, T>` comparisons over drizzle-kit's flat DDL entity
//! arrays to comparisons over [`erm_core::SchemaSnapshot`] tables, columns,
//! indexes, and foreign keys — see DESIGN.md.

use crate::operations::{order_operations, Operation, OperationKind};
use erm_core::{ColumnSnapshot, ForeignKeySnapshot, IndexSnapshot, SchemaSnapshot, TableSnapshot};
use std::collections::HashMap;

pub fn diff_snapshots(prev: &SchemaSnapshot, cur: &SchemaSnapshot) -> Vec<Operation> {
    let mut ops = Vec::new();

    for name in &cur.extensions {
        if !prev.extensions.contains(name) {
            ops.push(
                Operation::new(
                    OperationKind::CreateExtension,
                    name,
                    format!("CREATE EXTENSION IF NOT EXISTS \"{name}\";"),
                )
                .with_rollback(format!("DROP EXTENSION IF EXISTS \"{name}\";")),
            );
        }
    }
    for name in &prev.extensions {
        if !cur.extensions.contains(name) {
            ops.push(Operation::new(
                OperationKind::DropExtension,
                name,
                format!("DROP EXTENSION IF EXISTS \"{name}\";"),
            ));
        }
    }

    let prev_tables: HashMap<&str, &TableSnapshot> =
        prev.tables.iter().map(|t| (t.name.as_str(), t)).collect();
    let cur_tables: HashMap<&str, &TableSnapshot> =
        cur.tables.iter().map(|t| (t.name.as_str(), t)).collect();

    for table in &cur.tables {
        if !prev_tables.contains_key(table.name.as_str()) {
            ops.extend(diff_new_table(table));
        }
    }
    for table in &prev.tables {
        if !cur_tables.contains_key(table.name.as_str()) {
            ops.extend(diff_dropped_table(table));
        }
    }
    for table in &cur.tables {
        if let Some(prev_table) = prev_tables.get(table.name.as_str()) {
            ops.extend(diff_table(prev_table, table));
        }
    }

    order_operations(ops)
}

fn diff_new_table(table: &TableSnapshot) -> Vec<Operation> {
    let mut ops = vec![Operation::new(
        OperationKind::CreateTable,
        &table.name,
        render_create_table(table),
    )
    .with_rollback(format!("DROP TABLE IF EXISTS \"{}\";", table.name))];

    for fk in &table.foreign_keys {
        ops.push(render_add_fk(&table.name, fk));
    }
    for index in &table.indexes {
        ops.push(render_add_index(&table.name, index));
    }
    if let Some(column) = &table.hypertable_column {
        ops.push(render_create_hypertable(&table.name, column));
    }

    ops
}

fn diff_dropped_table(table: &TableSnapshot) -> Vec<Operation> {
    let mut ops = Vec::new();
    if table.hypertable_column.is_some() {
        ops.push(Operation::new(
            OperationKind::DropHypertable,
            &table.name,
            format!("-- hypertable \"{}\" dropped with its table", table.name),
        ));
    }
    for index in &table.indexes {
        ops.push(Operation::new(
            OperationKind::DropIndex,
            format!("{}.{}", table.name, index.name),
            format!("DROP INDEX IF EXISTS \"{}\";", index.name),
        ));
    }
    for fk in &table.foreign_keys {
        ops.push(Operation::new(
            OperationKind::DropForeignKey,
            format!("{}.{}", table.name, fk.constraint_name),
            format!(
                "ALTER TABLE \"{}\" DROP CONSTRAINT IF EXISTS \"{}\";",
                table.name, fk.constraint_name
            ),
        ));
    }
    ops.push(Operation::new(
        OperationKind::DropTable,
        &table.name,
        format!("DROP TABLE IF EXISTS \"{}\";", table.name),
    ));
    ops
}

fn diff_table(prev: &TableSnapshot, cur: &TableSnapshot) -> Vec<Operation> {
    let mut ops = Vec::new();

    let prev_cols: HashMap<&str, &ColumnSnapshot> =
        prev.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let cur_cols: HashMap<&str, &ColumnSnapshot> =
        cur.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    for col in &cur.columns {
        if !prev_cols.contains_key(col.name.as_str()) {
            ops.push(render_add_column(&cur.name, col));
        }
    }
    for (name, prev_col) in &prev_cols {
        if !cur_cols.contains_key(name) {
            ops.push(Operation::new(
                OperationKind::DropColumn,
                format!("{}.{}", cur.name, prev_col.name),
                format!(
                    "ALTER TABLE \"{}\" DROP COLUMN \"{}\";",
                    cur.name, prev_col.name
                ),
            ));
        }
    }
    for col in &cur.columns {
        if let Some(prev_col) = prev_cols.get(col.name.as_str()) {
            if *prev_col != col {
                ops.extend(render_alter_column(&cur.name, prev_col, col));
            }
        }
    }

    let prev_idx: HashMap<&str, &IndexSnapshot> =
        prev.indexes.iter().map(|i| (i.name.as_str(), i)).collect();
    let cur_idx: HashMap<&str, &IndexSnapshot> =
        cur.indexes.iter().map(|i| (i.name.as_str(), i)).collect();
    for index in &cur.indexes {
        if !prev_idx.contains_key(index.name.as_str()) {
            ops.push(render_add_index(&cur.name, index));
        }
    }
    for (name, prev_index) in &prev_idx {
        if !cur_idx.contains_key(name) {
            ops.push(Operation::new(
                OperationKind::DropIndex,
                format!("{}.{}", cur.name, prev_index.name),
                format!("DROP INDEX IF EXISTS \"{}\";", prev_index.name),
            ));
        }
    }
    for index in &cur.indexes {
        if let Some(prev_index) = prev_idx.get(index.name.as_str()) {
            if *prev_index != index {
                ops.push(Operation::new(
                    OperationKind::DropIndex,
                    format!("{}.{}", cur.name, index.name),
                    format!("DROP INDEX IF EXISTS \"{}\";", index.name),
                ));
                ops.push(render_add_index(&cur.name, index));
            }
        }
    }

    let prev_fks: HashMap<&str, &ForeignKeySnapshot> = prev
        .foreign_keys
        .iter()
        .map(|fk| (fk.constraint_name.as_str(), fk))
        .collect();
    let cur_fks: HashMap<&str, &ForeignKeySnapshot> = cur
        .foreign_keys
        .iter()
        .map(|fk| (fk.constraint_name.as_str(), fk))
        .collect();
    for fk in &cur.foreign_keys {
        if !prev_fks.contains_key(fk.constraint_name.as_str()) {
            ops.push(render_add_fk(&cur.name, fk));
        }
    }
    for (name, prev_fk) in &prev_fks {
        if !cur_fks.contains_key(name) {
            ops.push(Operation::new(
                OperationKind::DropForeignKey,
                format!("{}.{}", cur.name, prev_fk.constraint_name),
                format!(
                    "ALTER TABLE \"{}\" DROP CONSTRAINT IF EXISTS \"{}\";",
                    cur.name, prev_fk.constraint_name
                ),
            ));
        }
    }
    for fk in &cur.foreign_keys {
        if let Some(prev_fk) = prev_fks.get(fk.constraint_name.as_str()) {
            if *prev_fk != fk {
                ops.push(Operation::new(
                    OperationKind::DropForeignKey,
                    format!("{}.{}", cur.name, fk.constraint_name),
                    format!(
                        "ALTER TABLE \"{}\" DROP CONSTRAINT IF EXISTS \"{}\";",
                        cur.name, fk.constraint_name
                    ),
                ));
                ops.push(render_add_fk(&cur.name, fk));
            }
        }
    }

    match (&prev.hypertable_column, &cur.hypertable_column) {
        (None, Some(column)) => ops.push(render_create_hypertable(&cur.name, column)),
        (Some(_), None) => ops.push(Operation::new(
            OperationKind::DropHypertable,
            &cur.name,
            format!(
                "-- hypertable conversion is not reversible; recreate \"{}\" to drop it",
                cur.name
            ),
        )),
        _ => {}
    }

    ops
}

fn render_create_table(table: &TableSnapshot) -> String {
    let mut lines: Vec<String> = table.columns.iter().map(render_column_def).collect();
    if !table.primary_key.is_empty() {
        let cols = table
            .primary_key
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("PRIMARY KEY ({cols})"));
    }
    format!(
        "CREATE TABLE \"{}\" (\n  {}\n);",
        table.name,
        lines.join(",\n  ")
    )
}

fn render_column_def(col: &ColumnSnapshot) -> String {
    let mut def = format!("\"{}\" {}", col.name, col.sql_type);
    if !col.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &col.default {
        def.push_str(&format!(" DEFAULT {default}"));
    }
    if col.unique {
        def.push_str(" UNIQUE");
    }
    def
}

fn render_add_column(table: &str, col: &ColumnSnapshot) -> Operation {
    Operation::new(
        OperationKind::AddColumn,
        format!("{table}.{}", col.name),
        format!("ALTER TABLE \"{table}\" ADD COLUMN {};", render_column_def(col)),
    )
    .with_rollback(format!(
        "ALTER TABLE \"{table}\" DROP COLUMN \"{}\";",
        col.name
    ))
}

fn render_add_index(table: &str, index: &IndexSnapshot) -> Operation {
    let unique = if index.unique { "UNIQUE " } else { "" };
    let nulls_not_distinct = if index.nulls_not_distinct && index.unique {
        " NULLS NOT DISTINCT"
    } else {
        ""
    };
    let cols = index
        .columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let where_clause = index
        .partial_where
        .as_ref()
        .map(|w| format!(" WHERE {w}"))
        .unwrap_or_default();
    Operation::new(
        OperationKind::AddIndex,
        format!("{table}.{}", index.name),
        format!(
            "CREATE {unique}INDEX \"{}\" ON \"{table}\" USING {} ({cols}){nulls_not_distinct}{where_clause};",
            index.name, index.method
        ),
    )
    .with_rollback(format!("DROP INDEX IF EXISTS \"{}\";", index.name))
}

fn render_add_fk(table: &str, fk: &ForeignKeySnapshot) -> Operation {
    let mut sql = format!(
        "ALTER TABLE \"{table}\" ADD CONSTRAINT \"{}\" FOREIGN KEY (\"{}\") REFERENCES \"{}\" (\"{}\")",
        fk.constraint_name, fk.column, fk.ref_table, fk.ref_column
    );
    if let Some(on_delete) = &fk.on_delete {
        sql.push_str(&format!(" ON DELETE {on_delete}"));
    }
    if let Some(on_update) = &fk.on_update {
        sql.push_str(&format!(" ON UPDATE {on_update}"));
    }
    sql.push(';');
    Operation::new(OperationKind::AddForeignKey, format!("{table}.{}", fk.constraint_name), sql)
        .with_rollback(format!(
            "ALTER TABLE \"{table}\" DROP CONSTRAINT IF EXISTS \"{}\";",
            fk.constraint_name
        ))
}

fn render_create_hypertable(table: &str, column: &str) -> Operation {
    Operation::new(
        OperationKind::CreateHypertable,
        table,
        format!("SELECT create_hypertable('{table}', by_range('{column}'));"),
    )
}

/// Whether `old -> new` is a widening the database can do in place with a
/// single `ALTER COLUMN ... TYPE`. Anything not named here is treated as
/// incompatible and emitted as add-new/drop-old, flagged for review.
fn is_type_widen(old: &str, new: &str) -> bool {
    matches!(
        (old, new),
        ("smallint", "integer")
            | ("smallint", "bigint")
            | ("integer", "bigint")
            | ("real", "double precision")
            | ("varchar", "text")
    ) || (old.starts_with("varchar(") && new == "text")
}

fn render_alter_column(table: &str, old: &ColumnSnapshot, new: &ColumnSnapshot) -> Vec<Operation> {
    if old.sql_type != new.sql_type && !is_type_widen(&old.sql_type, &new.sql_type) {
        let staging = format!("{}__erm_retyped", new.name);
        return vec![Operation::new(
            OperationKind::AlterColumn,
            format!("{table}.{}", new.name),
            format!(
                "ALTER TABLE \"{table}\" ADD COLUMN \"{staging}\" {};\n-- backfill \"{staging}\" from \"{}\" before dropping the old column",
                render_column_def(&ColumnSnapshot { name: staging.clone(), ..new.clone() }),
                old.name
            ),
        )
        .with_reason(format!(
            "type change {} -> {} on \"{table}\".\"{}\" is not an in-place widen; review the backfill before dropping the old column",
            old.sql_type, new.sql_type, new.name
        ))];
    }

    let mut clauses = Vec::new();
    let mut rollback_clauses = Vec::new();

    if old.sql_type != new.sql_type {
        clauses.push(format!(
            "ALTER COLUMN \"{}\" TYPE {}",
            new.name, new.sql_type
        ));
        rollback_clauses.push(format!(
            "ALTER COLUMN \"{}\" TYPE {}",
            old.name, old.sql_type
        ));
    }
    if old.nullable != new.nullable {
        let action = if new.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
        let rollback_action = if old.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
        clauses.push(format!("ALTER COLUMN \"{}\" {action}", new.name));
        rollback_clauses.push(format!("ALTER COLUMN \"{}\" {rollback_action}", old.name));
    }
    if old.default != new.default {
        match &new.default {
            Some(default) => clauses.push(format!(
                "ALTER COLUMN \"{}\" SET DEFAULT {default}",
                new.name
            )),
            None => clauses.push(format!("ALTER COLUMN \"{}\" DROP DEFAULT", new.name)),
        }
        match &old.default {
            Some(default) => rollback_clauses.push(format!(
                "ALTER COLUMN \"{}\" SET DEFAULT {default}",
                old.name
            )),
            None => rollback_clauses.push(format!("ALTER COLUMN \"{}\" DROP DEFAULT", old.name)),
        }
    }
    if old.identity != new.identity {
        if new.identity {
            clauses.push(format!(
                "ALTER COLUMN \"{}\" ADD GENERATED BY DEFAULT AS IDENTITY",
                new.name
            ));
            rollback_clauses.push(format!("ALTER COLUMN \"{}\" DROP IDENTITY IF EXISTS", old.name));
        } else {
            clauses.push(format!("ALTER COLUMN \"{}\" DROP IDENTITY IF EXISTS", new.name));
            rollback_clauses.push(format!(
                "ALTER COLUMN \"{}\" ADD GENERATED BY DEFAULT AS IDENTITY",
                old.name
            ));
        }
    }

    if clauses.is_empty() {
        return Vec::new();
    }

    vec![Operation::new(
        OperationKind::AlterColumn,
        format!("{table}.{}", new.name),
        format!("ALTER TABLE \"{table}\" {};", clauses.join(", ")),
    )
    .with_rollback(format!(
        "ALTER TABLE \"{table}\" {};",
        rollback_clauses.join(", ")
    ))]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, sql_type: &str) -> ColumnSnapshot {
        ColumnSnapshot {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable: false,
            unique: false,
            default: None,
            identity: false,
        }
    }

    fn table(name: &str, columns: Vec<ColumnSnapshot>) -> TableSnapshot {
        TableSnapshot {
            name: name.to_string(),
            columns,
            primary_key: vec!["id".to_string()],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            hypertable_column: None,
            is_join_table: false,
        }
    }

    #[test]
    fn new_table_emits_create_table_before_constraints() {
        let mut cur = SchemaSnapshot::new();
        cur.tables.push(table("users", vec![column("id", "uuid")]));
        cur.canonicalize();

        let ops = diff_snapshots(&SchemaSnapshot::new(), &cur);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OperationKind::CreateTable);
    }

    #[test]
    fn added_column_is_reported() {
        let mut prev = SchemaSnapshot::new();
        prev.tables.push(table("users", vec![column("id", "uuid")]));
        prev.canonicalize();

        let mut cur = SchemaSnapshot::new();
        cur.tables.push(table(
            "users",
            vec![column("id", "uuid"), column("email", "text")],
        ));
        cur.canonicalize();

        let ops = diff_snapshots(&prev, &cur);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OperationKind::AddColumn);
        assert!(ops[0].sql.contains("ADD COLUMN"));
    }

    #[test]
    fn incompatible_type_change_is_flagged_for_review() {
        let mut prev = SchemaSnapshot::new();
        prev.tables.push(table("users", vec![column("age", "text")]));
        prev.canonicalize();

        let mut cur = SchemaSnapshot::new();
        cur.tables.push(table("users", vec![column("age", "integer")]));
        cur.canonicalize();

        let ops = diff_snapshots(&prev, &cur);
        assert_eq!(ops.len(), 1);
        assert!(ops[0].reason.is_some());
    }

    #[test]
    fn widening_type_change_is_a_plain_alter() {
        let mut prev = SchemaSnapshot::new();
        prev.tables.push(table("users", vec![column("views", "integer")]));
        prev.canonicalize();

        let mut cur = SchemaSnapshot::new();
        cur.tables.push(table("users", vec![column("views", "bigint")]));
        cur.canonicalize();

        let ops = diff_snapshots(&prev, &cur);
        assert_eq!(ops.len(), 1);
        assert!(ops[0].reason.is_none());
        assert!(ops[0].sql.contains("TYPE bigint"));
    }

    #[test]
    fn dropped_table_orders_constraints_before_the_table_itself() {
        let mut prev = SchemaSnapshot::new();
        let mut t = table("widgets", vec![column("id", "uuid")]);
        t.indexes.push(IndexSnapshot {
            name: "idx_widgets_id".to_string(),
            columns: vec!["id".to_string()],
            unique: false,
            method: "btree".to_string(),
            partial_where: None,
            nulls_not_distinct: false,
        });
        prev.tables.push(t);
        prev.canonicalize();

        let ops = diff_snapshots(&prev, &SchemaSnapshot::new());
        let index_pos = ops.iter().position(|o| o.kind == OperationKind::DropIndex).unwrap();
        let table_pos = ops.iter().position(|o| o.kind == OperationKind::DropTable).unwrap();
        assert!(index_pos < table_pos);
    }
}
