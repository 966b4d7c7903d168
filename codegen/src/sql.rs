//! Migration SQL emitter: turns a differ-produced, already-ordered
//! [`Operation`] list into a forward file and (when any operation carries
//! rollback SQL) a down file, per the migration file layout in spec §6.

use erm_differ::Operation;

pub struct MigrationFiles {
    /// Relative path under the migrations directory, e.g. `0007_add_users.sql`.
    pub forward_relative_path: String,
    pub forward_sql: String,
    /// `<stem>.down.sql`, present only when at least one operation is
    /// reversible.
    pub down_relative_path: Option<String>,
    pub down_sql: Option<String>,
}

/// `version` and `slug` together form the migration stem
/// (`<version>_<slug>`); the differ has already ordered `operations`
/// forward-creation-first / drop-reverse (spec §4.2).
pub fn emit_migration(version: &str, slug: &str, operations: &[Operation]) -> MigrationFiles {
    let stem = format!("{version}_{slug}");
    let forward_sql = render_forward(operations);
    let (down_relative_path, down_sql) = render_down(operations).map_or((None, None), |sql| {
        (Some(format!("{stem}.down.sql")), Some(sql))
    });

    MigrationFiles {
        forward_relative_path: format!("{stem}.sql"),
        forward_sql,
        down_relative_path,
        down_sql,
    }
}

fn render_forward(operations: &[Operation]) -> String {
    let mut out = String::new();
    for op in operations {
        if let Some(reason) = &op.reason {
            out.push_str(&format!("-- {reason}\n"));
        }
        out.push_str(op.sql.trim_end());
        if !op.sql.trim_end().ends_with(';') {
            out.push(';');
        }
        out.push_str("\n\n");
    }
    out.trim_end().to_string() + "\n"
}

/// Reverses the forward operations' rollback statements, since schema
/// changes must be undone in the opposite order they were applied in.
/// Operations without rollback SQL are skipped; returns `None` if none of
/// the operations in this migration are reversible.
fn render_down(operations: &[Operation]) -> Option<String> {
    let reversible: Vec<&str> = operations
        .iter()
        .rev()
        .filter_map(|op| op.rollback_sql.as_deref())
        .collect();
    if reversible.is_empty() {
        return None;
    }
    let mut out = String::new();
    for sql in reversible {
        out.push_str(sql.trim_end());
        if !sql.trim_end().ends_with(';') {
            out.push(';');
        }
        out.push_str("\n\n");
    }
    Some(out.trim_end().to_string() + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use erm_differ::OperationKind;

    #[test]
    fn forward_sql_joins_every_operation() {
        let ops = vec![
            Operation::new(OperationKind::CreateTable, "users", "CREATE TABLE users (id uuid)"),
            Operation::new(OperationKind::AddIndex, "idx_users_id", "CREATE INDEX idx_users_id ON users(id)"),
        ];
        let files = emit_migration("0001", "init", &ops);
        assert!(files.forward_sql.contains("CREATE TABLE users"));
        assert!(files.forward_sql.contains("CREATE INDEX idx_users_id"));
        assert_eq!(files.forward_relative_path, "0001_init.sql");
    }

    #[test]
    fn down_sql_is_none_when_nothing_reversible() {
        let ops = vec![Operation::new(OperationKind::CreateExtension, "postgis", "CREATE EXTENSION postgis")];
        let files = emit_migration("0001", "init", &ops);
        assert!(files.down_sql.is_none());
        assert!(files.down_relative_path.is_none());
    }

    #[test]
    fn down_sql_reverses_operation_order() {
        let ops = vec![
            Operation::new(OperationKind::CreateTable, "users", "CREATE TABLE users (id uuid)")
                .with_rollback("DROP TABLE users"),
            Operation::new(OperationKind::AddIndex, "idx_users_id", "CREATE INDEX idx_users_id ON users(id)")
                .with_rollback("DROP INDEX idx_users_id"),
        ];
        let files = emit_migration("0001", "init", &ops);
        let down = files.down_sql.unwrap();
        let idx_pos = down.find("DROP INDEX").unwrap();
        let table_pos = down.find("DROP TABLE").unwrap();
        assert!(idx_pos < table_pos, "index drop must precede table drop");
    }
}
