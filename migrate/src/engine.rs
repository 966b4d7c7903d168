//! Migration plan/apply/rollback (spec §4.4). Every step that touches the
//! database runs inside one transaction; any failure before commit rolls the
//! whole batch back, leaving no partial state.

use crate::discovery::Migration;
use erm_core::ErmError;
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tokio_postgres::Client;

#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// `pg_advisory_xact_lock` key. Two erm deployments sharing a database
    /// must use different keys to avoid serializing on each other.
    pub lock_key: i64,
    pub tracking_table: String,
    /// Stop after applying this many pending migrations; `None` applies all.
    pub batch_size: Option<usize>,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        MigrateOptions {
            lock_key: 727_272_001,
            tracking_table: "erm_schema_migrations".to_string(),
            batch_size: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub pending: Vec<Migration>,
    pub applied: Vec<String>,
}

pub async fn plan(client: &mut Client, migrations: &[Migration], opts: &MigrateOptions) -> Result<Plan, ErmError> {
    let txn = client.transaction().await.map_err(db_err)?;
    txn.execute("SELECT pg_advisory_xact_lock($1)", &[&opts.lock_key])
        .await
        .map_err(db_err)?;
    let applied = load_applied(&txn, &opts.tracking_table).await?;
    txn.commit().await.map_err(db_err)?;

    check_drift(migrations, &applied)?;

    let mut applied_sorted: Vec<String> = applied.iter().cloned().collect();
    applied_sorted.sort();
    let pending = migrations
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .cloned()
        .collect();

    Ok(Plan { pending, applied: applied_sorted })
}

/// Every applied version must have a matching forward file on disk; an
/// applied version with none is schema drift (spec §4.4).
fn check_drift(migrations: &[Migration], applied: &HashSet<String>) -> Result<(), ErmError> {
    let known: HashSet<&str> = migrations.iter().map(|m| m.version.as_str()).collect();
    let missing: Vec<String> = applied
        .iter()
        .filter(|v| !known.contains(v.as_str()))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ErmError::SchemaDrift { missing })
    }
}

pub async fn apply(client: &mut Client, migrations: &[Migration], opts: &MigrateOptions) -> Result<Vec<String>, ErmError> {
    let txn = client.transaction().await.map_err(db_err)?;
    txn.execute("SELECT pg_advisory_xact_lock($1)", &[&opts.lock_key])
        .await
        .map_err(db_err)?;
    txn.batch_execute(&format!(
        "CREATE TABLE IF NOT EXISTS {} (version text PRIMARY KEY, applied_at timestamptz NOT NULL DEFAULT now())",
        opts.tracking_table
    ))
    .await
    .map_err(db_err)?;

    let applied = load_applied(&txn, &opts.tracking_table).await?;
    check_drift(migrations, &applied)?;

    let mut newly_applied = Vec::new();
    let mut sorted: Vec<&Migration> = migrations.iter().collect();
    sorted.sort_by(|a, b| a.version.cmp(&b.version));

    for migration in sorted {
        if applied.contains(&migration.version) {
            continue;
        }
        if let Some(limit) = opts.batch_size {
            if newly_applied.len() >= limit {
                break;
            }
        }

        let started_at = Instant::now();
        let sql = migration.read_forward_sql()?;
        txn.batch_execute(&sql)
            .await
            .map_err(|e| decorate(e, &sql, &migration.forward_path))?;
        txn.execute(
            &format!(
                "INSERT INTO {} (version) VALUES ($1) ON CONFLICT DO NOTHING",
                opts.tracking_table
            ),
            &[&migration.version],
        )
        .await
        .map_err(db_err)?;

        tracing::info!(
            target: "erm.migrate.apply",
            version = %migration.version,
            duration_ms = started_at.elapsed().as_millis() as u64,
            "applied migration"
        );
        newly_applied.push(migration.version.clone());
    }

    txn.commit().await.map_err(db_err)?;
    Ok(newly_applied)
}

pub async fn rollback(client: &mut Client, migrations: &[Migration], opts: &MigrateOptions) -> Result<String, ErmError> {
    let started_at = Instant::now();
    let txn = client.transaction().await.map_err(db_err)?;
    txn.execute("SELECT pg_advisory_xact_lock($1)", &[&opts.lock_key])
        .await
        .map_err(db_err)?;

    let applied = load_applied(&txn, &opts.tracking_table).await?;
    let latest = applied.iter().max().cloned().ok_or(ErmError::NoAppliedMigrations)?;

    let migration = migrations
        .iter()
        .find(|m| m.version == latest)
        .ok_or_else(|| ErmError::MissingDownFile { version: latest.clone() })?;
    let sql = migration.read_down_sql()?;

    txn.batch_execute(&sql)
        .await
        .map_err(|e| decorate(e, &sql, migration.down_path.as_deref().unwrap_or(&migration.forward_path)))?;
    txn.execute(
        &format!("DELETE FROM {} WHERE version = $1", opts.tracking_table),
        &[&latest],
    )
    .await
    .map_err(db_err)?;

    txn.commit().await.map_err(db_err)?;
    tracing::info!(
        target: "erm.migrate.rollback",
        version = %latest,
        duration_ms = started_at.elapsed().as_millis() as u64,
        "rolled back migration"
    );
    Ok(latest)
}

async fn load_applied(
    txn: &tokio_postgres::Transaction<'_>,
    table: &str,
) -> Result<HashSet<String>, ErmError> {
    let exists_row = txn
        .query_one(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
            &[&table],
        )
        .await
        .map_err(db_err)?;
    let exists: bool = exists_row.get(0);
    if !exists {
        return Ok(HashSet::new());
    }

    let rows = txn
        .query(&format!("SELECT version FROM {table}"), &[])
        .await
        .map_err(db_err)?;
    Ok(rows.into_iter().map(|row| row.get::<_, String>(0)).collect())
}

fn db_err(err: tokio_postgres::Error) -> ErmError {
    ErmError::Database(err.to_string())
}

/// Decorate a Postgres error with `<path>:<line>:<col>` when the driver
/// reports a byte position into the executed SQL (spec §4.4).
fn decorate(err: tokio_postgres::Error, sql: &str, path: &Path) -> ErmError {
    let position = err
        .as_db_error()
        .and_then(|db_error| match db_error.position() {
            Some(tokio_postgres::error::ErrorPosition::Original(pos)) => Some(*pos as usize),
            _ => None,
        })
        .map(|byte_pos| {
            let (line, col) = line_col_at(sql, byte_pos);
            format!("{}:{line}:{col}", path.display())
        });

    ErmError::MigrationSql { message: err.to_string(), position }
}

/// 1-indexed (line, column) of `byte_pos` in `sql`, walking by character so
/// multi-byte UTF-8 doesn't throw the column off.
fn line_col_at(sql: &str, byte_pos: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (idx, ch) in sql.char_indices() {
        if idx >= byte_pos {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_at_counts_newlines() {
        let sql = "SELECT 1;\nSELECT bogus;";
        let (line, col) = line_col_at(sql, 17);
        assert_eq!(line, 2);
        assert_eq!(col, 8);
    }

    #[test]
    fn drift_check_flags_applied_versions_with_no_forward_file() {
        let migrations = vec![];
        let mut applied = HashSet::new();
        applied.insert("0001".to_string());
        let err = check_drift(&migrations, &applied).unwrap_err();
        assert!(matches!(err, ErmError::SchemaDrift { .. }));
    }
}
