//! Dispatches a built [`erm_query::SelectSpec`] against a routed connection,
//! wiring [`PoolSet::acquire_for_read`], [`PoolSet::failover_to_writer`],
//! [`FailoverLatch`], and [`Observer`] together per spec §4.6 (Failover) and
//! §4.7 (Observer).

use crate::observer::{Observer, RoutingAttributes};
use crate::policy::{resolve_policy, RoutingOverride};
use crate::pool::{FailoverLatch, PoolSet};
use bytes::BytesMut;
use erm_core::ErmError;
use erm_query::{build_select, SelectSpec, Value};
use std::error::Error as StdError;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::Row;

/// A local `ToSql` wrapper over a borrowed [`Value`]. `erm-query` stays
/// driver-agnostic (spec §4.5 design note); this impl lives here, at the
/// runtime's call site, since `Value` and `ToSql` are both foreign to this
/// crate and can't be impl'd together anywhere else.
struct BoundValue<'a>(&'a Value);

impl ToSql for BoundValue<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::I64(v) => v.to_sql(ty, out),
            Value::F64(v) => v.to_sql(ty, out),
            Value::Text(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn render_args(args: &[Value]) -> Vec<String> {
    args.iter().map(|v| format!("{v:?}")).collect()
}

/// Dispatch `sql`/`args` against `pool`, routed per `override_` and observed
/// through `observer`. A replica-issued query that errors is retried once on
/// the writer when the resolved policy allows fallback, under a second
/// `Observation` annotated `{failover: true, failover_reason: <first
/// error>}` (spec §4.6). `latch`, when given, gates that retry so that
/// concurrent callers sharing one deferred [`QueryRow`] only drive it once.
async fn dispatch(
    pool: &PoolSet,
    observer: &Observer,
    table: &str,
    override_: Option<&RoutingOverride>,
    sql: &str,
    args: &[Value],
    latch: Option<&FailoverLatch>,
) -> Result<Vec<Row>, ErmError> {
    let arg_strings = render_args(args);
    let bound: Vec<BoundValue> = args.iter().map(BoundValue).collect();
    let params: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|b| b as &(dyn ToSql + Sync)).collect();

    let fallback_allowed = match resolve_policy(&pool.policies, override_) {
        Some(policy) => !policy.as_ref().disable_fallback,
        None => false,
    };

    let mut observation = observer.begin(table, "select", args.len());
    let routed = pool.acquire_for_read(override_).await?;
    observation.set_routing(RoutingAttributes {
        target: routed.target.clone(),
        replica: routed.replica,
        failover: false,
        failover_reason: None,
        health_check: false,
    });

    match routed.client.query(sql, &params).await {
        Ok(rows) => {
            observation.close(sql, &arg_strings, None);
            Ok(rows)
        }
        Err(first_error) if routed.replica && fallback_allowed && latch.is_none_or(|l| l.try_fire()) => {
            observation.close(sql, &arg_strings, Some(&first_error.to_string()));

            let mut failover_observation = observer.begin(table, "select", args.len());
            let writer = pool.failover_to_writer(true).await?;
            failover_observation.set_routing(RoutingAttributes {
                target: writer.target.clone(),
                replica: false,
                failover: true,
                failover_reason: Some(first_error.to_string()),
                health_check: false,
            });

            match writer.client.query(sql, &params).await {
                Ok(rows) => {
                    failover_observation.close(sql, &arg_strings, None);
                    Ok(rows)
                }
                Err(e) => {
                    let message = e.to_string();
                    failover_observation.close(sql, &arg_strings, Some(&message));
                    Err(ErmError::Database(message))
                }
            }
        }
        Err(e) => {
            let message = e.to_string();
            observation.close(sql, &arg_strings, Some(&message));
            Err(ErmError::Database(message))
        }
    }
}

/// Runs reads for one entity/table, routed through a [`PoolSet`] and
/// observed through an [`Observer`]. One `Query` per call site; it borrows
/// both for the duration of the dispatch.
pub struct Query<'a> {
    pool: &'a PoolSet,
    observer: &'a Observer,
    table: String,
    override_: Option<RoutingOverride>,
}

impl<'a> Query<'a> {
    pub fn new(pool: &'a PoolSet, observer: &'a Observer, table: impl Into<String>) -> Self {
        Query { pool, observer, table: table.into(), override_: None }
    }

    pub fn with_override(mut self, override_: RoutingOverride) -> Self {
        self.override_ = Some(override_);
        self
    }

    /// Fetch every row matching `spec`, with one immediate writer-fallback
    /// retry on a failed replica read.
    pub async fn rows(&self, spec: &SelectSpec) -> Result<Vec<Row>, ErmError> {
        let (sql, args) = build_select(spec);
        dispatch(self.pool, self.observer, &self.table, self.override_.as_ref(), &sql, &args, None).await
    }

    /// A single-row query whose writer-fallback retry is deferred to
    /// [`QueryRow::scan`] (spec §4.6's deferred `QueryRow`/`Scan` path).
    pub fn row(&self, spec: &SelectSpec) -> QueryRow<'a> {
        let (sql, args) = build_select(spec);
        QueryRow {
            pool: self.pool,
            observer: self.observer,
            table: self.table.clone(),
            override_: self.override_.clone(),
            sql,
            args,
            latch: FailoverLatch::new(),
        }
    }
}

/// Deferred single-row fetch. The writer-failover retry, if any, happens
/// inside `scan`, not at construction, and the latch ensures that if the
/// same `QueryRow` is scanned from more than one concurrent task, only the
/// first drives the retry — the rest observe the replica's original error.
pub struct QueryRow<'a> {
    pool: &'a PoolSet,
    observer: &'a Observer,
    table: String,
    override_: Option<RoutingOverride>,
    sql: String,
    args: Vec<Value>,
    latch: FailoverLatch,
}

impl QueryRow<'_> {
    pub async fn scan(&self) -> Result<Option<Row>, ErmError> {
        let rows = dispatch(
            self.pool,
            self.observer,
            &self.table,
            self.override_.as_ref(),
            &self.sql,
            &self.args,
            Some(&self.latch),
        )
        .await?;
        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erm_query::Value;

    #[test]
    fn render_args_formats_every_value() {
        let args = vec![Value::Text("a@b.com".to_string()), Value::Null];
        let rendered = render_args(&args);
        assert_eq!(rendered.len(), 2);
    }
}
