//! SELECT and aggregate builders (spec §4.5). Argument order is stable:
//! WHERE predicates (in predicate order), then LIMIT, then OFFSET.

use crate::value::Value;
use erm_core::{AggregateFn, CompareOp, SortDirection};

pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    /// `None` for `IsNull`/`IsNotNull`, which bind no argument.
    pub value: Option<Value>,
}

pub struct Order {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Default)]
pub struct SelectSpec {
    pub table: String,
    pub columns: Vec<String>,
    pub predicates: Vec<Predicate>,
    pub order: Vec<Order>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn build_select(spec: &SelectSpec) -> (String, Vec<Value>) {
    let mut args = Vec::new();
    let mut next_placeholder = 1;

    let columns = if spec.columns.is_empty() {
        "*".to_string()
    } else {
        spec.columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut sql = format!("SELECT {columns} FROM \"{}\"", spec.table);

    if !spec.predicates.is_empty() {
        let clauses: Vec<String> = spec
            .predicates
            .iter()
            .map(|p| {
                render_predicate(p, &mut next_placeholder, &mut args)
            })
            .collect();
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    if !spec.order.is_empty() {
        let clauses: Vec<String> = spec
            .order
            .iter()
            .map(|o| format!("\"{}\" {}", o.column, o.direction.sql_keyword()))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&clauses.join(", "));
    }

    if let Some(limit) = spec.limit {
        sql.push_str(&format!(" LIMIT ${next_placeholder}"));
        args.push(Value::I64(limit));
        next_placeholder += 1;
    }

    if let Some(offset) = spec.offset {
        sql.push_str(&format!(" OFFSET ${next_placeholder}"));
        args.push(Value::I64(offset));
    }

    (sql, args)
}

pub struct AggregateSpec {
    pub table: String,
    pub function: AggregateFn,
    pub column: Option<String>,
    pub predicates: Vec<Predicate>,
}

pub fn build_aggregate(spec: &AggregateSpec) -> (String, Vec<Value>) {
    let mut args = Vec::new();
    let mut next_placeholder = 1;

    let target = spec
        .column
        .as_ref()
        .map(|c| format!("\"{c}\""))
        .unwrap_or_else(|| "*".to_string());

    let mut sql = format!(
        "SELECT {}({target}) FROM \"{}\"",
        spec.function.sql_name(),
        spec.table
    );

    if !spec.predicates.is_empty() {
        let clauses: Vec<String> = spec
            .predicates
            .iter()
            .map(|p| render_predicate(p, &mut next_placeholder, &mut args))
            .collect();
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    (sql, args)
}

fn render_predicate(predicate: &Predicate, next_placeholder: &mut u32, args: &mut Vec<Value>) -> String {
    match predicate.op {
        CompareOp::IsNull | CompareOp::IsNotNull => {
            format!("\"{}\" {}", predicate.column, predicate.op.sql_operator())
        }
        CompareOp::In | CompareOp::NotIn => {
            let placeholder = *next_placeholder;
            *next_placeholder += 1;
            args.push(predicate.value.clone().unwrap_or(Value::Null));
            format!(
                "\"{}\" {} (${placeholder})",
                predicate.column,
                predicate.op.sql_operator()
            )
        }
        _ => {
            let placeholder = *next_placeholder;
            *next_placeholder += 1;
            args.push(predicate.value.clone().unwrap_or(Value::Null));
            format!(
                "\"{}\" {} ${placeholder}",
                predicate.column,
                predicate.op.sql_operator()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_arguments_where_then_limit_then_offset() {
        let spec = SelectSpec {
            table: "users".to_string(),
            columns: vec![],
            predicates: vec![Predicate {
                column: "email".to_string(),
                op: CompareOp::Eq,
                value: Some(Value::Text("a@b.com".to_string())),
            }],
            order: vec![],
            limit: Some(20),
            offset: Some(40),
        };
        let (sql, args) = build_select(&spec);
        assert_eq!(sql, "SELECT * FROM \"users\" WHERE \"email\" = $1 LIMIT $2 OFFSET $3");
        assert_eq!(args, vec![Value::Text("a@b.com".to_string()), Value::I64(20), Value::I64(40)]);
    }

    #[test]
    fn null_checks_bind_no_argument() {
        let spec = SelectSpec {
            table: "users".to_string(),
            columns: vec!["id".to_string()],
            predicates: vec![Predicate {
                column: "deleted_at".to_string(),
                op: CompareOp::IsNull,
                value: None,
            }],
            order: vec![],
            limit: None,
            offset: None,
        };
        let (sql, args) = build_select(&spec);
        assert_eq!(sql, "SELECT \"id\" FROM \"users\" WHERE \"deleted_at\" IS NULL");
        assert!(args.is_empty());
    }

    #[test]
    fn aggregate_builds_function_call_with_optional_where() {
        let spec = AggregateSpec {
            table: "posts".to_string(),
            function: AggregateFn::Count,
            column: None,
            predicates: vec![],
        };
        let (sql, args) = build_aggregate(&spec);
        assert_eq!(sql, "SELECT COUNT(*) FROM \"posts\"");
        assert!(args.is_empty());
    }
}
