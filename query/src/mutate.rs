//! Bulk insert/update/delete builders (spec §4.5).

use crate::value::Value;
use erm_core::ErmError;

pub fn build_bulk_insert(
    table: &str,
    columns: &[String],
    rows: &[Vec<Value>],
    returning: &[String],
) -> Result<(String, Vec<Value>), ErmError> {
    if columns.is_empty() {
        return Err(ErmError::InvalidInvocation("bulk insert requires at least one column".to_string()));
    }
    if rows.is_empty() {
        return Err(ErmError::InvalidInvocation("bulk insert requires at least one row".to_string()));
    }
    for row in rows {
        if row.len() != columns.len() {
            return Err(ErmError::InvalidInvocation(format!(
                "row has {} values but {} columns were declared",
                row.len(),
                columns.len()
            )));
        }
    }

    let mut args = Vec::with_capacity(rows.len() * columns.len());
    let mut placeholder = 1u32;
    let row_groups: Vec<String> = rows
        .iter()
        .map(|row| {
            let placeholders: Vec<String> = row
                .iter()
                .map(|value| {
                    let p = format!("${placeholder}");
                    placeholder += 1;
                    args.push(value.clone());
                    p
                })
                .collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();

    let col_list = columns.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
    let mut sql = format!(
        "INSERT INTO \"{table}\"({col_list}) VALUES {}",
        row_groups.join(", ")
    );
    push_returning(&mut sql, returning);

    Ok((sql, args))
}

pub fn build_bulk_update(
    table: &str,
    pk_column: &str,
    columns: &[String],
    rows: &[Vec<Value>],
    returning: &[String],
) -> Result<(String, Vec<Value>), ErmError> {
    if columns.is_empty() {
        return Err(ErmError::InvalidInvocation("bulk update requires at least one column".to_string()));
    }
    if rows.is_empty() {
        return Err(ErmError::InvalidInvocation("bulk update requires at least one row".to_string()));
    }
    let expected_len = columns.len() + 1; // pk + columns
    for row in rows {
        if row.len() != expected_len {
            return Err(ErmError::InvalidInvocation(format!(
                "row has {} values but {} (pk + columns) were expected",
                row.len(),
                expected_len
            )));
        }
    }

    let mut args = Vec::with_capacity(rows.len() * expected_len);
    let mut placeholder = 1u32;
    let row_groups: Vec<String> = rows
        .iter()
        .map(|row| {
            let placeholders: Vec<String> = row
                .iter()
                .map(|value| {
                    let p = format!("${placeholder}");
                    placeholder += 1;
                    args.push(value.clone());
                    p
                })
                .collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();

    let data_cols = std::iter::once(pk_column.to_string())
        .chain(columns.iter().cloned())
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let set_clause = columns
        .iter()
        .map(|c| format!("\"{c}\" = data.\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "WITH data({data_cols}) AS (VALUES {}) UPDATE \"{table}\" AS t SET {set_clause} FROM data WHERE t.\"{pk_column}\" = data.\"{pk_column}\"",
        row_groups.join(", ")
    );
    push_returning(&mut sql, returning);

    Ok((sql, args))
}

pub fn build_bulk_delete(table: &str, pk_column: &str, ids: &[Value]) -> Result<(String, Vec<Value>), ErmError> {
    if ids.is_empty() {
        return Err(ErmError::InvalidInvocation("bulk delete requires at least one id".to_string()));
    }
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("${i}")).collect();
    let sql = format!(
        "DELETE FROM \"{table}\" WHERE \"{pk_column}\" IN ({})",
        placeholders.join(", ")
    );
    Ok((sql, ids.to_vec()))
}

fn push_returning(sql: &mut String, returning: &[String]) {
    if !returning.is_empty() {
        let cols = returning.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
        sql.push_str(&format!(" RETURNING {cols}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_insert_rejects_arity_mismatch() {
        let columns = vec!["email".to_string(), "name".to_string()];
        let rows = vec![vec![Value::from("a@b.com")]];
        assert!(build_bulk_insert("users", &columns, &rows, &[]).is_err());
    }

    #[test]
    fn bulk_insert_builds_multi_row_values_clause() {
        let columns = vec!["email".to_string()];
        let rows = vec![vec![Value::from("a@b.com")], vec![Value::from("c@d.com")]];
        let (sql, args) = build_bulk_insert("users", &columns, &rows, &["id".to_string()]).unwrap();
        assert_eq!(sql, "INSERT INTO \"users\"(\"email\") VALUES ($1), ($2) RETURNING \"id\"");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn bulk_delete_rejects_empty_id_list() {
        assert!(build_bulk_delete("users", "id", &[]).is_err());
    }

    #[test]
    fn bulk_delete_builds_in_clause() {
        let (sql, args) = build_bulk_delete("users", "id", &[Value::I64(1), Value::I64(2)]).unwrap();
        assert_eq!(sql, "DELETE FROM \"users\" WHERE \"id\" IN ($1, $2)");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn bulk_update_builds_values_cte() {
        let columns = vec!["name".to_string()];
        let rows = vec![vec![Value::I64(1), Value::from("Ada")]];
        let (sql, _args) = build_bulk_update("users", "id", &columns, &rows, &[]).unwrap();
        assert!(sql.starts_with("WITH data(\"id\", \"name\") AS (VALUES ($1, $2))"));
        assert!(sql.contains("SET \"name\" = data.\"name\""));
        assert!(sql.contains("WHERE t.\"id\" = data.\"id\""));
    }
}
