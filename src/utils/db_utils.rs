use actix_web::error::ErrorBadRequest;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::SqlitePool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `allowed` become columns; anything else in the payload
/// is a bad request, so client JSON never reaches the SQL text.
pub fn build_update_sql(
    table: &str,
    allowed: &[&str],
    payload: &Value,
    id_column: &str,
    id_value: i64,
) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    if let Some(unknown) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ErrorBadRequest(format!("Field `{}` cannot be updated", unknown)));
    }

    // Build SET clause
    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {}, updated_at = CURRENT_TIMESTAMP WHERE {} = ?",
        table, set_clause, id_column
    );

    let mut values = Vec::with_capacity(obj.len() + 1);

    // Convert JSON values → SqlValue
    for value in obj.values() {
        match value {
            Value::String(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(d) => values.push(SqlValue::Date(d)),
                Err(_) => values.push(SqlValue::String(s.clone())),
            },
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    values.push(SqlValue::I64(i));
                } else if let Some(f) = n.as_f64() {
                    values.push(SqlValue::F64(f));
                }
            }
            Value::Bool(b) => values.push(SqlValue::Bool(*b)),
            Value::Null => values.push(SqlValue::Null),
            _ => return Err(ErrorBadRequest("Unsupported JSON value type")),
        }
    }

    // WHERE id = ?
    values.push(SqlValue::I64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &SqlitePool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[&str] = &["full_name", "hire_date", "department_id", "avatar"];

    #[test]
    fn test_build_update_sql_single_field() {
        let payload = json!({ "hire_date": "2024-02-01" });

        let update = build_update_sql("employees", COLUMNS, &payload, "id", 7).unwrap();

        assert_eq!(
            update.sql,
            "UPDATE employees SET hire_date = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
                SqlValue::I64(7),
            ]
        );
    }

    #[test]
    fn test_build_update_sql_binds_one_value_per_column() {
        let payload = json!({
            "full_name": "Sara Ahmed",
            "department_id": 3,
            "avatar": null
        });

        let update = build_update_sql("employees", COLUMNS, &payload, "id", 7).unwrap();

        assert_eq!(update.sql.matches("= ?").count(), 4);
        assert_eq!(update.values.len(), 4);
        assert!(update.values.contains(&SqlValue::String("Sara Ahmed".to_string())));
        assert!(update.values.contains(&SqlValue::I64(3)));
        assert!(update.values.contains(&SqlValue::Null));
        assert_eq!(update.values.last(), Some(&SqlValue::I64(7)));
    }

    #[test]
    fn test_build_update_sql_rejects_unknown_columns() {
        let payload = json!({ "full_name": "x", "id = 1; --": 1 });
        assert!(build_update_sql("employees", COLUMNS, &payload, "id", 1).is_err());
    }

    #[test]
    fn test_build_update_sql_rejects_empty_and_non_objects() {
        assert!(build_update_sql("employees", COLUMNS, &json!({}), "id", 1).is_err());
        assert!(build_update_sql("employees", COLUMNS, &json!([1, 2]), "id", 1).is_err());
        assert!(
            build_update_sql("employees", COLUMNS, &json!({ "avatar": ["a"] }), "id", 1).is_err()
        );
    }
}
