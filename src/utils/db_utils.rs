use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::{MySql, Transaction};

use crate::error::AppError;

/// SQL bindable value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

/// Kind of value a column accepts from a JSON payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Id,
    Bool,
    Date,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

/// Normalized `page` / `per_page` query values and the row offset they select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub per_page: u32,
    pub offset: u64,
}

impl PageWindow {
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_size: u32, max_size: u32) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(default_size).clamp(1, max_size);
        Self {
            page,
            per_page,
            offset: u64::from(page - 1) * u64::from(per_page),
        }
    }
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

fn to_sql_value(column: &Column, value: &Value) -> Result<SqlValue, AppError> {
    let invalid = || AppError::validation(format!("{} の値が不正です", column.name));

    match (column.kind, value) {
        (_, Value::Null) if column.nullable => Ok(SqlValue::Null),
        (ColumnKind::Text, Value::String(s)) => Ok(SqlValue::String(s.trim().to_string())),
        (ColumnKind::Id, Value::Number(n)) => n.as_u64().map(SqlValue::U64).ok_or_else(invalid),
        (ColumnKind::Bool, Value::Bool(b)) => Ok(SqlValue::Bool(*b)),
        (ColumnKind::Date, Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(SqlValue::Date)
            .map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// Builds `UPDATE table SET ... WHERE id_column = ?` from the keys of
/// `payload`. Keys outside `columns` are rejected, never interpolated.
pub fn build_update_sql(
    table: &str,
    payload: &Map<String, Value>,
    columns: &[Column],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, AppError> {
    if payload.is_empty() {
        return Err(AppError::validation("更新する項目がありません"));
    }

    let mut assignments = Vec::with_capacity(payload.len());
    let mut values = Vec::with_capacity(payload.len() + 1);

    for (key, value) in payload {
        let column = columns
            .iter()
            .find(|c| c.name == key)
            .ok_or_else(|| AppError::validation(format!("{key} は更新できません")))?;
        assignments.push(format!("{} = ?", column.name));
        values.push(to_sql_value(column, value)?);
    }

    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate {
        sql: format!(
            "UPDATE {} SET {}, updated_at = NOW() WHERE {} = ?",
            table,
            assignments.join(", "),
            id_column
        ),
        values,
    })
}

pub async fn execute_update(
    tx: &mut Transaction<'_, MySql>,
    update: SqlUpdate,
) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(&mut **tx).await?;
    Ok(result.rows_affected())
}
