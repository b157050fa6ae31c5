//! Statement text generation over a table's name and ordered field list.
//!
//! Everything here is pure string assembly. Placeholders are positional
//! (`?`) and always appear in field order, so callers bind values in the
//! same order the table declares its fields.

use crate::{SqlValue, StoreError, StoreResult, TableSchema};

/// `SELECT <fields> FROM <table>[ WHERE <where_clause>]`.
///
/// The WHERE text is appended verbatim; an empty string is treated as absent.
pub fn select_statement(
    fields: &[&str],
    table_name: &str,
    where_clause: Option<&str>,
) -> StoreResult<String> {
    check_table(table_name, fields)?;
    let projection = fields_string(fields, None);
    match where_clause {
        Some(predicate) if !predicate.is_empty() => Ok(format!(
            "SELECT {projection} FROM {table_name} WHERE {predicate}"
        )),
        _ => Ok(format!("SELECT {projection} FROM {table_name}")),
    }
}

/// `INSERT OR REPLACE INTO <table> (<fields>) VALUES (?, ...)` with one
/// placeholder per field.
pub fn insert_statement(table_name: &str, fields: &[&str]) -> StoreResult<String> {
    check_table(table_name, fields)?;
    let placeholders = vec!["?"; fields.len()].join(", ");
    Ok(format!(
        "INSERT OR REPLACE INTO {table_name} ({}) VALUES ({placeholders})",
        fields_string(fields, None)
    ))
}

/// Equality conjunction `a = ? AND b = ?`. No field names yields `""`.
pub fn generate_where(field_names: &[&str]) -> String {
    field_names
        .iter()
        .map(|field| format!("{field} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Comma-joined projection, each field qualified as `prefix.field` when a
/// prefix is given.
pub fn fields_string(fields: &[&str], prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) => fields
            .iter()
            .map(|field| format!("{prefix}.{field}"))
            .collect::<Vec<_>>()
            .join(", "),
        None => fields.join(", "),
    }
}

/// Decodes raw rows positionally into `T::Entry`.
pub fn decode_results<T, I>(rows: I) -> StoreResult<Vec<T::Entry>>
where
    T: TableSchema,
    I: IntoIterator<Item = Vec<SqlValue>>,
{
    rows.into_iter().map(T::decode_row).collect()
}

pub fn check_row_width(table_name: &str, expected: usize, actual: usize) -> StoreResult<()> {
    if expected != actual {
        return Err(StoreError::shape(format!(
            "row has {actual} values, {table_name} declares {expected} fields"
        )));
    }
    Ok(())
}

pub fn check_bind_count(table_name: &str, expected: usize, actual: usize) -> StoreResult<()> {
    if expected != actual {
        return Err(StoreError::shape(format!(
            "statement on {table_name} expects {expected} bound values, got {actual}"
        )));
    }
    Ok(())
}

fn check_table(table_name: &str, fields: &[&str]) -> StoreResult<()> {
    if table_name.is_empty() {
        return Err(StoreError::configuration("table name is empty"));
    }
    if fields.is_empty() {
        return Err(StoreError::configuration(format!(
            "table {table_name} declares no fields"
        )));
    }
    Ok(())
}
