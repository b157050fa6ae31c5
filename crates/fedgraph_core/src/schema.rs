use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::statement::{
    check_bind_count, check_row_width, decode_results, fields_string, generate_where,
    insert_statement, select_statement,
};
use crate::{ColumnKind, SqlValue, StoreError, StoreResult};

/// Every persisted entity kind, in declaration order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    ReceivedTransactions,
    SentTransactions,
    TransactionsToPdu,
    Pdus,
    StatePdus,
    CurrentState,
    PduDestinations,
    PduEdges,
    PduForwardExtremities,
    PduBackwardExtremities,
    ContextDepth,
}

impl TableKind {
    pub const ALL: [TableKind; 11] = [
        TableKind::ReceivedTransactions,
        TableKind::SentTransactions,
        TableKind::TransactionsToPdu,
        TableKind::Pdus,
        TableKind::StatePdus,
        TableKind::CurrentState,
        TableKind::PduDestinations,
        TableKind::PduEdges,
        TableKind::PduForwardExtremities,
        TableKind::PduBackwardExtremities,
        TableKind::ContextDepth,
    ];

    pub fn table_name(self) -> &'static str {
        self.definition().name
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

/// Static metadata for one table. Field order is the positional contract
/// for both inserts and decoded rows.
#[derive(Debug)]
pub struct TableDef {
    pub kind: TableKind,
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub columns: &'static [Column],
    /// Columns whose combined value identifies a row; replace-inserts
    /// collide on this key.
    pub unique: &'static [&'static str],
    pub auto_increment: Option<&'static str>,
}

impl TableDef {
    pub fn select(&self, where_clause: Option<&str>) -> StoreResult<String> {
        select_statement(self.fields, self.name, where_clause)
    }

    pub fn insert(&self) -> StoreResult<String> {
        insert_statement(self.name, self.fields)
    }

    pub fn projection(&self, prefix: Option<&str>) -> String {
        fields_string(self.fields, prefix)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn check_row_width(&self, width: usize) -> StoreResult<()> {
        check_row_width(self.name, self.fields.len(), width)
    }

    /// Rejects metadata that cannot produce valid statements.
    pub fn validate(&self) -> StoreResult<()> {
        if self.name.is_empty() {
            return Err(StoreError::configuration(format!(
                "{:?} has an empty table name",
                self.kind
            )));
        }
        if self.fields.is_empty() {
            return Err(StoreError::configuration(format!(
                "table {} declares no fields",
                self.name
            )));
        }
        let column_names: Vec<&str> = self.columns.iter().map(|column| column.name).collect();
        if column_names != self.fields {
            return Err(StoreError::configuration(format!(
                "table {} columns do not match its field list",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for field in self.fields {
            if field.is_empty() || !seen.insert(*field) {
                return Err(StoreError::configuration(format!(
                    "table {} has an empty or duplicate field '{field}'",
                    self.name
                )));
            }
        }
        if self.unique.is_empty() {
            return Err(StoreError::configuration(format!(
                "table {} declares no uniqueness key",
                self.name
            )));
        }
        if let Some(missing) = self.unique.iter().find(|key| !seen.contains(**key)) {
            return Err(StoreError::configuration(format!(
                "table {} uniqueness key names unknown field '{missing}'",
                self.name
            )));
        }
        if let Some(auto) = self.auto_increment {
            match self.column(auto) {
                Some(column) if column.kind == ColumnKind::Integer => {}
                _ => {
                    return Err(StoreError::configuration(format!(
                        "table {} auto-increment column '{auto}' must be an integer field",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A table type bound to its static metadata and record type.
pub trait TableSchema: Sized {
    type Entry: Clone + fmt::Debug + PartialEq + Send + Sync + 'static;

    const KIND: TableKind;

    fn definition() -> &'static TableDef;

    /// Builds one record from a row whose values follow field order.
    fn decode_row(row: Vec<SqlValue>) -> StoreResult<Self::Entry>;

    /// Flattens a record into values in field order.
    fn encode(entry: &Self::Entry) -> Vec<SqlValue>;

    fn name() -> &'static str {
        Self::definition().name
    }

    fn fields() -> &'static [&'static str] {
        Self::definition().fields
    }

    fn select(where_clause: Option<&str>) -> StoreResult<String> {
        Self::definition().select(where_clause)
    }

    fn insert() -> StoreResult<String> {
        Self::definition().insert()
    }

    fn where_clause(field_names: &[&str]) -> String {
        generate_where(field_names)
    }

    fn projection(prefix: Option<&str>) -> String {
        Self::definition().projection(prefix)
    }

    fn decode<I>(rows: I) -> StoreResult<Vec<Self::Entry>>
    where
        I: IntoIterator<Item = Vec<SqlValue>>,
    {
        decode_results::<Self, I>(rows)
    }

    /// Insert text plus the record's values, ready to bind.
    fn bind_insert(entry: &Self::Entry) -> StoreResult<(String, Vec<SqlValue>)> {
        let values = Self::encode(entry);
        check_bind_count(Self::name(), Self::fields().len(), values.len())?;
        Ok((Self::insert()?, values))
    }
}
