//! `CREATE TABLE` statements for the registry's tables.

use sea_query::{Alias, ColumnDef, Index, SqliteQueryBuilder, Table};

use fedgraph_core::{ColumnKind, StoreResult, TableDef, registry};

/// Create-if-absent DDL for one table: a column per field, the
/// auto-increment primary key when declared, and a named UNIQUE constraint
/// over the table's uniqueness key.
pub fn create_table_statement(definition: &TableDef) -> StoreResult<String> {
    definition.validate()?;
    let mut table = Table::create();
    table.table(Alias::new(definition.name)).if_not_exists();
    for column in definition.columns {
        let mut column_def = ColumnDef::new(Alias::new(column.name));
        if definition.auto_increment == Some(column.name) {
            column_def.integer().primary_key().auto_increment();
        } else {
            match column.kind {
                ColumnKind::Text => column_def.text(),
                ColumnKind::Integer => column_def.big_integer(),
                ColumnKind::Boolean => column_def.boolean(),
            };
            if column.nullable {
                column_def.null();
            } else {
                column_def.not_null();
            }
        }
        table.col(&mut column_def);
    }
    let keyed_by_rowid = matches!(
        (definition.auto_increment, definition.unique),
        (Some(auto), [only]) if *only == auto
    );
    if !keyed_by_rowid {
        let mut unique = Index::create();
        unique.name(format!("uq_{}", definition.name)).unique();
        for key in definition.unique {
            unique.col(Alias::new(*key));
        }
        table.index(&mut unique);
    }
    Ok(table.to_string(SqliteQueryBuilder))
}

/// DDL for every registered table, in registry order.
pub fn schema_statements() -> StoreResult<Vec<String>> {
    registry()?.tables().map(create_table_statement).collect()
}
