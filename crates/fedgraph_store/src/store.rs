//! Executes generated statements against SQLite.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use tokio::task::spawn_blocking;

use fedgraph_core::statement::check_bind_count;
use fedgraph_core::{SqlValue, StoreError, StoreResult, TableSchema};

use crate::schema::schema_statements;
use crate::{DatabaseConfig, SqliteOptions, StoreConfig};

/// Statement execution plus typed access to the registry's tables.
///
/// Implementors only provide raw execution; the typed helpers bind values in
/// field order and decode rows through the table's schema.
#[async_trait]
pub trait StatementStore: Send + Sync {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> StoreResult<usize>;

    /// Runs every statement in one transaction.
    async fn execute_many(&self, statements: Vec<(String, Vec<SqlValue>)>) -> StoreResult<usize>;

    async fn query_rows(&self, sql: &str, params: Vec<SqlValue>)
    -> StoreResult<Vec<Vec<SqlValue>>>;

    async fn insert<T: TableSchema>(&self, entry: &T::Entry) -> StoreResult<()> {
        let (sql, values) = T::bind_insert(entry)?;
        self.execute(&sql, values).await?;
        log::debug!("replace-insert into {}", T::name());
        Ok(())
    }

    async fn insert_many<T: TableSchema>(&self, entries: &[T::Entry]) -> StoreResult<usize> {
        let statements = entries
            .iter()
            .map(T::bind_insert)
            .collect::<StoreResult<Vec<_>>>()?;
        let count = statements.len();
        self.execute_many(statements).await?;
        log::debug!("replace-inserted {count} rows into {}", T::name());
        Ok(count)
    }

    /// Rows whose `where_fields` equal `params`, position by position.
    async fn select<T: TableSchema>(
        &self,
        where_fields: &[&str],
        params: Vec<SqlValue>,
    ) -> StoreResult<Vec<T::Entry>> {
        check_bind_count(T::name(), where_fields.len(), params.len())?;
        let predicate = T::where_clause(where_fields);
        let sql = T::select(Some(predicate.as_str()))?;
        let rows = self.query_rows(&sql, params).await?;
        T::decode(rows)
    }

    async fn select_all<T: TableSchema>(&self) -> StoreResult<Vec<T::Entry>> {
        let sql = T::select(None)?;
        let rows = self.query_rows(&sql, Vec::new()).await?;
        T::decode(rows)
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub async fn open(config: &StoreConfig, base_dir: &Path) -> StoreResult<Self> {
        let options = config.sqlite_options();
        let conn = match &config.database {
            DatabaseConfig::Sqlite { .. } => {
                let path = config.sqlite_path(base_dir)?;
                log::info!("opening sqlite store at {}", path.display());
                run_blocking(move || {
                    Connection::open(path).map_err(sqlite_error("sqlite open error"))
                })
                .await?
            }
            DatabaseConfig::Memory => {
                log::info!("opening in-memory sqlite store");
                run_blocking(|| {
                    Connection::open_in_memory().map_err(sqlite_error("sqlite open error"))
                })
                .await?
            }
        };
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.configure(options).await?;
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn open_in_memory() -> StoreResult<Self> {
        Self::open(&StoreConfig::in_memory(), Path::new(".")).await
    }

    async fn configure(&self, options: SqliteOptions) -> StoreResult<()> {
        self.with_conn(move |conn| {
            if let Some(timeout_ms) = options.busy_timeout_ms {
                conn.busy_timeout(Duration::from_millis(timeout_ms))
                    .map_err(sqlite_error("sqlite busy timeout error"))?;
            }
            if let Some(mode) = options.journal_mode {
                let applied: String = conn
                    .query_row(
                        &format!("PRAGMA journal_mode = {}", mode.as_pragma()),
                        [],
                        |row| row.get(0),
                    )
                    .map_err(sqlite_error("sqlite journal mode error"))?;
                log::debug!("sqlite journal mode {applied}");
            }
            Ok(())
        })
        .await
    }

    async fn init_schema(&self) -> StoreResult<()> {
        let statements = schema_statements()?;
        let count = statements.len();
        let batch = format!("BEGIN;\n{};\nCOMMIT;", statements.join(";\n"));
        self.with_conn(move |conn| {
            conn.execute_batch(&batch)
                .map_err(sqlite_error("sqlite schema error"))
        })
        .await?;
        log::info!("sqlite schema ready ({count} tables)");
        Ok(())
    }

    pub async fn table_names(&self) -> StoreResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .map_err(sqlite_error("sqlite prepare error"))?;
            let names = stmt
                .query_map([], |row| row.get(0))
                .and_then(|rows| rows.collect::<Result<Vec<String>, _>>())
                .map_err(sqlite_error("sqlite query error"))?;
            Ok(names)
        })
        .await
    }

    async fn with_conn<F, T>(&self, func: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        run_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::storage("sqlite connection poisoned"))?;
            func(&mut guard)
        })
        .await
    }
}

#[async_trait]
impl StatementStore for SqliteStore {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> StoreResult<usize> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            conn.execute(&sql, params_from_iter(params.iter().map(to_sqlite_value)))
                .map_err(sqlite_error("sqlite execute error"))
        })
        .await
    }

    async fn execute_many(&self, statements: Vec<(String, Vec<SqlValue>)>) -> StoreResult<usize> {
        self.with_conn(move |conn| {
            let tx = conn
                .transaction()
                .map_err(sqlite_error("sqlite transaction error"))?;
            let mut affected = 0;
            for (sql, params) in &statements {
                affected += tx
                    .execute(sql, params_from_iter(params.iter().map(to_sqlite_value)))
                    .map_err(sqlite_error("sqlite execute error"))?;
            }
            tx.commit().map_err(sqlite_error("sqlite commit error"))?;
            Ok(affected)
        })
        .await
    }

    async fn query_rows(
        &self,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> StoreResult<Vec<Vec<SqlValue>>> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(sqlite_error("sqlite prepare error"))?;
            let width = stmt.column_count();
            let rows = stmt
                .query_map(params_from_iter(params.iter().map(to_sqlite_value)), |row| {
                    (0..width)
                        .map(|idx| row.get::<_, Value>(idx).map(from_sqlite_value))
                        .collect::<Result<Vec<_>, _>>()
                })
                .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
                .map_err(sqlite_error("sqlite query error"))?;
            log::debug!("query returned {} rows", rows.len());
            Ok(rows)
        })
        .await
    }
}

async fn run_blocking<F, T>(func: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(func)
        .await
        .map_err(|err| StoreError::storage(format!("sqlite join error: {err}")))?
}

fn sqlite_error(context: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
    move |err| StoreError::storage(format!("{context}: {err}"))
}

fn to_sqlite_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(int) => Value::Integer(*int),
        SqlValue::Real(real) => Value::Real(*real),
        SqlValue::Text(text) => Value::Text(text.clone()),
        SqlValue::Blob(blob) => Value::Blob(blob.clone()),
    }
}

fn from_sqlite_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(int) => SqlValue::Integer(int),
        Value::Real(real) => SqlValue::Real(real),
        Value::Text(text) => SqlValue::Text(text),
        Value::Blob(blob) => SqlValue::Blob(blob),
    }
}
