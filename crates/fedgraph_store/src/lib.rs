pub mod config;
pub mod datastore;
pub mod schema;
pub mod store;

pub use config::{
    DEFAULT_CONFIG_NAME, DEFAULT_DB_NAME, DatabaseConfig, JournalMode, SqliteOptions, StoreConfig,
};
pub use datastore::{missing_tables, open_store};
pub use fedgraph_core::*;
pub use schema::{create_table_statement, schema_statements};
pub use store::{SqliteStore, StatementStore};
