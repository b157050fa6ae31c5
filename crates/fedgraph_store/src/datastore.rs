//! Opening the store that lives in a data directory.

use std::path::Path;

use crate::{SqliteStore, StoreConfig, StoreError, StoreResult, registry};

/// Opens the store configured by `fedgraph.json` under `base`, creating the
/// config and database on first use. Fails with `Storage` if any registered
/// table is absent after schema setup.
pub async fn open_store(base: &Path) -> StoreResult<SqliteStore> {
    let config = StoreConfig::load_or_init(base)?;
    let store = SqliteStore::open(&config, base).await?;
    let missing = missing_tables(&store).await?;
    if !missing.is_empty() {
        return Err(StoreError::storage(format!(
            "store at {} is missing tables: {}",
            base.display(),
            missing.join(", ")
        )));
    }
    Ok(store)
}

/// Registered tables not present in the store's database.
pub async fn missing_tables(store: &SqliteStore) -> StoreResult<Vec<&'static str>> {
    let present = store.table_names().await?;
    Ok(registry()?
        .tables()
        .map(|definition| definition.name)
        .filter(|name| !present.iter().any(|table| table == name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{missing_tables, open_store};
    use crate::{
        DEFAULT_CONFIG_NAME, DEFAULT_DB_NAME, StatementStore, StoreConfig, TransactionToPdu,
        TransactionsToPduTable,
    };
    use tempfile::tempdir;

    fn link(pdu_id: &str) -> TransactionToPdu {
        TransactionToPdu {
            transaction_id: "txn-1".to_string(),
            destination: "green.example".to_string(),
            pdu_id: pdu_id.to_string(),
            pdu_origin: "red.example".to_string(),
        }
    }

    #[tokio::test]
    async fn first_open_lays_out_the_data_directory() {
        let dir = tempdir().expect("tempdir");
        let base = dir.path();
        {
            let store = open_store(base).await.expect("open store");
            assert!(base.join(DEFAULT_CONFIG_NAME).exists());
            assert!(base.join(DEFAULT_DB_NAME).exists());
            assert!(missing_tables(&store).await.expect("tables").is_empty());
            store
                .insert_many::<TransactionsToPduTable>(&[link("p1"), link("p2")])
                .await
                .expect("links");
        }
        let reopened = open_store(base).await.expect("reopen");
        let links = reopened
            .select::<TransactionsToPduTable>(
                &[TransactionsToPduTable::COLUMNS.transaction_id],
                vec!["txn-1".into()],
            )
            .await
            .expect("links");
        assert_eq!(links.len(), 2);
        assert!(links.contains(&link("p1")));
        assert!(links.contains(&link("p2")));
    }

    #[tokio::test]
    async fn memory_config_leaves_no_database_file() {
        let dir = tempdir().expect("tempdir");
        let base = dir.path();
        StoreConfig::in_memory()
            .write(&base.join(DEFAULT_CONFIG_NAME))
            .expect("write config");
        let store = open_store(base).await.expect("open store");
        assert!(missing_tables(&store).await.expect("tables").is_empty());
        assert!(!base.join(DEFAULT_DB_NAME).exists());
    }
}
