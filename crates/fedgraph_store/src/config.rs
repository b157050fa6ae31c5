use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::{Deserialize, Serialize};

use fedgraph_core::{StoreError, StoreResult};

pub const DEFAULT_CONFIG_NAME: &str = "fedgraph.json";
pub const DEFAULT_DB_NAME: &str = "fedgraph.sqlite";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite { path: Option<String> },
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Wal,
    Memory,
}

impl JournalMode {
    pub fn as_pragma(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SqliteOptions {
    pub busy_timeout_ms: Option<u64>,
    pub journal_mode: Option<JournalMode>,
}

impl SqliteOptions {
    pub fn with_defaults() -> Self {
        Self {
            busy_timeout_ms: Some(5_000),
            journal_mode: Some(JournalMode::Wal),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database: DatabaseConfig,
    pub sqlite: Option<SqliteOptions>,
}

impl StoreConfig {
    pub fn default_sqlite(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: Some(path.into()),
            },
            sqlite: Some(SqliteOptions::with_defaults()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig::Memory,
            sqlite: None,
        }
    }

    /// Reads `fedgraph.json` under `base_dir`. When absent, a sqlite config
    /// pointing at `fedgraph.sqlite` beside it is written and returned; the
    /// path is stored relative so the directory can be moved.
    pub fn load_or_init(base_dir: &Path) -> StoreResult<Self> {
        let config_path = base_dir.join(DEFAULT_CONFIG_NAME);
        if let Some(config) = Self::read(&config_path)? {
            log::debug!(
                "loaded {} store config from {}",
                config.backend_name(),
                config_path.display()
            );
            return Ok(config);
        }
        let config = Self::default_sqlite(DEFAULT_DB_NAME);
        config.write(&config_path)?;
        log::warn!(
            "no store config found, wrote defaults to {}",
            config_path.display()
        );
        Ok(config)
    }

    /// `None` when the file does not exist.
    pub fn read(path: &Path) -> StoreResult<Option<Self>> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StoreError::storage(format!("{}: {err}", path.display())));
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| StoreError::configuration(format!("{}: {err}", path.display())))
    }

    pub fn write(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| StoreError::storage(format!("{}: {err}", parent.display())))?;
        }
        let payload = serde_json::to_string_pretty(self)
            .map_err(|err| StoreError::configuration(format!("encode store config: {err}")))?;
        fs::write(path, payload)
            .map_err(|err| StoreError::storage(format!("{}: {err}", path.display())))
    }

    pub fn sqlite_path(&self, base_dir: &Path) -> StoreResult<PathBuf> {
        match &self.database {
            DatabaseConfig::Sqlite { path } => {
                let path = path.clone().unwrap_or_else(|| DEFAULT_DB_NAME.to_string());
                let candidate = PathBuf::from(path);
                if candidate.is_absolute() {
                    Ok(candidate)
                } else {
                    Ok(base_dir.join(candidate))
                }
            }
            DatabaseConfig::Memory => Err(StoreError::configuration(
                "in-memory backend has no database path",
            )),
        }
    }

    /// Configured options, falling back to the defaults for unset values.
    pub fn sqlite_options(&self) -> SqliteOptions {
        let defaults = SqliteOptions::with_defaults();
        match &self.sqlite {
            Some(options) => SqliteOptions {
                busy_timeout_ms: options.busy_timeout_ms.or(defaults.busy_timeout_ms),
                journal_mode: options.journal_mode.or(defaults.journal_mode),
            },
            None => defaults,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.database {
            DatabaseConfig::Sqlite { .. } => "sqlite",
            DatabaseConfig::Memory => "memory",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DatabaseConfig, JournalMode, SqliteOptions, StoreConfig};
    use std::path::Path;

    #[test]
    fn relative_paths_resolve_against_base() {
        let config = StoreConfig::default_sqlite("graph.sqlite");
        let path = config.sqlite_path(Path::new("/srv/fed")).expect("path");
        assert_eq!(path, Path::new("/srv/fed/graph.sqlite"));
        let config = StoreConfig {
            database: DatabaseConfig::Sqlite { path: None },
            sqlite: None,
        };
        let path = config.sqlite_path(Path::new("/srv/fed")).expect("path");
        assert_eq!(path, Path::new("/srv/fed/fedgraph.sqlite"));
    }

    #[test]
    fn memory_backend_has_no_path() {
        let err = StoreConfig::in_memory()
            .sqlite_path(Path::new("/tmp"))
            .expect_err("memory");
        assert!(err.is_configuration());
        assert_eq!(StoreConfig::in_memory().backend_name(), "memory");
    }

    #[test]
    fn partial_options_fill_defaults() {
        let config = StoreConfig {
            database: DatabaseConfig::Memory,
            sqlite: Some(SqliteOptions {
                busy_timeout_ms: Some(250),
                journal_mode: None,
            }),
        };
        let options = config.sqlite_options();
        assert_eq!(options.busy_timeout_ms, Some(250));
        assert_eq!(options.journal_mode, Some(JournalMode::Wal));
        assert_eq!(JournalMode::Delete.as_pragma(), "DELETE");
    }
}
