use std::collections::HashSet;

use once_cell::sync::OnceCell;

use crate::{StoreError, StoreResult, TableDef, TableKind};

static REGISTRY: OnceCell<SchemaRegistry> = OnceCell::new();

/// Validated set of table definitions, immutable once built.
#[derive(Debug)]
pub struct SchemaRegistry {
    tables: Vec<&'static TableDef>,
}

/// The process-wide registry of every persisted table. Built and validated
/// on first use; later calls return the same instance.
pub fn registry() -> StoreResult<&'static SchemaRegistry> {
    REGISTRY.get_or_try_init(|| {
        let registry = SchemaRegistry::build(TableKind::ALL.into_iter().map(TableKind::definition))?;
        log::debug!("schema registry ready with {} tables", registry.len());
        Ok::<_, StoreError>(registry)
    })
}

impl SchemaRegistry {
    pub fn build<I>(definitions: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = &'static TableDef>,
    {
        let mut tables = Vec::new();
        let mut names = HashSet::new();
        let mut kinds = HashSet::new();
        for definition in definitions {
            definition.validate()?;
            if !names.insert(definition.name) || !kinds.insert(definition.kind) {
                return Err(StoreError::configuration(format!(
                    "table {} ({:?}) is declared twice",
                    definition.name, definition.kind
                )));
            }
            tables.push(definition);
        }
        if tables.is_empty() {
            return Err(StoreError::configuration("schema registry has no tables"));
        }
        Ok(Self { tables })
    }

    pub fn lookup(&self, kind: TableKind) -> StoreResult<&'static TableDef> {
        self.tables
            .iter()
            .copied()
            .find(|definition| definition.kind == kind)
            .ok_or_else(|| StoreError::configuration(format!("unknown table kind {kind:?}")))
    }

    pub fn lookup_name(&self, name: &str) -> StoreResult<&'static TableDef> {
        self.tables
            .iter()
            .copied()
            .find(|definition| definition.name == name)
            .ok_or_else(|| StoreError::configuration(format!("unknown table '{name}'")))
    }

    pub fn tables(&self) -> impl Iterator<Item = &'static TableDef> + '_ {
        self.tables.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{SchemaRegistry, registry};
    use crate::{Column, ColumnKind, TableDef, TableKind};

    static NO_FIELDS: TableDef = TableDef {
        kind: TableKind::Pdus,
        name: "pdus",
        fields: &[],
        columns: &[],
        unique: &[],
        auto_increment: None,
    };

    static NO_NAME: TableDef = TableDef {
        kind: TableKind::ContextDepth,
        name: "",
        fields: &["context"],
        columns: &[Column {
            name: "context",
            kind: ColumnKind::Text,
            nullable: false,
        }],
        unique: &["context"],
        auto_increment: None,
    };

    static BAD_KEY: TableDef = TableDef {
        kind: TableKind::ContextDepth,
        name: "context_depth",
        fields: &["context"],
        columns: &[Column {
            name: "context",
            kind: ColumnKind::Text,
            nullable: false,
        }],
        unique: &["room"],
        auto_increment: None,
    };

    #[test]
    fn process_registry_covers_every_kind_in_order() {
        let registry = registry().expect("registry");
        let kinds: Vec<TableKind> = registry.tables().map(|def| def.kind).collect();
        assert_eq!(kinds, TableKind::ALL.to_vec());
        assert!(std::ptr::eq(registry, super::registry().expect("again")));
    }

    #[test]
    fn lookup_by_kind_and_name() {
        let registry = registry().expect("registry");
        let edges = registry.lookup(TableKind::PduEdges).expect("edges");
        assert_eq!(edges.name, "pdu_edges");
        let depth = registry.lookup_name("context_depth").expect("depth");
        assert_eq!(depth.kind, TableKind::ContextDepth);
        let err = registry.lookup_name("rooms").expect_err("unknown");
        assert!(err.is_configuration());
    }

    #[test]
    fn invalid_definitions_fail_to_build() {
        for broken in [&NO_FIELDS, &NO_NAME, &BAD_KEY] {
            let err = SchemaRegistry::build([broken]).expect_err("invalid");
            assert!(err.is_configuration(), "{broken:?} should be rejected");
        }
        let err = SchemaRegistry::build(std::iter::empty()).expect_err("empty");
        assert!(err.is_configuration());
    }

    #[test]
    fn duplicate_tables_are_rejected() {
        let pdus = TableKind::Pdus.definition();
        let err = SchemaRegistry::build([pdus, pdus]).expect_err("duplicate");
        assert!(err.is_configuration());
    }

    #[test]
    fn partial_registry_rejects_missing_kind() {
        let registry =
            SchemaRegistry::build([TableKind::Pdus.definition()]).expect("single table");
        assert!(
            registry
                .lookup(TableKind::StatePdus)
                .expect_err("absent")
                .is_configuration()
        );
    }
}
