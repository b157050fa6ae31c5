//! The persisted tables of the federation event graph.
//!
//! Field order in each definition is the on-disk contract: statements bind
//! parameters positionally and rows decode positionally.

use serde::{Deserialize, Serialize};

use crate::statement::check_row_width;
use crate::value::decode_field;
use crate::{Column, SqlField, SqlValue, StoreError, StoreResult, TableDef, TableKind, TableSchema};

macro_rules! define_table {
    (@count) => { 0usize };
    (@count $head:ident $($tail:ident)*) => { 1usize + define_table!(@count $($tail)*) };
    (@auto) => { None };
    (@auto $auto:ident) => { Some(stringify!($auto)) };
    (
        $(#[$table_meta:meta])*
        $kind:ident => $table:ident {
            name: $name:literal,
            entry: $entry:ident,
            columns: $columns:ident,
            unique: [$($key:ident),+ $(,)?],
            $(auto_increment: $auto:ident,)?
            fields: {
                $( $(#[$field_meta:meta])* $field:ident : $ty:ty ),+ $(,)?
            }
        }
    ) => {
        $(#[$table_meta])*
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $table;

        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        pub struct $entry {
            $( $(#[$field_meta])* pub $field: $ty, )+
        }

        #[derive(Clone, Copy, Debug)]
        pub struct $columns {
            $( pub $field: &'static str, )+
        }

        impl $table {
            pub const COLUMNS: $columns = $columns {
                $( $field: stringify!($field), )+
            };
        }

        impl TableSchema for $table {
            type Entry = $entry;

            const KIND: TableKind = TableKind::$kind;

            fn definition() -> &'static TableDef {
                static DEFINITION: TableDef = TableDef {
                    kind: TableKind::$kind,
                    name: $name,
                    fields: &[$( stringify!($field) ),+],
                    columns: &[$(
                        Column {
                            name: stringify!($field),
                            kind: <$ty as SqlField>::KIND,
                            nullable: <$ty as SqlField>::NULLABLE,
                        }
                    ),+],
                    unique: &[$( stringify!($key) ),+],
                    auto_increment: define_table!(@auto $($auto)?),
                };
                &DEFINITION
            }

            fn decode_row(row: Vec<SqlValue>) -> StoreResult<$entry> {
                check_row_width($name, Self::fields().len(), row.len())?;
                let values: [SqlValue; define_table!(@count $($field)+)] =
                    row.try_into().map_err(|row: Vec<SqlValue>| {
                        StoreError::shape(format!("{} cannot decode a row of {} values", $name, row.len()))
                    })?;
                let [$($field),+] = values;
                Ok($entry {
                    $( $field: decode_field($name, stringify!($field), $field)?, )+
                })
            }

            fn encode(entry: &$entry) -> Vec<SqlValue> {
                vec![$( SqlField::to_sql(&entry.$field) ),+]
            }
        }
    };
}

define_table! {
    /// Inbound federation transactions and the response we sent back.
    ReceivedTransactions => ReceivedTransactionsTable {
        name: "received_transactions",
        entry: ReceivedTransaction,
        columns: ReceivedTransactionColumns,
        unique: [transaction_id, origin],
        fields: {
            transaction_id: String,
            origin: String,
            ts: i64,
            response_code: Option<i64>,
            response_json: Option<String>,
            has_been_referenced: bool,
        }
    }
}

define_table! {
    /// Outbound transactions and the remote's reply.
    SentTransactions => SentTransactionsTable {
        name: "sent_transactions",
        entry: SentTransaction,
        columns: SentTransactionColumns,
        unique: [id],
        auto_increment: id,
        fields: {
            /// Row id; `None` on insert lets the store assign one.
            id: Option<i64>,
            transaction_id: String,
            destination: String,
            ts: i64,
            response_code: Option<i64>,
            response_json: Option<String>,
        }
    }
}

define_table! {
    /// Which PDUs were carried in which sent transaction.
    TransactionsToPdu => TransactionsToPduTable {
        name: "transaction_id_to_pdu",
        entry: TransactionToPdu,
        columns: TransactionToPduColumns,
        unique: [transaction_id, destination, pdu_id, pdu_origin],
        fields: {
            transaction_id: String,
            destination: String,
            pdu_id: String,
            pdu_origin: String,
        }
    }
}

define_table! {
    /// Every PDU we know about, one row per `(pdu_id, origin)`.
    Pdus => PdusTable {
        name: "pdus",
        entry: Pdu,
        columns: PduColumns,
        unique: [pdu_id, origin],
        fields: {
            pdu_id: String,
            origin: String,
            context: String,
            pdu_type: String,
            ts: i64,
            version: i64,
            content_json: String,
            unrecognized_keys: Option<String>,
            /// Fetched out of band, without its place in the graph.
            outlier: bool,
            have_processed: bool,
        }
    }
}

define_table! {
    StatePdus => StatePdusTable {
        name: "state_pdus",
        entry: StatePdu,
        columns: StatePduColumns,
        unique: [pdu_id, origin],
        fields: {
            pdu_id: String,
            origin: String,
            context: String,
            pdu_type: String,
            state_key: String,
            power_level: i64,
            prev_state_id: Option<String>,
            prev_state_origin: Option<String>,
        }
    }
}

define_table! {
    /// The PDU currently holding each `(context, pdu_type, state_key)` slot.
    CurrentState => CurrentStateTable {
        name: "current_state",
        entry: CurrentStateEntry,
        columns: CurrentStateColumns,
        unique: [context, pdu_type, state_key],
        fields: {
            pdu_id: String,
            origin: String,
            context: String,
            pdu_type: String,
            state_key: String,
        }
    }
}

define_table! {
    PduDestinations => PduDestinationsTable {
        name: "pdu_destinations",
        entry: PduDestination,
        columns: PduDestinationColumns,
        unique: [pdu_id, origin, destination],
        fields: {
            pdu_id: String,
            origin: String,
            destination: String,
            /// Zero until the destination acknowledges delivery.
            delivered_ts: i64,
        }
    }
}

define_table! {
    /// `(pdu_id, origin)` is causally after `(prev_pdu_id, prev_origin)`.
    PduEdges => PduEdgesTable {
        name: "pdu_edges",
        entry: PduEdge,
        columns: PduEdgeColumns,
        unique: [pdu_id, origin, prev_pdu_id, prev_origin],
        fields: {
            pdu_id: String,
            origin: String,
            prev_pdu_id: String,
            prev_origin: String,
            context: String,
        }
    }
}

define_table! {
    /// PDUs with no known successor in their context.
    PduForwardExtremities => PduForwardExtremitiesTable {
        name: "pdu_forward_extremeties",
        entry: PduForwardExtremity,
        columns: PduForwardExtremityColumns,
        unique: [pdu_id, origin, context],
        fields: {
            pdu_id: String,
            origin: String,
            context: String,
        }
    }
}

define_table! {
    /// PDUs referenced as predecessors but not yet fetched.
    PduBackwardExtremities => PduBackwardExtremitiesTable {
        name: "pdu_backward_extremeties",
        entry: PduBackwardExtremity,
        columns: PduBackwardExtremityColumns,
        unique: [pdu_id, origin, context],
        fields: {
            pdu_id: String,
            origin: String,
            context: String,
        }
    }
}

define_table! {
    ContextDepth => ContextDepthTable {
        name: "context_depth",
        entry: ContextDepthEntry,
        columns: ContextDepthColumns,
        unique: [context],
        fields: {
            context: String,
            min_depth: i64,
        }
    }
}

impl TableKind {
    pub fn definition(self) -> &'static TableDef {
        match self {
            TableKind::ReceivedTransactions => ReceivedTransactionsTable::definition(),
            TableKind::SentTransactions => SentTransactionsTable::definition(),
            TableKind::TransactionsToPdu => TransactionsToPduTable::definition(),
            TableKind::Pdus => PdusTable::definition(),
            TableKind::StatePdus => StatePdusTable::definition(),
            TableKind::CurrentState => CurrentStateTable::definition(),
            TableKind::PduDestinations => PduDestinationsTable::definition(),
            TableKind::PduEdges => PduEdgesTable::definition(),
            TableKind::PduForwardExtremities => PduForwardExtremitiesTable::definition(),
            TableKind::PduBackwardExtremities => PduBackwardExtremitiesTable::definition(),
            TableKind::ContextDepth => ContextDepthTable::definition(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColumnKind;

    #[test]
    fn pdu_insert_matches_persisted_layout() {
        assert_eq!(
            PdusTable::insert().expect("insert"),
            "INSERT OR REPLACE INTO pdus (pdu_id, origin, context, pdu_type, ts, version, \
             content_json, unrecognized_keys, outlier, have_processed) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn forward_extremities_decode_positionally() {
        let rows = vec![
            vec![SqlValue::from("p1"), SqlValue::from("o1"), SqlValue::from("c1")],
            vec![SqlValue::from("p2"), SqlValue::from("o2"), SqlValue::from("c1")],
        ];
        let decoded = PduForwardExtremitiesTable::decode(rows).expect("decode");
        assert_eq!(
            decoded,
            vec![
                PduForwardExtremity {
                    pdu_id: "p1".into(),
                    origin: "o1".into(),
                    context: "c1".into(),
                },
                PduForwardExtremity {
                    pdu_id: "p2".into(),
                    origin: "o2".into(),
                    context: "c1".into(),
                },
            ]
        );
    }

    #[test]
    fn narrow_row_is_a_shape_error() {
        let rows = vec![vec![SqlValue::from("p1"), SqlValue::from("o1")]];
        let err = PduForwardExtremitiesTable::decode(rows).expect_err("width 2");
        assert!(err.is_shape());
    }

    #[test]
    fn column_constants_follow_field_names() {
        assert_eq!(PdusTable::COLUMNS.context, "context");
        assert_eq!(
            CurrentStateTable::where_clause(&[
                CurrentStateTable::COLUMNS.context,
                CurrentStateTable::COLUMNS.pdu_type,
                CurrentStateTable::COLUMNS.state_key,
            ]),
            "context = ? AND pdu_type = ? AND state_key = ?"
        );
    }

    #[test]
    fn column_kinds_follow_field_types() {
        let def = ReceivedTransactionsTable::definition();
        let ts = def.column("ts").expect("ts");
        assert_eq!(ts.kind, ColumnKind::Integer);
        assert!(!ts.nullable);
        let response_json = def.column("response_json").expect("response_json");
        assert_eq!(response_json.kind, ColumnKind::Text);
        assert!(response_json.nullable);
        let referenced = def.column("has_been_referenced").expect("flag");
        assert_eq!(referenced.kind, ColumnKind::Boolean);
        assert_eq!(
            SentTransactionsTable::definition().auto_increment,
            Some("id")
        );
    }

    #[test]
    fn bind_insert_pairs_text_with_values() {
        let entry = ContextDepthEntry {
            context: "!room".into(),
            min_depth: 3,
        };
        let (sql, values) = ContextDepthTable::bind_insert(&entry).expect("bind");
        assert_eq!(
            sql,
            "INSERT OR REPLACE INTO context_depth (context, min_depth) VALUES (?, ?)"
        );
        assert_eq!(values, vec![SqlValue::from("!room"), SqlValue::Integer(3)]);
    }

    #[test]
    fn every_kind_resolves_to_its_own_definition() {
        for kind in TableKind::ALL {
            assert_eq!(kind.definition().kind, kind);
        }
        assert_eq!(TableKind::PduEdges.to_string(), "pdu_edges");
    }
}
