// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::span::RawSnapshot;

pub const TXN_OPERATION: &str = "sql txn";
pub const QUERY_OPERATION: &str = "sql query";
pub const TXN_TAG: &str = "txn";
pub const STATEMENT_TAG: &str = "statement";

/// State of a SQL transaction as far as the snapshot can tell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxnState {
    /// No span for the transaction is open.
    NotFound,
    /// The transaction is open but is not running a query.
    Idle,
    /// The transaction is open and its trace has a query running this
    /// statement.
    RunningQuery(String),
}

/// Looks through a snapshot for the span of transaction `txn_id` and, within
/// the same trace, for a running SQL query.
///
/// The first matching transaction span wins. The query is searched across the
/// whole trace of the transaction, not only below the transaction span, and
/// the first query span in snapshot order is reported.
pub fn find_txn_state(txn_id: &str, snapshot: &RawSnapshot) -> TxnState {
    let txn_trace = snapshot.traces.iter().find(|trace| {
        trace.iter().any(|s| {
            s.operation == TXN_OPERATION && s.tags.get(TXN_TAG).map(String::as_str) == Some(txn_id)
        })
    });
    let Some(trace) = txn_trace else {
        return TxnState::NotFound;
    };

    match trace.iter().find(|s| s.operation == QUERY_OPERATION) {
        Some(query) => match query.tags.get(STATEMENT_TAG) {
            Some(statement) if !statement.is_empty() => TxnState::RunningQuery(statement.clone()),
            // A query without a statement does not tell us anything more
            // than an idle txn.
            _ => TxnState::Idle,
        },
        None => TxnState::Idle,
    }
}
