// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::span::{RawSnapshot, RawSpan, RawTrace};
use std::collections::HashMap;

/// Create a span with the given identity, no tags and a goroutine id equal to
/// the span id.
pub fn create_test_span(trace_id: u64, span_id: u64, parent_span_id: u64) -> RawSpan {
    RawSpan {
        operation: format!("op-{span_id}"),
        trace_id,
        span_id,
        parent_span_id,
        start: 1448466874000000000,
        goroutine_id: span_id,
        tags: HashMap::new(),
    }
}

pub fn create_test_span_with_tags(
    trace_id: u64,
    span_id: u64,
    parent_span_id: u64,
    tags: &[(&str, &str)],
) -> RawSpan {
    let mut span = create_test_span(trace_id, span_id, parent_span_id);
    span.tags = tags
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    span
}

/// A `sql txn` span for the transaction `txn_id`.
pub fn create_test_txn_span(
    trace_id: u64,
    span_id: u64,
    parent_span_id: u64,
    txn_id: &str,
) -> RawSpan {
    let mut span =
        create_test_span_with_tags(trace_id, span_id, parent_span_id, &[("txn", txn_id)]);
    span.operation = "sql txn".to_string();
    span
}

/// A `sql query` span running `statement`.
pub fn create_test_query_span(
    trace_id: u64,
    span_id: u64,
    parent_span_id: u64,
    statement: &str,
) -> RawSpan {
    let mut span =
        create_test_span_with_tags(trace_id, span_id, parent_span_id, &[("statement", statement)]);
    span.operation = "sql query".to_string();
    span
}

/// Create a snapshot without any stack traces.
pub fn create_test_snapshot(traces: Vec<RawTrace>) -> RawSnapshot {
    RawSnapshot {
        traces,
        stacks: HashMap::new(),
    }
}

/// A single trace shaped as a chain: span `first_id` is the root, each
/// following span is the child of the previous one.
pub fn create_test_chain(trace_id: u64, first_id: u64, len: u64) -> RawTrace {
    (0..len)
        .map(|i| {
            let parent = if i == 0 { 0 } else { first_id + i - 1 };
            create_test_span(trace_id, first_id + i, parent)
        })
        .collect()
}
