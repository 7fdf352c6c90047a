// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::span::{RawSnapshot, RawSpan};
use std::collections::HashMap;

/// Position of a span in the flattened span table.
pub type SpanIdx = usize;

/// Lookup structures over the flattened spans of a snapshot.
///
/// Spans are addressed by their position in the flattened table, so the
/// table owning them (raw or processed) can be mutated in place while the
/// index stays valid. The index is built once and never updated.
#[derive(Debug, Default)]
pub struct SpanIndex {
    parents: Vec<u64>,
    span_ids: Vec<u64>,
    by_id: HashMap<u64, SpanIdx>,
    children: HashMap<u64, Vec<SpanIdx>>,
}

/// Flattens the per-trace span lists into a single sequence, keeping snapshot
/// order.
pub fn flatten(snapshot: &RawSnapshot) -> Vec<&RawSpan> {
    let mut spans = Vec::with_capacity(snapshot.span_count());
    spans.extend(snapshot.spans());
    spans
}

impl SpanIndex {
    pub fn build(spans: &[&RawSpan]) -> Self {
        let mut index = SpanIndex {
            parents: Vec::with_capacity(spans.len()),
            span_ids: Vec::with_capacity(spans.len()),
            by_id: HashMap::with_capacity(spans.len()),
            children: HashMap::new(),
        };
        for (idx, span) in spans.iter().enumerate() {
            index.parents.push(span.parent_span_id);
            index.span_ids.push(span.span_id);
            // Ids are supposed to be unique, last one wins otherwise.
            index.by_id.insert(span.span_id, idx);
            index
                .children
                .entry(span.parent_span_id)
                .or_default()
                .push(idx);
        }
        index
    }

    pub fn from_snapshot(snapshot: &RawSnapshot) -> Self {
        Self::build(&flatten(snapshot))
    }

    pub fn len(&self) -> usize {
        self.span_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.span_ids.is_empty()
    }

    pub fn get(&self, span_id: u64) -> Option<SpanIdx> {
        self.by_id.get(&span_id).copied()
    }

    pub fn span_id(&self, idx: SpanIdx) -> Option<u64> {
        self.span_ids.get(idx).copied()
    }

    /// Returns the parent id declared by the span at `idx`.
    pub fn parent_id(&self, idx: SpanIdx) -> Option<u64> {
        self.parents.get(idx).copied()
    }

    /// Returns the position of the parent of the span at `idx`, if the parent
    /// is part of the snapshot.
    pub fn parent_of(&self, idx: SpanIdx) -> Option<SpanIdx> {
        let parent_id = *self.parents.get(idx)?;
        self.get(parent_id)
    }

    /// Returns the positions of the spans declaring `span_id` as their parent.
    pub fn children_of(&self, span_id: u64) -> &[SpanIdx] {
        self.children
            .get(&span_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
