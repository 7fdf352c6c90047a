// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A span as recorded by the tracer's active span registry.
///
/// A `parent_span_id` of 0 means the span has no parent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSpan {
    pub operation: String,
    pub trace_id: u64,
    pub span_id: u64,
    #[serde(default)]
    pub parent_span_id: u64,
    /// Nanoseconds since the Unix epoch.
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub goroutine_id: u64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

// Traces are just arrays of spans
pub type RawTrace = Vec<RawSpan>;

/// Point-in-time capture of all the spans open in a tracer, grouped by trace,
/// plus the stack traces of the goroutines that were alive at capture time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    pub traces: Vec<RawTrace>,
    /// Goroutine id to stack trace.
    #[serde(default)]
    pub stacks: HashMap<u64, String>,
}

impl RawSnapshot {
    /// Decodes a snapshot from its JSON representation.
    pub fn from_json(data: &[u8]) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Iterates over the spans of every trace, in snapshot order.
    pub fn spans(&self) -> impl Iterator<Item = &RawSpan> {
        self.traces.iter().flatten()
    }

    pub fn span_count(&self) -> usize {
        self.traces.iter().map(Vec::len).sum()
    }
}

/// A span tag expanded with the metadata needed to render it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedTag {
    pub key: String,
    #[serde(rename = "val")]
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub caption: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
    #[serde(default)]
    pub hidden: bool,
    /// Set if the tag should be rendered with a little exclamation mark.
    #[serde(default)]
    pub highlight: bool,
    /// Set if this tag should be passed down to children, recursively.
    #[serde(default)]
    pub inherit: bool,
    /// Set if this tag was passed over from an ancestor.
    #[serde(default)]
    pub inherited: bool,
    #[serde(default)]
    pub propagate_up: bool,
    /// Set if this tag did not originate on the owner span, but was copied
    /// upwards from a descendant.
    #[serde(default)]
    pub copied_from_child: bool,
}

impl ProcessedTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        ProcessedTag {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    /// Returns true if the tag arrived on its span through propagation.
    pub fn is_copy(&self) -> bool {
        self.inherited || self.copied_from_child
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSpan {
    pub operation: String,
    pub trace_id: u64,
    pub span_id: u64,
    pub parent_span_id: u64,
    pub start: i64,
    pub goroutine_id: u64,
    /// Original tags sorted by key, followed by the copies added by
    /// propagation.
    pub tags: Vec<ProcessedTag>,
}

impl ProcessedSpan {
    /// Creates a span with the identity of `raw` and no tags.
    pub fn from_raw(raw: &RawSpan) -> Self {
        ProcessedSpan {
            operation: raw.operation.clone(),
            trace_id: raw.trace_id,
            span_id: raw.span_id,
            parent_span_id: raw.parent_span_id,
            start: raw.start,
            goroutine_id: raw.goroutine_id,
            tags: Vec::new(),
        }
    }

    /// Returns the first tag with the given key. Originals come before copies,
    /// so this is the span's own tag when it has one.
    pub fn tag(&self, key: &str) -> Option<&ProcessedTag> {
        self.tags.iter().find(|t| t.key == key)
    }
}

/// A snapshot of open spans ready for presentation, plus stack traces for all
/// the goroutines the spans reference.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSnapshot {
    pub spans: Vec<ProcessedSpan>,
    /// Stack traces keyed by the goroutine ids referenced through
    /// [`ProcessedSpan::goroutine_id`].
    pub stacks: HashMap<u64, String>,
}

impl ProcessedSnapshot {
    pub fn to_json(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Looks a span up by id. With duplicated ids the last one wins, same as
    /// the index used during processing.
    pub fn span(&self, span_id: u64) -> Option<&ProcessedSpan> {
        self.spans.iter().rev().find(|s| s.span_id == span_id)
    }

    pub fn children(&self, span_id: u64) -> impl Iterator<Item = &ProcessedSpan> {
        self.spans
            .iter()
            .filter(move |s| s.parent_span_id == span_id && s.span_id != span_id)
    }

    /// Spans to render at the top level of the tree: the ones without a parent
    /// and the ones whose parent is not part of the snapshot.
    pub fn roots(&self) -> impl Iterator<Item = &ProcessedSpan> {
        self.spans.iter().filter(move |s| {
            s.parent_span_id == 0
                || s.parent_span_id == s.span_id
                || self.span(s.parent_span_id).is_none()
        })
    }
}
