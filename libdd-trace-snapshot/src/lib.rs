// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Prepares a snapshot of the spans open in a tracer for an operator-facing
//! debug page.
//!
//! The snapshot comes in as a list of traces, each a flat list of spans linked
//! by parent ids. [`process_snapshot`] turns it into a list of spans whose tags
//! are expanded with display metadata and propagated along the span tree, plus
//! a stack trace for every goroutine the spans reference.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod error;
pub mod index;
pub mod processor;
pub mod propagation;
pub mod span;
pub mod stacks;
pub mod tags;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod txn;

pub use config::SnapshotProcessorConfig;
pub use error::SnapshotError;
pub use processor::{process_snapshot, ProcessingStats, SnapshotProcessor};
pub use span::{ProcessedSnapshot, ProcessedSpan, ProcessedTag, RawSnapshot, RawSpan};
