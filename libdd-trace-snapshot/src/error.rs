// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors raised while moving snapshots in and out of their serialized form.
///
/// Processing a snapshot never fails: malformed span trees are handled by
/// stopping the affected walk and keeping whatever was computed.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to (de)serialize snapshot: {0}")]
    Json(#[from] serde_json::Error),
}
