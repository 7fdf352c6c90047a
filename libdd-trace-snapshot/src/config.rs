// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use tracing::debug;

pub const MAX_PROPAGATION_DEPTH_ENV: &str = "DD_TRACE_SNAPSHOT_MAX_PROPAGATION_DEPTH";
pub const TXN_ID_DISPLAY_LEN_ENV: &str = "DD_TRACE_SNAPSHOT_TXN_ID_DISPLAY_LEN";

// Deep enough for any real span tree, small enough that a malformed snapshot
// cannot keep a walk going for long.
const DEFAULT_MAX_PROPAGATION_DEPTH: usize = 10_000;
const DEFAULT_TXN_ID_DISPLAY_LEN: usize = 8;

pub const MISSING_STACK_PLACEHOLDER: &str =
    "Goroutine not found. Goroutine must have finished since the span was created.";

pub mod parse_env {
    use std::{env, str::FromStr};

    pub fn str_not_empty(name: &str) -> Option<String> {
        env::var(name).ok().filter(|s| !s.is_empty())
    }

    pub fn int<T: FromStr>(name: &str) -> Option<T> {
        str_not_empty(name)?.trim().parse::<T>().ok()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotProcessorConfig {
    /// Maximum number of levels a tag copy travels from its origin, in either
    /// direction.
    pub max_propagation_depth: usize,
    /// Number of characters of a lock holder transaction id kept for display.
    pub txn_id_display_len: usize,
    /// Stack text used for goroutines that no longer exist.
    pub missing_stack_placeholder: String,
}

impl Default for SnapshotProcessorConfig {
    fn default() -> Self {
        SnapshotProcessorConfig {
            max_propagation_depth: DEFAULT_MAX_PROPAGATION_DEPTH,
            txn_id_display_len: DEFAULT_TXN_ID_DISPLAY_LEN,
            missing_stack_placeholder: MISSING_STACK_PLACEHOLDER.to_string(),
        }
    }
}

impl SnapshotProcessorConfig {
    /// Builds a config from `DD_TRACE_SNAPSHOT_*` environment variables. Unset,
    /// unparsable and zero values fall back to the defaults.
    pub fn from_env() -> Self {
        let default = Self::default();
        SnapshotProcessorConfig {
            max_propagation_depth: positive_or(
                MAX_PROPAGATION_DEPTH_ENV,
                default.max_propagation_depth,
            ),
            txn_id_display_len: positive_or(TXN_ID_DISPLAY_LEN_ENV, default.txn_id_display_len),
            missing_stack_placeholder: default.missing_stack_placeholder,
        }
    }
}

fn positive_or(name: &str, default: usize) -> usize {
    match parse_env::int::<usize>(name) {
        Some(v) if v > 0 => v,
        Some(_) => {
            debug!("Ignoring {name}=0, using default {default}");
            default
        }
        None => {
            if let Some(raw) = parse_env::str_not_empty(name) {
                debug!("Failed to parse {name}={raw:?}, using default {default}");
            }
            default
        }
    }
}
