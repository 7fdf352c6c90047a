// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::span::ProcessedSpan;
use std::collections::HashMap;

/// Copies the captured stack traces and adds `placeholder` for every goroutine
/// referenced by a span that has none. Returns the stacks and the number of
/// placeholders added.
pub fn stitch_stacks(
    stacks: &HashMap<u64, String>,
    spans: &[ProcessedSpan],
    placeholder: &str,
) -> (HashMap<u64, String>, usize) {
    let mut stitched = stacks.clone();
    let mut synthesized = 0;
    for span in spans {
        stitched.entry(span.goroutine_id).or_insert_with(|| {
            synthesized += 1;
            placeholder.to_string()
        });
    }
    (stitched, synthesized)
}
