// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::config::SnapshotProcessorConfig;
use crate::index::{flatten, SpanIndex};
use crate::propagation::propagate_tags;
use crate::span::{ProcessedSnapshot, ProcessedSpan, RawSnapshot};
use crate::stacks::stitch_stacks;
use crate::tags::process_span;
use tracing::debug;

/// Counters collected while processing a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    pub spans: usize,
    pub traces: usize,
    pub propagated_up: usize,
    pub propagated_down: usize,
    pub synthesized_stacks: usize,
    pub cycles_broken: usize,
}

/// Prepares snapshots of a tracer's active spans for presentation.
///
/// Processing is a pure function of the snapshot: the processor holds no
/// state besides its configuration and can be shared between threads.
#[derive(Clone, Debug, Default)]
pub struct SnapshotProcessor {
    config: SnapshotProcessorConfig,
}

impl SnapshotProcessor {
    pub fn new(config: SnapshotProcessorConfig) -> Self {
        SnapshotProcessor { config }
    }

    pub fn config(&self) -> &SnapshotProcessorConfig {
        &self.config
    }

    pub fn process(&self, snapshot: &RawSnapshot) -> ProcessedSnapshot {
        self.process_with_stats(snapshot).0
    }

    /// Flattens the traces, expands the tags of every span, propagates tags
    /// along the span tree and fills in stacks for goroutines that are gone.
    pub fn process_with_stats(
        &self,
        snapshot: &RawSnapshot,
    ) -> (ProcessedSnapshot, ProcessingStats) {
        let flat = flatten(snapshot);
        let index = SpanIndex::build(&flat);

        let mut spans: Vec<ProcessedSpan> = flat
            .iter()
            .map(|s| process_span(s, snapshot, &self.config))
            .collect();

        let propagation = propagate_tags(&mut spans, &index, self.config.max_propagation_depth);
        let (stacks, synthesized_stacks) = stitch_stacks(
            &snapshot.stacks,
            &spans,
            &self.config.missing_stack_placeholder,
        );

        let stats = ProcessingStats {
            spans: spans.len(),
            traces: snapshot.traces.len(),
            propagated_up: propagation.propagated_up,
            propagated_down: propagation.propagated_down,
            synthesized_stacks,
            cycles_broken: propagation.cycles_broken,
        };
        debug!(
            spans = stats.spans,
            traces = stats.traces,
            propagated_up = stats.propagated_up,
            propagated_down = stats.propagated_down,
            synthesized_stacks = stats.synthesized_stacks,
            cycles_broken = stats.cycles_broken,
            "Processed span snapshot"
        );

        (ProcessedSnapshot { spans, stacks }, stats)
    }
}

/// Processes `snapshot` with the default configuration.
pub fn process_snapshot(snapshot: &RawSnapshot) -> ProcessedSnapshot {
    SnapshotProcessor::default().process(snapshot)
}
