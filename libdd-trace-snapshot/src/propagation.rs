// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Copies tags between related spans.
//!
//! A tag marked `propagate_up` on the span it was recorded on is copied to
//! every ancestor of that span. A tag marked `inherit` is copied to every
//! descendant. Copies are flagged (`copied_from_child`, `inherited`) and the
//! flags are what makes a tag eligible, so every original tag is propagated
//! at most once per direction no matter the order spans are visited in.
//!
//! The upward pass runs to completion before the downward pass starts. Upward
//! copies have `inherit` cleared, so they never fan out again from the
//! ancestor they landed on.
//!
//! Parent links come from the snapshot as declared ids and are not guaranteed
//! to form a tree. Both walks keep a visited set and a depth bound and stop
//! quietly when either triggers.

use crate::index::{SpanIdx, SpanIndex};
use crate::span::{ProcessedSpan, ProcessedTag};
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropagationStats {
    /// Number of tag copies added to ancestors.
    pub propagated_up: usize,
    /// Number of tag copies added to descendants.
    pub propagated_down: usize,
    /// Number of walks cut short because a span was reached twice.
    pub cycles_broken: usize,
}

/// Runs the upward pass, then the downward pass, over `spans`.
///
/// `index` must have been built from the same flattened span list `spans`
/// was created from.
pub fn propagate_tags(
    spans: &mut [ProcessedSpan],
    index: &SpanIndex,
    max_depth: usize,
) -> PropagationStats {
    let mut stats = PropagationStats::default();
    propagate_up(spans, index, max_depth, &mut stats);
    propagate_down(spans, index, max_depth, &mut stats);
    stats
}

/// Copy of an original tag as seen on an ancestor.
fn upward_copy(tag: &ProcessedTag) -> ProcessedTag {
    ProcessedTag {
        copied_from_child: true,
        inherit: false,
        ..tag.clone()
    }
}

/// Copy of an original tag as seen on a descendant. Inherited tags are hidden
/// by default; only the span the tag was recorded on shows it.
fn inherited_copy(tag: &ProcessedTag) -> ProcessedTag {
    ProcessedTag {
        propagate_up: false,
        inherited: true,
        hidden: true,
        ..tag.clone()
    }
}

fn propagate_up(
    spans: &mut [ProcessedSpan],
    index: &SpanIndex,
    max_depth: usize,
    stats: &mut PropagationStats,
) {
    for idx in 0..spans.len() {
        let copies: Vec<ProcessedTag> = spans[idx]
            .tags
            .iter()
            .filter(|t| t.propagate_up && !t.copied_from_child)
            .map(upward_copy)
            .collect();
        if copies.is_empty() {
            continue;
        }

        let ancestors = ancestors(index, idx, max_depth, stats);
        for tag in copies {
            for &ancestor in &ancestors {
                spans[ancestor].tags.push(tag.clone());
                stats.propagated_up += 1;
            }
        }
    }
}

fn propagate_down(
    spans: &mut [ProcessedSpan],
    index: &SpanIndex,
    max_depth: usize,
    stats: &mut PropagationStats,
) {
    for idx in 0..spans.len() {
        let copies: Vec<ProcessedTag> = spans[idx]
            .tags
            .iter()
            .filter(|t| t.inherit && !t.inherited)
            .map(inherited_copy)
            .collect();
        if copies.is_empty() {
            continue;
        }

        let descendants = descendants(index, idx, max_depth, stats);
        for tag in copies {
            for &descendant in &descendants {
                spans[descendant].tags.push(tag.clone());
                stats.propagated_down += 1;
            }
        }
    }
}

/// Strict ancestors of the span at `idx`, closest first. The walk stops at the
/// first parent id that is not part of the snapshot.
pub fn ancestors(
    index: &SpanIndex,
    idx: SpanIdx,
    max_depth: usize,
    stats: &mut PropagationStats,
) -> Vec<SpanIdx> {
    let mut chain = Vec::new();
    let mut visited = HashSet::from([idx]);
    let mut current = idx;
    while let Some(parent) = index.parent_of(current) {
        if !visited.insert(parent) {
            warn!(
                span_id = index.span_id(current),
                "Cycle in span parent chain, stopping upward tag propagation"
            );
            stats.cycles_broken += 1;
            break;
        }
        if chain.len() >= max_depth {
            warn!(
                span_id = index.span_id(idx),
                max_depth, "Span ancestry deeper than the propagation limit"
            );
            break;
        }
        chain.push(parent);
        current = parent;
    }
    match index.parent_id(current) {
        Some(parent_id) if parent_id != 0 && index.get(parent_id).is_none() => {
            debug!(
                span_id = index.span_id(current),
                parent_id, "Parent span not in snapshot, stopping upward tag propagation"
            );
        }
        _ => {}
    }
    chain
}

/// Strict descendants of the span at `idx`, in depth-first pre-order.
pub fn descendants(
    index: &SpanIndex,
    idx: SpanIdx,
    max_depth: usize,
    stats: &mut PropagationStats,
) -> Vec<SpanIdx> {
    let mut found = Vec::new();
    let Some(span_id) = index.span_id(idx) else {
        return found;
    };

    let mut visited = HashSet::from([idx]);
    let mut depth_exceeded = false;
    let mut stack: Vec<(SpanIdx, usize)> = index
        .children_of(span_id)
        .iter()
        .rev()
        .map(|&child| (child, 1))
        .collect();

    while let Some((child, depth)) = stack.pop() {
        if depth > max_depth {
            depth_exceeded = true;
            continue;
        }
        if !visited.insert(child) {
            debug!(
                span_id = index.span_id(child),
                "Span reached twice while propagating tags down, skipping it"
            );
            stats.cycles_broken += 1;
            continue;
        }
        found.push(child);
        if let Some(child_id) = index.span_id(child) {
            stack.extend(
                index
                    .children_of(child_id)
                    .iter()
                    .rev()
                    .map(|&grandchild| (grandchild, depth + 1)),
            );
        }
    }

    if depth_exceeded {
        warn!(
            span_id,
            max_depth, "Span subtree deeper than the propagation limit"
        );
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnapshotProcessorConfig;
    use crate::index::{flatten, SpanIndex};
    use crate::span::{RawSnapshot, RawSpan};
    use crate::tags::process_span;
    use crate::test_utils::*;

    const MAX_DEPTH: usize = 10_000;

    fn prepare(snapshot: &RawSnapshot) -> (Vec<ProcessedSpan>, SpanIndex) {
        let flat = flatten(snapshot);
        let config = SnapshotProcessorConfig::default();
        let spans = flat
            .iter()
            .map(|s| process_span(s, snapshot, &config))
            .collect();
        (spans, SpanIndex::build(&flat))
    }

    fn run(snapshot: &RawSnapshot) -> (Vec<ProcessedSpan>, PropagationStats) {
        let (mut spans, index) = prepare(snapshot);
        let stats = propagate_tags(&mut spans, &index, MAX_DEPTH);
        (spans, stats)
    }

    fn find(spans: &[ProcessedSpan], span_id: u64) -> &ProcessedSpan {
        spans.iter().find(|s| s.span_id == span_id).unwrap()
    }

    fn tags_with_key<'a>(span: &'a ProcessedSpan, key: &str) -> Vec<&'a ProcessedTag> {
        span.tags.iter().filter(|t| t.key == key).collect()
    }

    fn span_with_tag(span_id: u64, parent: u64, key: &str, value: &str) -> RawSpan {
        create_test_span_with_tags(1, span_id, parent, &[(key, value)])
    }

    #[test]
    fn test_upward_copies_reach_every_ancestor() {
        // 1 <- 2 <- 3 <- 4, lock tag on 3.
        let snapshot = create_test_snapshot(vec![vec![
            create_test_span(1, 1, 0),
            create_test_span(1, 2, 1),
            span_with_tag(3, 2, "lock_holder_txn", "0123456789"),
            create_test_span(1, 4, 3),
        ]]);
        let (spans, stats) = run(&snapshot);

        for ancestor in [1, 2] {
            let copies = tags_with_key(find(&spans, ancestor), "lock_holder_txn");
            assert_eq!(copies.len(), 1, "span {ancestor}");
            assert!(copies[0].copied_from_child);
            assert!(!copies[0].inherit);
            assert!(copies[0].highlight);
            assert_eq!(copies[0].value, "01234567");
        }
        let original = tags_with_key(find(&spans, 3), "lock_holder_txn");
        assert_eq!(original.len(), 1);
        assert!(!original[0].copied_from_child);
        assert!(original[0].propagate_up);

        // Descendants don't get lock tags.
        assert!(tags_with_key(find(&spans, 4), "lock_holder_txn").is_empty());
        assert_eq!(stats.propagated_up, 2);
        assert_eq!(stats.propagated_down, 0);
    }

    #[test]
    fn test_upward_stops_at_dangling_parent() {
        // 1 is a root, 3's parent (2) is not part of the snapshot.
        let snapshot = create_test_snapshot(vec![vec![
            create_test_span(1, 1, 0),
            create_test_span(1, 3, 2),
            span_with_tag(4, 3, "lock_holder_txn", "0123456789"),
        ]]);
        let (spans, stats) = run(&snapshot);

        assert_eq!(tags_with_key(find(&spans, 3), "lock_holder_txn").len(), 1);
        assert!(tags_with_key(find(&spans, 1), "lock_holder_txn").is_empty());
        assert_eq!(stats.propagated_up, 1);
        assert_eq!(stats.cycles_broken, 0);
    }

    #[test]
    fn test_downward_copies_reach_every_descendant() {
        // 1 <- 2 <- {3, 4}, 4 <- 5; statement on 2.
        let snapshot = create_test_snapshot(vec![vec![
            create_test_span(1, 1, 0),
            span_with_tag(2, 1, "statement", "SELECT 2"),
            create_test_span(1, 3, 2),
            create_test_span(1, 4, 2),
            create_test_span(1, 5, 4),
        ]]);
        let (spans, stats) = run(&snapshot);

        let original = tags_with_key(find(&spans, 2), "statement");
        assert_eq!(original.len(), 1);
        assert!(!original[0].hidden);
        assert!(!original[0].is_copy());

        for descendant in [3, 4, 5] {
            let copies = tags_with_key(find(&spans, descendant), "statement");
            assert_eq!(copies.len(), 1, "span {descendant}");
            assert!(copies[0].inherited);
            assert!(copies[0].hidden);
            assert!(!copies[0].propagate_up);
            assert_eq!(copies[0].value, "SELECT 2");
        }

        // Statements also go up, without being hidden.
        let up = tags_with_key(find(&spans, 1), "statement");
        assert_eq!(up.len(), 1);
        assert!(up[0].copied_from_child);
        assert!(!up[0].hidden);
        assert!(!up[0].inherited);

        assert_eq!(stats.propagated_up, 1);
        assert_eq!(stats.propagated_down, 3);
    }

    #[test]
    fn test_upward_copy_does_not_fan_out_downwards() {
        // 1 <- {2, 3}; statement on 2 is copied to 1 but must not reach 3.
        let snapshot = create_test_snapshot(vec![vec![
            create_test_span(1, 1, 0),
            span_with_tag(2, 1, "statement", "SELECT 1"),
            create_test_span(1, 3, 1),
        ]]);
        let (spans, _) = run(&snapshot);
        assert!(tags_with_key(find(&spans, 3), "statement").is_empty());
        assert_eq!(tags_with_key(find(&spans, 1), "statement").len(), 1);
    }

    #[test]
    fn test_visit_order_does_not_matter() {
        let in_order = vec![
            create_test_span(1, 1, 0),
            span_with_tag(2, 1, "statement", "SELECT 1"),
            span_with_tag(3, 2, "lock_holder_txn", "abcdefghijk"),
            create_test_span(1, 4, 3),
        ];
        let mut reversed = in_order.clone();
        reversed.reverse();

        // Copies from different origins may land in a different order, the
        // resulting set of tags must not change.
        let sorted = |tags: &[ProcessedTag]| {
            let mut tags = tags.to_vec();
            tags.sort_by(|a, b| {
                (&a.key, &a.value, a.inherited, a.copied_from_child).cmp(&(
                    &b.key,
                    &b.value,
                    b.inherited,
                    b.copied_from_child,
                ))
            });
            tags
        };

        let (a, stats_a) = run(&create_test_snapshot(vec![in_order]));
        let (b, stats_b) = run(&create_test_snapshot(vec![reversed]));
        assert_eq!(stats_a, stats_b);
        for span in &a {
            let other = find(&b, span.span_id);
            assert_eq!(
                sorted(&span.tags[..]),
                sorted(&other.tags[..]),
                "span {}",
                span.span_id
            );
        }
    }

    #[test]
    fn test_multiple_origins_same_key() {
        // Both 2 and 3 carry a statement: 3 gets 2's copy in addition to its own,
        // 1 gets a copy of each.
        let snapshot = create_test_snapshot(vec![vec![
            create_test_span(1, 1, 0),
            span_with_tag(2, 1, "statement", "outer"),
            span_with_tag(3, 2, "statement", "inner"),
        ]]);
        let (spans, _) = run(&snapshot);

        let on_3 = tags_with_key(find(&spans, 3), "statement");
        assert_eq!(on_3.len(), 2);
        assert_eq!(on_3[0].value, "inner");
        assert!(!on_3[0].is_copy());
        assert_eq!(on_3[1].value, "outer");
        assert!(on_3[1].inherited);

        let on_1: Vec<&str> = tags_with_key(find(&spans, 1), "statement")
            .iter()
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(on_1, vec!["outer", "inner"]);
        assert_eq!(tags_with_key(find(&spans, 2), "statement").len(), 2);
    }

    #[test]
    fn test_parent_cycle_terminates() {
        // 1 -> 2 -> 3 -> 1
        let snapshot = create_test_snapshot(vec![vec![
            create_test_span(1, 1, 3),
            create_test_span(1, 2, 1),
            span_with_tag(3, 2, "statement", "SELECT loop"),
        ]]);
        let (spans, stats) = run(&snapshot);

        // Every other member of the cycle gets exactly one copy per direction,
        // the origin gets none.
        for id in [1, 2] {
            let tags = tags_with_key(find(&spans, id), "statement");
            assert_eq!(tags.len(), 2, "span {id}");
            assert_eq!(tags.iter().filter(|t| t.copied_from_child).count(), 1);
            assert_eq!(tags.iter().filter(|t| t.inherited).count(), 1);
        }
        assert_eq!(tags_with_key(find(&spans, 3), "statement").len(), 1);
        assert_eq!(stats.cycles_broken, 2);
    }

    #[test]
    fn test_self_parent_terminates() {
        let snapshot = create_test_snapshot(vec![vec![span_with_tag(
            1,
            1,
            "statement",
            "SELECT self",
        )]]);
        let (spans, stats) = run(&snapshot);
        assert_eq!(spans[0].tags.len(), 1);
        assert_eq!(stats.propagated_up, 0);
        assert_eq!(stats.propagated_down, 0);
        assert_eq!(stats.cycles_broken, 2);
    }

    #[test]
    fn test_depth_bound() {
        let mut trace = create_test_chain(1, 1, 10);
        trace[9].tags.insert("lock_holder_txn".into(), "abc".into());
        trace[0].tags.insert("statement".into(), "SELECT deep".into());
        let snapshot = create_test_snapshot(vec![trace]);
        let (mut spans, index) = prepare(&snapshot);
        let stats = propagate_tags(&mut spans, &index, 3);

        // Span 10 has 9 ancestors, only the 3 closest get the copy.
        assert_eq!(stats.propagated_up, 3);
        for id in 7..=9 {
            assert_eq!(tags_with_key(find(&spans, id), "lock_holder_txn").len(), 1);
        }
        assert!(tags_with_key(find(&spans, 6), "lock_holder_txn").is_empty());

        // Span 1 has 9 descendants, only 3 levels get the copy.
        assert_eq!(stats.propagated_down, 3);
        assert!(tags_with_key(find(&spans, 4), "statement")[0].inherited);
        assert!(tags_with_key(find(&spans, 5), "statement").is_empty());
    }

    #[test]
    fn test_ancestors_and_descendants_order() {
        let snapshot = create_test_snapshot(vec![vec![
            create_test_span(1, 1, 0),
            create_test_span(1, 2, 1),
            create_test_span(1, 3, 2),
            create_test_span(1, 4, 1),
        ]]);
        let index = SpanIndex::from_snapshot(&snapshot);
        let mut stats = PropagationStats::default();

        assert_eq!(ancestors(&index, 2, MAX_DEPTH, &mut stats), vec![1, 0]);
        assert!(ancestors(&index, 0, MAX_DEPTH, &mut stats).is_empty());
        assert_eq!(descendants(&index, 0, MAX_DEPTH, &mut stats), vec![1, 2, 3]);
        assert!(descendants(&index, 3, MAX_DEPTH, &mut stats).is_empty());
        assert_eq!(stats, PropagationStats::default());
    }
}
