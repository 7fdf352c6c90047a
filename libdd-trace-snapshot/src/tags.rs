// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::config::SnapshotProcessorConfig;
use crate::span::{ProcessedSpan, ProcessedTag, RawSnapshot, RawSpan};
use crate::txn::{self, TxnState};

pub const LOCK_HOLDER_TXN_TAG: &str = "lock_holder_txn";

/// Tags rendered greyed out unless the user asks for them.
pub const HIDDEN_TAGS: [&str; 5] = ["_unfinished", "_verbose", "_dropped", "node", "store"];

const CAPTION_UNKNOWN_TXN: &str = "blocked on unknown transaction";
const CAPTION_RUNNING_QUERY: &str = "blocked on txn currently running query: ";
const CAPTION_IDLE_TXN: &str = "blocked on idle txn";

pub fn is_hidden(key: &str) -> bool {
    HIDDEN_TAGS.contains(&key)
}

/// Returns the prefix of `s` made of at most `max_chars` characters.
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

pub fn lock_holder_caption(state: &TxnState) -> String {
    match state {
        TxnState::NotFound => CAPTION_UNKNOWN_TXN.to_string(),
        TxnState::RunningQuery(statement) => format!("{CAPTION_RUNNING_QUERY}{statement}"),
        TxnState::Idle => CAPTION_IDLE_TXN.to_string(),
    }
}

/// Expands a span tag for presentation. Some tags are hidden, some are marked
/// for propagation to the span's ancestors or descendants, and lock contention
/// tags get a caption describing the lock holder txn.
pub fn process_tag(
    key: &str,
    value: &str,
    snapshot: &RawSnapshot,
    config: &SnapshotProcessorConfig,
) -> ProcessedTag {
    let mut tag = ProcessedTag::new(key, value);
    tag.hidden = is_hidden(key);

    match key {
        LOCK_HOLDER_TXN_TAG => {
            let short_id = truncate_chars(value, config.txn_id_display_len);
            tag.value = short_id.to_string();
            tag.link = short_id.to_string();
            tag.propagate_up = true;
            tag.highlight = true;
            // The lookup uses the full id.
            tag.caption = lock_holder_caption(&txn::find_txn_state(value, snapshot));
        }
        txn::STATEMENT_TAG => {
            tag.inherit = true;
            tag.propagate_up = true;
        }
        _ => {}
    }
    tag
}

/// Creates the processed version of `raw`: identity is copied over and the
/// tags are expanded, sorted by key.
pub fn process_span(
    raw: &RawSpan,
    snapshot: &RawSnapshot,
    config: &SnapshotProcessorConfig,
) -> ProcessedSpan {
    let mut tags: Vec<(&String, &String)> = raw.tags.iter().collect();
    // Keys are unique, no need for a stable sort.
    tags.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut span = ProcessedSpan::from_raw(raw);
    span.tags = tags
        .into_iter()
        .map(|(k, v)| process_tag(k, v, snapshot, config))
        .collect();
    span
}
