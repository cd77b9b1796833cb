//! Consumable wildcard intervals derived from inline `/***/` markers.

use std::collections::VecDeque;
use tracing::debug;

/// A consumable byte range owned by one wildcard marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

/// Ordered queue of active wildcard intervals for one pattern region.
///
/// Intervals are appended in source order as markers are discovered. A
/// marker's true end is only known once the next marker (or the region end)
/// is seen, so `add` backfills the previous interval's end and `close`
/// backfills the last one. State is scoped to a single pattern extraction
/// and consumed during the subsequent tree walk.
#[derive(Debug, Default)]
pub struct WildcardIntervals {
    ranges: VecDeque<Interval>,
}

impl WildcardIntervals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interval for a marker spanning `[marker_start, marker_end)`.
    /// The previous interval (if any) is closed at `marker_start - 1` so
    /// intervals never overlap.
    pub fn add(&mut self, marker_start: usize, marker_end: usize) {
        self.backfill_last(marker_start.saturating_sub(1));
        debug!(
            start = marker_start,
            end = marker_end,
            "adding wildcard interval"
        );
        self.ranges.push_back(Interval {
            start: marker_start,
            end: marker_end,
        });
    }

    /// Pad the last interval out to the region boundary.
    pub fn close(&mut self, region_end: usize) {
        self.backfill_last(region_end);
    }

    fn backfill_last(&mut self, end: usize) {
        if let Some(last) = self.ranges.back_mut() {
            debug!(
                start = last.start,
                old_end = last.end,
                new_end = end,
                "backfilling interval end"
            );
            last.end = end;
        }
    }

    /// Decide whether the node spanning `[node_start, node_end)` claims the
    /// front interval. An interval is consumed by the first node it fully
    /// covers; only identifiers are reported as wildcards, but a
    /// non-identifier that claims an interval still consumes it. Intervals
    /// that closed before this node matched nothing and are dropped.
    pub fn consume_wildcard(
        &mut self,
        node_start: usize,
        node_end: usize,
        is_identifier: bool,
    ) -> bool {
        loop {
            let Some(first) = self.ranges.front().copied() else {
                return false;
            };
            if first.start < node_start && first.end >= node_end {
                self.ranges.pop_front();
                return is_identifier;
            } else if first.end < node_start {
                // Stale interval: it preceded punctuation or a token with no
                // owned syntax node. Drop it and retry.
                self.ranges.pop_front();
            } else {
                // Interval extends past this node; a later or enclosing node
                // gets to claim it.
                return false;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }
}
