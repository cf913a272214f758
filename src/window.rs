//! Virtual windowing: which rows of a long uniform list a viewport needs.

use std::ops::RangeInclusive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inclusive row span `[start, end]` to render, overscan included.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Never true; empty windows are represented as `None`.
    pub const fn is_empty(&self) -> bool {
        false
    }

    pub const fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }

    pub const fn indices(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

#[track_caller]
fn assert_item_height(item_height: f64) {
    assert!(
        item_height.is_finite() && item_height > 0.0,
        "item height must be positive and finite, got {item_height}"
    );
}

// First row whose top edge is at or above `offset`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "row indices are clamped to the list length right after"
)]
fn first_row(offset: f64, item_height: f64) -> usize {
    (offset.max(0.0) / item_height).floor() as usize
}

// Row boundary at or below `edge`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "row indices are clamped to the list length right after"
)]
fn boundary_row(edge: f64, item_height: f64) -> usize {
    (edge.max(0.0) / item_height).ceil() as usize
}

/// Computes the rows to render for a uniform-height list.
///
/// `start = max(0, floor(offset / h) - overscan)` and
/// `end = min(count - 1, ceil((offset + viewport) / h) + overscan)`. When the
/// offset lies past the end of the list, `start` is pulled back to `end`.
/// Returns `None` for an empty list.
///
/// # Panics
///
/// Panics if `item_height` is not a positive finite number.
#[track_caller]
pub fn visible_range(
    total_count: usize,
    item_height: f64,
    scroll_offset: f64,
    viewport_height: f64,
    overscan: usize,
) -> Option<VisibleRange> {
    assert_item_height(item_height);
    if total_count == 0 {
        return None;
    }
    let first = first_row(scroll_offset, item_height);
    let last = boundary_row(scroll_offset.max(0.0) + viewport_height.max(0.0), item_height);
    let end = last.saturating_add(overscan).min(total_count - 1);
    let start = first.saturating_sub(overscan).min(end);
    Some(VisibleRange { start, end })
}

/// Stateful window over a list that skips recomputation when inputs move
/// without crossing a row boundary.
///
/// Output depends only on the inputs, so it is safe to drive from every
/// scroll or resize event.
#[derive(Clone, Debug)]
pub struct VirtualWindow {
    item_height: f64,
    overscan: usize,
    total_count: usize,
    scroll_offset: f64,
    viewport_height: f64,
    // (first row, boundary row, count) used for the cached range.
    last_key: Option<(usize, usize, usize)>,
    last_range: Option<VisibleRange>,
    recomputes: u64,
}

impl VirtualWindow {
    /// # Panics
    ///
    /// Panics if `item_height` is not a positive finite number.
    #[track_caller]
    pub fn new(item_height: f64, overscan: usize) -> Self {
        assert_item_height(item_height);
        Self {
            item_height,
            overscan,
            total_count: 0,
            scroll_offset: 0.0,
            viewport_height: 0.0,
            last_key: None,
            last_range: None,
            recomputes: 0,
        }
    }

    pub const fn item_height(&self) -> f64 {
        self.item_height
    }

    pub const fn overscan(&self) -> usize {
        self.overscan
    }

    pub const fn total_count(&self) -> usize {
        self.total_count
    }

    pub const fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub const fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    /// Number of times the range was actually recomputed.
    pub const fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    pub fn set_total_count(&mut self, total_count: usize) {
        self.total_count = total_count;
    }

    /// Negative offsets are clamped to zero.
    pub fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll_offset = offset.max(0.0);
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = height.max(0.0);
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        if overscan != self.overscan {
            self.overscan = overscan;
            self.last_key = None;
        }
    }

    /// Largest offset that still fills the viewport.
    #[allow(clippy::cast_precision_loss, reason = "row counts stay far below 2^52")]
    pub fn max_scroll_offset(&self) -> f64 {
        (self.total_count as f64 * self.item_height - self.viewport_height).max(0.0)
    }

    /// Returns the cached range, recomputing only when a boundary row or the
    /// count changed.
    pub fn range(&mut self) -> Option<VisibleRange> {
        let key = (
            first_row(self.scroll_offset, self.item_height),
            boundary_row(self.scroll_offset + self.viewport_height, self.item_height),
            self.total_count,
        );
        if self.last_key != Some(key) {
            self.last_range = visible_range(
                self.total_count,
                self.item_height,
                self.scroll_offset,
                self.viewport_height,
                self.overscan,
            );
            self.last_key = Some(key);
            self.recomputes += 1;
        }
        self.last_range
    }

    /// Applies all inputs at once and returns the range.
    pub fn update(
        &mut self,
        total_count: usize,
        scroll_offset: f64,
        viewport_height: f64,
    ) -> Option<VisibleRange> {
        self.set_total_count(total_count);
        self.set_scroll_offset(scroll_offset);
        self.set_viewport_height(viewport_height);
        self.range()
    }

    /// Returns the scroll offset closest to the current one that shows row
    /// `index` fully.
    #[allow(clippy::cast_precision_loss, reason = "row counts stay far below 2^52")]
    pub fn scroll_into_view(&self, index: usize) -> f64 {
        let top = index as f64 * self.item_height;
        let bottom = top + self.item_height;
        let offset = if top < self.scroll_offset {
            top
        } else if bottom > self.scroll_offset + self.viewport_height {
            bottom - self.viewport_height
        } else {
            self.scroll_offset
        };
        offset.clamp(0.0, self.max_scroll_offset().max(0.0))
    }
}
