use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tuning knobs for an inspector session.
///
/// With the `serde` feature enabled, this type derives `Serialize`/`Deserialize`
/// and missing fields fall back to [`InspectorConfig::default`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct InspectorConfig {
    /// Height of one row in viewport units (terminal rows for the bundled widget).
    pub item_height: f64,
    /// Extra rows rendered above and below the viewport.
    pub overscan: usize,
    /// Upper bound on memoized rendered rows.
    pub render_cache_capacity: usize,
    /// Quiet period before a typed query is evaluated; see
    /// [`crate::Debouncer::from_config`].
    pub debounce: Duration,
    /// Draw tree guide lines in front of row labels.
    pub draw_lines: bool,
}

impl InspectorConfig {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
    pub const DEFAULT_CACHE_CAPACITY: usize = 2048;
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            item_height: 1.0,
            overscan: 4,
            render_cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
            debounce: Self::DEFAULT_DEBOUNCE,
            draw_lines: true,
        }
    }
}
