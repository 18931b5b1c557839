//! Value-to-visual mapping for point data.
//!
//! Every function here is pure: the caller passes the dataset, the color
//! table and the style explicitly.

use foundation::time::{TimeSpan, Timestamp, seconds_between};

use crate::dataset::Dataset;
use crate::symbology::{ColorTable, Rgba};

/// Position of `value` within the dataset's value range, in `[0, 1]`.
///
/// `None` when there is no dataset, the value is "no data", or the dataset
/// has no valid values. A degenerate range (min == max) maps everything to 0.
pub fn normalized_position<D: Dataset + ?Sized>(value: f64, dataset: Option<&D>) -> Option<f64> {
    let data = dataset?;
    if data.is_no_data(value) {
        return None;
    }
    let (min, max) = (data.min_value()?, data.max_value()?);
    Some(normalize(value, min, max))
}

pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        0.0
    } else {
        (value - min) / (max - min)
    }
}

/// Table color at `position` with its alpha multiplied by the base color's alpha.
///
/// Without a table or a position the base color is returned unchanged.
pub fn map_color(position: Option<f64>, table: Option<&ColorTable>, base: Rgba) -> Rgba {
    match (position.filter(|p| !p.is_nan()), table) {
        (Some(p), Some(table)) => table.lookup(p).scale_alpha(base.alpha_fraction()),
        _ => base,
    }
}

/// `base_scale * (position + 0.5)` when scaling by value, so the data range spans 0.5x to 1.5x.
pub fn map_scale(position: Option<f64>, base_scale: f64, scale_by_value: bool) -> f64 {
    match position.filter(|p| !p.is_nan()) {
        Some(p) if scale_by_value => base_scale * (p + 0.5),
        _ => base_scale,
    }
}

/// How long each point stays visible around its timestamp.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TimeWindow {
    pub lead_minutes: f64,
    pub trail_minutes: f64,
}

impl TimeWindow {
    pub const fn new(lead_minutes: f64, trail_minutes: f64) -> Self {
        Self {
            lead_minutes,
            trail_minutes,
        }
    }

    /// `percent` (0 to 100) of `span`, in minutes.
    pub fn minutes_for_percent(span: TimeSpan, percent: f64) -> f64 {
        seconds_between(span.start, span.end) * percent / (60.0 * 100.0)
    }

    /// Visibility interval for a point, or `None` when the point is always visible.
    pub fn visibility(&self, time: Option<Timestamp>, has_time_data: bool) -> Option<TimeSpan> {
        if !has_time_data {
            return None;
        }
        time.map(|t| TimeSpan::around(t, self.lead_minutes, self.trail_minutes))
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::new(0.0, 60.0)
    }
}
