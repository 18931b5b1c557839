use formats::czml::{BillboardPacket, Clock, CzmlPacket, DocumentPacket};
use foundation::geo::Cartographic;
use foundation::time::TimeSpan;
use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::mapping::{TimeWindow, map_color, map_scale, normalized_position};
use crate::symbology::{ColorTable, Rgba};

/// Wall-clock seconds the document clock takes to play the whole time range.
pub const PLAYBACK_SECONDS: f64 = 60.0;

/// Appearance of points before value mapping.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointStyle {
    pub color: Rgba,
    pub scale: f64,
    pub scale_by_value: bool,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            color: Rgba::RED,
            scale: 1.0,
            scale_by_value: true,
        }
    }
}

/// Display record for one data row.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualRecord {
    /// Row index in the dataset.
    pub id: usize,
    pub color: Rgba,
    pub scale: f64,
    pub position: Cartographic,
    /// `None` means always visible.
    pub visibility: Option<TimeSpan>,
}

impl VisualRecord {
    pub fn to_czml(&self, image: &str) -> BillboardPacket {
        BillboardPacket::new(
            self.id.to_string(),
            image,
            self.position,
            self.color.0,
            self.scale,
            self.visibility,
        )
    }
}

/// Maps every row of `dataset` to a [`VisualRecord`], keeping at most `max_points`.
///
/// Returns `None` while the dataset is still loading.
pub fn build_records<D: Dataset + ?Sized>(
    dataset: &D,
    table: Option<&ColorTable>,
    style: &PointStyle,
    window: &TimeWindow,
    max_points: usize,
) -> Option<Vec<VisualRecord>> {
    if dataset.is_loading() {
        debug!("dataset still loading; skipping record build");
        return None;
    }

    let points = dataset.points();
    if points.len() > max_points {
        warn!(
            total = points.len(),
            max_points, "point count exceeds limit; extra rows dropped"
        );
    }

    let has_time = dataset.has_time_data();
    let records: Vec<VisualRecord> = points
        .iter()
        .take(max_points)
        .enumerate()
        .map(|(id, point)| {
            let position = normalized_position(point.value, Some(dataset));
            VisualRecord {
                id,
                color: map_color(position, table, style.color),
                scale: map_scale(position, style.scale, style.scale_by_value),
                position: point.position,
                visibility: window.visibility(point.time, has_time),
            }
        })
        .collect();
    debug!(records = records.len(), "built visual records");
    Some(records)
}

/// Document packet followed by one billboard per record.
///
/// The document carries an animation clock when the data has a time range.
pub fn czml_document(
    records: &[VisualRecord],
    image: &str,
    name: Option<&str>,
    time_range: Option<TimeSpan>,
) -> Vec<CzmlPacket> {
    let mut document = DocumentPacket::new();
    document.name = name.map(str::to_string);
    document.clock = time_range.map(|span| Clock::spanning(span, PLAYBACK_SECONDS));

    let mut packets = Vec::with_capacity(records.len() + 1);
    packets.push(CzmlPacket::Document(document));
    packets.extend(
        records
            .iter()
            .map(|r| CzmlPacket::Billboard(r.to_czml(image))),
    );
    packets
}
