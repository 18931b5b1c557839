use formats::czml::CzmlPacket;
use formats::table::{TableData, TableError, TableOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::layer::{Layer, LayerId};
use crate::legend::{LegendError, LegendSurface, LegendText, RasterLegend, draw_legend};
use crate::mapping::TimeWindow;
use crate::record::{PointStyle, VisualRecord, build_records, czml_document};
use crate::symbology::{ColorTable, Gradient, Rgba};

/// Lead time applied after every load, as a percentage of the time range.
pub const LOAD_LEAD_PERCENT: f64 = 0.0;
/// Trail time applied after every load, as a percentage of the time range.
pub const LOAD_TRAIL_PERCENT: f64 = 1.0;

/// Scene-description loader of the rendering engine.
pub trait SceneSink {
    /// Replaces whatever `source_name` showed before with `packets`.
    fn load_czml(&mut self, source_name: &str, packets: Vec<CzmlPacket>);
}

/// User-facing configuration of a table layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableStyle {
    pub color: Rgba,
    pub scale: f64,
    pub scale_by_value: bool,
    /// Marker image for every point.
    pub image: String,
    pub max_points: usize,
    pub gradient: Gradient,
    pub lead_minutes: f64,
    pub trail_minutes: f64,
    pub no_data: Option<f64>,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            color: Rgba::RED,
            scale: 1.0,
            scale_by_value: true,
            image: "./images/pow32.png".to_string(),
            max_points: 10_000,
            gradient: Gradient::default(),
            lead_minutes: 0.0,
            trail_minutes: 60.0,
            no_data: None,
        }
    }
}

impl TableStyle {
    pub fn from_json_str(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    pub fn point_style(&self) -> PointStyle {
        PointStyle {
            color: self.color,
            scale: self.scale,
            scale_by_value: self.scale_by_value,
        }
    }
}

/// Geo-located table shown as colored, scaled markers.
///
/// Owns its dataset and the color table built from the configured gradient.
/// Every change that affects appearance is followed by a full rebuild of the
/// record list; there are no incremental updates.
#[derive(Debug, Clone)]
pub struct TableLayer {
    id: LayerId,
    name: String,
    pub show: bool,
    dataset: TableData,
    style: TableStyle,
    color_table: ColorTable,
    window: TimeWindow,
}

impl TableLayer {
    pub fn new(id: u64, name: impl Into<String>, style: TableStyle) -> Self {
        let color_table = ColorTable::from_gradient(&style.gradient);
        let window = TimeWindow::new(style.lead_minutes, style.trail_minutes);
        let dataset = TableData::new(TableOptions {
            no_data: style.no_data,
        });
        Self {
            id: LayerId(id),
            name: name.into(),
            show: true,
            dataset,
            style,
            color_table,
            window,
        }
    }

    /// Replaces the data with `text` and resets the time window to the load defaults.
    pub fn load_text(&mut self, text: &str) -> Result<(), TableError> {
        self.dataset.load_text(text)?;
        self.set_lead_time_by_percent(LOAD_LEAD_PERCENT);
        self.set_trail_time_by_percent(LOAD_TRAIL_PERCENT);
        debug!(layer = %self.name, rows = self.dataset.len(), "table layer loaded");
        Ok(())
    }

    /// Marks the layer as waiting for an asynchronous load; record builds return `None` until
    /// [`TableLayer::load_text`] runs.
    pub fn begin_loading(&mut self) {
        self.dataset.begin_loading();
    }

    pub fn set_current_variable(&mut self, name: &str) -> Result<(), TableError> {
        self.dataset.set_current_variable(name)
    }

    pub fn set_color_gradient(&mut self, gradient: Gradient) {
        self.color_table = ColorTable::from_gradient(&gradient);
        self.style.gradient = gradient;
    }

    /// No effect when the data has no time range.
    pub fn set_lead_time_by_percent(&mut self, percent: f64) {
        if let Some(span) = self.dataset.time_range() {
            self.window.lead_minutes = TimeWindow::minutes_for_percent(span, percent);
        }
    }

    /// No effect when the data has no time range.
    pub fn set_trail_time_by_percent(&mut self, percent: f64) {
        if let Some(span) = self.dataset.time_range() {
            self.window.trail_minutes = TimeWindow::minutes_for_percent(span, percent);
        }
    }

    pub fn set_lead_minutes(&mut self, minutes: f64) {
        self.window.lead_minutes = minutes;
    }

    pub fn set_trail_minutes(&mut self, minutes: f64) {
        self.window.trail_minutes = minutes;
    }

    pub fn time_window(&self) -> TimeWindow {
        self.window
    }

    pub fn dataset(&self) -> &TableData {
        &self.dataset
    }

    pub fn style(&self) -> &TableStyle {
        &self.style
    }

    pub fn color_table(&self) -> &ColorTable {
        &self.color_table
    }

    /// `None` while the dataset is loading.
    pub fn records(&self) -> Option<Vec<VisualRecord>> {
        build_records(
            &self.dataset,
            Some(&self.color_table),
            &self.style.point_style(),
            &self.window,
            self.style.max_points,
        )
    }

    pub fn czml_packets(&self) -> Option<Vec<CzmlPacket>> {
        let records = self.records()?;
        Some(czml_document(
            &records,
            &self.style.image,
            Some(&self.name),
            self.dataset.time_range(),
        ))
    }

    /// Hands a fresh CZML document to `sink`. Returns `false` while loading, or when hidden.
    pub fn push_to(&self, sink: &mut dyn SceneSink) -> bool {
        if !self.show {
            return false;
        }
        match self.czml_packets() {
            Some(packets) => {
                sink.load_czml(&self.name, packets);
                true
            }
            None => false,
        }
    }

    pub fn draw_legend<S: LegendSurface + ?Sized>(&self, surface: &mut S) {
        let text = LegendText {
            variable: self.dataset.current_variable(),
            min: self.dataset.min_value(),
            max: self.dataset.max_value(),
        };
        draw_legend(surface, &self.style.gradient, &text);
    }

    pub fn legend(&self) -> RasterLegend {
        let mut legend = RasterLegend::default();
        self.draw_legend(&mut legend);
        legend
    }

    pub fn legend_png(&self) -> Result<Vec<u8>, LegendError> {
        self.legend().to_png()
    }
}

impl Layer for TableLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
