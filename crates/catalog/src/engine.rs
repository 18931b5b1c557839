use std::collections::BTreeMap;

use formats::czml::CzmlPacket;
use layers::raster::RasterLayer;
use layers::table::SceneSink;
use serde_json::Value;
use tracing::{debug, warn};

/// Identifies something a [`MapEngine`] is displaying.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineHandle(pub u64);

/// Vector data a map engine should load and show.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSourceSpec {
    CzmlUrl(String),
    CzmlDocument(Value),
    GeoJsonUrl(String),
}

/// The 3D globe or 2D map that catalog items display themselves on.
pub trait MapEngine {
    fn add_imagery_layer(&mut self, layer: RasterLayer) -> EngineHandle;
    /// Returns `false` when the handle is unknown.
    fn remove_imagery_layer(&mut self, handle: EngineHandle) -> bool;
    fn set_imagery_alpha(&mut self, handle: EngineHandle, alpha: f64) -> bool;
    fn add_data_source(&mut self, name: &str, source: DataSourceSpec) -> EngineHandle;
    fn remove_data_source(&mut self, handle: EngineHandle) -> bool;
}

/// Engine that only records what it was asked to show.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    next: u64,
    imagery: BTreeMap<EngineHandle, RasterLayer>,
    data_sources: BTreeMap<EngineHandle, (String, DataSourceSpec)>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn imagery_layers(&self) -> impl Iterator<Item = (&EngineHandle, &RasterLayer)> {
        self.imagery.iter()
    }

    pub fn data_sources(&self) -> impl Iterator<Item = (&EngineHandle, &(String, DataSourceSpec))> {
        self.data_sources.iter()
    }

    fn next_handle(&mut self) -> EngineHandle {
        self.next += 1;
        EngineHandle(self.next)
    }
}

impl MapEngine for InMemoryEngine {
    fn add_imagery_layer(&mut self, layer: RasterLayer) -> EngineHandle {
        let handle = self.next_handle();
        debug!(?handle, url = %layer.source.url, "imagery layer added");
        self.imagery.insert(handle, layer);
        handle
    }

    fn remove_imagery_layer(&mut self, handle: EngineHandle) -> bool {
        self.imagery.remove(&handle).is_some()
    }

    fn set_imagery_alpha(&mut self, handle: EngineHandle, alpha: f64) -> bool {
        match self.imagery.get_mut(&handle) {
            Some(layer) => {
                layer.style.alpha = alpha.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    fn add_data_source(&mut self, name: &str, source: DataSourceSpec) -> EngineHandle {
        let handle = self.next_handle();
        debug!(?handle, name, "data source added");
        self.data_sources.insert(handle, (name.to_string(), source));
        handle
    }

    fn remove_data_source(&mut self, handle: EngineHandle) -> bool {
        self.data_sources.remove(&handle).is_some()
    }
}

impl SceneSink for InMemoryEngine {
    /// Replaces any CZML document previously loaded under `source_name`.
    fn load_czml(&mut self, source_name: &str, packets: Vec<CzmlPacket>) {
        let document = match serde_json::to_value(&packets) {
            Ok(v) => v,
            Err(e) => {
                warn!(source_name, "CZML document not serializable: {e}");
                return;
            }
        };
        self.data_sources.retain(|_, (name, spec)| {
            !(name.as_str() == source_name && matches!(spec, DataSourceSpec::CzmlDocument(_)))
        });
        self.add_data_source(source_name, DataSourceSpec::CzmlDocument(document));
    }
}
