use std::collections::BTreeMap;

use foundation::bounds::Rectangle;
use layers::raster::{RasterLayer, WmsImagery};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::CatalogError;
use crate::engine::{EngineHandle, MapEngine};
use crate::item::{DataItem, ItemKind, Metadata, UNNAMED_ITEM, parse_description, strip_query};
use crate::proxy::CorsProxy;

pub const DEFAULT_DATA_URL_TYPE: &str = "wfs";

/// Parameters sent with every WMS image request unless the item overrides them.
pub fn default_parameters() -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("transparent".to_string(), json!(true)),
        ("format".to_string(), json!("image/png")),
        ("exceptions".to_string(), json!("application/vnd.ogc.se_xml")),
        ("style".to_string(), json!("")),
    ])
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WmsDescription {
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    layers: String,
    legend_url: Option<String>,
    metadata_url: Option<String>,
    data_url: Option<String>,
    data_url_type: Option<String>,
    data_custodian: Option<String>,
    rectangle: Option<Vec<f64>>,
    parameters: Option<BTreeMap<String, Value>>,
    get_feature_info_as_geo_json: Option<bool>,
    get_feature_info_as_xml: Option<bool>,
    opacity: Option<f64>,
}

/// A layer served by a Web Map Service, shown as imagery.
///
/// Legend, metadata and data URLs follow the service URL unless they were
/// set explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct WmsItem {
    pub name: String,
    pub description: String,
    pub url: String,
    /// Comma-separated layer names.
    pub layers: String,
    pub parameters: BTreeMap<String, Value>,
    pub rectangle: Rectangle,
    pub data_custodian: Option<String>,
    pub get_feature_info_as_geojson: bool,
    pub get_feature_info_as_xml: bool,
    legend_url: Option<String>,
    metadata_url: Option<String>,
    data_url: Option<String>,
    data_url_type: Option<String>,
    opacity: f64,
    layer: Option<EngineHandle>,
}

impl Default for WmsItem {
    fn default() -> Self {
        Self {
            name: UNNAMED_ITEM.to_string(),
            description: String::new(),
            url: String::new(),
            layers: String::new(),
            parameters: default_parameters(),
            rectangle: Rectangle::MAX,
            data_custodian: None,
            get_feature_info_as_geojson: true,
            get_feature_info_as_xml: true,
            legend_url: None,
            metadata_url: None,
            data_url: None,
            data_url_type: None,
            opacity: 1.0,
            layer: None,
        }
    }
}

impl WmsItem {
    pub fn legend_url(&self) -> String {
        self.legend_url.clone().unwrap_or_else(|| {
            format!(
                "{}?service=WMS&version=1.3.0&request=GetLegendGraphic&format=image/png&layer={}",
                strip_query(&self.url),
                self.layers
            )
        })
    }

    pub fn set_legend_url(&mut self, url: impl Into<String>) {
        self.legend_url = Some(url.into());
    }

    pub fn metadata_url(&self) -> String {
        self.metadata_url.clone().unwrap_or_else(|| {
            format!(
                "{}?service=WMS&version=1.3.0&request=GetCapabilities",
                strip_query(&self.url)
            )
        })
    }

    pub fn set_metadata_url(&mut self, url: impl Into<String>) {
        self.metadata_url = Some(url.into());
    }

    /// Where the raw features behind the imagery can be downloaded.
    pub fn data_url(&self) -> String {
        self.data_url.clone().unwrap_or_else(|| {
            format!(
                "{}?service=WFS&version=1.1.0&request=GetFeature&typeName={}&srsName=EPSG:4326",
                strip_query(&self.url),
                self.layers
            )
        })
    }

    pub fn data_url_type(&self) -> &str {
        self.data_url_type.as_deref().unwrap_or(DEFAULT_DATA_URL_TYPE)
    }

    pub fn set_data_url(&mut self, url: impl Into<String>, url_type: impl Into<String>) {
        self.data_url = Some(url.into());
        self.data_url_type = Some(url_type.into());
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Applies immediately when the item is enabled.
    pub fn set_opacity(&mut self, engine: &mut dyn MapEngine, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
        if let Some(handle) = self.layer {
            engine.set_imagery_alpha(handle, self.opacity);
        }
    }

    fn imagery(&self, proxy: &CorsProxy) -> WmsImagery {
        WmsImagery {
            url: proxy.url_for(&self.url),
            layers: self.layers.clone(),
            parameters: self.parameters.clone(),
            rectangle: self.rectangle,
            feature_info_as_geojson: self.get_feature_info_as_geojson,
            feature_info_as_xml: self.get_feature_info_as_xml,
        }
    }
}

impl DataItem for WmsItem {
    fn kind(&self) -> ItemKind {
        ItemKind::Wms
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn update_from_json(&mut self, json: &Value) -> Result<(), CatalogError> {
        let d: WmsDescription = parse_description(json)?;
        let rectangle = match d.rectangle {
            Some(values) => Rectangle::from_slice(&values).ok_or_else(|| {
                CatalogError::InvalidJson("rectangle must be [west, south, east, north]".to_string())
            })?,
            None => Rectangle::MAX,
        };

        self.name = d.name.unwrap_or_else(|| UNNAMED_ITEM.to_string());
        self.description = d.description;
        self.url = d.url;
        self.layers = d.layers;
        self.legend_url = d.legend_url;
        self.metadata_url = d.metadata_url;
        self.data_url = d.data_url;
        self.data_url_type = d.data_url_type;
        self.data_custodian = d.data_custodian;
        self.rectangle = rectangle;
        self.parameters = d.parameters.unwrap_or_else(default_parameters);
        self.get_feature_info_as_geojson = d.get_feature_info_as_geo_json.unwrap_or(true);
        self.get_feature_info_as_xml = d.get_feature_info_as_xml.unwrap_or(true);
        self.opacity = d.opacity.unwrap_or(1.0).clamp(0.0, 1.0);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.layer.is_some()
    }

    fn enable(&mut self, engine: &mut dyn MapEngine, proxy: &CorsProxy) -> Result<(), CatalogError> {
        if self.layer.is_some() {
            return Err(CatalogError::AlreadyEnabled);
        }
        let layer = RasterLayer::new(self.imagery(proxy), self.opacity);
        self.layer = Some(engine.add_imagery_layer(layer));
        debug!(name = %self.name, layers = %self.layers, "WMS item enabled");
        Ok(())
    }

    fn disable(&mut self, engine: &mut dyn MapEngine) -> Result<(), CatalogError> {
        let handle = self.layer.take().ok_or(CatalogError::NotEnabled)?;
        engine.remove_imagery_layer(handle);
        Ok(())
    }

    fn request_metadata(&self, proxy: &CorsProxy) -> Metadata {
        Metadata::Pending {
            url: proxy.url_for(&self.metadata_url()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;
    use pretty_assertions::assert_eq;

    #[test]
    fn has_sensible_type_and_type_name() {
        let item = WmsItem::default();
        assert_eq!(item.kind().as_str(), "wms");
        assert_eq!(item.type_name(), "Web Map Service (WMS)");
    }

    #[test]
    fn derives_urls_from_service_url() {
        let mut item = WmsItem::default();
        item.url = "http://foo.com/bar".to_string();
        assert!(item.legend_url().starts_with(&item.url));
        assert!(item.metadata_url().starts_with(&item.url));
        assert!(item.data_url().starts_with(&item.url));
        assert_eq!(item.data_url_type(), "wfs");
    }

    #[test]
    fn explicit_urls_survive_url_changes() {
        let mut item = WmsItem::default();
        item.set_legend_url("http://foo.com/legend.png");
        item.set_metadata_url("http://foo.com/metadata");
        item.set_data_url("http://foo.com/data", "wfs-complete");
        item.url = "http://foo.com/somethingElse".to_string();
        assert_eq!(item.legend_url(), "http://foo.com/legend.png");
        assert_eq!(item.metadata_url(), "http://foo.com/metadata");
        assert_eq!(item.data_url(), "http://foo.com/data");
        assert_eq!(item.data_url_type(), "wfs-complete");
    }

    #[test]
    fn updates_from_json() {
        let mut item = WmsItem::default();
        item.update_from_json(&json!({
            "name": "Name",
            "description": "Description",
            "rectangle": [-10, 10, -20, 20],
            "legendUrl": "http://legend.com",
            "dataUrlType": "wfs",
            "dataUrl": "http://my.wfs.com/wfs",
            "dataCustodian": "Data Custodian",
            "metadataUrl": "http://my.metadata.com",
            "url": "http://my.wms.com",
            "layers": "mylayer",
            "parameters": { "custom": true, "awesome": "maybe" },
            "getFeatureInfoAsGeoJson": false,
            "getFeatureInfoAsXml": false
        }))
        .unwrap();

        assert_eq!(item.name, "Name");
        assert_eq!(item.description, "Description");
        assert_eq!(item.rectangle, Rectangle::from_degrees(-10.0, 10.0, -20.0, 20.0));
        assert_eq!(item.legend_url(), "http://legend.com");
        assert_eq!(item.data_url_type(), "wfs");
        assert!(item.data_url().starts_with("http://my.wfs.com/wfs"));
        assert_eq!(item.data_custodian.as_deref(), Some("Data Custodian"));
        assert_eq!(item.metadata_url(), "http://my.metadata.com");
        assert_eq!(item.url, "http://my.wms.com");
        assert_eq!(item.layers, "mylayer");
        assert_eq!(
            item.parameters,
            BTreeMap::from([
                ("custom".to_string(), json!(true)),
                ("awesome".to_string(), json!("maybe")),
            ])
        );
        assert!(!item.get_feature_info_as_geojson);
        assert!(!item.get_feature_info_as_xml);
    }

    #[test]
    fn uses_reasonable_defaults_for_update_from_json() {
        let mut item = WmsItem::default();
        item.set_legend_url("http://stale.com");
        item.update_from_json(&json!({})).unwrap();

        assert_eq!(item.name, "Unnamed Item");
        assert_eq!(item.description, "");
        assert_eq!(item.rectangle, Rectangle::MAX);
        assert!(item.legend_url().starts_with('?'));
        assert_eq!(item.data_url_type(), "wfs");
        assert!(item.data_url().starts_with('?'));
        assert_eq!(item.data_custodian, None);
        assert!(item.metadata_url().starts_with('?'));
        assert_eq!(item.url, "");
        assert_eq!(item.layers, "");
        assert_eq!(item.parameters["transparent"], json!(true));
        assert!(item.get_feature_info_as_geojson);
        assert!(item.get_feature_info_as_xml);
    }

    #[test]
    fn rejects_malformed_rectangle() {
        let mut item = WmsItem::default();
        let err = item.update_from_json(&json!({"rectangle": [1, 2]})).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidJson(_)));
    }

    #[test]
    fn enable_disable_tracks_imagery_layer() {
        let mut engine = InMemoryEngine::new();
        let proxy = CorsProxy::new(vec!["my.wms.com".to_string()], Vec::new(), false);
        let mut item = WmsItem::default();
        item.update_from_json(&json!({"url": "http://my.wms.com/wms", "layers": "a,b", "opacity": 0.4}))
            .unwrap();

        item.enable(&mut engine, &proxy).unwrap();
        assert!(item.is_enabled());
        assert_eq!(item.enable(&mut engine, &proxy), Err(CatalogError::AlreadyEnabled));

        let (_, layer) = engine.imagery_layers().next().unwrap();
        assert_eq!(layer.source.url, "/proxy/http://my.wms.com/wms");
        assert_eq!(layer.source.layers, "a,b");
        assert_eq!(layer.style.alpha, 0.4);

        item.set_opacity(&mut engine, 0.8);
        assert_eq!(engine.imagery_layers().next().unwrap().1.style.alpha, 0.8);

        item.disable(&mut engine).unwrap();
        assert_eq!(engine.imagery_layers().count(), 0);
        assert_eq!(item.disable(&mut engine), Err(CatalogError::NotEnabled));
    }

    #[test]
    fn metadata_points_at_capabilities() {
        let mut item = WmsItem::default();
        item.url = "http://my.wms.com/wms?foo=bar".to_string();
        assert_eq!(
            item.request_metadata(&CorsProxy::default()),
            Metadata::Pending {
                url: "http://my.wms.com/wms?service=WMS&version=1.3.0&request=GetCapabilities"
                    .to_string()
            }
        );
    }
}
