use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::CatalogError;
use crate::engine::{DataSourceSpec, EngineHandle, MapEngine};
use crate::item::{DataItem, ItemKind, Metadata, UNNAMED_ITEM, parse_description, strip_query};
use crate::proxy::CorsProxy;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WfsDescription {
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    type_names: String,
}

/// Features from a Web Feature Service, requested as GeoJSON.
#[derive(Debug, Clone, PartialEq)]
pub struct WfsItem {
    pub name: String,
    pub description: String,
    pub url: String,
    /// Comma-separated feature type names.
    pub type_names: String,
    source: Option<EngineHandle>,
}

impl Default for WfsItem {
    fn default() -> Self {
        Self {
            name: UNNAMED_ITEM.to_string(),
            description: String::new(),
            url: String::new(),
            type_names: String::new(),
            source: None,
        }
    }
}

impl WfsItem {
    pub fn feature_url(&self) -> String {
        format!(
            "{}?service=WFS&version=1.1.0&request=GetFeature&typeName={}&outputFormat=JSON&srsName=EPSG:4326",
            strip_query(&self.url),
            self.type_names
        )
    }

    pub fn capabilities_url(&self) -> String {
        format!(
            "{}?service=WFS&version=1.1.0&request=GetCapabilities",
            strip_query(&self.url)
        )
    }
}

impl DataItem for WfsItem {
    fn kind(&self) -> ItemKind {
        ItemKind::Wfs
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn update_from_json(&mut self, json: &Value) -> Result<(), CatalogError> {
        let d: WfsDescription = parse_description(json)?;
        self.name = d.name.unwrap_or_else(|| UNNAMED_ITEM.to_string());
        self.description = d.description;
        self.url = d.url;
        self.type_names = d.type_names;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    fn enable(&mut self, engine: &mut dyn MapEngine, proxy: &CorsProxy) -> Result<(), CatalogError> {
        if self.source.is_some() {
            return Err(CatalogError::AlreadyEnabled);
        }
        let url = proxy.url_for(&self.feature_url());
        debug!(name = %self.name, %url, "WFS item enabled");
        self.source = Some(engine.add_data_source(&self.name, DataSourceSpec::GeoJsonUrl(url)));
        Ok(())
    }

    fn disable(&mut self, engine: &mut dyn MapEngine) -> Result<(), CatalogError> {
        let handle = self.source.take().ok_or(CatalogError::NotEnabled)?;
        engine.remove_data_source(handle);
        Ok(())
    }

    fn request_metadata(&self, proxy: &CorsProxy) -> Metadata {
        Metadata::Pending {
            url: proxy.url_for(&self.capabilities_url()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;
    use serde_json::json;

    #[test]
    fn enable_adds_geojson_source() {
        let mut item = WfsItem::default();
        item.update_from_json(&json!({
            "name": "Roads",
            "url": "http://my.wfs.com/wfs?x=1",
            "typeNames": "roads"
        }))
        .unwrap();
        assert_eq!(item.type_name(), "Web Feature Service (WFS)");

        let mut engine = InMemoryEngine::new();
        item.enable(&mut engine, &CorsProxy::default()).unwrap();
        let (_, (name, spec)) = engine.data_sources().next().unwrap();
        assert_eq!(name, "Roads");
        assert_eq!(
            spec,
            &DataSourceSpec::GeoJsonUrl(
                "http://my.wfs.com/wfs?service=WFS&version=1.1.0&request=GetFeature&typeName=roads&outputFormat=JSON&srsName=EPSG:4326"
                    .to_string()
            )
        );

        item.disable(&mut engine).unwrap();
        assert_eq!(engine.data_sources().count(), 0);
        assert_eq!(item.disable(&mut engine), Err(CatalogError::NotEnabled));
    }

    #[test]
    fn metadata_from_capabilities() {
        let mut item = WfsItem::default();
        item.url = "http://my.wfs.com/wfs".to_string();
        let proxy = CorsProxy::new(vec!["wfs.com".to_string()], Vec::new(), false);
        assert_eq!(
            item.request_metadata(&proxy),
            Metadata::Pending {
                url: "/proxy/http://my.wfs.com/wfs?service=WFS&version=1.1.0&request=GetCapabilities"
                    .to_string()
            }
        );
    }
}
