use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::CatalogError;
use crate::engine::{DataSourceSpec, EngineHandle, MapEngine};
use crate::item::{DataItem, ItemKind, Metadata, UNNAMED_ITEM, parse_description};
use crate::proxy::CorsProxy;

const NO_DATA_SOURCE_DETAILS: &str = "This data source does not have any details available.";
const NO_SERVICE_DETAILS: &str = "This service does not have any details available.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CzmlDescription {
    name: Option<String>,
    #[serde(default)]
    description: String,
    url: Option<String>,
    data: Option<Value>,
}

/// A CZML document, fetched from `url` or given inline as `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct CzmlItem {
    pub name: String,
    pub description: String,
    pub url: Option<String>,
    /// Takes precedence over `url`.
    pub data: Option<Value>,
    source: Option<EngineHandle>,
}

impl Default for CzmlItem {
    fn default() -> Self {
        Self {
            name: UNNAMED_ITEM.to_string(),
            description: String::new(),
            url: None,
            data: None,
            source: None,
        }
    }
}

impl DataItem for CzmlItem {
    fn kind(&self) -> ItemKind {
        ItemKind::Czml
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn update_from_json(&mut self, json: &Value) -> Result<(), CatalogError> {
        let d: CzmlDescription = parse_description(json)?;
        self.name = d.name.unwrap_or_else(|| UNNAMED_ITEM.to_string());
        self.description = d.description;
        self.url = d.url;
        self.data = d.data;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    fn enable(&mut self, engine: &mut dyn MapEngine, proxy: &CorsProxy) -> Result<(), CatalogError> {
        if self.source.is_some() {
            return Err(CatalogError::AlreadyEnabled);
        }
        let spec = match (&self.data, &self.url) {
            (Some(data), _) => DataSourceSpec::CzmlDocument(data.clone()),
            (None, Some(url)) => DataSourceSpec::CzmlUrl(proxy.url_for(url)),
            (None, None) => return Err(CatalogError::MissingField("url")),
        };
        debug!(name = %self.name, "CZML item enabled");
        self.source = Some(engine.add_data_source(&self.name, spec));
        Ok(())
    }

    fn disable(&mut self, engine: &mut dyn MapEngine) -> Result<(), CatalogError> {
        let handle = self.source.take().ok_or(CatalogError::NotEnabled)?;
        engine.remove_data_source(handle);
        Ok(())
    }

    fn request_metadata(&self, _proxy: &CorsProxy) -> Metadata {
        Metadata::Unavailable {
            data_source_message: NO_DATA_SOURCE_DETAILS.to_string(),
            service_message: NO_SERVICE_DETAILS.to_string(),
        }
    }
}
