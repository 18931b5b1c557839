use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::CatalogError;
use crate::czml::CzmlItem;
use crate::engine::MapEngine;
use crate::proxy::CorsProxy;
use crate::wfs::WfsItem;
use crate::wms::WmsItem;

pub const UNNAMED_ITEM: &str = "Unnamed Item";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Wms,
    Wfs,
    Czml,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Wms => "wms",
            ItemKind::Wfs => "wfs",
            ItemKind::Czml => "czml",
        }
    }

    /// Human-readable name of the service type.
    pub fn type_name(self) -> &'static str {
        match self {
            ItemKind::Wms => "Web Map Service (WMS)",
            ItemKind::Wfs => "Web Feature Service (WFS)",
            ItemKind::Czml => "Cesium Language (CZML)",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wms" => Some(ItemKind::Wms),
            "wfs" => Some(ItemKind::Wfs),
            "czml" => Some(ItemKind::Czml),
            _ => None,
        }
    }
}

/// What is known about an item's data and the service behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadata {
    /// Metadata has to be fetched from `url` (a capabilities document).
    Pending { url: String },
    Unavailable {
        data_source_message: String,
        service_message: String,
    },
}

/// Capabilities shared by every catalog item.
pub trait DataItem {
    fn kind(&self) -> ItemKind;
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Resets the item from a JSON object; fields that are absent fall back to their defaults.
    fn update_from_json(&mut self, json: &Value) -> Result<(), CatalogError>;

    fn is_enabled(&self) -> bool;
    fn enable(&mut self, engine: &mut dyn MapEngine, proxy: &CorsProxy) -> Result<(), CatalogError>;
    fn disable(&mut self, engine: &mut dyn MapEngine) -> Result<(), CatalogError>;
    fn request_metadata(&self, proxy: &CorsProxy) -> Metadata;

    fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }
}

/// Any item that can appear in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogItem {
    Wms(WmsItem),
    Wfs(WfsItem),
    Czml(CzmlItem),
}

impl CatalogItem {
    pub fn new(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Wms => CatalogItem::Wms(WmsItem::default()),
            ItemKind::Wfs => CatalogItem::Wfs(WfsItem::default()),
            ItemKind::Czml => CatalogItem::Czml(CzmlItem::default()),
        }
    }

    /// Builds an item from a JSON object whose `type` names the item kind.
    pub fn from_json(json: &Value) -> Result<Self, CatalogError> {
        let ty = json
            .get("type")
            .and_then(Value::as_str)
            .ok_or(CatalogError::MissingField("type"))?;
        let kind = ItemKind::parse(ty).ok_or_else(|| CatalogError::UnknownType(ty.to_string()))?;
        let mut item = CatalogItem::new(kind);
        item.update_from_json(json)?;
        Ok(item)
    }

    fn inner(&self) -> &dyn DataItem {
        match self {
            CatalogItem::Wms(i) => i,
            CatalogItem::Wfs(i) => i,
            CatalogItem::Czml(i) => i,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn DataItem {
        match self {
            CatalogItem::Wms(i) => i,
            CatalogItem::Wfs(i) => i,
            CatalogItem::Czml(i) => i,
        }
    }
}

impl DataItem for CatalogItem {
    fn kind(&self) -> ItemKind {
        self.inner().kind()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn description(&self) -> &str {
        self.inner().description()
    }

    fn update_from_json(&mut self, json: &Value) -> Result<(), CatalogError> {
        self.inner_mut().update_from_json(json)
    }

    fn is_enabled(&self) -> bool {
        self.inner().is_enabled()
    }

    fn enable(&mut self, engine: &mut dyn MapEngine, proxy: &CorsProxy) -> Result<(), CatalogError> {
        self.inner_mut().enable(engine, proxy)
    }

    fn disable(&mut self, engine: &mut dyn MapEngine) -> Result<(), CatalogError> {
        self.inner_mut().disable(engine)
    }

    fn request_metadata(&self, proxy: &CorsProxy) -> Metadata {
        self.inner().request_metadata(proxy)
    }
}

/// Deserializes an item description, rejecting anything that is not a JSON object.
pub(crate) fn parse_description<T: DeserializeOwned>(json: &Value) -> Result<T, CatalogError> {
    if !json.is_object() {
        return Err(CatalogError::InvalidJson("item description must be an object".to_string()));
    }
    serde_json::from_value(json.clone()).map_err(|e| CatalogError::InvalidJson(e.to_string()))
}

/// `url` without its query string and fragment.
pub(crate) fn strip_query(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_query_handles_absolute_and_relative() {
        assert_eq!(strip_query("http://foo.com/bar?x=1#f"), "http://foo.com/bar");
        assert_eq!(strip_query("data/wms?x=1"), "data/wms");
        assert_eq!(strip_query(""), "");
    }

    #[test]
    fn from_json_dispatches_on_type() {
        let item = CatalogItem::from_json(&json!({"type": "czml", "name": "Tracks"})).unwrap();
        assert_eq!(item.kind(), ItemKind::Czml);
        assert_eq!(item.type_name(), "Cesium Language (CZML)");
        assert_eq!(item.name(), "Tracks");

        assert_eq!(
            CatalogItem::from_json(&json!({"type": "kml"})),
            Err(CatalogError::UnknownType("kml".to_string()))
        );
        assert_eq!(
            CatalogItem::from_json(&json!({"name": "x"})),
            Err(CatalogError::MissingField("type"))
        );
    }

    #[test]
    fn field_type_mismatch_is_invalid_json() {
        let err = CatalogItem::from_json(&json!({"type": "wms", "name": 3})).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidJson(_)));
    }
}
