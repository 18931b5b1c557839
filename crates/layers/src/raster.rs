use std::collections::BTreeMap;

use foundation::bounds::Rectangle;
use serde_json::Value;

use crate::symbology::LayerStyle;

/// Web Map Service imagery as handed to a map engine.
#[derive(Debug, Clone, PartialEq)]
pub struct WmsImagery {
    pub url: String,
    /// Comma-separated layer names.
    pub layers: String,
    pub parameters: BTreeMap<String, Value>,
    pub rectangle: Rectangle,
    pub feature_info_as_geojson: bool,
    pub feature_info_as_xml: bool,
}

impl WmsImagery {
    /// Query parameters for tile requests: the configured extras plus `layers`.
    ///
    /// `layers` always wins over an extra of the same name.
    pub fn request_parameters(&self) -> BTreeMap<String, Value> {
        let mut out = self.parameters.clone();
        out.insert("layers".to_string(), Value::String(self.layers.clone()));
        out
    }

    pub fn supports_feature_picking(&self) -> bool {
        self.feature_info_as_geojson || self.feature_info_as_xml
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    pub style: LayerStyle,
    pub source: WmsImagery,
}

impl RasterLayer {
    pub fn new(source: WmsImagery, alpha: f64) -> Self {
        Self {
            style: LayerStyle::new(alpha.clamp(0.0, 1.0)),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn layers_override_extra_parameters() {
        let mut parameters = BTreeMap::new();
        parameters.insert("layers".to_string(), json!("stale"));
        parameters.insert("transparent".to_string(), json!(true));
        let imagery = WmsImagery {
            url: "http://wms.example.com".to_string(),
            layers: "roads".to_string(),
            parameters,
            rectangle: Rectangle::MAX,
            feature_info_as_geojson: false,
            feature_info_as_xml: false,
        };
        let params = imagery.request_parameters();
        assert_eq!(params["layers"], json!("roads"));
        assert_eq!(params["transparent"], json!(true));
        assert!(!imagery.supports_feature_picking());
        assert_eq!(RasterLayer::new(imagery, 1.7).style.alpha, 1.0);
    }
}
