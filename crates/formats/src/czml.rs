use foundation::geo::Cartographic;
use foundation::time::{TimeSpan, to_iso8601};
use serde::{Deserialize, Serialize};

pub const CZML_VERSION: &str = "1.0";
pub const DOCUMENT_ID: &str = "document";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CzmlPacket {
    Document(DocumentPacket),
    Billboard(BillboardPacket),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPacket {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<Clock>,
}

impl DocumentPacket {
    pub fn new() -> Self {
        Self {
            id: DOCUMENT_ID.to_string(),
            version: CZML_VERSION.to_string(),
            name: None,
            clock: None,
        }
    }
}

impl Default for DocumentPacket {
    fn default() -> Self {
        Self::new()
    }
}

/// Animation clock covering the data's time span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clock {
    pub interval: String,
    pub current_time: String,
    pub multiplier: f64,
}

impl Clock {
    /// Plays `span` in `playback_seconds` of wall time; never slower than real time.
    pub fn spanning(span: TimeSpan, playback_seconds: f64) -> Self {
        let multiplier = if playback_seconds > 0.0 {
            (span.duration_seconds() / playback_seconds).max(1.0)
        } else {
            1.0
        };
        Self {
            interval: span.to_iso8601(),
            current_time: to_iso8601(span.start),
            multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillboardPacket {
    pub id: String,
    pub billboard: Billboard,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Billboard {
    pub horizontal_origin: String,
    pub vertical_origin: String,
    pub image: String,
    pub scale: f64,
    pub color: RgbaValue,
    pub show: Vec<ShowInterval>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbaValue {
    pub rgba: [u8; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowInterval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    pub boolean: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub cartographic_degrees: [f64; 3],
}

impl BillboardPacket {
    /// A marker hidden outside `visibility`, or always shown when there is none.
    pub fn new(
        id: impl Into<String>,
        image: impl Into<String>,
        position: Cartographic,
        rgba: [u8; 4],
        scale: f64,
        visibility: Option<TimeSpan>,
    ) -> Self {
        let show = match visibility {
            Some(span) => vec![
                ShowInterval {
                    interval: None,
                    boolean: false,
                },
                ShowInterval {
                    interval: Some(span.to_iso8601()),
                    boolean: true,
                },
            ],
            None => vec![ShowInterval {
                interval: None,
                boolean: true,
            }],
        };
        Self {
            id: id.into(),
            billboard: Billboard {
                horizontal_origin: "CENTER".to_string(),
                vertical_origin: "BOTTOM".to_string(),
                image: image.into(),
                scale,
                color: RgbaValue { rgba },
                show,
            },
            position: Position {
                cartographic_degrees: position.to_array(),
            },
        }
    }
}

#[derive(Debug)]
pub enum CzmlError {
    Json(serde_json::Error),
    MissingDocumentPacket,
}

impl std::fmt::Display for CzmlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CzmlError::Json(e) => write!(f, "CZML JSON error: {e}"),
            CzmlError::MissingDocumentPacket => {
                write!(f, "CZML must start with a document packet")
            }
        }
    }
}

impl std::error::Error for CzmlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CzmlError::Json(e) => Some(e),
            CzmlError::MissingDocumentPacket => None,
        }
    }
}

pub fn to_json_string(packets: &[CzmlPacket]) -> Result<String, CzmlError> {
    serde_json::to_string(packets).map_err(CzmlError::Json)
}

pub fn to_json_pretty(packets: &[CzmlPacket]) -> Result<String, CzmlError> {
    serde_json::to_string_pretty(packets).map_err(CzmlError::Json)
}

pub fn from_json_str(payload: &str) -> Result<Vec<CzmlPacket>, CzmlError> {
    let packets: Vec<CzmlPacket> = serde_json::from_str(payload).map_err(CzmlError::Json)?;
    match packets.first() {
        Some(CzmlPacket::Document(_)) => Ok(packets),
        _ => Err(CzmlError::MissingDocumentPacket),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn billboard_with_interval_serializes_to_czml_shape() {
        let t = Utc.with_ymd_and_hms(2011, 2, 4, 16, 0, 0).unwrap();
        let packet = BillboardPacket::new(
            "7",
            "marker.png",
            Cartographic::new(151.0, -33.0, 10.0),
            [255, 0, 0, 128],
            1.5,
            Some(TimeSpan::around(t, 0.0, 120.0)),
        );
        let value = serde_json::to_value(CzmlPacket::Billboard(packet)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "7",
                "billboard": {
                    "horizontalOrigin": "CENTER",
                    "verticalOrigin": "BOTTOM",
                    "image": "marker.png",
                    "scale": 1.5,
                    "color": { "rgba": [255, 0, 0, 128] },
                    "show": [
                        { "boolean": false },
                        { "interval": "2011-02-04T16:00:00Z/2011-02-04T18:00:00Z", "boolean": true }
                    ]
                },
                "position": { "cartographicDegrees": [151.0, -33.0, 10.0] }
            })
        );
    }

    #[test]
    fn billboard_without_interval_is_always_shown() {
        let packet = BillboardPacket::new("0", "m.png", Cartographic::default(), [0; 4], 1.0, None);
        assert_eq!(
            packet.billboard.show,
            vec![ShowInterval {
                interval: None,
                boolean: true
            }]
        );
    }

    #[test]
    fn document_round_trips_and_is_required_first() {
        let packets = vec![
            CzmlPacket::Document(DocumentPacket::new()),
            CzmlPacket::Billboard(BillboardPacket::new(
                "0",
                "m.png",
                Cartographic::default(),
                [1, 2, 3, 4],
                1.0,
                None,
            )),
        ];
        let text = to_json_string(&packets).unwrap();
        assert!(text.starts_with(r#"[{"id":"document","version":"1.0"}"#));
        assert_eq!(from_json_str(&text).unwrap(), packets);

        assert!(matches!(
            from_json_str("[]"),
            Err(CzmlError::MissingDocumentPacket)
        ));
        assert!(matches!(from_json_str("{"), Err(CzmlError::Json(_))));
    }

    #[test]
    fn clock_never_runs_slower_than_real_time() {
        let start = Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2014, 1, 2, 0, 0, 0).unwrap();
        let clock = Clock::spanning(TimeSpan::new(start, end), 60.0);
        assert_eq!(clock.multiplier, 1440.0);
        assert_eq!(clock.current_time, "2014-01-01T00:00:00Z");
        assert_eq!(Clock::spanning(TimeSpan::instant(start), 60.0).multiplier, 1.0);
    }
}
