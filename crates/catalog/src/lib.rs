pub mod czml;
pub mod engine;
pub mod group;
pub mod item;
pub mod proxy;
pub mod wfs;
pub mod wms;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

pub use engine::{DataSourceSpec, EngineHandle, InMemoryEngine, MapEngine};
pub use group::{Catalog, CatalogGroup, CatalogMember, USER_ADDED_GROUP};
pub use item::{CatalogItem, DataItem, ItemKind, Metadata};
pub use proxy::{CorsProxy, ProxyConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    NotFound,
    AlreadyEnabled,
    NotEnabled,
    UnknownType(String),
    MissingField(&'static str),
    InvalidJson(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::NotFound => write!(f, "catalog entry not found"),
            CatalogError::AlreadyEnabled => write!(f, "catalog item is already enabled"),
            CatalogError::NotEnabled => write!(f, "catalog item is not enabled"),
            CatalogError::UnknownType(ty) => write!(f, "unknown catalog item type `{ty}`"),
            CatalogError::MissingField(field) => write!(f, "catalog item is missing `{field}`"),
            CatalogError::InvalidJson(msg) => write!(f, "invalid catalog JSON: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// A user-added catalog item, kept as the JSON it was described with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    /// Item type as it appears in catalog files (`wms`, `wfs`, `czml`).
    pub kind: String,
    pub json: Value,
    pub created_at_ms: u64,
}

impl CatalogEntry {
    /// Builds an entry for an item description; the id is derived from its content.
    pub fn from_item_json(json: Value, created_at_ms: u64) -> Result<Self, CatalogError> {
        let item = CatalogItem::from_json(&json)?;
        Ok(Self {
            id: id_for_item_json(&json),
            name: item.name().to_string(),
            kind: item.kind().as_str().to_string(),
            json,
            created_at_ms,
        })
    }

    /// Entry for a web link to a CZML file or a WMS/WFS service endpoint.
    ///
    /// The item is named after the file for CZML links and after the host for services.
    pub fn from_link(link: &str, kind: ItemKind, created_at_ms: u64) -> Result<Self, CatalogError> {
        let link = link.trim();
        if link.is_empty() {
            return Err(CatalogError::MissingField("url"));
        }
        let json = json!({
            "type": kind.as_str(),
            "name": name_for_link(link, kind),
            "url": link,
        });
        Self::from_item_json(json, created_at_ms)
    }

    pub fn to_item(&self) -> Result<CatalogItem, CatalogError> {
        CatalogItem::from_json(&self.json)
    }
}

fn name_for_link(link: &str, kind: ItemKind) -> String {
    let Ok(url) = Url::parse(link) else {
        // Relative path
        let path = link.split(['?', '#']).next().unwrap_or(link);
        return path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(link).to_string();
    };
    let file = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string);
    match (kind, file, url.host_str()) {
        (ItemKind::Czml, Some(file), _) => file,
        (_, _, Some(host)) => host.to_string(),
        _ => link.to_string(),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub entries: BTreeMap<String, CatalogEntry>,
}

pub trait CatalogStore {
    fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError>;
    fn get(&self, id: &str) -> Result<Option<CatalogEntry>, CatalogError>;
    fn upsert(&mut self, entry: CatalogEntry) -> Result<(), CatalogError>;
    fn delete(&mut self, id: &str) -> Result<bool, CatalogError>;
}

/// blake3 of the compact JSON. `serde_json` keeps object keys sorted, so equal
/// descriptions hash equally regardless of the key order they were written in.
pub fn id_for_item_json(json: &Value) -> String {
    blake3::hash(json.to_string().as_bytes()).to_hex().to_string()
}

#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    snapshot: CatalogSnapshot,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a store written by [`InMemoryCatalogStore::to_json_pretty`].
    pub fn from_json_str(payload: &str) -> Result<Self, CatalogError> {
        let snapshot: CatalogSnapshot =
            serde_json::from_str(payload).map_err(|e| CatalogError::InvalidJson(e.to_string()))?;
        Ok(Self { snapshot })
    }

    pub fn to_json_pretty(&self) -> Result<String, CatalogError> {
        serde_json::to_string_pretty(&self.snapshot).map_err(|e| CatalogError::InvalidJson(e.to_string()))
    }

    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut out: Vec<CatalogEntry> = self.snapshot.entries.values().cloned().collect();
        // Most recent first, then id.
        out.sort_by(|a, b| {
            b.created_at_ms
                .cmp(&a.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(out)
    }

    fn get(&self, id: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        Ok(self.snapshot.entries.get(id).cloned())
    }

    fn upsert(&mut self, entry: CatalogEntry) -> Result<(), CatalogError> {
        self.snapshot.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<bool, CatalogError> {
        Ok(self.snapshot.entries.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn id_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"type":"czml","name":"a","url":"a.czml"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"url":"a.czml","name":"a","type":"czml"}"#).unwrap();
        assert_eq!(id_for_item_json(&a), id_for_item_json(&b));
        assert_eq!(id_for_item_json(&a).len(), 64);
    }

    #[test]
    fn store_round_trips_items() {
        let mut store = InMemoryCatalogStore::new();
        let older = CatalogEntry::from_item_json(json!({"type": "wms", "name": "Old", "url": "http://a.com"}), 1)
            .unwrap();
        let newer = CatalogEntry::from_item_json(json!({"type": "czml", "name": "New", "url": "b.czml"}), 2)
            .unwrap();
        store.upsert(older.clone()).unwrap();
        store.upsert(newer.clone()).unwrap();
        store.upsert(newer.clone()).unwrap();

        let names: Vec<String> = store.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["New".to_string(), "Old".to_string()]);

        let item = store.get(&older.id).unwrap().unwrap().to_item().unwrap();
        assert_eq!(item.kind(), ItemKind::Wms);
        assert_eq!(newer.kind, "czml");

        assert!(store.delete(&older.id).unwrap());
        assert!(!store.delete(&older.id).unwrap());
        assert_eq!(store.get(&older.id).unwrap(), None);
        assert_eq!(store.snapshot().entries.len(), 1);
    }

    #[test]
    fn link_entries_are_named_after_file_or_host() {
        let czml = CatalogEntry::from_link(" http://data.org/tracks/flights.czml?v=2 ", ItemKind::Czml, 5).unwrap();
        assert_eq!(czml.name, "flights.czml");
        assert_eq!(czml.kind, "czml");
        assert_eq!(czml.json["url"], "http://data.org/tracks/flights.czml?v=2");

        let wms = CatalogEntry::from_link("http://maps.example.com/geoserver/wms", ItemKind::Wms, 5).unwrap();
        assert_eq!(wms.name, "maps.example.com");
        assert_eq!(wms.to_item().unwrap().kind(), ItemKind::Wms);

        let local = CatalogEntry::from_link("data/ships.czml", ItemKind::Czml, 5).unwrap();
        assert_eq!(local.name, "ships.czml");

        assert_eq!(
            CatalogEntry::from_link("  ", ItemKind::Wfs, 5),
            Err(CatalogError::MissingField("url"))
        );
    }

    #[test]
    fn store_survives_a_json_round_trip() {
        let mut store = InMemoryCatalogStore::new();
        let entry = CatalogEntry::from_link("http://a.com/wfs", ItemKind::Wfs, 7).unwrap();
        store.upsert(entry.clone()).unwrap();

        let restored = InMemoryCatalogStore::from_json_str(&store.to_json_pretty().unwrap()).unwrap();
        assert_eq!(restored.snapshot(), store.snapshot());
        assert_eq!(restored.get(&entry.id).unwrap(), Some(entry));
        assert!(matches!(
            InMemoryCatalogStore::from_json_str("[]"),
            Err(CatalogError::InvalidJson(_))
        ));
    }

    #[test]
    fn entry_rejects_unknown_items() {
        assert_eq!(
            CatalogEntry::from_item_json(json!({"type": "kml"}), 0),
            Err(CatalogError::UnknownType("kml".to_string()))
        );
    }
}
