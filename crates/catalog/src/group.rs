use serde_json::Value;

use crate::item::{CatalogItem, DataItem};
use crate::{CatalogError, CatalogStore};

/// Name of the group holding items the user added by web link.
pub const USER_ADDED_GROUP: &str = "User-Added Data";

/// A named collection of items and nested groups.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogGroup {
    pub name: String,
    pub members: Vec<CatalogMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogMember {
    Item(CatalogItem),
    Group(CatalogGroup),
}

/// The top-level group of a catalog file.
pub type Catalog = CatalogGroup;

impl CatalogGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Reads `{ "name": .., "items": [ .. ] }`; items of type `group` nest.
    pub fn from_json(json: &Value) -> Result<Self, CatalogError> {
        let name = json.get("name").and_then(Value::as_str).unwrap_or_default();
        let mut group = CatalogGroup::new(name);
        let Some(items) = json.get("items") else {
            return Ok(group);
        };
        let items = items
            .as_array()
            .ok_or_else(|| CatalogError::InvalidJson("`items` must be an array".to_string()))?;
        for item in items {
            let member = if item.get("type").and_then(Value::as_str) == Some("group") {
                CatalogMember::Group(CatalogGroup::from_json(item)?)
            } else {
                CatalogMember::Item(CatalogItem::from_json(item)?)
            };
            group.members.push(member);
        }
        Ok(group)
    }

    pub fn from_json_str(payload: &str) -> Result<Self, CatalogError> {
        let json: Value =
            serde_json::from_str(payload).map_err(|e| CatalogError::InvalidJson(e.to_string()))?;
        Self::from_json(&json)
    }

    /// Group of every item in `store`, newest first.
    pub fn from_store(name: impl Into<String>, store: &dyn CatalogStore) -> Result<Self, CatalogError> {
        let mut group = CatalogGroup::new(name);
        for entry in store.list()? {
            group.members.push(CatalogMember::Item(entry.to_item()?));
        }
        Ok(group)
    }

    /// Every item in the group and its subgroups, depth first.
    pub fn items(&self) -> Vec<&CatalogItem> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a CatalogItem>) {
        for member in &self.members {
            match member {
                CatalogMember::Item(item) => out.push(item),
                CatalogMember::Group(group) => group.collect(out),
            }
        }
    }

    /// First item named `name`, searching depth first.
    pub fn item_mut(&mut self, name: &str) -> Result<&mut CatalogItem, CatalogError> {
        self.find_mut(name).ok_or(CatalogError::NotFound)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut CatalogItem> {
        for member in &mut self.members {
            let found = match member {
                CatalogMember::Item(item) if item.name() == name => Some(item),
                CatalogMember::Item(_) => None,
                CatalogMember::Group(group) => group.find_mut(name),
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;
    use crate::item::ItemKind;
    use crate::proxy::CorsProxy;
    use crate::{CatalogEntry, InMemoryCatalogStore};
    use serde_json::json;

    fn sample() -> Catalog {
        Catalog::from_json(&json!({
            "name": "Root",
            "items": [
                { "type": "wms", "name": "Elevation", "url": "http://a.com/wms", "layers": "dem" },
                {
                    "type": "group",
                    "name": "Transport",
                    "items": [
                        { "type": "wfs", "name": "Roads", "url": "http://b.com/wfs", "typeNames": "roads" },
                        { "type": "czml", "name": "Flights", "url": "flights.czml" }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn reads_nested_groups() {
        let catalog = sample();
        assert_eq!(catalog.name, "Root");
        let kinds: Vec<(ItemKind, &str)> = catalog.items().iter().map(|i| (i.kind(), i.name())).collect();
        assert_eq!(
            kinds,
            vec![
                (ItemKind::Wms, "Elevation"),
                (ItemKind::Wfs, "Roads"),
                (ItemKind::Czml, "Flights"),
            ]
        );
        assert!(matches!(&catalog.members[1], CatalogMember::Group(g) if g.name == "Transport"));
    }

    #[test]
    fn enables_item_found_by_name() {
        let mut catalog = sample();
        let mut engine = InMemoryEngine::new();
        catalog
            .item_mut("Flights")
            .unwrap()
            .enable(&mut engine, &CorsProxy::default())
            .unwrap();
        assert!(catalog.items()[2].is_enabled());
        assert_eq!(catalog.item_mut("Nope").unwrap_err(), CatalogError::NotFound);
    }

    #[test]
    fn user_added_items_join_the_catalog_as_a_group() {
        let mut store = InMemoryCatalogStore::new();
        store
            .upsert(CatalogEntry::from_link("http://x.org/a.czml", ItemKind::Czml, 1).unwrap())
            .unwrap();
        store
            .upsert(CatalogEntry::from_link("http://wms.x.org/ows", ItemKind::Wms, 2).unwrap())
            .unwrap();

        let mut catalog = sample();
        catalog
            .members
            .push(CatalogMember::Group(CatalogGroup::from_store(USER_ADDED_GROUP, &store).unwrap()));
        let names: Vec<&str> = catalog.items().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["Elevation", "Roads", "Flights", "wms.x.org", "a.czml"]);

        let mut engine = InMemoryEngine::new();
        catalog
            .item_mut("a.czml")
            .unwrap()
            .enable(&mut engine, &CorsProxy::default())
            .unwrap();
        assert_eq!(engine.data_sources().count(), 1);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let err = Catalog::from_json_str(r#"{"items":[{"type":"shapefile"}]}"#).unwrap_err();
        assert_eq!(err, CatalogError::UnknownType("shapefile".to_string()));
        assert!(matches!(
            Catalog::from_json_str(r#"{"items":{}}"#),
            Err(CatalogError::InvalidJson(_))
        ));
    }
}
