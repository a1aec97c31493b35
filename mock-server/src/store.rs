//! In-memory site state and the rules the real API enforces on it.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ApiError;

/// Server-side description of one resource kind.
#[derive(Debug)]
pub struct Kind {
    pub kind: &'static str,
    pub collection: &'static str,
    pub required: &'static [&'static str],
    /// Attribute that must be unique (within the parent, when nested).
    pub unique: Option<&'static str>,
    /// Accepted relationships and the kind each one points at.
    pub relations: &'static [(&'static str, &'static str)],
    pub required_relations: &'static [&'static str],
    pub parent: Option<&'static Kind>,
    pub defaults: fn() -> Map<String, Value>,
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn no_defaults() -> Map<String, Value> {
    Map::new()
}

fn item_type_defaults() -> Map<String, Value> {
    object(json!({
        "singleton": false,
        "sortable": false,
        "modular_block": false,
        "tree": false,
        "draft_mode_active": false,
        "ordering_direction": null,
        "all_locales_required": true,
        "hint": null,
    }))
}

fn field_defaults() -> Map<String, Value> {
    object(json!({
        "localized": false,
        "validators": {},
        "hint": null,
        "default_value": null,
        "appeareance": {"type": "default", "editor": "single_line", "parameters": {}},
    }))
}

fn deployment_defaults() -> Map<String, Value> {
    object(json!({
        "spider_enabled": false,
        "build_on_scheduled_publications": false,
        "deploy_status": "idle",
    }))
}

fn user_defaults() -> Map<String, Value> {
    object(json!({"is_active": false}))
}

pub static ITEM_TYPE: Kind = Kind {
    kind: "item_type",
    collection: "item-types",
    required: &["name", "api_key"],
    unique: Some("api_key"),
    relations: &[("ordering_field", "field"), ("title_field", "field")],
    required_relations: &[],
    parent: None,
    defaults: item_type_defaults,
};

pub static FIELD: Kind = Kind {
    kind: "field",
    collection: "fields",
    required: &["label", "api_key", "field_type"],
    unique: Some("api_key"),
    relations: &[],
    required_relations: &[],
    parent: Some(&ITEM_TYPE),
    defaults: field_defaults,
};

pub static ITEM: Kind = Kind {
    kind: "item",
    collection: "items",
    required: &[],
    unique: None,
    relations: &[("item_type", "item_type"), ("creator", "user")],
    required_relations: &["item_type"],
    parent: None,
    defaults: no_defaults,
};

pub static USER: Kind = Kind {
    kind: "user",
    collection: "users",
    required: &["email"],
    unique: Some("email"),
    relations: &[("role", "role")],
    required_relations: &["role"],
    parent: None,
    defaults: user_defaults,
};

pub static ROLE: Kind = Kind {
    kind: "role",
    collection: "roles",
    required: &["name"],
    unique: Some("name"),
    relations: &[],
    required_relations: &[],
    parent: None,
    defaults: no_defaults,
};

pub static MENU_ITEM: Kind = Kind {
    kind: "menu_item",
    collection: "menu-items",
    required: &["label"],
    unique: None,
    relations: &[
        ("item_type", "item_type"),
        ("parent", "menu_item"),
        ("children", "menu_item"),
    ],
    required_relations: &[],
    parent: None,
    defaults: no_defaults,
};

pub static DEPLOYMENT_ENVIRONMENT: Kind = Kind {
    kind: "deployment_environment",
    collection: "deployment-environments",
    required: &["name", "deploy_adapter"],
    unique: None,
    relations: &[],
    required_relations: &[],
    parent: None,
    defaults: deployment_defaults,
};

pub static UPLOAD: Kind = Kind {
    kind: "upload",
    collection: "uploads",
    required: &["path"],
    unique: Some("path"),
    relations: &[],
    required_relations: &[],
    parent: None,
    defaults: no_defaults,
};

pub static SITE: Kind = Kind {
    kind: "site",
    collection: "site",
    required: &[],
    unique: None,
    relations: &[("favicon", "upload")],
    required_relations: &[],
    parent: None,
    defaults: no_defaults,
};

/// Kinds served under `/{collection}` and `/{collection}/{id}`.
pub static COLLECTIONS: &[&Kind] = &[
    &ITEM_TYPE,
    &FIELD,
    &ITEM,
    &USER,
    &ROLE,
    &MENU_ITEM,
    &DEPLOYMENT_ENVIRONMENT,
    &UPLOAD,
];

/// A resource as stored and rendered; relationships keep their linkage form.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: Map<String, Value>,
}

impl Resource {
    /// Id referenced by a to-one relationship.
    pub fn related_id(&self, name: &str) -> Option<&str> {
        self.relationships
            .get(name)
            .and_then(|linkage| linkage.get("data"))
            .and_then(|data| data.get("id"))
            .and_then(Value::as_str)
    }
}

/// Incoming `{ "data": ... }` document.
#[derive(Debug, Deserialize)]
pub struct Document {
    pub data: Incoming,
}

#[derive(Debug, Deserialize)]
pub struct Incoming {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: Map<String, Value>,
}

pub struct Store {
    next_id: u64,
    records: HashMap<&'static str, BTreeMap<u64, Resource>>,
    site: Resource,
    files: HashMap<String, Vec<u8>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::seeded()
    }
}

impl Store {
    /// An empty site with one editor role, like a freshly created project.
    pub fn seeded() -> Self {
        let mut store = Self {
            next_id: 1,
            records: HashMap::new(),
            site: Resource {
                id: "1".to_string(),
                kind: "site".to_string(),
                attributes: object(json!({
                    "name": "Test site",
                    "locales": ["en"],
                    "timezone": "Europe/London",
                    "theme": {},
                    "no_index": false,
                    "global_seo": null,
                    "domain": null,
                    "internal_domain": "test-site.admin.datocms.com",
                })),
                relationships: object(json!({"favicon": {"data": null}})),
            },
            files: HashMap::new(),
        };
        let role = object(json!({"name": "Editor", "can_edit_site": true, "can_edit_schema": true}));
        let id = store.allocate_id();
        store.insert(&ROLE, id, role, Map::new());
        store
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert(
        &mut self,
        kind: &'static Kind,
        id: u64,
        attributes: Map<String, Value>,
        relationships: Map<String, Value>,
    ) -> Resource {
        let resource = Resource {
            id: id.to_string(),
            kind: kind.kind.to_string(),
            attributes,
            relationships,
        };
        self.records
            .entry(kind.kind)
            .or_default()
            .insert(id, resource.clone());
        resource
    }

    fn collection(&self, kind: &str) -> impl Iterator<Item = &Resource> {
        self.records.get(kind).into_iter().flat_map(|c| c.values())
    }

    fn get(&self, kind: &Kind, id: &str) -> Result<&Resource, ApiError> {
        let key: u64 = id.parse().map_err(|_| ApiError::NotFound)?;
        self.records
            .get(kind.kind)
            .and_then(|c| c.get(&key))
            .ok_or(ApiError::NotFound)
    }

    fn exists(&self, kind: &str, id: &str) -> bool {
        let Ok(key) = id.parse::<u64>() else {
            return false;
        };
        self.records.get(kind).is_some_and(|c| c.contains_key(&key))
    }

    /// Relationships computed from other records at read time.
    pub fn render(&self, resource: &Resource) -> Resource {
        let mut rendered = resource.clone();
        if resource.kind == ITEM_TYPE.kind {
            let fields: Vec<Value> = self
                .collection(FIELD.kind)
                .filter(|f| f.related_id("item_type") == Some(resource.id.as_str()))
                .map(|f| json!({"type": "field", "id": f.id}))
                .collect();
            rendered
                .relationships
                .insert("fields".to_string(), json!({ "data": fields }));
        }
        rendered
    }

    pub fn list(
        &self,
        kind: &'static Kind,
        parent_id: Option<&str>,
        query: &HashMap<String, String>,
    ) -> Result<Vec<Resource>, ApiError> {
        if let (Some(parent), Some(parent_id)) = (kind.parent, parent_id) {
            self.get(parent, parent_id)?;
        }
        let ids: Option<Vec<&str>> = query.get("filter[ids]").map(|ids| ids.split(',').collect());
        let item_type = query.get("filter[type]");

        Ok(self
            .collection(kind.kind)
            .filter(|r| match (kind.parent, parent_id) {
                (Some(parent), Some(parent_id)) => r.related_id(parent.kind) == Some(parent_id),
                _ => true,
            })
            .filter(|r| ids.as_ref().map_or(true, |ids| ids.contains(&r.id.as_str())))
            .filter(|r| item_type.map_or(true, |t| r.related_id("item_type") == Some(t.as_str())))
            .map(|r| self.render(r))
            .collect())
    }

    pub fn find(&self, kind: &'static Kind, id: &str) -> Result<Resource, ApiError> {
        self.get(kind, id).map(|r| self.render(r))
    }

    pub fn create(
        &mut self,
        kind: &'static Kind,
        parent_id: Option<&str>,
        incoming: Incoming,
    ) -> Result<Resource, ApiError> {
        if incoming.kind != kind.kind {
            return Err(ApiError::InvalidType {
                expected: kind.kind,
            });
        }
        let mut attributes = (kind.defaults)();
        attributes.extend(incoming.attributes);
        let mut relationships = incoming.relationships;

        if let Some(parent) = kind.parent {
            let parent_id = parent_id.ok_or(ApiError::NotFound)?;
            self.get(parent, parent_id)?;
            relationships.insert(
                parent.kind.to_string(),
                json!({"data": {"type": parent.kind, "id": parent_id}}),
            );
            if kind.kind == FIELD.kind && !attributes.contains_key("position") {
                let position = self
                    .collection(FIELD.kind)
                    .filter(|f| f.related_id(parent.kind) == Some(parent_id))
                    .count()
                    + 1;
                attributes.insert("position".to_string(), json!(position));
            }
        }

        let candidate = Resource {
            id: String::new(),
            kind: kind.kind.to_string(),
            attributes,
            relationships,
        };
        self.validate(kind, &candidate)?;

        let id = self.allocate_id();
        let created = self.insert(kind, id, candidate.attributes, candidate.relationships);
        Ok(self.render(&created))
    }

    pub fn update(&mut self, kind: &'static Kind, id: &str, incoming: Incoming) -> Result<Resource, ApiError> {
        if incoming.kind != kind.kind {
            return Err(ApiError::InvalidType {
                expected: kind.kind,
            });
        }
        let mut candidate = self.get(kind, id)?.clone();
        candidate.attributes.extend(incoming.attributes);
        for (name, linkage) in incoming.relationships {
            if kind.parent.is_some_and(|parent| parent.kind == name) {
                continue;
            }
            candidate.relationships.insert(name, linkage);
        }
        self.validate(kind, &candidate)?;

        let key: u64 = id.parse().map_err(|_| ApiError::NotFound)?;
        self.records
            .entry(kind.kind)
            .or_default()
            .insert(key, candidate.clone());
        Ok(self.render(&candidate))
    }

    /// Removes the record, and for item types every field and item of that type.
    pub fn destroy(&mut self, kind: &'static Kind, id: &str) -> Result<Resource, ApiError> {
        let rendered = self.find(kind, id)?;
        let key: u64 = id.parse().map_err(|_| ApiError::NotFound)?;
        if let Some(collection) = self.records.get_mut(kind.kind) {
            collection.remove(&key);
        }
        if kind.kind == ITEM_TYPE.kind {
            for dependent in [FIELD.kind, ITEM.kind] {
                if let Some(collection) = self.records.get_mut(dependent) {
                    collection.retain(|_, r| r.related_id("item_type") != Some(id));
                }
            }
        }
        Ok(rendered)
    }

    /// Copies an item type; the copy's api key gets the first free
    /// `_copy_<n>` suffix.
    pub fn duplicate(&mut self, kind: &'static Kind, id: &str) -> Result<Resource, ApiError> {
        let original = self.get(kind, id)?.clone();
        let mut attributes = original.attributes.clone();

        if let Some(unique) = kind.unique {
            let base = original
                .attributes
                .get(unique)
                .and_then(Value::as_str)
                .unwrap_or(kind.kind)
                .to_string();
            let taken: Vec<String> = self
                .collection(kind.kind)
                .filter_map(|r| r.attributes.get(unique).and_then(Value::as_str))
                .map(str::to_string)
                .collect();
            let mut n = 1;
            let copy = loop {
                let candidate = format!("{base}_copy_{n}");
                if !taken.contains(&candidate) {
                    break candidate;
                }
                n += 1;
            };
            attributes.insert(unique.to_string(), Value::String(copy));
        }
        if let Some(Value::String(name)) = attributes.get("name").cloned() {
            attributes.insert("name".to_string(), Value::String(format!("{name} (copy)")));
        }

        let new_id = self.allocate_id();
        let copy = self.insert(kind, new_id, attributes, original.relationships);
        Ok(self.render(&copy))
    }

    pub fn trigger(&mut self, kind: &'static Kind, id: &str) -> Result<(), ApiError> {
        let key: u64 = id.parse().map_err(|_| ApiError::NotFound)?;
        let record = self
            .records
            .get_mut(kind.kind)
            .and_then(|c| c.get_mut(&key))
            .ok_or(ApiError::NotFound)?;
        record
            .attributes
            .insert("deploy_status".to_string(), json!("pending"));
        Ok(())
    }

    pub fn site(&self) -> Resource {
        self.site.clone()
    }

    pub fn update_site(&mut self, incoming: Incoming) -> Result<Resource, ApiError> {
        if incoming.kind != SITE.kind {
            return Err(ApiError::InvalidType {
                expected: SITE.kind,
            });
        }
        let mut candidate = self.site.clone();
        candidate.attributes.extend(incoming.attributes);
        candidate.relationships.extend(incoming.relationships);
        self.validate(&SITE, &candidate)?;
        self.site = candidate;
        Ok(self.site.clone())
    }

    /// Reserve a storage key for `filename`; returns `(path, key)`.
    pub fn reserve_upload(&mut self, filename: &str) -> (String, String) {
        let n = self.allocate_id();
        let key = format!("{}/{n}-{filename}", self.site.id);
        (format!("/{key}"), key)
    }

    pub fn store_file(&mut self, key: &str, bytes: Vec<u8>) {
        self.files.insert(key.to_string(), bytes);
    }

    pub fn file(&self, key: &str) -> Option<&[u8]> {
        self.files.get(key).map(Vec::as_slice)
    }

    fn validate(&self, kind: &Kind, candidate: &Resource) -> Result<(), ApiError> {
        for name in kind.required {
            let present = match candidate.attributes.get(*name) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => !s.trim().is_empty(),
                Some(_) => true,
            };
            if !present {
                return Err(ApiError::invalid(name, "VALIDATION_REQUIRED"));
            }
        }

        if let Some(unique) = kind.unique {
            let value = candidate.attributes.get(unique);
            let scope = kind.parent.and_then(|p| candidate.related_id(p.kind));
            let clash = self.collection(kind.kind).any(|other| {
                other.id != candidate.id
                    && other.attributes.get(unique) == value
                    && kind.parent.map_or(true, |p| other.related_id(p.kind) == scope)
            });
            if clash {
                return Err(ApiError::invalid(unique, "VALIDATION_UNIQUENESS"));
            }
        }

        for name in kind.required_relations {
            if candidate.related_id(name).is_none() {
                return Err(ApiError::invalid(name, "VALIDATION_REQUIRED"));
            }
        }

        for (name, linkage) in &candidate.relationships {
            if kind.parent.is_some_and(|p| p.kind == name.as_str()) {
                continue;
            }
            let Some((_, target)) = kind.relations.iter().find(|(rel, _)| *rel == name.as_str()) else {
                return Err(ApiError::invalid(name, "VALIDATION_UNKNOWN_RELATIONSHIP"));
            };
            let refs: Vec<&Value> = match linkage.get("data") {
                Some(Value::Array(refs)) => refs.iter().collect(),
                Some(Value::Null) | None => Vec::new(),
                Some(single) => vec![single],
            };
            for reference in refs {
                let id = reference.get("id").and_then(Value::as_str).unwrap_or_default();
                let matches_type = reference.get("type").and_then(Value::as_str) == Some(*target);
                if !matches_type || !self.exists(target, id) {
                    return Err(ApiError::invalid(name, "VALIDATION_INVALID_RELATIONSHIP"));
                }
            }
        }
        Ok(())
    }
}
