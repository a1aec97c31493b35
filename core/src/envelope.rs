//! JSON:API envelope building and flattening.
//!
//! # Design
//! Callers work with flat `Fields` maps (`{"name": "Article", "role": "3"}`).
//! On the way out the descriptor splits the map into `attributes` and
//! `relationships`; on the way in relationships are flattened back to ids so
//! an `Entity` can be merged with changes and sent straight back.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::descriptor::{Cardinality, Relationship, ResourceDescriptor};
use crate::error::{ClientError, ConfigurationError};

/// Flat attribute/relationship map supplied by callers.
pub type Fields = Map<String, Value>;

/// One resource instance as returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: String,
    pub kind: String,
    pub fields: Fields,
}

impl Entity {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Fields plus `id`, ready to be modified and passed to `update`.
    pub fn to_fields(&self) -> Fields {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        fields
    }

    /// `to_fields` with `changes` applied on top.
    pub fn merge(&self, changes: Fields) -> Fields {
        let mut fields = self.to_fields();
        fields.extend(changes);
        fields
    }
}

#[derive(Serialize)]
struct OutgoingDocument<'a> {
    data: OutgoingResource<'a>,
}

#[derive(Serialize)]
struct OutgoingResource<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    relationships: Map<String, Value>,
}

/// Build the request body for create (`id == None`) or update.
///
/// Every key is checked against the descriptor before anything is
/// serialized, so a bad name never reaches the network.
pub fn build_envelope(
    descriptor: &ResourceDescriptor,
    id: Option<&str>,
    fields: &Fields,
) -> Result<String, ClientError> {
    let mut attributes = Map::new();
    let mut relationships = Map::new();

    for (name, value) in fields {
        if name == "id" || descriptor.is_read_only(name) {
            continue;
        }
        if let Some(rel) = descriptor.relationship(name) {
            relationships.insert(name.clone(), relationship_linkage(descriptor, rel, value)?);
        } else if descriptor.is_attribute(name) || descriptor.free_form {
            attributes.insert(name.clone(), value.clone());
        } else {
            return Err(ConfigurationError::UnknownField {
                resource: descriptor.kind,
                name: name.clone(),
            }
            .into());
        }
    }

    let doc = OutgoingDocument {
        data: OutgoingResource {
            kind: descriptor.kind,
            id,
            attributes,
            relationships,
        },
    };
    serde_json::to_string(&doc).map_err(|e| ClientError::Serialization(e.to_string()))
}

fn relationship_linkage(
    descriptor: &ResourceDescriptor,
    rel: &Relationship,
    value: &Value,
) -> Result<Value, ClientError> {
    let invalid = |reason: &str| -> ClientError {
        ConfigurationError::InvalidPayload {
            resource: descriptor.kind,
            name: rel.name.to_string(),
            reason: reason.to_string(),
        }
        .into()
    };

    let data = match (rel.cardinality, value) {
        (_, Value::Null) => Value::Null,
        (Cardinality::Many, Value::Array(ids)) => Value::Array(
            ids.iter()
                .map(|id| reference(rel.target, id).ok_or_else(|| invalid("expected a list of ids")))
                .collect::<Result<Vec<_>, ClientError>>()?,
        ),
        (Cardinality::One, other) => {
            reference(rel.target, other).ok_or_else(|| invalid("expected an id or null"))?
        }
        (Cardinality::Many, _) => return Err(invalid("expected a list of ids")),
    };
    Ok(json!({ "data": data }))
}

/// `{type, id}` reference for an id given as a string, number or an already
/// shaped reference object.
fn reference(target: &str, id: &Value) -> Option<Value> {
    let id = match id {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(obj) => obj.get("id").and_then(Value::as_str)?.to_string(),
        _ => return None,
    };
    Some(json!({ "type": target, "id": id }))
}

#[derive(Deserialize)]
struct IncomingResource {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    relationships: Map<String, Value>,
}

impl From<IncomingResource> for Entity {
    fn from(resource: IncomingResource) -> Self {
        let mut fields = resource.attributes;
        for (name, linkage) in resource.relationships {
            // links-only relationships carry no linkage to send back
            if let Some(value) = flatten_linkage(&linkage) {
                fields.insert(name, value);
            }
        }
        Entity {
            id: resource.id,
            kind: resource.kind,
            fields,
        }
    }
}

fn flatten_linkage(linkage: &Value) -> Option<Value> {
    let flat = match linkage.get("data")? {
        Value::Array(refs) => Value::Array(refs.iter().map(reference_id).collect()),
        link @ Value::Object(_) => reference_id(link),
        _ => Value::Null,
    };
    Some(flat)
}

fn reference_id(reference: &Value) -> Value {
    reference.get("id").cloned().unwrap_or(Value::Null)
}

#[derive(Deserialize)]
struct SingleDocument {
    data: IncomingResource,
}

#[derive(Deserialize)]
struct CollectionDocument {
    data: Vec<IncomingResource>,
}

pub fn parse_entity(body: &[u8]) -> Result<Entity, ClientError> {
    let doc: SingleDocument =
        serde_json::from_slice(body).map_err(|e| ClientError::Deserialization(e.to_string()))?;
    Ok(doc.data.into())
}

pub fn parse_collection(body: &[u8]) -> Result<Vec<Entity>, ClientError> {
    let doc: CollectionDocument =
        serde_json::from_slice(body).map_err(|e| ClientError::Deserialization(e.to_string()))?;
    Ok(doc.data.into_iter().map(Entity::from).collect())
}
