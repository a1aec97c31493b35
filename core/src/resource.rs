//! Generic CRUD client driven by a `ResourceDescriptor`.
//!
//! # Design
//! As with the rest of the crate, each operation is split into a pure
//! `build_*` method that produces an `HttpRequest` and a pure `parse_*`
//! method that consumes an `HttpResponse`. The public operation (`find`,
//! `create`, ...) runs `build`, one `Transport::execute`, then `parse`.
//! Nothing is cached between calls.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::descriptor::{Action, ResourceDescriptor};
use crate::envelope::{self, Entity, Fields};
use crate::error::{parse_field_errors, ClientError, ConfigurationError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Query-string filters for listings, forwarded verbatim in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(Vec<(String, String)>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    /// `filter[type]=<item type id>`, the usual filter for items.
    pub fn item_type(item_type_id: &str) -> Self {
        Self::new().with("filter[type]", item_type_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn to_query(&self) -> Vec<(String, String)> {
        self.0.clone()
    }
}

/// CRUD façade for one resource kind.
#[derive(Clone)]
pub struct ResourceClient {
    descriptor: &'static ResourceDescriptor,
    transport: Arc<dyn Transport>,
}

impl ResourceClient {
    pub fn new(descriptor: &'static ResourceDescriptor, transport: Arc<dyn Transport>) -> Self {
        Self {
            descriptor,
            transport,
        }
    }

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.descriptor
    }

    // -- operations ---------------------------------------------------------

    pub fn all(&self, filters: &Filters, parent_id: Option<&str>) -> Result<Vec<Entity>, ClientError> {
        let request = self.build_all(filters, parent_id)?;
        self.parse_all(self.send(&request)?)
    }

    pub fn find(&self, id: &str) -> Result<Entity, ClientError> {
        let request = self.build_find(id);
        self.parse_entity(self.send(&request)?)
    }

    pub fn create(&self, fields: &Fields, parent_id: Option<&str>) -> Result<Entity, ClientError> {
        let request = self.build_create(fields, parent_id)?;
        self.parse_entity(self.send(&request)?)
    }

    pub fn update(&self, id: &str, fields: &Fields) -> Result<Entity, ClientError> {
        let request = self.build_update(id, fields)?;
        self.parse_entity(self.send(&request)?)
    }

    /// Returns the entity as it was before deletion.
    pub fn destroy(&self, id: &str) -> Result<Entity, ClientError> {
        let request = self.build_destroy(id);
        self.parse_entity(self.send(&request)?)
    }

    /// Server-side copy. Identifying fields of the copy (e.g. `api_key`) are
    /// chosen by the server and returned untouched.
    pub fn duplicate(&self, id: &str) -> Result<Entity, ClientError> {
        let request = self.build_duplicate(id)?;
        self.parse_entity(self.send(&request)?)
    }

    pub fn trigger(&self, id: &str) -> Result<(), ClientError> {
        let request = self.build_trigger(id)?;
        self.parse_empty(self.send(&request)?)
    }

    // -- request builders ---------------------------------------------------

    pub fn build_all(&self, filters: &Filters, parent_id: Option<&str>) -> Result<HttpRequest, ClientError> {
        let path = self.collection_path(parent_id)?;
        Ok(HttpRequest::new(HttpMethod::Get, path).with_query(filters.to_query()))
    }

    pub fn build_find(&self, id: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.descriptor.member_path(id))
    }

    pub fn build_create(&self, fields: &Fields, parent_id: Option<&str>) -> Result<HttpRequest, ClientError> {
        let path = self.collection_path(parent_id)?;
        let body = envelope::build_envelope(self.descriptor, None, fields)?;
        Ok(HttpRequest::new(HttpMethod::Post, path).with_json(body))
    }

    pub fn build_update(&self, id: &str, fields: &Fields) -> Result<HttpRequest, ClientError> {
        let body = envelope::build_envelope(self.descriptor, Some(id), fields)?;
        Ok(HttpRequest::new(HttpMethod::Put, self.descriptor.member_path(id)).with_json(body))
    }

    pub fn build_destroy(&self, id: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Delete, self.descriptor.member_path(id))
    }

    pub fn build_duplicate(&self, id: &str) -> Result<HttpRequest, ClientError> {
        self.action_request(Action::Duplicate, id)
    }

    pub fn build_trigger(&self, id: &str) -> Result<HttpRequest, ClientError> {
        self.action_request(Action::Trigger, id)
    }

    fn action_request(&self, action: Action, id: &str) -> Result<HttpRequest, ClientError> {
        if !self.descriptor.supports(action) {
            return Err(ConfigurationError::UnsupportedAction {
                resource: self.descriptor.kind,
                action: action.as_str(),
            }
            .into());
        }
        let path = format!("{}/{}", self.descriptor.member_path(id), action.as_str());
        Ok(HttpRequest::new(HttpMethod::Post, path))
    }

    fn collection_path(&self, parent_id: Option<&str>) -> Result<String, ClientError> {
        let resource = self.descriptor.kind;
        match (self.descriptor.nested_under, parent_id) {
            (Some(_), None | Some("")) => {
                return Err(ConfigurationError::MissingParentId { resource }.into())
            }
            (None, Some(_)) => return Err(ConfigurationError::UnexpectedParentId { resource }.into()),
            _ => {}
        }
        Ok(self.descriptor.collection_path(parent_id))
    }

    // -- response parsers ---------------------------------------------------

    pub fn parse_all(&self, response: HttpResponse) -> Result<Vec<Entity>, ClientError> {
        check_status(&response)?;
        envelope::parse_collection(&response.body)
    }

    pub fn parse_entity(&self, response: HttpResponse) -> Result<Entity, ClientError> {
        check_status(&response)?;
        envelope::parse_entity(&response.body)
    }

    pub fn parse_empty(&self, response: HttpResponse) -> Result<(), ClientError> {
        check_status(&response)
    }

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        send(self.transport.as_ref(), self.descriptor.kind, request)
    }
}

/// Client for a resource with exactly one instance and no id in its path.
#[derive(Clone)]
pub struct SingletonClient {
    inner: ResourceClient,
}

impl SingletonClient {
    pub fn new(descriptor: &'static ResourceDescriptor, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: ResourceClient::new(descriptor, transport),
        }
    }

    pub fn find(&self) -> Result<Entity, ClientError> {
        let request = self.build_find();
        self.inner.parse_entity(self.inner.send(&request)?)
    }

    pub fn update(&self, fields: &Fields) -> Result<Entity, ClientError> {
        let request = self.build_update(fields)?;
        self.inner.parse_entity(self.inner.send(&request)?)
    }

    pub fn build_find(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.path())
    }

    pub fn build_update(&self, fields: &Fields) -> Result<HttpRequest, ClientError> {
        let id = fields.get("id").and_then(|v| v.as_str());
        let body = envelope::build_envelope(self.inner.descriptor, id, fields)?;
        Ok(HttpRequest::new(HttpMethod::Put, self.path()).with_json(body))
    }

    fn path(&self) -> String {
        format!("/{}", self.inner.descriptor.collection)
    }
}

pub(crate) fn send(
    transport: &dyn Transport,
    resource: &'static str,
    request: &HttpRequest,
) -> Result<HttpResponse, ClientError> {
    debug!(resource, method = %request.method, path = %request.path, "sending request");
    let response = transport.execute(request)?;
    if response.is_success() {
        debug!(resource, status = response.status, "request succeeded");
    } else {
        warn!(resource, status = response.status, path = %request.path, "request failed");
    }
    Ok(response)
}

/// Map non-success status codes to the appropriate `ClientError` variant.
pub(crate) fn check_status(response: &HttpResponse) -> Result<(), ClientError> {
    if response.is_success() {
        return Ok(());
    }
    let body = response.text().into_owned();
    match response.status {
        404 => Err(ClientError::NotFound {
            status: response.status,
            body,
        }),
        422 => Err(ClientError::Validation {
            status: response.status,
            errors: parse_field_errors(&body),
            body,
        }),
        status => Err(ClientError::Http { status, body }),
    }
}
