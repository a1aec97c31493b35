//! Synchronous client for the DatoCMS site API.
//!
//! # Overview
//! Exposes each site resource (item types, fields, items, users, roles, menu
//! items, deployment environments, uploads, site settings) as CRUD operations
//! over JSON:API, plus helpers for uploading files.
//!
//! # Design
//! - `ResourceDescriptor` statics describe each resource kind; one generic
//!   `ResourceClient` serves them all.
//! - Every operation is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_*` (consumes an `HttpResponse`), joined by a single
//!   `Transport::execute` call. `UreqTransport` is the default transport.
//! - Errors map 404 to `NotFound`, 422 to `Validation`, and pass any other
//!   failure through. Misuse caught locally is a `Configuration` error and
//!   never reaches the network.
//!
//! ```no_run
//! use dato_core::{ClientConfig, Filters, SiteClient};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), dato_core::ClientError> {
//! let client = SiteClient::new(&ClientConfig::new("api-token"))?;
//! let input = json!({"name": "Article", "api_key": "article"});
//! let article = client.item_types().create(input.as_object().unwrap(), None)?;
//! let fields = client.fields().all(&Filters::new(), Some(&article.id))?;
//! # let _ = fields;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod field_type;
pub mod http;
pub mod resource;
pub mod transport;
pub mod upload;

pub use client::SiteClient;
pub use config::ClientConfig;
pub use descriptor::{Action, Cardinality, Relationship, ResourceDescriptor};
pub use envelope::{Entity, Fields};
pub use error::{ClientError, ConfigurationError, FieldError};
pub use http::{Body, HttpMethod, HttpRequest, HttpResponse};
pub use resource::{Filters, ResourceClient, SingletonClient};
pub use transport::{Transport, UreqTransport};
pub use upload::{UploadedFile, Uploader};
