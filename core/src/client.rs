//! Top-level site API client.
//!
//! # Design
//! `SiteClient` owns a single `Arc<dyn Transport>` and hands a clone of it to
//! one `ResourceClient` per resource kind. It holds no other state, so it can
//! live for the whole process and be shared across threads.

use std::path::Path;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::descriptor::{
    ResourceDescriptor, DEPLOYMENT_ENVIRONMENT, FIELD, ITEM, ITEM_TYPE, MENU_ITEM, ROLE, SITE,
    UPLOAD, USER,
};
use crate::error::ClientError;
use crate::resource::{ResourceClient, SingletonClient};
use crate::transport::{Transport, UreqTransport};
use crate::upload::{UploadedFile, Uploader};

#[derive(Clone)]
pub struct SiteClient {
    item_types: ResourceClient,
    fields: ResourceClient,
    items: ResourceClient,
    users: ResourceClient,
    roles: ResourceClient,
    menu_items: ResourceClient,
    deployment_environments: ResourceClient,
    uploads: ResourceClient,
    site: SingletonClient,
    uploader: Uploader,
}

impl SiteClient {
    /// Connect with the default `ureq` transport.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = UreqTransport::new(config)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        let resource = |descriptor: &'static ResourceDescriptor| {
            ResourceClient::new(descriptor, Arc::clone(&transport))
        };
        Self {
            item_types: resource(&ITEM_TYPE),
            fields: resource(&FIELD),
            items: resource(&ITEM),
            users: resource(&USER),
            roles: resource(&ROLE),
            menu_items: resource(&MENU_ITEM),
            deployment_environments: resource(&DEPLOYMENT_ENVIRONMENT),
            uploads: resource(&UPLOAD),
            site: SingletonClient::new(&SITE, Arc::clone(&transport)),
            uploader: Uploader::new(Arc::clone(&transport)),
        }
    }

    pub fn item_types(&self) -> &ResourceClient {
        &self.item_types
    }

    /// Nested under item types: listing and creation take the item type id.
    pub fn fields(&self) -> &ResourceClient {
        &self.fields
    }

    pub fn items(&self) -> &ResourceClient {
        &self.items
    }

    pub fn users(&self) -> &ResourceClient {
        &self.users
    }

    pub fn roles(&self) -> &ResourceClient {
        &self.roles
    }

    pub fn menu_items(&self) -> &ResourceClient {
        &self.menu_items
    }

    pub fn deployment_environments(&self) -> &ResourceClient {
        &self.deployment_environments
    }

    pub fn uploads(&self) -> &ResourceClient {
        &self.uploads
    }

    pub fn site(&self) -> &SingletonClient {
        &self.site
    }

    pub fn upload_file(&self, path: impl AsRef<Path>) -> Result<UploadedFile, ClientError> {
        self.uploader.upload_file(path)
    }

    pub fn upload_image(&self, url: &str) -> Result<UploadedFile, ClientError> {
        self.uploader.upload_image(url)
    }
}
