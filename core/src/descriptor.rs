//! Static per-resource metadata.
//!
//! # Design
//! A `ResourceDescriptor` is the only thing that differs between resource
//! kinds. `ResourceClient` reads it to decide paths, which input keys become
//! attributes or relationship references, and which extra actions are
//! allowed. Descriptors are `static` and shared by every client instance.

/// Whether a relationship points at one entity or a list of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// A named relationship and the JSON:API type it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub name: &'static str,
    pub target: &'static str,
    pub cardinality: Cardinality,
}

const fn one(name: &'static str, target: &'static str) -> Relationship {
    Relationship {
        name,
        target,
        cardinality: Cardinality::One,
    }
}

/// Server-side actions beyond plain CRUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Duplicate,
    Trigger,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Duplicate => "duplicate",
            Action::Trigger => "trigger",
        }
    }
}

/// Declarative description of one resource kind.
#[derive(Debug)]
pub struct ResourceDescriptor {
    /// JSON:API `type`.
    pub kind: &'static str,
    /// Collection path segment, e.g. `item-types`.
    pub collection: &'static str,
    /// Writable plain attributes.
    pub attributes: &'static [&'static str],
    pub relationships: &'static [Relationship],
    /// Names the server returns but never accepts; dropped from outgoing
    /// envelopes.
    pub read_only: &'static [&'static str],
    /// Parent resource whose member path prefixes listing and creation.
    pub nested_under: Option<&'static ResourceDescriptor>,
    /// Undeclared keys are sent as attributes instead of being rejected.
    pub free_form: bool,
    pub actions: &'static [Action],
}

impl ResourceDescriptor {
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn is_attribute(&self, name: &str) -> bool {
        self.attributes.contains(&name)
    }

    pub fn is_read_only(&self, name: &str) -> bool {
        self.read_only.contains(&name)
    }

    pub fn supports(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    /// `/{collection}`, or `/{parent}/{parent_id}/{collection}` when nested.
    /// Ids are percent-encoded so they always stay a single path segment.
    pub fn collection_path(&self, parent_id: Option<&str>) -> String {
        match (self.nested_under, parent_id) {
            (Some(parent), Some(parent_id)) => format!(
                "/{}/{}/{}",
                parent.collection,
                urlencoding::encode(parent_id),
                self.collection
            ),
            _ => format!("/{}", self.collection),
        }
    }

    pub fn member_path(&self, id: &str) -> String {
        format!("/{}/{}", self.collection, urlencoding::encode(id))
    }
}

pub static ITEM_TYPE: ResourceDescriptor = ResourceDescriptor {
    kind: "item_type",
    collection: "item-types",
    attributes: &[
        "name",
        "api_key",
        "singleton",
        "sortable",
        "modular_block",
        "tree",
        "draft_mode_active",
        "ordering_direction",
        "all_locales_required",
        "collection_appeareance",
        "hint",
    ],
    relationships: &[one("ordering_field", "field"), one("title_field", "field")],
    read_only: &["fields", "singleton_item"],
    nested_under: None,
    free_form: false,
    actions: &[Action::Duplicate],
};

pub static FIELD: ResourceDescriptor = ResourceDescriptor {
    kind: "field",
    collection: "fields",
    attributes: &[
        "label",
        "field_type",
        "api_key",
        "hint",
        "localized",
        "validators",
        "position",
        "appeareance",
        "default_value",
    ],
    relationships: &[],
    read_only: &["item_type"],
    nested_under: Some(&ITEM_TYPE),
    free_form: false,
    actions: &[],
};

pub static ITEM: ResourceDescriptor = ResourceDescriptor {
    kind: "item",
    collection: "items",
    attributes: &[],
    relationships: &[one("item_type", "item_type"), one("creator", "user")],
    read_only: &["updated_at", "created_at", "is_valid"],
    nested_under: None,
    free_form: true,
    actions: &[],
};

pub static USER: ResourceDescriptor = ResourceDescriptor {
    kind: "user",
    collection: "users",
    attributes: &["email", "first_name", "last_name"],
    relationships: &[one("role", "role")],
    read_only: &["is_active"],
    nested_under: None,
    free_form: false,
    actions: &[],
};

pub static ROLE: ResourceDescriptor = ResourceDescriptor {
    kind: "role",
    collection: "roles",
    attributes: &[
        "name",
        "can_edit_site",
        "can_edit_schema",
        "can_manage_users",
        "can_edit_favicon",
        "can_publish_to_production",
    ],
    relationships: &[],
    read_only: &[],
    nested_under: None,
    free_form: false,
    actions: &[],
};

pub static MENU_ITEM: ResourceDescriptor = ResourceDescriptor {
    kind: "menu_item",
    collection: "menu-items",
    attributes: &["label", "position", "external_url"],
    relationships: &[
        one("item_type", "item_type"),
        one("parent", "menu_item"),
        Relationship {
            name: "children",
            target: "menu_item",
            cardinality: Cardinality::Many,
        },
    ],
    read_only: &[],
    nested_under: None,
    free_form: false,
    actions: &[],
};

pub static DEPLOYMENT_ENVIRONMENT: ResourceDescriptor = ResourceDescriptor {
    kind: "deployment_environment",
    collection: "deployment-environments",
    attributes: &[
        "name",
        "access_policy",
        "deploy_adapter",
        "deploy_settings",
        "frontend_url",
        "spider_enabled",
        "build_on_scheduled_publications",
    ],
    relationships: &[],
    read_only: &["deploy_status", "last_deploy_completed_at"],
    nested_under: None,
    free_form: false,
    actions: &[Action::Trigger],
};

pub static UPLOAD: ResourceDescriptor = ResourceDescriptor {
    kind: "upload",
    collection: "uploads",
    attributes: &[
        "path", "size", "width", "height", "format", "alt", "title", "author", "copyright",
        "notes",
    ],
    relationships: &[],
    read_only: &["url", "is_image"],
    nested_under: None,
    free_form: false,
    actions: &[],
};

pub static SITE: ResourceDescriptor = ResourceDescriptor {
    kind: "site",
    collection: "site",
    attributes: &[
        "name",
        "locales",
        "theme",
        "domain",
        "internal_domain",
        "timezone",
        "no_index",
        "global_seo",
        "frontend_url",
        "ssg",
    ],
    relationships: &[one("favicon", "upload")],
    read_only: &["readwrite_token", "read_only_token", "item_types", "menu_items"],
    nested_under: None,
    free_form: false,
    actions: &[],
};

pub static UPLOAD_REQUEST: ResourceDescriptor = ResourceDescriptor {
    kind: "upload_request",
    collection: "upload-requests",
    attributes: &["filename"],
    relationships: &[],
    read_only: &["url"],
    nested_under: None,
    free_form: false,
    actions: &[],
};
