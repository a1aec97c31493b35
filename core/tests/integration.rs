//! Site API scenarios against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `SiteClient` over
//! real HTTP with the default `UreqTransport`. Each test gets its own server
//! so the in-memory store starts empty (apart from the seeded role and site).

use std::io::Write;

use dato_core::{ClientConfig, ClientError, Entity, Fields, Filters, SiteClient};
use serde_json::{json, Value};

fn start_server() -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client_with_addr() -> (SiteClient, std::net::SocketAddr) {
    let addr = start_server();
    let config = ClientConfig::new("readwrite-token")
        .with_base_url(&format!("http://{addr}"))
        .with_header("X-Foo", "Bar");
    (SiteClient::new(&config).unwrap(), addr)
}

fn client() -> SiteClient {
    client_with_addr().0
}

fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

fn article_attributes() -> Fields {
    fields(json!({
        "name": "Article",
        "singleton": false,
        "modular_block": false,
        "sortable": false,
        "tree": false,
        "draft_mode_active": false,
        "api_key": "article",
        "ordering_direction": null,
        "ordering_field": null,
        "all_locales_required": true,
        "title_field": null
    }))
}

fn create_article(client: &SiteClient) -> Entity {
    client.item_types().create(&article_attributes(), None).unwrap()
}

#[test]
fn find_missing_item_type_is_not_found() {
    let client = client();
    let err = client.item_types().find("44").unwrap_err();
    match err {
        ClientError::NotFound { status, .. } => assert_eq!(status, 404),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn item_types_fetch_create_update_duplicate_destroy() {
    let client = client();
    let item_types = client.item_types();
    let none = Filters::new();

    // Step 1: create, server fills in defaults and relationships.
    let created = create_article(&client);
    assert_eq!(created.get_str("api_key"), Some("article"));
    assert_eq!(created.get("fields"), Some(&json!([])));
    assert_eq!(item_types.all(&none, None).unwrap().len(), 1);

    // Step 2: attributes round-trip through find.
    let fetched = item_types.find(&created.id).unwrap();
    for (name, value) in article_attributes() {
        assert_eq!(fetched.get(&name), Some(&value), "attribute {name}");
    }

    // Step 3: update from the fetched entity merged with changes.
    item_types
        .update(
            &created.id,
            &created.merge(fields(json!({"name": "Post", "api_key": "post"}))),
        )
        .unwrap();
    let fetched = item_types.find(&created.id).unwrap();
    assert_eq!(fetched.get_str("api_key"), Some("post"));
    assert_eq!(fetched.get_str("name"), Some("Post"));

    // Step 4: duplicate, the server picks the copy's api key.
    let duplicate = item_types.duplicate(&created.id).unwrap();
    assert_ne!(duplicate.id, created.id);
    let copy = item_types.find(&duplicate.id).unwrap();
    assert_eq!(copy.get_str("api_key"), Some("post_copy_1"));

    // Step 5: destroy the original; only the copy remains.
    item_types.destroy(&created.id).unwrap();
    assert_eq!(item_types.all(&none, None).unwrap().len(), 1);

    // Step 6: a second destroy and a find both report NotFound.
    assert!(matches!(
        item_types.destroy(&created.id).unwrap_err(),
        ClientError::NotFound { .. }
    ));
    assert!(matches!(
        item_types.find(&created.id).unwrap_err(),
        ClientError::NotFound { .. }
    ));
}

#[test]
fn partial_update_leaves_other_attributes_untouched() {
    let client = client();
    let created = create_article(&client);

    client
        .item_types()
        .update(&created.id, &fields(json!({"sortable": true})))
        .unwrap();

    let fetched = client.item_types().find(&created.id).unwrap();
    assert_eq!(fetched.get("sortable"), Some(&json!(true)));
    assert_eq!(fetched.get_str("name"), Some("Article"));
    assert_eq!(fetched.get_str("api_key"), Some("article"));
    assert_eq!(fetched.get("all_locales_required"), Some(&json!(true)));
}

#[test]
fn duplicate_api_key_is_a_validation_error() {
    let client = client();
    create_article(&client);

    let err = client
        .item_types()
        .create(&article_attributes(), None)
        .unwrap_err();
    match err {
        ClientError::Validation { status, errors, .. } => {
            assert_eq!(status, 422);
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field.as_deref(), Some("api_key"));
            assert_eq!(errors[0].code, "VALIDATION_UNIQUENESS");
        }
        other => panic!("expected Validation, got {other:?}"),
    }
    assert_eq!(client.item_types().all(&Filters::new(), None).unwrap().len(), 1);
}

#[test]
fn fields_are_nested_under_item_types() {
    let client = client();
    let item_type = create_article(&client);
    let none = Filters::new();

    let field = client
        .fields()
        .create(
            &fields(json!({
                "api_key": "title",
                "field_type": "string",
                "label": "Title",
                "validators": {"required": {}}
            })),
            Some(&item_type.id),
        )
        .unwrap();
    assert_eq!(field.get_str("item_type"), Some(item_type.id.as_str()));
    assert_eq!(client.fields().all(&none, Some(&item_type.id)).unwrap().len(), 1);

    // The server-chosen appearance is sent back, minus one key.
    let mut appearance = field.get("appeareance").cloned().unwrap();
    appearance.as_object_mut().unwrap().remove("type");
    client
        .fields()
        .update(
            &field.id,
            &field.merge(fields(json!({"label": "Article title", "appeareance": appearance}))),
        )
        .unwrap();
    assert_eq!(
        client.fields().find(&field.id).unwrap().get_str("label"),
        Some("Article title")
    );

    client.fields().destroy(&field.id).unwrap();
    assert!(client.fields().all(&none, Some(&item_type.id)).unwrap().is_empty());

    assert!(matches!(
        client.fields().all(&none, Some("9999")).unwrap_err(),
        ClientError::NotFound { .. }
    ));
}

#[test]
fn items_with_uploaded_files() {
    let (client, addr) = client_with_addr();
    let item_type = create_article(&client);
    for (api_key, field_type) in [("title", "string"), ("image", "file"), ("file", "file")] {
        client
            .fields()
            .create(
                &fields(json!({"api_key": api_key, "field_type": field_type, "label": api_key})),
                Some(&item_type.id),
            )
            .unwrap();
    }

    let mut local = std::env::temp_dir();
    local.push(format!("dato-core-upload-{}.txt", std::process::id()));
    std::fs::File::create(&local)
        .unwrap()
        .write_all(b"hello from a file")
        .unwrap();
    let file = client.upload_file(&local).unwrap();
    std::fs::remove_file(&local).unwrap();
    assert_eq!(file.size, 17);
    assert!(file.path.ends_with(".txt"));

    // Re-upload the stored bytes as an "image" fetched by URL.
    let storage_url = format!("http://{addr}/storage{}", file.path);
    let image = client.upload_image(&storage_url).unwrap();
    assert_eq!(image.size, 17);
    assert_ne!(image.path, file.path);

    let by_type = Filters::item_type(&item_type.id);
    let item = client
        .items()
        .create(
            &fields(json!({
                "item_type": item_type.id,
                "title": "First post",
                "image": image.path,
                "file": file.path
            })),
            None,
        )
        .unwrap();
    assert_eq!(item.get_str("item_type"), Some(item_type.id.as_str()));
    assert_eq!(client.items().all(&by_type, None).unwrap().len(), 1);

    client
        .items()
        .update(&item.id, &item.merge(fields(json!({"title": "Welcome!"}))))
        .unwrap();
    assert_eq!(
        client.items().find(&item.id).unwrap().get_str("title"),
        Some("Welcome!")
    );

    client.items().destroy(&item.id).unwrap();
    assert!(client.items().all(&by_type, None).unwrap().is_empty());
}

#[test]
fn menu_items_with_parents() {
    let client = client();
    let item_type = create_article(&client);
    let none = Filters::new();

    let parent = client
        .menu_items()
        .create(
            &fields(json!({"label": "Parent", "position": 99, "item_type": null})),
            None,
        )
        .unwrap();
    let child = client
        .menu_items()
        .create(
            &fields(json!({
                "label": "Articles",
                "position": 99,
                "parent": parent.id,
                "item_type": item_type.id
            })),
            None,
        )
        .unwrap();
    assert_eq!(child.get_str("parent"), Some(parent.id.as_str()));

    client
        .menu_items()
        .update(&child.id, &child.merge(fields(json!({"label": "Manage articles"}))))
        .unwrap();
    assert_eq!(client.menu_items().all(&none, None).unwrap().len(), 2);
    assert_eq!(
        client.menu_items().find(&child.id).unwrap().get_str("label"),
        Some("Manage articles")
    );

    client.menu_items().destroy(&child.id).unwrap();
    assert_eq!(client.menu_items().all(&none, None).unwrap().len(), 1);
}

#[test]
fn deployment_environments_create_and_trigger() {
    let client = client();
    let env = client
        .deployment_environments()
        .create(
            &fields(json!({
                "access_policy": null,
                "deploy_adapter": "custom",
                "spider_enabled": false,
                "build_on_scheduled_publications": false,
                "deploy_settings": {"trigger_url": "https://www.google.com"},
                "frontend_url": null,
                "name": "Foo"
            })),
            None,
        )
        .unwrap();
    assert_eq!(
        client
            .deployment_environments()
            .all(&Filters::new(), None)
            .unwrap()
            .len(),
        1
    );

    client.deployment_environments().trigger(&env.id).unwrap();
    assert!(matches!(
        client.deployment_environments().trigger("9999").unwrap_err(),
        ClientError::NotFound { .. }
    ));
}

#[test]
fn users_fetch_create_destroy() {
    let client = client();
    let role = client.roles().all(&Filters::new(), None).unwrap().remove(0);

    let user = client
        .users()
        .create(
            &fields(json!({
                "email": "foo@bar.it",
                "first_name": "Foo",
                "last_name": "Bar",
                "role": role.id
            })),
            None,
        )
        .unwrap();
    assert_eq!(client.users().all(&Filters::new(), None).unwrap().len(), 1);
    assert_eq!(
        client.users().find(&user.id).unwrap().get_str("first_name"),
        Some("Foo")
    );

    client.users().destroy(&user.id).unwrap();
    assert!(client.users().all(&Filters::new(), None).unwrap().is_empty());
}

#[test]
fn site_fetch_update() {
    let client = client();
    let site = client.site().find().unwrap();
    client
        .site()
        .update(&site.merge(fields(json!({"name": "My Blog"}))))
        .unwrap();
    assert_eq!(client.site().find().unwrap().get_str("name"), Some("My Blog"));
}

#[test]
fn create_then_destroy_restores_listing_size() {
    let client = client();
    let none = Filters::new();
    let before = client.item_types().all(&none, None).unwrap().len();

    let created = create_article(&client);
    assert_eq!(client.item_types().all(&none, None).unwrap().len(), before + 1);

    client.item_types().destroy(&created.id).unwrap();
    assert_eq!(client.item_types().all(&none, None).unwrap().len(), before);
}

#[test]
fn unreachable_server_is_a_network_error() {
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let closed_addr = closed.local_addr().unwrap();
    drop(closed);

    let config = ClientConfig::new("tok").with_base_url(&format!("http://{closed_addr}"));
    let err = SiteClient::new(&config)
        .unwrap()
        .item_types()
        .all(&Filters::new(), None)
        .unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
    assert!(err.is_transport());
}

#[test]
fn ids_that_look_like_paths_are_not_found() {
    let client = client();
    let article = create_article(&client);

    let err = client
        .item_types()
        .find(&format!("{}/duplicate", article.id))
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }), "got {err:?}");

    let err = client
        .fields()
        .all(&Filters::new(), Some(&format!("{}?", article.id)))
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }), "got {err:?}");

    // nothing was duplicated along the way
    assert_eq!(client.item_types().all(&Filters::new(), None).unwrap().len(), 1);
}

#[test]
fn large_files_upload_and_download_in_full() {
    let (client, addr) = client_with_addr();
    let size = 11 * 1024 * 1024;

    let mut local = std::env::temp_dir();
    local.push(format!("dato-core-large-{}.bin", std::process::id()));
    std::fs::write(&local, vec![7u8; size]).unwrap();
    let uploaded = client.upload_file(&local);
    std::fs::remove_file(&local).unwrap();
    let uploaded = uploaded.unwrap();
    assert_eq!(uploaded.size, size);

    let copy = client
        .upload_image(&format!("http://{addr}/storage{}", uploaded.path))
        .unwrap();
    assert_eq!(copy.size, size);
}
