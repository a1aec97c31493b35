//! In-memory stand-in for the DatoCMS site API.
//!
//! Serves the JSON:API routes the client crate talks to, backed by a
//! `Store` behind a tokio `RwLock`. Any bearer token is accepted; requests
//! without one get 401. `/storage/{*key}` plays the role of the presigned
//! upload bucket and needs no token.

pub mod error;
pub mod store;

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub use error::ApiError;
pub use store::{Document, Incoming, Kind, Resource, Store};

use store::{COLLECTIONS, DEPLOYMENT_ENVIRONMENT, ITEM_TYPE};

pub type Db = Arc<RwLock<Store>>;

type ApiResult = Result<Response, ApiError>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded()));

    let mut api = Router::new();
    for kind in COLLECTIONS {
        api = resource_routes(api, *kind);
    }
    let api = api
        .route(
            "/item-types/{id}/duplicate",
            post(|State(db): State<Db>, Path(id): Path<String>| async move {
                let copy = db.write().await.duplicate(&ITEM_TYPE, &id)?;
                info!(id = %copy.id, "item type duplicated");
                created(copy)
            }),
        )
        .route(
            "/deployment-environments/{id}/trigger",
            post(|State(db): State<Db>, Path(id): Path<String>| async move {
                db.write().await.trigger(&DEPLOYMENT_ENVIRONMENT, &id)?;
                info!(%id, "deploy triggered");
                Ok::<_, ApiError>(StatusCode::NO_CONTENT.into_response())
            }),
        )
        .route("/site", get(find_site).put(update_site))
        .route("/upload-requests", post(create_upload_request))
        .route_layer(middleware::from_fn(require_token));

    let storage = Router::new()
        .route("/storage/{*key}", get(read_file).put(write_file))
        .layer(DefaultBodyLimit::disable());

    api.merge(storage).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Registers collection and member routes for one kind. Nested kinds are
/// listed and created under their parent's member path.
fn resource_routes(router: Router<Db>, kind: &'static Kind) -> Router<Db> {
    let member = format!("/{}/{{id}}", kind.collection);
    let router = router.route(
        &member,
        get(move |State(db): State<Db>, Path(id): Path<String>| async move {
            ok(db.read().await.find(kind, &id)?)
        })
        .put(
            move |State(db): State<Db>, Path(id): Path<String>, Json(doc): Json<Document>| async move {
                ok(db.write().await.update(kind, &id, doc.data)?)
            },
        )
        .delete(move |State(db): State<Db>, Path(id): Path<String>| async move {
            let removed = db.write().await.destroy(kind, &id)?;
            debug!(kind = kind.kind, %id, "destroyed");
            ok(removed)
        }),
    );

    match kind.parent {
        Some(parent) => router.route(
            &format!("/{}/{{id}}/{}", parent.collection, kind.collection),
            get(
                move |State(db): State<Db>,
                      Path(parent_id): Path<String>,
                      Query(query): Query<HashMap<String, String>>| async move {
                    listing(db.read().await.list(kind, Some(&parent_id), &query)?)
                },
            )
            .post(
                move |State(db): State<Db>, Path(parent_id): Path<String>, Json(doc): Json<Document>| async move {
                    created(db.write().await.create(kind, Some(&parent_id), doc.data)?)
                },
            ),
        ),
        None => router.route(
            &format!("/{}", kind.collection),
            get(
                move |State(db): State<Db>, Query(query): Query<HashMap<String, String>>| async move {
                    listing(db.read().await.list(kind, None, &query)?)
                },
            )
            .post(move |State(db): State<Db>, Json(doc): Json<Document>| async move {
                created(db.write().await.create(kind, None, doc.data)?)
            }),
        ),
    }
}

fn ok(resource: Resource) -> ApiResult {
    Ok(Json(json!({ "data": resource })).into_response())
}

fn created(resource: Resource) -> ApiResult {
    Ok((StatusCode::CREATED, Json(json!({ "data": resource }))).into_response())
}

fn listing(resources: Vec<Resource>) -> ApiResult {
    Ok(Json(json!({ "data": resources })).into_response())
}

async fn require_token(request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| !token.trim().is_empty());
    if !authorized {
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}

async fn find_site(State(db): State<Db>) -> ApiResult {
    ok(db.read().await.site())
}

async fn update_site(State(db): State<Db>, Json(doc): Json<Document>) -> ApiResult {
    ok(db.write().await.update_site(doc.data)?)
}

async fn create_upload_request(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(doc): Json<Document>,
) -> ApiResult {
    if doc.data.kind != "upload_request" {
        return Err(ApiError::InvalidType {
            expected: "upload_request",
        });
    }
    let filename = doc
        .data
        .attributes
        .get("filename")
        .and_then(Value::as_str)
        .filter(|f| !f.is_empty() && !f.contains('/'))
        .ok_or_else(|| ApiError::invalid("filename", "VALIDATION_REQUIRED"))?;
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");

    let (path, key) = db.write().await.reserve_upload(filename);
    let resource = Resource {
        id: path,
        kind: "upload_request".to_string(),
        attributes: serde_json::Map::from_iter([(
            "url".to_string(),
            json!(format!("http://{host}/storage/{key}")),
        )]),
        relationships: serde_json::Map::new(),
    };
    created(resource)
}

async fn write_file(State(db): State<Db>, Path(key): Path<String>, body: Bytes) -> StatusCode {
    let key = key.trim_start_matches('/').to_string();
    debug!(%key, size = body.len(), "file stored");
    db.write().await.store_file(&key, body.to_vec());
    StatusCode::OK
}

async fn read_file(State(db): State<Db>, Path(key): Path<String>) -> Result<Vec<u8>, StatusCode> {
    let key = key.trim_start_matches('/');
    db.read()
        .await
        .file(key)
        .map(<[u8]>::to_vec)
        .ok_or(StatusCode::NOT_FOUND)
}
