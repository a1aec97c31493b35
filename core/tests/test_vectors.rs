//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! `requests.json` pairs client inputs with the request each builder must
//! produce; `responses.json` pairs simulated responses with the expected parse
//! result or error kind. Bodies are compared as parsed JSON so key order does
//! not matter.

use std::sync::Arc;

use dato_core::descriptor::{
    DEPLOYMENT_ENVIRONMENT, FIELD, ITEM, ITEM_TYPE, MENU_ITEM, ROLE, USER,
};
use dato_core::{
    ClientError, Entity, Fields, Filters, HttpMethod, HttpRequest, HttpResponse, ResourceClient,
    ResourceDescriptor, Transport,
};
use serde_json::Value;

/// Builders and parsers never touch the transport.
struct Offline;

impl Transport for Offline {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        panic!("unexpected request to {}", request.path)
    }
}

fn descriptor(kind: &str) -> &'static ResourceDescriptor {
    match kind {
        "item_type" => &ITEM_TYPE,
        "field" => &FIELD,
        "item" => &ITEM,
        "user" => &USER,
        "role" => &ROLE,
        "menu_item" => &MENU_ITEM,
        "deployment_environment" => &DEPLOYMENT_ENVIRONMENT,
        other => panic!("unknown resource: {other}"),
    }
}

fn client(kind: &str) -> ResourceClient {
    ResourceClient::new(descriptor(kind), Arc::new(Offline))
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .map(|list| {
            list.iter()
                .map(|pair| {
                    (
                        pair[0].as_str().unwrap().to_string(),
                        pair[1].as_str().unwrap().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn entity_json(entity: &Entity) -> Value {
    serde_json::json!({
        "id": entity.id,
        "kind": entity.kind,
        "fields": Value::Object(entity.fields.clone()),
    })
}

fn response(case: &Value) -> HttpResponse {
    let status = case["response"]["status"].as_u64().unwrap() as u16;
    let body = match &case["response"]["body"] {
        Value::Null => String::new(),
        other => other.to_string(),
    };
    HttpResponse::new(status, body)
}

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let c = client(case["resource"].as_str().unwrap());
        let id = case["id"].as_str();
        let parent_id = case["parent_id"].as_str();
        let input: Fields = case["input"].as_object().cloned().unwrap_or_default();
        let filters = pairs(&case["filters"])
            .into_iter()
            .fold(Filters::new(), |filters, (k, v)| filters.with(k, v));

        let req = match case["operation"].as_str().unwrap() {
            "all" => c.build_all(&filters, parent_id).unwrap(),
            "find" => c.build_find(id.unwrap()),
            "create" => c.build_create(&input, parent_id).unwrap(),
            "update" => c.build_update(id.unwrap(), &input).unwrap(),
            "destroy" => c.build_destroy(id.unwrap()),
            "duplicate" => c.build_duplicate(id.unwrap()).unwrap(),
            "trigger" => c.build_trigger(id.unwrap()).unwrap(),
            other => panic!("{name}: unknown operation {other}"),
        };

        let expected = &case["expected_request"];
        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.path, expected["path"].as_str().unwrap(), "{name}: path");
        assert_eq!(req.query, pairs(&expected["query"]), "{name}: query");

        match (&expected["body"], req.json_body()) {
            (Value::Null, None) => {}
            (Value::Null, Some(body)) => panic!("{name}: unexpected body {body}"),
            (expected_body, Some(body)) => {
                let body: Value = serde_json::from_str(body).unwrap();
                assert_eq!(&body, expected_body, "{name}: body");
            }
            (_, None) => panic!("{name}: missing body"),
        }
    }
}

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let c = client(case["resource"].as_str().unwrap());
        let resp = response(case);

        let result: Result<Value, ClientError> = match case["operation"].as_str().unwrap() {
            "entity" => c.parse_entity(resp).map(|e| entity_json(&e)),
            "all" => c
                .parse_all(resp)
                .map(|list| Value::Array(list.iter().map(entity_json).collect())),
            "empty" => c.parse_empty(resp).map(|()| Value::Null),
            other => panic!("{name}: unknown operation {other}"),
        };

        match case["expected_error"].as_str() {
            None => assert_eq!(result.unwrap(), case["expected"], "{name}"),
            Some(kind) => {
                let err = result.unwrap_err();
                let status = case["response"]["status"].as_u64().unwrap() as u16;
                assert_eq!(err.status(), Some(status), "{name}: status");
                match (kind, &err) {
                    ("not_found", ClientError::NotFound { .. }) => {}
                    ("http", ClientError::Http { .. }) => {}
                    ("validation", ClientError::Validation { errors, .. }) => {
                        let expected = case["expected_field_errors"].as_array().unwrap();
                        assert_eq!(errors.len(), expected.len(), "{name}: error count");
                        for (got, want) in errors.iter().zip(expected) {
                            assert_eq!(got.field.as_deref(), want["field"].as_str(), "{name}");
                            assert_eq!(got.code, want["code"].as_str().unwrap(), "{name}");
                        }
                    }
                    _ => panic!("{name}: expected {kind}, got {err:?}"),
                }
            }
        }
    }
}
