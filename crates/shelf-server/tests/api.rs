//! Integration tests for the catalog HTTP surface: create/fetch/update/
//! delete round trips, validation failures, duplicate handling, and the
//! API-key auth middleware.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use shelf_server::api;
use shelf_server::auth::ApiKeyAuth;
use shelf_server::state::{AppState, ServerConfig, StorageConfig};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "shelf-test-boundary";

async fn test_app(dir: &TempDir) -> axum::Router {
    let config = ServerConfig {
        storage: StorageConfig {
            dir: dir.path().to_path_buf(),
        },
    };
    let state = AppState::from_config(config).await.unwrap();
    api::build_router(state, ApiKeyAuth::disabled())
}

async fn test_app_with_auth(dir: &TempDir, keys: &[(&str, &str)]) -> axum::Router {
    let config = ServerConfig {
        storage: StorageConfig {
            dir: dir.path().to_path_buf(),
        },
    };
    let state = AppState::from_config(config).await.unwrap();
    let auth = ApiKeyAuth::with_keys(
        keys.iter()
            .map(|(token, owner)| (token.to_string(), owner.to_string())),
    );
    api::build_router(state, auth)
}

/// Hand-rolled multipart body: text fields plus an optional file part.
fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(method: &str, uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_bytes(response: axum::http::Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn create_replica(app: &axum::Router, name: &str, payload: &[u8]) {
    let body = multipart_body(&[("name", name), ("format", "file")], Some((name, payload)));
    let response = app
        .clone()
        .oneshot(multipart_request("POST", "/catalogs/replica/", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

// -- Basics -------------------------------------------------------------------

#[tokio::test]
async fn health_is_ok() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn index_maps_types_to_listing_endpoints() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalogs/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["site"], "/catalogs/site/");
    assert_eq!(json["replica"], "/catalogs/replica/");
    assert_eq!(json["transformation"], "/catalogs/transformation/");
}

// -- Create & fetch -----------------------------------------------------------

#[tokio::test]
async fn create_returns_location_and_fetch_streams_payload() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let body = multipart_body(
        &[("name", "r1"), ("format", "file")],
        Some(("rc.txt", b"X,Y,Z")),
    );
    let response = app
        .clone()
        .oneshot(multipart_request("POST", "/catalogs/replica/", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/catalogs/replica/r1"
    );
    assert_eq!(body_json(response).await["location"], "/catalogs/replica/r1");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalogs/replica/r1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain"
    );
    assert_eq!(body_bytes(response).await, b"X,Y,Z");
}

#[tokio::test]
async fn create_without_required_fields_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let cases: [(Vec<(&str, &str)>, Option<(&str, &[u8])>, &str); 3] = [
        (vec![("format", "file")], Some(("f", b"x")), "Specify name"),
        (vec![("name", "r1")], Some(("f", b"x")), "Specify format"),
        (vec![("name", "r1"), ("format", "file")], None, "Specify file"),
    ];

    for (fields, file, expected) in cases {
        let body = multipart_body(&fields, file);
        let response = app
            .clone()
            .oneshot(multipart_request("POST", "/catalogs/replica/", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], expected);
    }
}

#[tokio::test]
async fn unknown_catalog_type_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalogs/workflow/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Invalid catalog type: workflow"
    );
}

#[tokio::test]
async fn format_outside_type_domain_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let body = multipart_body(&[("name", "s1"), ("format", "xml5")], Some(("f", b"x")));
    let response = app
        .oneshot(multipart_request("POST", "/catalogs/site/", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Invalid site catalog format: xml5"
    );
}

#[tokio::test]
async fn duplicate_create_is_client_error() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    create_replica(&app, "r1", b"first").await;

    let body = multipart_body(&[("name", "r1"), ("format", "file")], Some(("f", b"second")));
    let response = app
        .clone()
        .oneshot(multipart_request("POST", "/catalogs/replica/", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Duplicate catalog name: r1"
    );

    // first payload untouched
    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalogs/replica/r1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_bytes(response).await, b"first");
}

#[tokio::test]
async fn fetch_missing_catalog_is_404() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalogs/site/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "No such catalog: nope");
}

// -- List ---------------------------------------------------------------------

#[tokio::test]
async fn listing_returns_descriptors() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    create_replica(&app, "r1", b"one").await;
    create_replica(&app, "r2", b"two").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalogs/replica/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["name"], "r1");
    assert_eq!(list[0]["format"], "file");
    assert_eq!(list[0]["location"], "/catalogs/replica/r1");
    assert!(list[0]["id"].is_string());
    assert!(list[0]["created"].is_string());
}

// -- Update -------------------------------------------------------------------

#[tokio::test]
async fn update_format_only_keeps_payload() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    create_replica(&app, "r1", b"X,Y,Z").await;

    let body = multipart_body(&[("format", "regex")], None);
    let response = app
        .clone()
        .oneshot(multipart_request("PUT", "/catalogs/replica/r1", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["format"], "regex");
    assert_eq!(json["location"], "/catalogs/replica/r1");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalogs/replica/r1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_bytes(response).await, b"X,Y,Z");
}

#[tokio::test]
async fn update_payload_only_keeps_format() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    create_replica(&app, "r1", b"old").await;

    let body = multipart_body(&[], Some(("rc.txt", b"new")));
    let response = app
        .clone()
        .oneshot(multipart_request("PUT", "/catalogs/replica/r1", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["format"], "file");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalogs/replica/r1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_bytes(response).await, b"new");
}

#[tokio::test]
async fn update_missing_catalog_is_404() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let body = multipart_body(&[("format", "regex")], None);
    let response = app
        .oneshot(multipart_request("PUT", "/catalogs/replica/ghost", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Delete -------------------------------------------------------------------

#[tokio::test]
async fn delete_removes_catalog_and_confirms() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    create_replica(&app, "r1", b"data").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/catalogs/replica/r1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "deleted");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalogs/replica/r1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_missing_catalog_is_404() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/catalogs/replica/ghost")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Auth ---------------------------------------------------------------------

#[tokio::test]
async fn missing_token_is_401_when_keys_configured() {
    let dir = TempDir::new().unwrap();
    let app = test_app_with_auth(&dir, &[("alice-token", "alice")]).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalogs/replica/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_token_is_401() {
    let dir = TempDir::new().unwrap();
    let app = test_app_with_auth(&dir, &[("alice-token", "alice")]).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalogs/replica/")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn owners_are_isolated_by_token() {
    let dir = TempDir::new().unwrap();
    let app =
        test_app_with_auth(&dir, &[("alice-token", "alice"), ("bob-token", "bob")]).await;

    let body = multipart_body(&[("name", "r1"), ("format", "file")], Some(("f", b"alice")));
    let mut request = multipart_request("POST", "/catalogs/replica/", body);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer alice-token".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/catalogs/replica/")
                .header(header::AUTHORIZATION, "Bearer bob-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalogs/replica/")
                .header(header::AUTHORIZATION, "Bearer alice-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn health_does_not_require_token() {
    let dir = TempDir::new().unwrap();
    let app = test_app_with_auth(&dir, &[("alice-token", "alice")]).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
