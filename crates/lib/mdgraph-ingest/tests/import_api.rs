use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use mdgraph_core::control::{CallScope, GraphControlPlane};
use mdgraph_ingest::{ImportResponse, IngestServer, IngestServerConfig};
use serde_json::{Value, json};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tower::ServiceExt;

async fn build(db_name: &str, config: IngestServerConfig) -> (Router, GraphControlPlane<Db>) {
    let db = Surreal::new::<Mem>(())
        .await
        .expect("failed to create in-memory surrealdb instance");
    db.use_ns("mdgraph")
        .use_db(db_name)
        .await
        .expect("failed to select surrealdb namespace/db");
    let control = GraphControlPlane::new(db);
    let router = IngestServer::new(control.clone(), config).router();
    (router, control)
}

fn post_json(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/import")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn sample_snapshot() -> Value {
    json!({
        "meta": {
            "configName": "Accounting",
            "configVersion": "3.0.1",
            "exportedAt": "2026-10-01T08:00:00Z",
            "source": "upload",
            "objectCount": 2
        },
        "objects": [
            { "id": "doc.Payment", "type": "document", "name": "Payment" },
            { "id": "cat.Banks", "type": "catalog", "name": "Banks" }
        ],
        "relations": [
            { "from": "Document.Payment", "to": "cat.Banks", "kind": "references" },
            { "from": "doc.Payment", "to": "cat.Unknown", "kind": "references" }
        ]
    })
}

#[tokio::test]
async fn health_and_usage_respond() {
    let (router, _) = build("health", IngestServerConfig::default()).await;
    let response = router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    assert_eq!(&bytes[..], b"ok");

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    assert!(String::from_utf8_lossy(&bytes).contains("POST /import"));
}

#[tokio::test]
async fn import_stores_snapshot_and_reports_counts() {
    let (router, control) = build("import", IngestServerConfig::default()).await;
    let response = router
        .oneshot(post_json(&sample_snapshot()))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["configName"], "Accounting");
    assert_eq!(body["objectCount"], 2);
    assert_eq!(body["relationCount"], 2);
    assert!(body["importedAt"].as_str().is_some_and(|value| !value.is_empty()));
    let parsed: ImportResponse = serde_json::from_value(body).expect("typed response");
    assert!(parsed.ok);

    let scope = CallScope::unbounded();
    let stored = control
        .get_object(&scope, "Document.Payment")
        .await
        .expect("lookup")
        .expect("object stored");
    assert_eq!(stored.name, "Payment");
    let status = control.snapshot_status(&scope).await.expect("status");
    assert_eq!(status.live_relation_count, 1);
    assert_eq!(status.meta.config_version, "3.0.1");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (router, _) = build("malformed", IngestServerConfig::default()).await;
    let request = Request::builder()
        .method("POST")
        .uri("/import")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"meta\": "))
        .expect("request");
    let response = router.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn wrong_shape_is_bad_request() {
    let (router, _) = build("shape", IngestServerConfig::default()).await;
    let response = router
        .oneshot(post_json(&json!({ "objects": "not a list" })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn positional_documents_are_bad_requests() {
    let bodies = [
        json!({ "meta": [] }),
        json!({ "meta": ["9.9", "Hijacked", "1.0"] }),
        json!({ "objects": [["doc.A", "document", "A"]] }),
        json!({ "relations": [["doc.A", "doc.A", "uses"]] }),
        json!([{}, [], []]),
    ];
    let (router, control) = build("positional", IngestServerConfig::default()).await;
    for body in &bodies {
        let response = router
            .clone()
            .oneshot(post_json(body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
    let status = control
        .snapshot_status(&CallScope::unbounded())
        .await
        .expect("status");
    assert!(!status.loaded);
}

#[tokio::test]
async fn object_without_id_is_bad_request() {
    let (router, _) = build("no_id", IngestServerConfig::default()).await;
    let response = router
        .oneshot(post_json(&json!({ "objects": [{ "name": "Nameless" }] })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let config = IngestServerConfig::default().with_max_body_bytes(64);
    let (router, _) = build("oversized", config).await;
    let response = router
        .oneshot(post_json(&sample_snapshot()))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
