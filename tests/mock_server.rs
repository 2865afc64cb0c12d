//! End-to-end tests for mock traffic and the admin REST surface.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn test_default_endpoints_respond() {
    let server = common::start_server().await;
    let client = common::client();

    for name in ["a", "b", "c"] {
        let res = client.get(server.url(&format!("/{}", name))).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "application/json");
        let body: Value = res.json().await.unwrap();
        assert_eq!(
            body,
            json!({ "message": format!("Response from http://127.0.0.1:{}/{}", server.addr.port(), name) })
        );
    }

    let res = client.get(server.url("/zzz")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Not found", "path": "/zzz" }));
}

#[tokio::test]
async fn test_admin_create_then_serve() {
    let server = common::start_server().await;
    let client = common::client();

    let res = client
        .post(server.url("/api/endpoints"))
        .json(&json!({
            "endpoint": "users",
            "config": {"method": "POST", "statusCode": 201, "body": {"id": 1}}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"message": "Endpoint created", "endpoint": "users"}));

    let res = client.post(server.url("/users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"id": 1}));

    // only the configured method is bound
    let res = client.get(server.url("/users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let listed: Value = client
        .get(server.url("/api/endpoints"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        listed["users"],
        json!({"method": "POST", "statusCode": 201, "delay": 0, "body": {"id": 1}})
    );

    let routes: Vec<String> = client
        .get(server.url("/api/routes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(routes, vec!["a", "b", "c", "users"]);
}

#[tokio::test]
async fn test_admin_errors() {
    let server = common::start_server().await;
    let client = common::client();

    let res = client
        .post(server.url("/api/endpoints"))
        .json(&json!({"endpoint": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.json::<Value>().await.unwrap(),
        json!({"error": "Missing endpoint or config"})
    );

    let res = client
        .post(server.url("/api/endpoints"))
        .json(&json!({"endpoint": "a", "config": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(server.url("/api/endpoints"))
        .json(&json!({"endpoint": "bad", "config": {"method": "TRACE"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.delete(server.url("/api/endpoints/nope")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_delete_unbinds_route() {
    let server = common::start_server().await;
    let client = common::client();

    let res = client.delete(server.url("/api/endpoints/b")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.json::<Value>().await.unwrap(),
        json!({"message": "Endpoint deleted", "endpoint": "b"})
    );

    let res = client.get(server.url("/b")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expected_fields_enforced() {
    let server = common::start_server().await;
    let client = common::client();

    client
        .post(server.url("/api/endpoints"))
        .json(&json!({
            "endpoint": "orders",
            "config": {"method": "POST", "expectedFields": ["sku", "qty"], "body": {"ok": true}}
        }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(server.url("/orders"))
        .json(&json!({"sku": "A1", "qty": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["details"].as_array().unwrap().len(), 1);
    assert_eq!(body["details"][0]["field"], "qty");

    let res = client
        .post(server.url("/orders"))
        .header("content-type", "application/json")
        .body("{oops")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.json::<Value>().await.unwrap(),
        json!({"error": "Invalid JSON in request body"})
    );

    let res = client
        .post(server.url("/orders"))
        .json(&json!({"sku": "A1", "qty": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"ok": true}));
}

#[tokio::test]
async fn test_non_ascii_name_is_served() {
    let server = common::start_server().await;
    let client = common::client();

    let res = client
        .post(server.url("/api/endpoints"))
        .json(&json!({"endpoint": "café", "config": {"body": {"menu": ["espresso"]}}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client.get(server.url("/café")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"menu": ["espresso"]}));

    let res = client
        .post(server.url("/api/endpoints"))
        .json(&json!({"endpoint": "..", "config": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delay_does_not_block_other_requests() {
    let server = common::start_server().await;
    let client = common::client();

    client
        .post(server.url("/api/endpoints"))
        .json(&json!({"endpoint": "slow", "config": {"delay": 300}}))
        .send()
        .await
        .unwrap();

    let slow = {
        let client = client.clone();
        let url = server.url("/slow");
        tokio::spawn(async move {
            let start = Instant::now();
            let res = client.get(url).send().await.unwrap();
            (res.status(), start.elapsed())
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    let start = Instant::now();
    let res = client.get(server.url("/a")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(start.elapsed() < Duration::from_millis(250));

    let (status, elapsed) = slow.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(elapsed >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_endpoints_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("endpoints.json");
    let client = common::client();

    {
        let server = common::start_server_at(&path).await;
        let res = client
            .post(server.url("/api/endpoints"))
            .json(&json!({"endpoint": "kept", "config": {"statusCode": 202}}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        client.delete(server.url("/api/endpoints/a")).send().await.unwrap();
    }

    let persisted: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(persisted.get("kept").is_some());
    assert!(persisted.get("a").is_none());

    let server = common::start_server_at(&path).await;
    let res = client.get(server.url("/kept")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let res = client.get(server.url("/a")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_reports_counts() {
    let server = common::start_server().await;
    let client = common::client();
    let (_socket, _) = common::connect_control(&server).await;

    let status: Value = client
        .get(server.url("/api/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "ok");
    assert_eq!(status["endpoints"], 3);
    assert_eq!(status["sessions"], 1);
    assert_eq!(status["version"], env!("CARGO_PKG_VERSION"));
}
