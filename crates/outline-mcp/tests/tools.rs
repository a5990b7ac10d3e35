use std::sync::Arc;
use std::time::{Duration, Instant};

use mcp_core::ToolError;
use mcp_server::Router;
use outline_mcp::{OutlineClient, OutlineRouter, RemoteCall, RemoteCallError, SessionConfig};
use rmcp::model::Content;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn client(server: &MockServer) -> Arc<OutlineClient> {
    let config = Arc::new(SessionConfig::new(server.uri(), TOKEN));
    Arc::new(OutlineClient::new(config).unwrap())
}

fn router(server: &MockServer) -> OutlineRouter {
    OutlineRouter::new(client(server)).unwrap()
}

fn text_json(content: &[Content]) -> Value {
    assert_eq!(content.len(), 1);
    let text = &content[0].as_text().expect("text content").text;
    serde_json::from_str(text).expect("tool text should be JSON")
}

async fn mock_document(server: &MockServer, id: &str, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/api/documents.info"))
        .and(body_json(json!({ "id": id })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "ok": true,
                    "data": { "id": id, "title": format!("Doc {id}") },
                }))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_add_returns_sum_as_text() {
    let server = MockServer::start().await;
    let router = router(&server);

    for (a, b, expected) in [
        (1.0, 2.0, "3"),
        (0.25, 0.25, "0.5"),
        (-4.0, 1.5, "-2.5"),
        (0.1, 0.2, "0.30000000000000004"),
        (1e21, 0.0, "1e+21"),
        (f64::MAX, f64::MAX, "Infinity"),
    ] {
        let content = router
            .call_tool("add", json!({ "a": a, "b": b }))
            .await
            .unwrap();
        assert_eq!(content[0].as_text().unwrap().text, expected);
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_requires_numbers() {
    let server = MockServer::start().await;
    let err = router(&server)
        .call_tool("add", json!({ "a": "1" }))
        .await
        .unwrap_err();
    match err {
        ToolError::InvalidParameters { fields, .. } => {
            assert!(fields.contains(&"/a".to_string()));
            assert!(fields.contains(&"/b".to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_search_applies_default_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents.search"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "offset": 1, "limit": 10, "query": "onboarding" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pagination": { "offset": 1, "limit": 10 },
            "data": [{ "ranking": 0.9, "document": { "id": "abc" } }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let content = router(&server)
        .call_tool("search", json!({ "query": "onboarding" }))
        .await
        .unwrap();
    assert_eq!(
        text_json(&content),
        json!([{ "ranking": 0.9, "document": { "id": "abc" } }])
    );
}

#[tokio::test]
async fn test_search_forwards_explicit_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents.search"))
        .and(body_json(json!({ "offset": 20, "limit": 5, "query": "rust" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let content = router(&server)
        .call_tool("search", json!({ "query": "rust", "offset": 20, "limit": 5 }))
        .await
        .unwrap();
    assert_eq!(text_json(&content), json!([]));
}

#[tokio::test]
async fn test_search_forwards_any_numeric_pagination_unchanged() {
    let server = MockServer::start().await;
    for (offset, limit) in [
        (json!(2.0), json!(5)),
        (json!(5000000000u64), json!(2.5)),
    ] {
        Mock::given(method("POST"))
            .and(path("/api/documents.search"))
            .and(body_json(json!({ "offset": offset, "limit": limit, "query": "rust" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(1)
            .mount(&server)
            .await;
    }
    let router = router(&server);

    for arguments in [
        json!({ "query": "rust", "offset": 2.0, "limit": 5 }),
        json!({ "query": "rust", "offset": 5000000000u64, "limit": 2.5 }),
    ] {
        let content = router.call_tool("search", arguments).await.unwrap();
        assert_eq!(text_json(&content), json!([]));
    }
}

#[tokio::test]
async fn test_search_with_wrong_types_makes_no_remote_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents.search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(0)
        .mount(&server)
        .await;
    let router = router(&server);

    for (arguments, field) in [
        (json!({ "query": "rust", "offset": "abc" }), "/offset"),
        (json!({ "query": "rust", "limit": true }), "/limit"),
        (json!({ "offset": 2 }), "/query"),
    ] {
        let err = router.call_tool("search", arguments).await.unwrap_err();
        match err {
            ToolError::InvalidParameters { fields, .. } => assert_eq!(fields, vec![field]),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_search_surfaces_remote_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents.search"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "ok": false, "error": "authentication_required", "message": "Authentication required"
        })))
        .mount(&server)
        .await;

    let err = router(&server)
        .call_tool("search", json!({ "query": "rust" }))
        .await
        .unwrap_err();
    match err {
        ToolError::ExecutionError(message) => {
            assert!(message.contains("401"), "{message}");
            assert!(message.contains("Authentication required"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_read_preserves_input_order() {
    let server = MockServer::start().await;
    mock_document(&server, "x", Duration::from_millis(300)).await;
    mock_document(&server, "y", Duration::ZERO).await;

    let content = router(&server)
        .call_tool("read", json!({ "ids": ["x", "y"] }))
        .await
        .unwrap();
    assert_eq!(
        text_json(&content),
        json!([
            { "id": "x", "title": "Doc x" },
            { "id": "y", "title": "Doc y" },
        ])
    );
}

#[tokio::test]
async fn test_read_issues_lookups_concurrently() {
    let server = MockServer::start().await;
    for id in ["a", "b", "c"] {
        mock_document(&server, id, Duration::from_millis(300)).await;
    }

    let started = Instant::now();
    let content = router(&server)
        .call_tool("read", json!({ "ids": ["a", "b", "c"] }))
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_millis(800));
    assert_eq!(text_json(&content).as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_read_fails_as_a_whole_when_one_lookup_fails() {
    let server = MockServer::start().await;
    mock_document(&server, "a", Duration::ZERO).await;
    mock_document(&server, "c", Duration::ZERO).await;
    Mock::given(method("POST"))
        .and(path("/api/documents.info"))
        .and(body_json(json!({ "id": "b" })))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "ok": false, "error": "not_found", "message": "Document not found"
        })))
        .mount(&server)
        .await;

    let err = router(&server)
        .call_tool("read", json!({ "ids": ["a", "b", "c"] }))
        .await
        .unwrap_err();
    match err {
        ToolError::ExecutionError(message) => {
            assert!(message.contains("Failed to read document b"), "{message}");
            assert!(message.contains("Document not found"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_read_without_ids_makes_no_remote_call() {
    let server = MockServer::start().await;
    let content = router(&server)
        .call_tool("read", json!({ "ids": [] }))
        .await
        .unwrap();
    assert_eq!(text_json(&content), json!([]));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_tool() {
    let server = MockServer::start().await;
    let err = router(&server)
        .call_tool("delete", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err, ToolError::NotFound("delete".into()));
}

#[tokio::test]
async fn test_lists_the_three_tools() {
    let server = MockServer::start().await;
    let tools = router(&server).list_tools();
    let names: Vec<_> = tools.iter().map(|t| t.name.to_string()).collect();
    assert_eq!(names, vec!["add", "read", "search"]);

    let search = &tools[2];
    assert_eq!(search.input_schema["required"], json!(["query"]));
    assert_eq!(search.input_schema["properties"]["offset"]["type"], "number");
    assert_eq!(search.input_schema["properties"]["limit"]["type"], "number");
    assert_eq!(search.input_schema["properties"]["offset"]["default"], 1);
    assert_eq!(search.input_schema["properties"]["limit"]["default"], 10);
}

#[tokio::test]
async fn test_client_returns_data_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents.info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "n": 3 } })))
        .mount(&server)
        .await;

    let data = client(&server)
        .call(RemoteCall::post("documents.info", json!({ "id": "n" })))
        .await
        .unwrap();
    assert_eq!(data, json!({ "n": 3 }));
}

#[tokio::test]
async fn test_client_rejects_bodies_without_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents.info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/documents.search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client
        .call(RemoteCall::post("documents.info", json!({ "id": "n" })))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteCallError::MissingData { .. }));

    let err = client
        .call(RemoteCall::post("documents.search", json!({ "query": "q" })))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteCallError::InvalidBody { .. }));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_client_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents.info"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server)
        .call(RemoteCall::post("documents.info", json!({ "id": "n" })))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
    assert!(err.to_string().contains("Internal Server Error"), "{err}");
}

#[tokio::test]
async fn test_client_reports_network_failures() {
    let config = Arc::new(SessionConfig::new("http://127.0.0.1:1", TOKEN));
    let client = OutlineClient::new(config).unwrap();

    let err = client
        .call(RemoteCall::post("documents.info", json!({ "id": "n" })))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteCallError::Request { .. }));
}
