//! HTTP surface tests driving the router in-process.

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use common::fixtures::IssueBuilder;
use common::test_services;
use http_body_util::BodyExt;
use issue_tracker::api::router;
use issue_tracker::service::Services;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    services: Services,
    app: Router,
    _dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let (services, dir) = test_services();
        Self {
            app: router(services.clone()),
            services,
            _dir: dir,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, uri, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn create_body(title: &str) -> Value {
    json!({
        "title": title,
        "description": "first\r\nsecond",
        "author": "Alice Smith",
        "type": "BUG",
        "severity": "HIGH",
        "project": "MWP",
    })
}

#[tokio::test]
async fn create_then_fetch() {
    let app = TestApp::new();

    let (status, created) = app
        .json(Method::POST, "/issue/create", Some(create_body("Broken login")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "SUBMITTED");
    assert_eq!(created["description"], "first<br />second");
    let id = created["id"].as_i64().unwrap();

    let (status, by_id) = app.json(Method::GET, &format!("/issue/id/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_id["title"], "Broken login");

    let (status, by_title) = app
        .json(Method::GET, "/issue/title/Broken%20login", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_title["id"], id);
}

#[tokio::test]
async fn duplicate_create_is_conflict() {
    let app = TestApp::new();
    app.json(Method::POST, "/issue/create", Some(create_body("Same")))
        .await;

    let (status, body) = app
        .json(Method::POST, "/issue/create", Some(create_body("Same")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_TITLE");
    assert_eq!(app.services.issues.count().unwrap(), 1);
}

#[tokio::test]
async fn missing_issue_is_404_with_error_body() {
    let app = TestApp::new();
    let (status, body) = app.json(Method::GET, "/issue/id/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "ISSUE_NOT_FOUND");

    let (status, _) = app.json(Method::DELETE, "/issue/id/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn property_routes_and_bad_values() {
    let app = TestApp::new();
    IssueBuilder::new("bug").create(&app.services);

    let (status, body) = app.json(Method::GET, "/issue/type/bug", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app.json(Method::GET, "/issue/project/SUDOKU", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = app.json(Method::GET, "/issue/status/fixed", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PROPERTY");
}

#[tokio::test]
async fn malformed_requests_get_error_body() {
    let app = TestApp::new();

    let (status, body) = app
        .json(Method::POST, "/issue/filter", Some(json!({"type": "NOPE"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert!(body["error"]["message"].as_str().unwrap().contains("NOPE"));

    let (status, body) = app.json(Method::GET, "/issue/id/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");

    let (status, body) = app
        .json(Method::POST, "/issue/create", Some(json!({"title": "x"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn filter_and_search() {
    let app = TestApp::new();
    IssueBuilder::new("A").create(&app.services);
    IssueBuilder::new("B")
        .with_status(issue_tracker::model::Status::Open)
        .with_author("Alice Smith")
        .create(&app.services);

    let (status, body) = app
        .json(
            Method::POST,
            "/issue/filter",
            Some(json!({"type": "BUG", "status": "OPEN"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "B");

    let (_, body) = app.json(Method::POST, "/issue/filter", Some(json!({}))).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = app.json(Method::GET, "/issue/search?query=alice", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = app.json(Method::GET, "/issue/search", None).await;
    assert_eq!(body[0]["title"], "B");
    assert_eq!(body[1]["title"], "A");
}

#[tokio::test]
async fn updates_and_history() {
    let app = TestApp::new();
    let issue = IssueBuilder::new("evolving").create(&app.services);

    let (status, body) = app
        .json(
            Method::PUT,
            "/issue/update",
            Some(json!({
                "id": issue.id,
                "type": "ENHANCEMENT",
                "severity": "LOW",
                "status": "SOLVED",
                "project": "DAP",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SOLVED");

    let (status, body) = app
        .json(
            Method::POST,
            "/issue/update-description",
            Some(json!({"title": "evolving", "description": "a\nb"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "a<br />b");

    let (status, history) = app
        .json(Method::GET, &format!("/issue/id/{}/history", issue.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let texts: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["text"].as_str().unwrap())
        .collect();
    assert_eq!(
        texts,
        [
            "CHANGED DESCRIPTION",
            "UPDATED with properties: ENHANCEMENT LOW SOLVED DAP",
            "CREATED with properties: BUG MEDIUM SUBMITTED TRACKER",
        ]
    );

    let (status, _) = app
        .json(
            Method::POST,
            "/issue/update-description",
            Some(json!({"title": "ghost", "description": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_issue_returns_empty_ok() {
    let app = TestApp::new();
    let issue = IssueBuilder::new("bye").create(&app.services);

    let (status, bytes) = app
        .send(Method::DELETE, &format!("/issue/id/{}", issue.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.is_empty());
    assert_eq!(app.services.issues.count().unwrap(), 0);
}

#[tokio::test]
async fn attachment_lifecycle() {
    let app = TestApp::new();
    let issue = IssueBuilder::new("files").create(&app.services);

    let (status, attachment) = app
        .json(
            Method::POST,
            "/issue/attachments/upload",
            Some(json!({
                "issue_title": "files",
                "original_filename": "notes.txt",
                "bytes": STANDARD.encode("hello file"),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        attachment["path"],
        format!("/issue/attachments/{}/notes.txt", issue.id)
    );

    let (status, listed) = app
        .json(Method::GET, &format!("/issue/id/{}/attachments", issue.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/issue/attachments/{}/notes.txt", issue.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"hello file");

    let id = attachment["id"].as_i64().unwrap();
    let (status, _) = app
        .send(Method::DELETE, &format!("/issue/attachments/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(Method::DELETE, &format!("/issue/attachments/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .json(
            Method::GET,
            &format!("/issue/attachments/{}/notes.txt", issue.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "ATTACHMENT_NOT_FOUND");
}

#[tokio::test]
async fn empty_upload_is_bad_request() {
    let app = TestApp::new();
    IssueBuilder::new("files").create(&app.services);

    let (status, body) = app
        .json(
            Method::POST,
            "/issue/attachments/upload",
            Some(json!({
                "issue_title": "files",
                "original_filename": "empty.txt",
                "bytes": "",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "EMPTY_ATTACHMENT");
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let app = TestApp::new();
    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/issue/all")
                .header(header::ORIGIN, "http://example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "3600");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap();
    assert!(methods.contains("DELETE"));
    assert!(methods.contains("PUT"));
}
