//! Preview server integration tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

use std::fs;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use coins_mail::config::{Settings, TemplateConfig};
use coins_mail::mail::MemoryMailRepository;
use coins_mail::server::{create_app, AppState};

fn test_settings(root: &TempDir) -> Settings {
    Settings {
        server: Default::default(),
        templates: TemplateConfig::with_dir(root.path()),
        database: Default::default(),
    }
}

fn setup() -> (TempDir, Router, Arc<MemoryMailRepository>) {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("default");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("styles.scss"), "h1 { color: red; }").unwrap();
    fs::write(
        dir.join("html.twig"),
        "<html><body><h1>{{ greeting }}</h1>{{ messageBody|raw }}</body></html>",
    )
    .unwrap();
    fs::write(dir.join("text.twig"), "{{ greeting }} <3").unwrap();

    let repository = Arc::new(MemoryMailRepository::new());
    let state = AppState::with_repository(test_settings(&root), repository.clone());
    (root, create_app(state), repository)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_preview_page_shows_html_and_text() {
    let (_root, app, _) = setup();

    let response = app
        .oneshot(Request::get("/preview").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = body_string(response).await;
    assert!(page.contains("Lorem Ipsum Dolor"));
    assert!(page.contains("<pre"));
    assert!(page.contains("&lt;3</pre>"), "text is escaped: {}", page);
}

#[tokio::test]
async fn test_preview_errors_are_plain_messages() {
    let (_root, app, _) = setup();

    let response = app
        .clone()
        .oneshot(Request::get("/preview/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body_string(response).await.is_empty());

    let response = app
        .oneshot(Request::get("/preview/bad.name").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_render_endpoint_returns_json() {
    let (_root, app, _) = setup();
    let locals = json!({
        "html": {"greeting": "Hi", "messageBody": "<p>Body</p>"},
        "text": {"greeting": "Hi"}
    });

    let response = app
        .oneshot(json_request(Method::POST, "/preview/default", locals))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(content["text"], "Hi <3");
    let html: String = content["html"]
        .as_str()
        .unwrap()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    assert!(html.contains("color:red"), "{}", html);
}

#[tokio::test]
async fn test_render_endpoint_rejects_missing_channels() {
    let (_root, app, _) = setup();

    let response = app
        .oneshot(json_request(Method::POST, "/preview/default", json!({"html": {}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENTS");
}

#[tokio::test]
async fn test_create_mails_endpoint() {
    let (_root, app, repository) = setup();
    let options = json!({
        "fromLabel": "App",
        "recipients": ["a@x.com", "b@x.com"],
        "replyTo": "a@example.com",
        "subject": "Hi",
        "templateLocals": {
            "html": {"greeting": "Hi", "messageBody": "<p>Body</p>"},
            "text": {"greeting": "Hi"}
        }
    });

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/v1/mails", options.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let record: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(record["recipients"]["email"], json!(["a@x.com", "b@x.com"]));
    assert_eq!(record["use_coins_template"], true);
    assert!(record["sent"].is_null());

    let response = app
        .oneshot(json_request(Method::POST, "/api/v1/mails", json!([options.clone(), options])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let records: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 2);
    assert_eq!(repository.count(), 3);
}

#[tokio::test]
async fn test_create_mails_validation_error() {
    let (_root, app, repository) = setup();

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/mails",
            json!({"fromLabel": "App", "recipients": "nope", "replyTo": "a@example.com",
                   "subject": "Hi", "templateLocals": {}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"].as_str().unwrap().contains("recipients"));
    assert_eq!(repository.count(), 0);
}

#[tokio::test]
async fn test_health_reports_repository() {
    let (_root, app, repository) = setup();
    repository.close();

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["repository"]["backend"], "memory");
}
