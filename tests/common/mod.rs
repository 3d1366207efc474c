//! Shared helpers for the HTTP integration tests.
//!
//! Each test file is its own crate, so not every helper is used everywhere.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use taskmaster::Database;
use taskmaster::server::{AppState, build_router};

/// Router over a fresh in-memory database, debug routes mounted
pub fn test_router() -> Router {
    let db = Database::in_memory().expect("in-memory database");
    build_router(AppState::new(db), true)
}

/// Router with the debug routes left off
pub fn production_router() -> Router {
    let db = Database::in_memory().expect("in-memory database");
    build_router(AppState::new(db), false)
}

/// Send one request and return the status with the parsed JSON body
/// (`Value::Null` when the body is empty or not JSON).
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("valid request");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("readable body")
        .to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Method::GET, uri, None).await
}

pub async fn post(router: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    send(router, Method::POST, uri, Some(body)).await
}

pub async fn put(router: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    send(router, Method::PUT, uri, Some(body)).await
}

pub async fn delete(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Method::DELETE, uri, None).await
}

/// Create a project and return its id
pub async fn create_project(router: &Router, deadline: &str) -> i64 {
    let body = format!(r#"{{"deadline":"{deadline}"}}"#);
    let (status, value) = post(router, "/projects", &body).await;
    assert_eq!(status, StatusCode::CREATED);
    value["id"].as_i64().expect("project id")
}

/// Create a task in a project and return its id
pub async fn create_task(router: &Router, project_id: i64, title: &str, priority: i64) -> i64 {
    let body = format!(
        r#"{{"title":"{title}","project_id":{project_id},"priority":{priority}}}"#
    );
    let (status, value) = post(router, "/tasks", &body).await;
    assert_eq!(status, StatusCode::CREATED);
    value["id"].as_i64().expect("task id")
}

pub async fn create_user(router: &Router, name: &str, email: &str, password: &str) {
    let body = format!(r#"{{"name":"{name}","email":"{email}","password":"{password}"}}"#);
    let (status, _) = post(router, "/users", &body).await;
    assert_eq!(status, StatusCode::CREATED);
}
