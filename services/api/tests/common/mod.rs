//! Shared helpers for the HTTP integration tests: an app wired to the
//! in-memory store, and small request/response conveniences.

#![allow(dead_code)]

use api_lib::{
    adapters::{JwtSessionTokens, MemoryStore},
    config::Config,
    web::{self, AppState},
};
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("memory://".to_string()),
        "ACCESS_TOKEN_SECRET" => Some("test-secret".to_string()),
        _ => None,
    })
    .expect("test config is valid")
}

pub fn create_test_app() -> Router {
    let config = Arc::new(test_config());
    let tokens = Arc::new(JwtSessionTokens::from_config(&config).unwrap());
    let store = Arc::new(MemoryStore::with_default_constraints());
    web::router(Arc::new(AppState::new(config, store, tokens))).unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn empty(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn with_json(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    request
}

/// Signs in through `/jwt` and returns the `token=...` pair to send back.
pub async fn sign_in(app: &Router, email: &str) -> String {
    let response = send(
        app,
        with_json(Method::POST, "/jwt", json!({ "email": email })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    session_pair(&response.headers).expect("session cookie set")
}

pub fn session_pair(headers: &HeaderMap) -> Option<String> {
    let set_cookie = headers.get(header::SET_COOKIE)?.to_str().ok()?;
    set_cookie.split(';').next().map(str::to_string)
}

pub async fn create_task(app: &Router, title: &str) -> String {
    let response = send(
        app,
        with_json(Method::POST, "/tasks", json!({ "title": title })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    response.body["insertedId"].as_str().unwrap().to_string()
}

pub async fn list_tasks(app: &Router) -> Vec<Value> {
    let response = send(app, empty(Method::GET, "/tasks")).await;
    assert_eq!(response.status, StatusCode::OK);
    response.body.as_array().unwrap().clone()
}

pub fn titles(tasks: &[Value]) -> Vec<&str> {
    tasks
        .iter()
        .map(|task| task["title"].as_str().unwrap())
        .collect()
}
