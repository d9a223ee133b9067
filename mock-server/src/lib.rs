use std::time::Duration;

use axum::{
    extract::{Path, RawQuery},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Highscore {
    pub username: String,
    pub score: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/user", get(user))
        .route("/highscore", post(highscore))
        .route("/answers/{num}", put(answers))
        .route("/logs", get(logs).delete(logs))
        .route("/headerbounce", get(headerbounce))
        .route("/slow", get(slow))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn user() -> Json<Value> {
    Json(json!({ "username": "testuser" }))
}

async fn highscore(Json(input): Json<Highscore>) -> (StatusCode, Json<Highscore>) {
    (StatusCode::CREATED, Json(input))
}

async fn answers(Path(num): Path<String>, Json(original): Json<Value>) -> Json<Value> {
    Json(json!({
        "id": num,
        "about": ["life", "the universe", "everything"],
        "original": original,
    }))
}

/// Echo the raw query string back as plain text, leading `?` included.
async fn logs(RawQuery(query): RawQuery) -> String {
    match query {
        Some(query) => format!("?{query}"),
        None => String::new(),
    }
}

/// Echo the request headers back as a JSON object.
async fn headerbounce(headers: HeaderMap) -> Json<Value> {
    let mut bounced = serde_json::Map::new();
    for (name, value) in &headers {
        if let Ok(value) = value.to_str() {
            bounced.insert(name.as_str().to_string(), Value::String(value.to_string()));
        }
    }
    Json(Value::Object(bounced))
}

/// Respond after a delay long enough to trip any short client timeout.
async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(2)).await;
    "finally"
}
