//! Integration tests for the tt-dispatch HTTP API
//!
//! Routes are driven with `oneshot` against a router built over a small
//! catalog, a seeded random source and an in-memory database.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot`
use tt_common::db::init_memory_database;
use tt_common::Tune;
use tt_dispatch::{build_router, AppContext, Catalog, EngineConfig, SetEngine, SharedState};

fn catalog() -> Catalog {
    let types = ["reel", "jig", "hornpipe"];
    let keys = ["G", "D", "E minor", "A dorian"];
    Catalog::load(
        (1..=36u64)
            .map(|i| {
                Tune::new(
                    i,
                    format!("Tune {}", i),
                    types[(i % 3) as usize],
                    keys[(i % 4) as usize],
                    (400 - i * 5) as u32,
                )
            })
            .collect(),
    )
}

/// Test helper: app over the sample catalog with a database attached
async fn setup_app() -> Router {
    let db = init_memory_database().await.unwrap();
    let state = Arc::new(SharedState::new());
    let engine = SetEngine::new(catalog(), EngineConfig::immediate(), state.clone())
        .with_rng(StdRng::seed_from_u64(2024))
        .with_database(db)
        .await;
    build_router(AppContext::new(state, Arc::new(engine)))
}

/// Test helper: app without a database
fn setup_app_without_db() -> Router {
    let state = Arc::new(SharedState::new());
    let engine = SetEngine::new(catalog(), EngineConfig::immediate(), state.clone())
        .with_rng(StdRng::seed_from_u64(1));
    build_router(AppContext::new(state, Arc::new(engine)))
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send a request and return status plus parsed JSON body
async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, body)
}

fn tune_ids(body: &Value) -> Vec<u64> {
    body["tunes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_u64().unwrap())
        .collect()
}

// =============================================================================
// Health and catalog
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app().await;
    let (status, body) = send(&app, request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "tt-dispatch");
    assert_eq!(body["tunes"], 36);
    assert_eq!(body["phase"], "idle");
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let app = setup_app().await;

    let (status, body) = send(&app, request("GET", "/catalog/tunes")).await;
    assert_eq!(status, StatusCode::OK);
    let tunes = body.as_array().unwrap();
    assert_eq!(tunes.len(), 36);
    assert_eq!(tunes[0]["globalRank"], 1);
    assert_eq!(tunes[0]["type"], "jig");

    let (_, body) = send(&app, request("GET", "/catalog/types")).await;
    assert_eq!(body, json!(["any", "hornpipe", "jig", "reel"]));

    let (status, body) = send(&app, request("GET", "/catalog/keys?type=reel")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0], "any");
    assert!(body.as_array().unwrap().len() > 1);
}

#[tokio::test]
async fn test_catalog_keys_rejects_unknown_popularity() {
    let app = setup_app().await;
    let (status, body) = send(&app, request("GET", "/catalog/keys?popularity=famous")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["status"].as_str().unwrap().starts_with("error"));
}

// =============================================================================
// Filters and draws
// =============================================================================

#[tokio::test]
async fn test_filters_round_trip() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/filters",
            json!({"type": "reel", "popularity": "all", "key": "any", "mode": "strict"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "reel");
    assert_eq!(body["key"], Value::Null);
    assert_eq!(body["popularity"], "any");

    let (_, body) = send(&app, request("GET", "/filters")).await;
    assert_eq!(body["mode"], "strict");
}

#[tokio::test]
async fn test_spin_then_reset_commits() {
    let app = setup_app().await;

    let (status, body) = send(&app, request("POST", "/draw/spin")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "drawn");
    let drawn = tune_ids(&body);
    assert_eq!(drawn.len(), 3);

    let (_, body) = send(&app, request("GET", "/draw")).await;
    assert_eq!(tune_ids(&body), drawn);
    assert_eq!(body["phase"], "idle");

    let (_, body) = send(&app, request("POST", "/draw/reset")).await;
    assert_eq!(tune_ids(&body), drawn);

    let (_, body) = send(&app, request("GET", "/set")).await;
    assert_eq!(tune_ids(&body), drawn);
    let (_, body) = send(&app, request("GET", "/draw")).await;
    assert!(tune_ids(&body).is_empty());
}

#[tokio::test]
async fn test_draw_more_needs_a_draw() {
    let app = setup_app().await;

    let (status, body) = send(&app, request("POST", "/draw/more")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "empty");
    assert!(tune_ids(&body).is_empty());

    send(&app, request("POST", "/draw/spin")).await;
    let (_, body) = send(&app, request("POST", "/draw/more")).await;
    assert_eq!(body["status"], "drawn");
    assert_eq!(tune_ids(&body).len(), 1);

    let (_, body) = send(&app, request("GET", "/draw")).await;
    assert_eq!(tune_ids(&body).len(), 4);
}

#[tokio::test]
async fn test_filters_with_no_match_report_empty() {
    let app = setup_app().await;
    send(&app, json_request("POST", "/filters", json!({"type": "waltz"}))).await;

    let (_, body) = send(&app, request("POST", "/draw/spin")).await;
    assert_eq!(body["status"], "empty");
}

#[tokio::test]
async fn test_seed_spin() {
    let app = setup_app().await;

    let (status, body) = send(&app, json_request("POST", "/draw/seed", json!({"tune_id": 17}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tune_ids(&body)[0], 17);

    let (status, _) = send(&app, json_request("POST", "/draw/seed", json!({"tune_id": 999}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_spin_with_and_matching() {
    let app = setup_app().await;

    let (_, body) = send(&app, request("POST", "/draw/spin-matching")).await;
    assert_eq!(body["status"], "empty");

    let (_, body) = send(&app, json_request("POST", "/draw/spin-with", json!({"type": "hornpipe"}))).await;
    assert_eq!(body["status"], "drawn");
    assert_eq!(body["tunes"][0]["type"], "hornpipe");

    send(&app, request("POST", "/draw/reset")).await;
    let (_, set) = send(&app, request("GET", "/set")).await;
    let last = set["tunes"].as_array().unwrap().last().unwrap().clone();

    let (_, body) = send(&app, request("POST", "/draw/spin-matching")).await;
    if body["status"] == "drawn" {
        assert_eq!(body["tunes"][0]["type"], last["type"]);
        assert_eq!(body["tunes"][0]["key"], last["key"]);
    }

    let (_, filters) = send(&app, request("GET", "/filters")).await;
    assert_eq!(filters["type"], Value::Null);
}

#[tokio::test]
async fn test_move_and_remove_in_draw() {
    let app = setup_app().await;
    let (_, body) = send(&app, request("POST", "/draw/spin")).await;
    let drawn = tune_ids(&body);

    let (_, body) = send(&app, json_request("POST", "/draw/move", json!({"index": 0, "direction": "down"}))).await;
    assert_eq!(body["moved"], true);
    assert_eq!(tune_ids(&body), vec![drawn[1], drawn[0], drawn[2]]);

    let (_, body) = send(&app, json_request("POST", "/draw/move", json!({"index": 0, "direction": "up"}))).await;
    assert_eq!(body["moved"], false);

    let (status, _) = send(&app, request("DELETE", &format!("/draw/{}", drawn[2]))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, request("DELETE", &format!("/draw/{}", drawn[2]))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Working sequence and favorites
// =============================================================================

#[tokio::test]
async fn test_remove_from_set_unstars() {
    let app = setup_app().await;
    let (_, body) = send(&app, request("POST", "/draw/spin")).await;
    let drawn = tune_ids(&body);
    send(&app, request("POST", "/draw/reset")).await;

    let uri = format!("/favorites/{}/toggle", drawn[0]);
    let (_, body) = send(&app, request("POST", &uri)).await;
    assert_eq!(body["favorite"], true);
    let (_, body) = send(&app, request("GET", "/favorites")).await;
    assert_eq!(body["tune_ids"], json!([drawn[0]]));

    let (status, _) = send(&app, request("DELETE", &format!("/set/{}", drawn[0]))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, request("GET", "/favorites")).await;
    assert_eq!(body["tune_ids"], json!([]));
    let (_, body) = send(&app, request("GET", "/set")).await;
    assert!(!tune_ids(&body).contains(&drawn[0]));

    let (status, _) = send(&app, request("DELETE", &format!("/set/{}", drawn[0]))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_set() {
    let app = setup_app().await;
    send(&app, request("POST", "/draw/spin")).await;
    send(&app, request("POST", "/draw/spin")).await;

    let (status, _) = send(&app, request("POST", "/set/clear")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, request("GET", "/set")).await;
    assert!(tune_ids(&body).is_empty());
    let (_, body) = send(&app, request("GET", "/draw")).await;
    assert!(tune_ids(&body).is_empty());
}

#[tokio::test]
async fn test_edits_conflict_while_drawing() {
    let state = Arc::new(SharedState::new());
    let config = EngineConfig {
        settle_delay: Duration::from_millis(200),
        ..EngineConfig::immediate()
    };
    let engine = SetEngine::new(catalog(), config, state.clone()).with_rng(StdRng::seed_from_u64(3));
    let app = build_router(AppContext::new(state, Arc::new(engine)));

    let spin = {
        let app = app.clone();
        tokio::spawn(async move { send(&app, request("POST", "/draw/spin")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (status, body) = send(&app, request("POST", "/set/clear")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["status"].as_str().unwrap().starts_with("error"));
    let (status, _) = send(&app, request("POST", "/draw/reset")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, spun) = spin.await.unwrap();
    let (_, body) = send(&app, request("GET", "/draw")).await;
    assert_eq!(tune_ids(&body), tune_ids(&spun));
}

// =============================================================================
// Saved collections
// =============================================================================

#[tokio::test]
async fn test_collections_lifecycle() {
    let app = setup_app().await;
    send(&app, request("POST", "/draw/spin")).await;
    let (_, body) = send(&app, request("POST", "/draw/reset")).await;
    let working = tune_ids(&body);

    let (status, _) = send(&app, json_request("POST", "/collections", json!({"title": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, saved) = send(&app, json_request("POST", "/collections", json!({"title": "Reels in G"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tune_ids(&saved), working);
    let id = saved["id"].as_str().unwrap().to_string();

    let (_, list) = send(&app, request("GET", "/collections")).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["title"], "Reels in G");

    send(&app, request("POST", "/set/clear")).await;
    let (status, _) = send(&app, request("POST", &format!("/collections/{}/load", id))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, request("GET", "/set")).await;
    assert_eq!(tune_ids(&body), working);

    let (status, _) = send(&app, request("DELETE", &format!("/collections/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, request("DELETE", &format!("/collections/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, request("POST", &format!("/collections/{}/load", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_collections_unavailable_without_database() {
    let app = setup_app_without_db();

    let (status, _) = send(&app, request("GET", "/collections")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Favorites still work in memory
    let (_, body) = send(&app, request("POST", "/favorites/3/toggle")).await;
    assert_eq!(body["favorite"], true);
}
