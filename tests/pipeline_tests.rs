use axum::{
    extract::{Query, RawQuery, State},
    http::StatusCode,
    routing::get as route_get,
    Json, Router,
};
use nakama::airtable;
use nakama::models::{CardField, Role, DEFAULT_STATUS, SYSTEM_OWNER};
use nakama::repo;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

mod common;
use common::*;

/// Mock CoinGecko markets endpoint serving one page of coins
async fn mock_coingecko() -> String {
    let router = Router::new().route(
        "/coins/markets",
        route_get(|Query(query): Query<HashMap<String, String>>| async move {
            if query.get("page").map(String::as_str) != Some("1") {
                return Json(json!([]));
            }
            Json(json!([
                {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "market_cap": 1.0e12, "current_price": 60000.0},
                {"id": "tether", "symbol": "usdt", "name": "Tether", "market_cap": 1.0e11, "current_price": 1.0},
                {"id": "ethereum", "symbol": "eth", "name": "Ethereum", "market_cap": 4.0e11, "current_price": 3000.0},
                {"id": "solana", "symbol": "sol", "name": "Solana", "market_cap": 8.0e10, "current_price": 150.0},
                {"id": "cardano", "symbol": "ada", "name": "Cardano", "market_cap": 2.0e10, "current_price": 0.5}
            ]))
        }),
    );
    spawn_mock(router).await
}

#[tokio::test]
async fn test_pipeline_endpoints_require_admin() {
    let test = create_test_app();
    add_user(&test.state, "bob@example.com", "right", Role::User);

    let response = send(&test.app, post("/run_create_cards", &Cookies::default())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Unauthorized");

    let bob = login(&test.app, "bob@example.com", "right").await;
    let response = send(&test.app, post("/run_change_card_owner", &bob)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert!(repo::list_cards(&test.state.pool).unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let test = create_test_app();
    add_user(&test.state, "admin", "secret", Role::Admin);
    let admin = login(&test.app, "admin", "secret").await;

    let _running = test.state.pipeline_lock.lock().await;
    let response = send(&test.app, post("/run_create_cards", &admin)).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["status"], "error");
    assert!(repo::list_cards(&test.state.pool).unwrap().is_empty());
}

#[tokio::test]
async fn test_create_cards_run() {
    let coingecko = mock_coingecko().await;
    let test = create_test_app_with(|config| config.coingecko_url = coingecko);
    add_user(&test.state, "admin", "secret", Role::Admin);
    let admin = login(&test.app, "admin", "secret").await;

    let response = send(&test.app, post("/run_create_cards", &admin)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["report"]["pipeline"], "create-cards");
    let steps = body["report"]["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 22);
    assert_eq!(steps[0]["step"], "fetch-coins");
    assert_eq!(steps[0]["status"], "completed");
    // Stablecoins are dropped
    assert_eq!(steps[0]["filled"], 4);
    assert_eq!(steps.last().unwrap()["step"], "airtable-sync");
    assert_eq!(steps.last().unwrap()["status"], "skipped");

    let cards = repo::list_cards(&test.state.pool).unwrap();
    assert_eq!(cards.len(), 3);
    for card in &cards {
        assert!(card.get_card_id().starts_with("Card_"));
        assert_eq!(card.get_owner().as_deref(), Some(SYSTEM_OWNER));
        assert_eq!(card.get_status().as_deref(), Some(DEFAULT_STATUS));
        assert!(!card.get(CardField::Coins).unwrap().contains("USDT"));
        assert!(card.get_card_url().unwrap().starts_with("https://cards.example.com/card/"));
        assert!(card.get(CardField::UsdAmount).is_some());
    }

    let key = cards[0].url_key().unwrap();
    let response = send(&test.app, get(&format!("/card/{}", key), &Cookies::default())).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_failed_step_reports_500() {
    let test = create_test_app();
    add_user(&test.state, "admin", "secret", Role::Admin);
    let admin = login(&test.app, "admin", "secret").await;

    let response = send(&test.app, post("/run_create_cards", &admin)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Failed steps: fetch-coins, coins");
    // The remaining steps still ran
    assert_eq!(body["report"]["steps"][1]["status"], "completed");
    assert_eq!(repo::list_cards(&test.state.pool).unwrap().len(), 3);
}

#[tokio::test]
async fn test_change_owner_run() {
    let test = create_test_app();
    add_user(&test.state, "admin", "secret", Role::Admin);
    repo::ensure_user(&test.state.pool, "fan@example.com").unwrap();
    add_card(
        &test.state,
        "Card_000001",
        &[(CardField::Owner, SYSTEM_OWNER), (CardField::CardUrl, "https://cards.example.com/card/k1")],
    );
    repo::create_claim(&test.state.pool, "fan@example.com", "https://cards.example.com/card/k1").unwrap();

    let admin = login(&test.app, "admin", "secret").await;
    let response = send(&test.app, post("/run_change_card_owner", &admin)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["report"]["pipeline"], "change-owner");

    let card = repo::get_card(&test.state.pool, "Card_000001").unwrap().unwrap();
    assert_eq!(card.get_owner().as_deref(), Some("fan@example.com"));
    assert_eq!(card.get(CardField::UserType), Some("USER"));
    assert!(repo::list_claims(&test.state.pool).unwrap().is_empty());
}

/// Requests seen by the mock Airtable table
#[derive(Clone, Default)]
struct AirtableLog {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn mock_airtable(remote: Value) -> (String, AirtableLog) {
    let log = AirtableLog::default();
    let router = Router::new()
        .route(
            "/base1/table1",
            route_get(move |RawQuery(query): RawQuery| {
                let remote = remote.clone();
                async move {
                    assert!(query.unwrap_or_default().contains("pageSize=100"));
                    Json(json!({ "records": remote }))
                }
            })
            .delete(|State(log): State<AirtableLog>, RawQuery(query): RawQuery| async move {
                let query = query.unwrap_or_default();
                log.requests.lock().unwrap().push(("DELETE".to_string(), json!(query)));
                Json(json!({"records": []}))
            })
            .patch(|State(log): State<AirtableLog>, Json(body): Json<Value>| async move {
                log.requests.lock().unwrap().push(("PATCH".to_string(), body));
                Json(json!({"records": []}))
            })
            .post(|State(log): State<AirtableLog>, Json(body): Json<Value>| async move {
                log.requests.lock().unwrap().push(("POST".to_string(), body));
                Json(json!({"records": []}))
            }),
        )
        .with_state(log.clone());
    (spawn_mock(router).await, log)
}

#[tokio::test]
async fn test_airtable_sync_against_mock() {
    let (base_url, log) = mock_airtable(json!([
        {"id": "rec1", "fields": {"CARD_ID": "Card_999999"}},
        {"id": "rec2", "fields": {}},
        {"id": "rec3", "fields": {"CARD_ID": "Card_000001"}}
    ]))
    .await;
    let test = create_test_app_with(|config| {
        config.airtable_url = base_url;
        config.airtable_api_key = Some("key".to_string());
        config.airtable_base_id = Some("base1".to_string());
        config.airtable_table_id = Some("table1".to_string());
    });
    add_card(&test.state, "Card_000001", &[]);
    add_card(
        &test.state,
        "Card_000002",
        &[(CardField::Name, "Crown of Ash"), (CardField::ImageFilename, "Card_000002.png")],
    );
    add_card(&test.state, "Card_000003", &[]);

    let settings = test.state.config.airtable().unwrap();
    let snapshot = repo::table_snapshot(&test.state.pool).unwrap();
    let summary = airtable::sync_table(&test.state.http, &settings, &snapshot).await.unwrap();

    assert_eq!((summary.deleted, summary.updated, summary.created), (1, 1, 1));
    assert!(summary.failures.is_empty());

    let requests = log.requests.lock().unwrap();
    let methods: Vec<&str> = requests.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(methods, vec!["DELETE", "PATCH", "POST"]);
    assert!(requests[0].1.as_str().unwrap().contains("rec1"));
    assert_eq!(requests[1].1["records"][0]["id"], "rec2");
    assert_eq!(requests[1].1["records"][0]["fields"]["CARD_ID"], "Card_000002");
    assert_eq!(requests[1].1["records"][0]["fields"]["CARD_NAME"], "Crown of Ash");
    assert!(requests[1].1["records"][0]["fields"].get("IMAGE_FILENAME").is_none());
    assert_eq!(requests[2].1["records"][0]["fields"]["CARD_ID"], "Card_000003");
    assert!(requests[2].1["records"][0].get("id").is_none());
}
