//! Common test utilities for Nakama integration tests
//!
//! Shared helpers for building the application on a temporary database,
//! carrying session cookies between requests and running small mock servers
//! for the external services.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use nakama::{
    config::{base_config, Config},
    create_app, db,
    models::{Card, CardField, Role},
    repo, AppState,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test application with its state and the directory holding its files
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub dir: TempDir,
}

/// Configuration rooted in `dir`, with a session secret and no external services
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = base_config(Some(dir.path().to_path_buf()));
    config.session_secret = "integration-test-secret".to_string();
    config.public_base_url = "https://cards.example.com".to_string();
    config.number_of_cards = 3;
    config.images_per_run = 2;
    config.cards_folder = dir.path().join("cards");
    config.qr_codes_folder = dir.path().join("qr_codes");
    config.coins_db_json = dir.path().join("coins_db.json");
    config.descriptions_csv = dir.path().join("card_descriptions.csv");
    config.game_stats_csv = dir.path().join("game_stats.csv");
    // Nothing listens on port 1
    config.coingecko_url = "http://127.0.0.1:1".to_string();
    config
}

/// Creates a test application on a fresh SQLite file
///
/// ### Arguments
///
/// * `customize` - Adjusts the configuration before the app is built
pub fn create_test_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    customize(&mut config);

    let pool = db::init_pool(&config.database_url).unwrap();
    {
        let mut conn = pool.get().unwrap();
        db::run_migrations(&mut conn).unwrap();
    }

    let state = AppState::new(Arc::new(pool), config).unwrap();
    TestApp {
        app: create_app(state.clone()),
        state,
        dir,
    }
}

/// Creates a test application with the default test configuration
pub fn create_test_app() -> TestApp {
    create_test_app_with(|_| {})
}

/// Adds a user with a password
pub fn add_user(state: &AppState, username: &str, password: &str, role: Role) {
    let hash = bcrypt::hash(password, 4).unwrap();
    repo::create_user(&state.pool, username, Some(hash), role).unwrap();
}

/// Stores a card with the given non-blank fields
pub fn add_card(state: &AppState, card_id: &str, fields: &[(CardField, &str)]) -> Card {
    let mut card = Card::new(card_id.to_string());
    for (field, value) in fields {
        card.set(*field, Some(value.to_string()));
    }
    repo::upsert_card(&state.pool, &card).unwrap();
    card
}

/// Cookies collected from responses, sent back on later requests
#[derive(Debug, Default, Clone)]
pub struct Cookies(BTreeMap<String, String>);

impl Cookies {
    /// Records every `Set-Cookie` of a response; empty values remove the cookie
    pub fn store<B>(&mut self, response: &Response<B>) {
        for value in response.headers().get_all(header::SET_COOKIE) {
            let value = value.to_str().unwrap();
            let pair = value.split(';').next().unwrap_or_default();
            let (name, cookie) = pair.split_once('=').unwrap();
            if cookie.is_empty() {
                self.0.remove(name);
            } else {
                self.0.insert(name.to_string(), cookie.to_string());
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// The value for a `Cookie` request header
    pub fn header(&self) -> String {
        self.0
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Sends a request through the app
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

/// A GET request carrying the given cookies
pub fn get(uri: &str, cookies: &Cookies) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookies.header())
        .body(Body::empty())
        .unwrap()
}

/// A POST request with an empty body carrying the given cookies
pub fn post(uri: &str, cookies: &Cookies) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::COOKIE, cookies.header())
        .body(Body::empty())
        .unwrap()
}

/// Logs in through the password form and returns the session cookies
pub async fn login(app: &Router, username: &str, password: &str) -> Cookies {
    let form = serde_html_form::to_string([("username", username), ("password", password)]).unwrap();
    let request = Request::builder()
        .uri("/login")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();

    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER, "login failed for {}", username);

    let mut cookies = Cookies::default();
    cookies.store(&response);
    cookies
}

/// Reads the response body as text
pub async fn body_text(response: Response<Body>) -> String {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Reads the response body as JSON
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// The `Location` header of a redirect
pub fn location<B>(response: &Response<B>) -> String {
    response.headers()[header::LOCATION].to_str().unwrap().to_string()
}

/// Serves `router` on a free local port and returns its base URL
pub async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", address)
}
