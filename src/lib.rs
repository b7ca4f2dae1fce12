/// Nakama: a collectible card service
///
/// This library provides the core functionality behind the Nakama site:
/// the card store, the card generation pipeline, the Airtable mirror and
/// the web interface where people sign in and claim cards.
///
/// ### Modules
///
/// - `db`: Database connection management
/// - `models`: Cards, users and ownership claims
/// - `repo`: Repository layer for database operations
/// - `pipeline`: The ordered steps that create and update cards
/// - `coingecko`, `airtable`, `oauth`: Clients for external services
/// - `handlers`, `pages`: The web interface
///
/// ### Web interface
///
/// - `GET /login`, `POST /login`: Password login
/// - `GET /google-login`, `GET /auth/google/callback`: Google login
/// - `GET /profile`: The signed-in user's cards
/// - `GET /card/{*key}`: Claim page behind a card's secret URL
/// - `GET /api/cards`: The signed-in user's cards as JSON
/// - `GET /table`, `GET /get_users`, `GET /stream`: Live card table (admins)
/// - `POST /run_create_cards`, `POST /run_change_card_owner`: Pipelines (admins)

/// Mirror of the card table in Airtable
pub mod airtable;

/// CoinGecko market data client
pub mod coingecko;

/// Layered configuration
pub mod config;

/// Database connection module
pub mod db;

/// Request and response bodies
pub mod dto;

/// API error type
pub mod errors;

/// Web handlers
pub mod handlers;

/// CSV import and export
pub mod import;

/// Data models module
pub mod models;

/// Google OAuth client
pub mod oauth;

/// HTML pages
pub mod pages;

/// Card generation pipeline
pub mod pipeline;

/// Repository module for database operations
pub mod repo;

/// Database schema module
pub mod schema;

/// Signed-cookie sessions
pub mod session;

/// Shared application state
pub mod state;

/// Logging setup
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

pub use db::run_migrations;
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use handlers::*;

/// Creates the application router with all routes configured
///
/// ### Arguments
///
/// * `state` - The shared application state
///
/// ### Returns
///
/// An Axum Router configured with all pages and endpoints
pub fn create_app(state: AppState) -> Router {
    let images = ServeDir::new(&state.config.cards_folder);

    Router::new()
        // Login and sessions
        .route("/", get(index_handler))
        .route("/login", get(login_page_handler).post(login_submit_handler))
        .route("/google-login", get(google_login_handler))
        .route("/auth/google/callback", get(google_callback_handler))
        .route("/logout", get(logout_handler))
        // Pages
        .route("/profile", get(profile_handler))
        .route("/table", get(table_handler))
        .route("/card/{*key}", get(card_page_handler))
        // JSON and event endpoints
        .route("/api/cards", get(api_cards_handler))
        .route("/get_users", get(get_users_handler))
        .route("/stream", get(stream_handler))
        // Pipelines
        .route("/run_create_cards", post(run_create_cards_handler))
        .route("/run_change_card_owner", post(run_change_card_owner_handler))
        // Card image files
        .nest_service(CARD_IMAGE_ROUTE, images)
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
