use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use axum_extra::extract::cookie::SignedCookieJar;
use futures::stream::{self, Stream};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::{card_image_url, require_admin};
use crate::db::DbPool;
use crate::dto::{CardView, TableSnapshot};
use crate::errors::ApiError;
use crate::repo;
use crate::session;
use crate::state::AppState;

/// How often `/stream` checks the table for changes
pub const STREAM_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Handler for listing the signed-in user's cards
///
/// This function handles GET requests to `/api/cards`.
///
/// ### Returns
///
/// The user's cards that have an image file, as JSON
#[instrument(skip_all)]
pub async fn api_cards_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Json<Vec<CardView>>, ApiError> {
    let username = session::session_username(&jar).ok_or(ApiError::Unauthorized)?;

    let cards: Vec<CardView> = repo::list_cards_by_owner(&state.pool, &username)?
        .iter()
        .filter_map(|card| {
            let url = card_image_url(&state.config.cards_folder, card)?;
            Some(CardView::new(card, url))
        })
        .collect();

    debug!("Returning {} cards", cards.len());
    Ok(Json(cards))
}

/// Handler for the whole card table as JSON (admin only)
#[instrument(skip_all)]
pub async fn get_users_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Json<TableSnapshot>, ApiError> {
    require_admin(&state, &jar)?;

    let snapshot = repo::table_snapshot(&state.pool)?;
    Ok(Json(snapshot))
}

/// Server-sent events carrying the card table each time it changes
///
/// The first event is sent immediately; after that the table is polled
/// every [`STREAM_POLL_INTERVAL`].
pub fn table_events(pool: Arc<DbPool>) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold((pool, None::<TableSnapshot>), |(pool, last)| async move {
        loop {
            match repo::table_snapshot(&pool) {
                Ok(snapshot) if last.as_ref() != Some(&snapshot) => {
                    let event = Event::default().json_data(&snapshot);
                    return Some((event, (pool, Some(snapshot))));
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to read card table: {:#}", e),
            }
            tokio::time::sleep(STREAM_POLL_INTERVAL).await;
        }
    })
}

/// Handler for `/stream` (admin only)
#[instrument(skip_all)]
pub async fn stream_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let admin = require_admin(&state, &jar)?;
    info!("{} subscribed to table updates", admin.get_username());

    Ok(Sse::new(table_events(state.pool.clone())).keep_alive(KeepAlive::default()))
}
