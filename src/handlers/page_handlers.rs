use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::{debug, info, instrument, warn};

use super::card_image_url;
use crate::dto::{CardView, LoginForm};
use crate::errors::ApiError;
use crate::pages;
use crate::repo;
use crate::session;
use crate::state::AppState;

/// Handler for `/`, which only sends visitors on to the login page
pub async fn index_handler() -> Redirect {
    Redirect::to("/login")
}

/// Handler for rendering the login page
///
/// Visitors who are already signed in go straight to their profile.
#[instrument(skip_all)]
pub async fn login_page_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Response, ApiError> {
    if session::current_user(&state.pool, &jar)?.is_some() {
        return Ok(Redirect::to("/profile").into_response());
    }

    Ok(Html(pages::login_page(None, state.config.google().is_some())).into_response())
}

/// Handler for the password login form
///
/// This function handles POST requests to `/login`.
///
/// ### Arguments
///
/// * `state` - The application state
/// * `jar` - The signed session cookies
/// * `form` - The submitted user name and password
///
/// ### Returns
///
/// A redirect to `/profile` with a fresh session, or the login page with
/// status 401 when the credentials do not match
#[instrument(skip(state, jar, form), fields(username = %form.username))]
pub async fn login_submit_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    match repo::verify_credentials(&state.pool, &form.username, &form.password)? {
        Some(user) => {
            info!("User signed in with password");
            let jar = session::sign_in(jar, &user.get_username(), state.secure_cookies());
            Ok((jar, Redirect::to("/profile")).into_response())
        }
        None => {
            warn!("Rejected password login");
            let page = pages::login_page(Some("Invalid username or password"), state.config.google().is_some());
            Ok((StatusCode::UNAUTHORIZED, Html(page)).into_response())
        }
    }
}

/// Handler for `/logout`
pub async fn logout_handler(jar: SignedCookieJar) -> (SignedCookieJar, Redirect) {
    (session::sign_out(jar), Redirect::to("/login"))
}

/// Handler for the profile page listing the signed-in user's cards
#[instrument(skip_all)]
pub async fn profile_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Response, ApiError> {
    let Some(user) = session::current_user(&state.pool, &jar)? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let cards: Vec<CardView> = repo::list_cards_by_owner(&state.pool, &user.get_username())?
        .iter()
        .map(|card| {
            let url = card_image_url(&state.config.cards_folder, card).unwrap_or_default();
            CardView::new(card, url)
        })
        .collect();
    debug!("Rendering {} cards", cards.len());

    Ok(Html(pages::profile_page(&user, &cards)).into_response())
}

/// Handler for the admin card table page
///
/// Visitors without a session go to `/login`, non-admins to `/profile`.
#[instrument(skip_all)]
pub async fn table_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Response, ApiError> {
    match session::current_user(&state.pool, &jar)? {
        None => Ok(Redirect::to("/login").into_response()),
        Some(user) if !user.is_admin() => Ok(Redirect::to("/profile").into_response()),
        Some(_) => Ok(Html(pages::table_page()).into_response()),
    }
}

/// Handler for a card's secret URL
///
/// This function handles GET requests to `/card/{*key}`. Cards still owned
/// by `SYSTEM` show the claim page; anything else is a 404.
#[instrument(skip(state))]
pub async fn card_page_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let key = key.trim().trim_matches('/');
    if key.is_empty() {
        return Ok(not_found_response());
    }

    match repo::find_card_by_url_key(&state.pool, key)? {
        Some(card) if card.is_system_owned() => {
            let image = card_image_url(&state.config.cards_folder, &card);
            Ok(Html(pages::claim_page(&card, image.as_deref())).into_response())
        }
        Some(card) => {
            debug!("Card {} already has an owner", card.get_card_id());
            Ok(not_found_response())
        }
        None => Ok(not_found_response()),
    }
}

fn not_found_response() -> Response {
    (StatusCode::NOT_FOUND, Html(pages::not_found_page())).into_response()
}

/// Fallback for unknown routes
pub async fn not_found_handler() -> Response {
    not_found_response()
}
