use anyhow::{anyhow, bail};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::{info, instrument, warn};

use crate::dto::{GoogleLoginQuery, OAuthCallbackQuery};
use crate::errors::ApiError;
use crate::oauth;
use crate::pipeline::{run_pipeline, Pipeline};
use crate::repo;
use crate::session::{self, NEXT_COOKIE, OAUTH_STATE_COOKIE, REFERRER_COOKIE};
use crate::state::AppState;

/// `next` value that turns a Google login into an ownership claim
pub const ADD_CARD_OWNER: &str = "add_card_owner";

/// Pages a Google login may continue to
const KNOWN_PAGES: [&str; 2] = ["profile", "table"];

fn clear_pending(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(session::removal_cookie(OAUTH_STATE_COOKIE))
        .remove(session::removal_cookie(NEXT_COOKIE))
        .remove(session::removal_cookie(REFERRER_COOKIE))
}

/// Handler for starting a Google login
///
/// This function handles GET requests to `/google-login`. It stores a fresh
/// OAuth `state`, the requested `next` page and, for claims, the card page
/// the visitor came from, then redirects to Google.
#[instrument(skip(state, jar, headers))]
pub async fn google_login_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    headers: HeaderMap,
    Query(query): Query<GoogleLoginQuery>,
) -> Result<Response, ApiError> {
    let Some(google) = state.config.google() else {
        warn!("Google login requested but not configured");
        return Ok(Redirect::to("/login").into_response());
    };

    let csrf = oauth::new_state();
    let authorize = oauth::authorize_url(&google, &csrf)?;
    let secure = state.secure_cookies();

    let mut jar = clear_pending(jar).add(session::session_cookie(OAUTH_STATE_COOKIE, csrf, secure));

    if let Some(next) = query.next.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        if next == ADD_CARD_OWNER {
            match headers.get(header::REFERER).and_then(|v| v.to_str().ok()) {
                Some(referrer) => {
                    jar = jar.add(session::session_cookie(REFERRER_COOKIE, referrer.to_string(), secure));
                }
                None => warn!("Claim started without a Referer"),
            }
        }
        jar = jar.add(session::session_cookie(NEXT_COOKIE, next, secure));
    }

    Ok((jar, Redirect::to(&authorize)).into_response())
}

/// Handler for Google's redirect back to the site
///
/// This function handles GET requests to `/auth/google/callback`. Any
/// failure sends the visitor back to `/login`.
#[instrument(skip_all)]
pub async fn google_callback_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(query): Query<OAuthCallbackQuery>,
) -> Response {
    match complete_google_login(&state, &jar, query).await {
        Ok((email, target)) => {
            info!("Google login for {}", email);
            let jar = session::sign_in(clear_pending(jar), &email, state.secure_cookies());
            (jar, Redirect::to(&target)).into_response()
        }
        Err(e) => {
            warn!("Google login failed: {:#}", e);
            (clear_pending(jar), Redirect::to("/login")).into_response()
        }
    }
}

/// Verifies the callback, registers the user and resolves where to go next
async fn complete_google_login(
    state: &AppState,
    jar: &SignedCookieJar,
    query: OAuthCallbackQuery,
) -> anyhow::Result<(String, String)> {
    if let Some(error) = query.error {
        bail!("Google returned an error: {}", error);
    }

    let google = state
        .config
        .google()
        .ok_or_else(|| anyhow!("Google login is not configured"))?;

    let expected = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| anyhow!("No OAuth state in the session"))?;
    if query.state.as_deref() != Some(expected.as_str()) {
        bail!("OAuth state mismatch");
    }

    let code = query
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| anyhow!("Callback has no authorization code"))?;

    let token = oauth::exchange_code(&state.http, &google, &code).await?;
    let email = oauth::fetch_email(&state.http, &google, &token).await?;
    repo::ensure_user(&state.pool, &email)?;

    let next = jar.get(NEXT_COOKIE).map(|c| c.value().to_string());
    let target = match next.as_deref() {
        Some(ADD_CARD_OWNER) => {
            match jar.get(REFERRER_COOKIE).map(|c| c.value().to_string()) {
                Some(card_url) => {
                    repo::create_claim(&state.pool, &email, &card_url)?;
                    let _running = state.pipeline_lock.lock().await;
                    let report = run_pipeline(&state.pipeline_context(), Pipeline::ChangeOwner).await;
                    if report.has_failures() {
                        warn!("Change-owner pipeline failed steps: {:?}", report.failed_steps());
                    }
                }
                None => warn!("Claim for {} has no card URL", email),
            }
            "/profile".to_string()
        }
        Some(page) if KNOWN_PAGES.contains(&page) => format!("/{}", page),
        _ => "/profile".to_string(),
    };

    Ok((email, target))
}
