//! Google OAuth 2.0 authorization-code flow.

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::config::GoogleSettings;

const SCOPE: &str = "openid email profile";
const STATE_BYTES: usize = 24;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    email_verified: Option<bool>,
}

/// A fresh random value for the `state` parameter
pub fn new_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::rng().fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// The Google consent page URL the browser is sent to
pub fn authorize_url(settings: &GoogleSettings, state: &str) -> Result<String> {
    let mut url = Url::parse(&settings.auth_url)
        .with_context(|| format!("Invalid Google authorize URL: {}", settings.auth_url))?;

    url.query_pairs_mut()
        .append_pair("client_id", &settings.client_id)
        .append_pair("redirect_uri", &settings.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", SCOPE)
        .append_pair("state", state);

    Ok(url.into())
}

/// Trades an authorization code for an access token
#[instrument(skip_all)]
pub async fn exchange_code(http: &reqwest::Client, settings: &GoogleSettings, code: &str) -> Result<String> {
    let token: TokenResponse = http
        .post(&settings.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", settings.client_id.as_str()),
            ("client_secret", settings.client_secret.as_str()),
            ("redirect_uri", settings.redirect_uri.as_str()),
        ])
        .send()
        .await
        .context("Token request failed")?
        .error_for_status()
        .context("Token request was rejected")?
        .json()
        .await
        .context("Invalid token response")?;

    debug!("Exchanged authorization code");
    Ok(token.access_token)
}

/// Reads the signed-in account's e-mail, lower-cased
///
/// ### Errors
///
/// Fails when the account has no e-mail or Google reports it unverified
#[instrument(skip_all)]
pub async fn fetch_email(http: &reqwest::Client, settings: &GoogleSettings, access_token: &str) -> Result<String> {
    let info: UserInfo = http
        .get(&settings.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await
        .context("Userinfo request failed")?
        .error_for_status()
        .context("Userinfo request was rejected")?
        .json()
        .await
        .context("Invalid userinfo response")?;

    if info.email_verified == Some(false) {
        bail!("Google account e-mail is not verified");
    }

    info.email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| anyhow!("Google account has no e-mail"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GoogleSettings {
        GoogleSettings {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            auth_url: "https://accounts.example.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth.example.com/token".to_string(),
            userinfo_url: "https://oauth.example.com/userinfo".to_string(),
            redirect_uri: "https://nakama.example.com/auth/google/callback".to_string(),
        }
    }

    #[test]
    fn test_authorize_url_carries_parameters() {
        let url = Url::parse(&authorize_url(&settings(), "st4te").unwrap()).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.example.com"));
        assert!(pairs.contains(&("client_id".to_string(), "client-123".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "https://nakama.example.com/auth/google/callback".to_string()
        )));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "openid email profile".to_string())));
        assert!(pairs.contains(&("state".to_string(), "st4te".to_string())));
    }

    #[test]
    fn test_authorize_url_rejects_bad_endpoint() {
        let mut settings = settings();
        settings.auth_url = "not a url".to_string();
        assert!(authorize_url(&settings, "s").is_err());
    }

    #[test]
    fn test_new_state_is_random_and_url_safe() {
        let a = new_state();
        let b = new_state();

        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
