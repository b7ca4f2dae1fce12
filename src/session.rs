//! Signed-cookie sessions.

use anyhow::{bail, Result};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use sha2::{Digest, Sha512};

use crate::db::DbPool;
use crate::models::{normalize_username, User};
use crate::repo;

/// Signed-in user name or e-mail
pub const USER_COOKIE: &str = "nakama_user";
/// OAuth `state` awaiting the Google callback
pub const OAUTH_STATE_COOKIE: &str = "nakama_oauth_state";
/// Page to continue to after the Google callback
pub const NEXT_COOKIE: &str = "nakama_next";
/// Card page a claim was started from
pub const REFERRER_COOKIE: &str = "nakama_ref";

/// Derives the cookie signing key from the configured secret
///
/// ### Errors
///
/// Fails on an empty secret
pub fn session_key(secret: &str) -> Result<Key> {
    if secret.trim().is_empty() {
        bail!("Session secret must not be empty");
    }

    let digest = Sha512::digest(secret.as_bytes());
    Ok(Key::from(digest.as_slice()))
}

/// A session cookie scoped to the whole site
pub fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Removal cookie matching [`session_cookie`]
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// The signed-in user name, if any
pub fn session_username(jar: &SignedCookieJar) -> Option<String> {
    jar.get(USER_COOKIE)
        .map(|c| normalize_username(c.value()))
        .filter(|name| !name.is_empty())
}

/// The signed-in user, if the session names a registered one
pub fn current_user(pool: &DbPool, jar: &SignedCookieJar) -> Result<Option<User>> {
    match session_username(jar) {
        Some(username) => repo::get_user(pool, &username),
        None => Ok(None),
    }
}

/// Starts a session for `username`
pub fn sign_in(jar: SignedCookieJar, username: &str, secure: bool) -> SignedCookieJar {
    jar.add(session_cookie(USER_COOKIE, normalize_username(username), secure))
}

/// Clears the session and any pending login state
pub fn sign_out(jar: SignedCookieJar) -> SignedCookieJar {
    [USER_COOKIE, OAUTH_STATE_COOKIE, NEXT_COOKIE, REFERRER_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| jar.remove(removal_cookie(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::test_utils::setup_test_db;

    fn jar() -> SignedCookieJar {
        SignedCookieJar::new(session_key("test-secret").unwrap())
    }

    #[test]
    fn test_session_key_requires_secret() {
        assert!(session_key("").is_err());
        assert!(session_key("   ").is_err());
        assert!(session_key("s3cret").is_ok());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie(USER_COOKIE, "admin".to_string(), true);

        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_sign_in_and_out() {
        let jar = sign_in(jar(), " Alice@Example.com ", false);
        assert_eq!(session_username(&jar).as_deref(), Some("alice@example.com"));

        let jar = sign_out(jar);
        assert_eq!(session_username(&jar), None);
    }

    #[test]
    fn test_current_user_requires_registration() {
        let pool = setup_test_db();
        let jar = sign_in(jar(), "bob@example.com", false);

        assert!(current_user(&pool, &jar).unwrap().is_none());

        repo::create_user(&pool, "bob@example.com", None, Role::User).unwrap();
        let user = current_user(&pool, &jar).unwrap().unwrap();
        assert_eq!(user.get_username(), "bob@example.com");
    }
}
