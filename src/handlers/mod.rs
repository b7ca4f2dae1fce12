/// Web handlers
///
/// This module contains the handlers for the pages and JSON endpoints.
/// Each handler reads the session from the signed cookie jar, calls the
/// repository or pipeline layer, and renders HTML or JSON.

mod auth_handlers;
mod card_handlers;
mod page_handlers;
mod pipeline_handlers;

// Re-export all handlers
pub use auth_handlers::*;
pub use card_handlers::*;
pub use page_handlers::*;
pub use pipeline_handlers::*;

use axum_extra::extract::cookie::SignedCookieJar;
use std::path::Path;

use crate::errors::ApiError;
use crate::models::{Card, User};
use crate::session;
use crate::state::AppState;

/// URL prefix the card images are served under
pub const CARD_IMAGE_ROUTE: &str = "/card_image";

/// The signed-in user, or `Unauthorized`
pub(crate) fn require_user(state: &AppState, jar: &SignedCookieJar) -> Result<User, ApiError> {
    session::current_user(&state.pool, jar)?.ok_or(ApiError::Unauthorized)
}

/// The signed-in admin; `Unauthorized` without a session, `Forbidden` for other users
pub(crate) fn require_admin(state: &AppState, jar: &SignedCookieJar) -> Result<User, ApiError> {
    let user = require_user(state, jar)?;
    if user.is_admin() {
        Ok(user)
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Public URL of a card's image, if a file for it exists in `cards_folder`
///
/// Tries the recorded `image_filename` first, then `<id>.png`, `<id>.jpg`
/// and `<id>.jpeg`.
pub fn card_image_url(cards_folder: &Path, card: &Card) -> Option<String> {
    let id = card.get_card_id();
    let candidates = card
        .get_image_filename()
        .into_iter()
        .chain(["png", "jpg", "jpeg"].iter().map(|ext| format!("{}.{}", id, ext)));

    for name in candidates {
        let name = name.trim();
        // Only plain file names inside the folder
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            continue;
        }
        if cards_folder.join(name).is_file() {
            return Some(format!("{}/{}", CARD_IMAGE_ROUTE, name));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardField;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_card_image_url_lookup_order() {
        let dir = tempdir().unwrap();
        let mut card = Card::new("Card_000001".to_string());

        assert_eq!(card_image_url(dir.path(), &card), None);

        fs::write(dir.path().join("Card_000001.jpeg"), b"x").unwrap();
        assert_eq!(card_image_url(dir.path(), &card).as_deref(), Some("/card_image/Card_000001.jpeg"));

        fs::write(dir.path().join("Card_000001.png"), b"x").unwrap();
        assert_eq!(card_image_url(dir.path(), &card).as_deref(), Some("/card_image/Card_000001.png"));

        fs::write(dir.path().join("custom.jpg"), b"x").unwrap();
        card.set(CardField::ImageFilename, Some("custom.jpg".to_string()));
        assert_eq!(card_image_url(dir.path(), &card).as_deref(), Some("/card_image/custom.jpg"));

        // A recorded name that is missing falls back to the id
        card.set(CardField::ImageFilename, Some("gone.png".to_string()));
        assert_eq!(card_image_url(dir.path(), &card).as_deref(), Some("/card_image/Card_000001.png"));
    }

    #[test]
    fn test_card_image_url_rejects_paths() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("a.png"), b"x").unwrap();

        let mut card = Card::new("Card_000002".to_string());
        card.set(CardField::ImageFilename, Some("sub/a.png".to_string()));
        assert_eq!(card_image_url(dir.path(), &card), None);
    }
}
