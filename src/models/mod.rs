/// Data models module
///
/// This module defines the records stored in the database (cards, users and
/// ownership claims) and the coin listings kept in the coins file.

mod role;
pub use role::Role;

mod card;
pub use card::{url_key_of, Card, CardField, CARD_URL_SEGMENT, DEFAULT_STATUS, SYSTEM_OWNER};

mod user;
pub use user::{normalize_username, User};

mod ownership_claim;
pub use ownership_claim::OwnershipClaim;

mod coin;
pub use coin::CoinListing;
