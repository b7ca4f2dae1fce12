use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::normalize_username;

/// A queued request from a signed-in e-mail to own the card at a URL
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::ownership_claims)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OwnershipClaim {
    id: String,
    email: String,
    card_url: String,
    created_at: NaiveDateTime,
}

impl OwnershipClaim {
    pub fn new(email: &str, card_url: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: normalize_username(email),
            card_url: card_url.trim().to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_email(&self) -> String {
        self.email.clone()
    }

    pub fn get_card_url(&self) -> String {
        self.card_url.clone()
    }

    pub fn get_created_at(&self) -> NaiveDateTime {
        self.created_at
    }
}
