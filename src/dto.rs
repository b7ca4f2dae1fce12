use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Card, CardField};
use crate::pipeline::PipelineReport;

/// Form posted by the password login page
#[derive(Deserialize, Debug)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Query string of `/google-login`
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct GoogleLoginQuery {
    /// Page to continue to after signing in; `add_card_owner` starts a claim
    pub next: Option<String>,
}

/// Query string Google sends back to the OAuth callback
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// The card table as header names plus one string map per row
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSnapshot {
    pub columns: Vec<String>,
    pub records: Vec<BTreeMap<String, String>>,
}

/// A card as shown on the profile page and returned by `/api/cards`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    /// Path of the card image
    pub url: String,
    #[serde(rename = "CARD_ID")]
    pub card_id: String,
    pub status: String,
    #[serde(rename = "CARD_CHAIN")]
    pub chain: String,
    #[serde(rename = "CARD_NAME")]
    pub name: String,
    #[serde(rename = "CARD_THEME")]
    pub theme: String,
    #[serde(rename = "CARD_TYPE")]
    pub card_type: String,
    #[serde(rename = "CARD_COINS")]
    pub coins: String,
    #[serde(rename = "USD_AMMOUNT")]
    pub usd_amount: String,
    #[serde(rename = "PACK_ID")]
    pub pack_id: String,
    #[serde(rename = "CARD_DATE")]
    pub card_date: String,
}

impl CardView {
    /// Builds the view of a card whose image lives at `image_url`
    pub fn new(card: &Card, image_url: String) -> Self {
        let text = |field: CardField| card.get(field).unwrap_or_default().to_string();
        Self {
            url: image_url,
            card_id: card.get_card_id(),
            status: text(CardField::Status),
            chain: text(CardField::Chain),
            name: text(CardField::Name),
            theme: text(CardField::Theme),
            card_type: text(CardField::CardType),
            coins: text(CardField::Coins),
            usd_amount: text(CardField::UsdAmount),
            pack_id: text(CardField::PackId),
            card_date: text(CardField::CardDate),
        }
    }
}

/// Response body of the pipeline endpoints
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PipelineRunResponse {
    /// `success` or `error`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PipelineReport>,
}

impl PipelineRunResponse {
    pub fn success(report: PipelineReport) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            report: Some(report),
        }
    }

    pub fn error(message: impl Into<String>, report: Option<PipelineReport>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
            report,
        }
    }
}

#[cfg(test)]
mod tests;
