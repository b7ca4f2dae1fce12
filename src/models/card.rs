use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner and user type of a card nobody has claimed yet
pub const SYSTEM_OWNER: &str = "SYSTEM";

/// Status given to freshly generated cards
pub const DEFAULT_STATUS: &str = "STATUS_1";

/// Path segment that precedes a card's secret key in its URL
pub const CARD_URL_SEGMENT: &str = "card";

/// A column of the card table
///
/// Each field has a database column name and the upper-case header used by
/// CSV files, the admin table and Airtable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardField {
    CardId,
    PackId,
    CardDate,
    UserType,
    Owner,
    Description,
    Coins,
    UsdAmount,
    Name,
    Chain,
    Theme,
    CardType,
    CardUrl,
    CardKeys,
    Status,
    MonsterPower,
    PowerCombat,
    ImageFilename,
}

impl CardField {
    /// All fields in table order
    pub const ALL: [CardField; 18] = [
        CardField::CardId,
        CardField::PackId,
        CardField::CardDate,
        CardField::UserType,
        CardField::Owner,
        CardField::Description,
        CardField::Coins,
        CardField::UsdAmount,
        CardField::Name,
        CardField::Chain,
        CardField::Theme,
        CardField::CardType,
        CardField::CardUrl,
        CardField::CardKeys,
        CardField::Status,
        CardField::MonsterPower,
        CardField::PowerCombat,
        CardField::ImageFilename,
    ];

    /// The database column name
    pub fn column(self) -> &'static str {
        match self {
            CardField::CardId => "card_id",
            CardField::PackId => "pack_id",
            CardField::CardDate => "card_date",
            CardField::UserType => "user_type",
            CardField::Owner => "owner",
            CardField::Description => "description",
            CardField::Coins => "coins",
            CardField::UsdAmount => "usd_amount",
            CardField::Name => "name",
            CardField::Chain => "chain",
            CardField::Theme => "theme",
            CardField::CardType => "card_type",
            CardField::CardUrl => "card_url",
            CardField::CardKeys => "card_keys",
            CardField::Status => "status",
            CardField::MonsterPower => "monster_power",
            CardField::PowerCombat => "power_combat",
            CardField::ImageFilename => "image_filename",
        }
    }

    /// The external header name
    pub fn header(self) -> &'static str {
        match self {
            CardField::CardId => "CARD_ID",
            CardField::PackId => "PACK_ID",
            CardField::CardDate => "CARD_DATE",
            CardField::UserType => "USER_TYPE",
            CardField::Owner => "CARD_OWNER",
            CardField::Description => "CARD_DESCRIPTION",
            CardField::Coins => "CARD_COINS",
            CardField::UsdAmount => "USD_AMMOUNT",
            CardField::Name => "CARD_NAME",
            CardField::Chain => "CARD_CHAIN",
            CardField::Theme => "CARD_THEME",
            CardField::CardType => "CARD_TYPE",
            CardField::CardUrl => "CARD_URL",
            CardField::CardKeys => "CARD_KEYS",
            CardField::Status => "CARD_STATUS",
            CardField::MonsterPower => "MONSTER_POWER",
            CardField::PowerCombat => "POWER_COMBAT",
            CardField::ImageFilename => "IMAGE_FILENAME",
        }
    }

    /// Looks a field up by its external header, ignoring case and surrounding whitespace
    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.header().eq_ignore_ascii_case(header))
    }
}

impl fmt::Display for CardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A collectible card
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::cards)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
#[diesel(primary_key(card_id))]
pub struct Card {
    card_id: String,
    pack_id: Option<String>,
    card_date: Option<String>,
    user_type: Option<String>,
    owner: Option<String>,
    description: Option<String>,
    coins: Option<String>,
    usd_amount: Option<String>,
    name: Option<String>,
    chain: Option<String>,
    theme: Option<String>,
    card_type: Option<String>,
    card_url: Option<String>,
    card_keys: Option<String>,
    status: Option<String>,
    monster_power: Option<String>,
    power_combat: Option<String>,
    image_filename: Option<String>,
}

impl Card {
    /// Creates a card with only its ID set
    pub fn new(card_id: String) -> Self {
        Self {
            card_id,
            ..Default::default()
        }
    }

    /// Gets the card's ID
    pub fn get_card_id(&self) -> String {
        self.card_id.clone()
    }

    /// Gets the card's owner, if any
    pub fn get_owner(&self) -> Option<String> {
        self.owner.clone()
    }

    /// Gets the card's status, if any
    pub fn get_status(&self) -> Option<String> {
        self.status.clone()
    }

    /// Gets the card's URL, if any
    pub fn get_card_url(&self) -> Option<String> {
        self.card_url.clone()
    }

    /// Gets the recorded image file name, if any
    pub fn get_image_filename(&self) -> Option<String> {
        self.image_filename.clone()
    }

    /// Reads any field as a string slice
    pub fn get(&self, field: CardField) -> Option<&str> {
        match field {
            CardField::CardId => Some(self.card_id.as_str()),
            CardField::PackId => self.pack_id.as_deref(),
            CardField::CardDate => self.card_date.as_deref(),
            CardField::UserType => self.user_type.as_deref(),
            CardField::Owner => self.owner.as_deref(),
            CardField::Description => self.description.as_deref(),
            CardField::Coins => self.coins.as_deref(),
            CardField::UsdAmount => self.usd_amount.as_deref(),
            CardField::Name => self.name.as_deref(),
            CardField::Chain => self.chain.as_deref(),
            CardField::Theme => self.theme.as_deref(),
            CardField::CardType => self.card_type.as_deref(),
            CardField::CardUrl => self.card_url.as_deref(),
            CardField::CardKeys => self.card_keys.as_deref(),
            CardField::Status => self.status.as_deref(),
            CardField::MonsterPower => self.monster_power.as_deref(),
            CardField::PowerCombat => self.power_combat.as_deref(),
            CardField::ImageFilename => self.image_filename.as_deref(),
        }
    }

    /// Writes any field; an empty or whitespace-only value is stored as NULL
    pub fn set(&mut self, field: CardField, value: Option<String>) {
        let value = value.filter(|v| !v.trim().is_empty());
        let slot = match field {
            CardField::CardId => {
                self.card_id = value.unwrap_or_default();
                return;
            }
            CardField::PackId => &mut self.pack_id,
            CardField::CardDate => &mut self.card_date,
            CardField::UserType => &mut self.user_type,
            CardField::Owner => &mut self.owner,
            CardField::Description => &mut self.description,
            CardField::Coins => &mut self.coins,
            CardField::UsdAmount => &mut self.usd_amount,
            CardField::Name => &mut self.name,
            CardField::Chain => &mut self.chain,
            CardField::Theme => &mut self.theme,
            CardField::CardType => &mut self.card_type,
            CardField::CardUrl => &mut self.card_url,
            CardField::CardKeys => &mut self.card_keys,
            CardField::Status => &mut self.status,
            CardField::MonsterPower => &mut self.monster_power,
            CardField::PowerCombat => &mut self.power_combat,
            CardField::ImageFilename => &mut self.image_filename,
        };
        *slot = value;
    }

    /// True when the field is NULL or only whitespace
    pub fn is_blank(&self, field: CardField) -> bool {
        self.get(field).is_none_or(|v| v.trim().is_empty())
    }

    /// True when nobody has claimed the card yet
    pub fn is_system_owned(&self) -> bool {
        self.owner
            .as_deref()
            .is_some_and(|o| o.trim() == SYSTEM_OWNER)
    }

    /// True when the card belongs to the given user (case-insensitive)
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.owner
            .as_deref()
            .is_some_and(|o| o.trim().eq_ignore_ascii_case(username.trim()))
    }

    /// The secret key at the end of the card URL
    pub fn url_key(&self) -> Option<String> {
        self.card_url.as_deref().and_then(url_key_of)
    }
}

/// Extracts the key that follows `/card/` in a card URL
pub fn url_key_of(card_url: &str) -> Option<String> {
    let marker = format!("/{}/", CARD_URL_SEGMENT);
    let (_, key) = card_url.trim().rsplit_once(&marker)?;
    let key = key.trim_end_matches('/');
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}
