use crate::db::DbPool;
use crate::dto::TableSnapshot;
use crate::models::{Card, CardField, CARD_URL_SEGMENT, SYSTEM_OWNER};
use crate::schema::cards;
use anyhow::{anyhow, Result};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// Binds `$col` to the diesel column behind a mutable `CardField` and evaluates `$body`
///
/// `card_id` is the primary key and never written or treated as blank.
macro_rules! with_column {
    ($field:expr, $col:ident => $body:expr) => {
        match $field {
            CardField::CardId => Err(anyhow!("card_id is immutable")),
            CardField::PackId => { let $col = cards::pack_id; $body }
            CardField::CardDate => { let $col = cards::card_date; $body }
            CardField::UserType => { let $col = cards::user_type; $body }
            CardField::Owner => { let $col = cards::owner; $body }
            CardField::Description => { let $col = cards::description; $body }
            CardField::Coins => { let $col = cards::coins; $body }
            CardField::UsdAmount => { let $col = cards::usd_amount; $body }
            CardField::Name => { let $col = cards::name; $body }
            CardField::Chain => { let $col = cards::chain; $body }
            CardField::Theme => { let $col = cards::theme; $body }
            CardField::CardType => { let $col = cards::card_type; $body }
            CardField::CardUrl => { let $col = cards::card_url; $body }
            CardField::CardKeys => { let $col = cards::card_keys; $body }
            CardField::Status => { let $col = cards::status; $body }
            CardField::MonsterPower => { let $col = cards::monster_power; $body }
            CardField::PowerCombat => { let $col = cards::power_combat; $body }
            CardField::ImageFilename => { let $col = cards::image_filename; $body }
        }
    };
}

/// Inserts bare cards that only carry their ID
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `ids` - The new card IDs
///
/// ### Returns
///
/// The number of inserted rows
///
/// ### Errors
///
/// Returns an error if any ID already exists; no row is inserted in that case
#[instrument(skip(pool, ids), fields(count = ids.len()))]
pub fn insert_cards(pool: &DbPool, ids: &[String]) -> Result<usize> {
    let conn = &mut pool.get()?;

    let new_cards: Vec<Card> = ids.iter().cloned().map(Card::new).collect();

    let inserted = diesel::insert_into(cards::table)
        .values(&new_cards)
        .execute(conn)?;

    debug!("Inserted {} cards", inserted);
    Ok(inserted)
}

/// Retrieves a card by its ID
pub fn get_card(pool: &DbPool, card_id: &str) -> Result<Option<Card>> {
    let conn = &mut pool.get()?;

    let card = cards::table
        .find(card_id)
        .select(Card::as_select())
        .first(conn)
        .optional()
        .map_err(|e| anyhow!("Failed to get card: {}", e))?;

    Ok(card)
}

/// Lists every card in `card_id` order
pub fn list_cards(pool: &DbPool) -> Result<Vec<Card>> {
    let conn = &mut pool.get()?;
    load_all(conn)
}

fn load_all(conn: &mut SqliteConnection) -> Result<Vec<Card>> {
    let result = cards::table
        .order(cards::card_id.asc())
        .select(Card::as_select())
        .load(conn)?;
    Ok(result)
}

/// Lists every card ID in order
pub fn list_card_ids(pool: &DbPool) -> Result<Vec<String>> {
    let conn = &mut pool.get()?;

    let ids = cards::table
        .order(cards::card_id.asc())
        .select(cards::card_id)
        .load::<String>(conn)?;

    Ok(ids)
}

/// Lists the cards owned by a user
///
/// The owner match ignores case and surrounding whitespace, so cards imported
/// with a differently cased e-mail still show up.
pub fn list_cards_by_owner(pool: &DbPool, owner: &str) -> Result<Vec<Card>> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Ok(Vec::new());
    }

    let conn = &mut pool.get()?;
    let owned = load_all(conn)?
        .into_iter()
        .filter(|card| card.is_owned_by(owner))
        .collect();

    Ok(owned)
}

/// Finds the card whose URL ends with `/card/<key>`
#[instrument(skip(pool))]
pub fn find_card_by_url_key(pool: &DbPool, key: &str) -> Result<Option<Card>> {
    let key = key.trim().trim_matches('/');
    if key.is_empty() {
        return Ok(None);
    }

    let conn = &mut pool.get()?;

    // LIKE narrows the candidates; `_` is a wildcard and matching is
    // case-insensitive, so the key is compared exactly afterwards.
    let pattern = format!("%/{}/{}%", CARD_URL_SEGMENT, key);
    let candidates = cards::table
        .filter(cards::card_url.like(pattern))
        .order(cards::card_id.asc())
        .select(Card::as_select())
        .load(conn)?;

    Ok(candidates
        .into_iter()
        .find(|card| card.url_key().as_deref() == Some(key)))
}

/// Lists IDs of cards whose `field` is blank
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `field` - The column to inspect
/// * `limit` - The maximum number of IDs to return, or `None` for all
///
/// ### Returns
///
/// Card IDs in ascending order
pub fn card_ids_missing(pool: &DbPool, field: CardField, limit: Option<usize>) -> Result<Vec<String>> {
    let conn = &mut pool.get()?;
    ids_missing(conn, field, limit)
}

fn ids_missing(conn: &mut SqliteConnection, field: CardField, limit: Option<usize>) -> Result<Vec<String>> {
    with_column!(field, col => {
        let query = cards::table
            .filter(col.is_null().or(col.eq("")))
            .order(cards::card_id.asc())
            .select(cards::card_id)
            .into_boxed::<diesel::sqlite::Sqlite>();
        let query = match limit {
            Some(limit) => query.limit(i64::try_from(limit).unwrap_or(i64::MAX)),
            None => query,
        };
        Ok(query.load::<String>(conn)?)
    })
}

/// Overwrites one cell of a card
///
/// ### Returns
///
/// The number of updated rows (0 when the card does not exist)
///
/// ### Errors
///
/// Returns an error for `CardField::CardId`, which is immutable
pub fn update_card_field(pool: &DbPool, card_id: &str, field: CardField, value: Option<&str>) -> Result<usize> {
    let conn = &mut pool.get()?;
    let value = value.filter(|v| !v.trim().is_empty());

    with_column!(field, col => {
        Ok(diesel::update(cards::table.find(card_id))
            .set(col.eq(value))
            .execute(conn)?)
    })
}

/// Fills blank cells of a column
///
/// Cards with a blank `field` are visited in `card_id` order and given the
/// value produced by `value_fn` for their ID, until `limit` cells are filled.
/// A `None` from `value_fn` skips that card. The update is guarded on the
/// cell still being blank, so a non-empty cell is never overwritten.
///
/// `value_fn` runs inside a write transaction and must not use the pool.
///
/// ### Returns
///
/// The number of cells filled
#[instrument(skip(pool, value_fn))]
pub fn fill_missing<F>(pool: &DbPool, field: CardField, limit: Option<usize>, mut value_fn: F) -> Result<usize>
where
    F: FnMut(&str) -> Option<String>,
{
    let conn = &mut pool.get()?;

    let filled = conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let ids = ids_missing(conn, field, None)?;
        let mut filled = 0;

        for id in ids {
            if limit.is_some_and(|limit| filled >= limit) {
                break;
            }
            let Some(value) = value_fn(&id).filter(|v| !v.trim().is_empty()) else {
                continue;
            };

            filled += with_column!(field, col => {
                Ok::<usize, anyhow::Error>(
                    diesel::update(
                        cards::table
                            .find(&id)
                            .filter(col.is_null().or(col.eq(""))),
                    )
                    .set(col.eq(value))
                    .execute(conn)?,
                )
            })?;
        }

        Ok(filled)
    })?;

    debug!("Filled {} {} cells", filled, field);
    Ok(filled)
}

/// The set of non-blank values of a column
pub fn distinct_values(pool: &DbPool, field: CardField) -> Result<BTreeSet<String>> {
    let conn = &mut pool.get()?;

    if field == CardField::CardId {
        return Ok(cards::table
            .select(cards::card_id)
            .load::<String>(conn)?
            .into_iter()
            .collect());
    }

    let values: Vec<Option<String>> = with_column!(field, col => {
        Ok::<_, anyhow::Error>(cards::table.select(col).distinct().load(conn)?)
    })?;

    Ok(values
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}

/// Inserts a card or replaces the stored row with the same ID
pub fn upsert_card(pool: &DbPool, card: &Card) -> Result<()> {
    let conn = &mut pool.get()?;

    if card.get_card_id().trim().is_empty() {
        return Err(anyhow!("Card has no ID"));
    }

    diesel::replace_into(cards::table)
        .values(card)
        .execute(conn)?;

    Ok(())
}

/// Gives a card to a new owner if, and only if, it is still owned by `SYSTEM`
///
/// ### Returns
///
/// `true` when the owner was changed
pub fn claim_system_card(pool: &DbPool, card_id: &str, new_owner: &str) -> Result<bool> {
    let conn = &mut pool.get()?;

    let updated = diesel::update(
        cards::table
            .find(card_id)
            .filter(cards::owner.eq(SYSTEM_OWNER)),
    )
    .set(cards::owner.eq(new_owner.trim()))
    .execute(conn)?;

    Ok(updated > 0)
}

/// The whole card table as header names and string records
///
/// Blank cells are rendered as empty strings.
pub fn table_snapshot(pool: &DbPool) -> Result<TableSnapshot> {
    let cards = list_cards(pool)?;

    let columns = CardField::ALL
        .iter()
        .map(|field| field.header().to_string())
        .collect();

    let records = cards
        .iter()
        .map(|card| {
            CardField::ALL
                .iter()
                .map(|field| {
                    (
                        field.header().to_string(),
                        card.get(*field).unwrap_or_default().to_string(),
                    )
                })
                .collect::<BTreeMap<_, _>>()
        })
        .collect();

    Ok(TableSnapshot { columns, records })
}


#[cfg(test)]
mod prop_tests;
