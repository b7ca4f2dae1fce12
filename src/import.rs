//! CSV import into, and export out of, the SQLite store.

use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::db::DbPool;
use crate::models::{normalize_username, Card, CardField, Role, User};
use crate::pipeline::seeds;
use crate::repo;

const USERNAME_HEADER: &str = "USER_WHITELIST";
const PASSWORD_HEADER: &str = "PASSWORD";
/// Always an admin, whatever the admin list says
const DEFAULT_ADMIN: &str = "admin";

fn header_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

/// Imports cards from a CSV with the external column headers
///
/// Unknown columns are ignored and rows without a `CARD_ID` skipped. An
/// existing card with the same ID is replaced.
///
/// ### Returns
///
/// The number of imported cards
#[instrument(skip(pool))]
pub fn import_cards(pool: &DbPool, path: &Path) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let columns: Vec<Option<CardField>> = reader
        .headers()?
        .iter()
        .map(CardField::from_header)
        .collect();
    if !columns.contains(&Some(CardField::CardId)) {
        return Err(anyhow!("{} has no {} column", path.display(), CardField::CardId.header()));
    }

    let mut imported = 0;
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Invalid row {} in {}", line + 2, path.display()))?;

        let mut card = Card::default();
        for (field, value) in columns.iter().zip(record.iter()) {
            if let Some(field) = field {
                card.set(*field, Some(value.trim().to_string()));
            }
        }

        if card.get_card_id().is_empty() {
            warn!("Skipping row {} without a card id", line + 2);
            continue;
        }

        repo::upsert_card(pool, &card)?;
        imported += 1;
    }

    info!("Imported {} cards from {}", imported, path.display());
    Ok(imported)
}

/// Turns a stored password into a bcrypt hash
///
/// Values that already are bcrypt hashes are kept; an empty one means no
/// password login.
fn password_hash(password: &str) -> Result<Option<String>> {
    let password = password.trim();
    if password.is_empty() {
        Ok(None)
    } else if password.starts_with("$2") {
        Ok(Some(password.to_string()))
    } else {
        repo::hash_password(password).map(Some)
    }
}

/// Imports users from a `USER_WHITELIST,PASSWORD` CSV
///
/// Users named in the first column of `admins` (after its header row), and
/// the user `admin`, get the `ADMIN` role; everybody else is a `USER`.
///
/// ### Returns
///
/// The number of imported users
#[instrument(skip(pool))]
pub fn import_users(pool: &DbPool, path: &Path, admins: Option<&Path>) -> Result<usize> {
    let admin_names: HashSet<String> = match admins {
        Some(admins) => seeds::first_column_values(admins)?
            .iter()
            .map(|name| normalize_username(name))
            .collect(),
        None => HashSet::new(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let name_index = header_index(&headers, USERNAME_HEADER)
        .ok_or_else(|| anyhow!("{} has no {} column", path.display(), USERNAME_HEADER))?;
    let password_index = header_index(&headers, PASSWORD_HEADER);

    let mut imported = 0;
    for record in reader.records() {
        let record = record?;
        let username = normalize_username(record.get(name_index).unwrap_or_default());
        if username.is_empty() {
            continue;
        }

        let password = password_index
            .and_then(|i| record.get(i))
            .unwrap_or_default();
        let role = if username == DEFAULT_ADMIN || admin_names.contains(&username) {
            Role::Admin
        } else {
            Role::User
        };

        repo::upsert_user(pool, &User::new(&username, password_hash(password)?, role))?;
        imported += 1;
    }

    info!("Imported {} users from {}", imported, path.display());
    Ok(imported)
}

/// Writes the card table to a CSV with the external column headers
///
/// ### Returns
///
/// The number of exported cards
#[instrument(skip(pool))]
pub fn export_cards(pool: &DbPool, path: &Path) -> Result<usize> {
    let snapshot = repo::table_snapshot(pool)?;

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(&snapshot.columns)?;
    for record in &snapshot.records {
        writer.write_record(
            snapshot
                .columns
                .iter()
                .map(|c| record.get(c).map(String::as_str).unwrap_or_default()),
        )?;
    }
    writer.flush()?;

    info!("Exported {} cards to {}", snapshot.records.len(), path.display());
    Ok(snapshot.records.len())
}
