use anyhow::{anyhow, bail, Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::generators::{self, CARD_ID_PREFIX, MIN_COINS_PER_CARD, PACK_ID_PREFIX};
use super::seeds;
use super::{PipelineContext, StepOutcome};
use crate::airtable;
use crate::coingecko::{self, TOP_COINS_LIMIT};
use crate::db::DbPool;
use crate::models::{url_key_of, normalize_username, CardField, DEFAULT_STATUS, SYSTEM_OWNER};
use crate::repo;

const MONSTER_POWER_HEADER: &str = "MONSTER_POWER";
const POWER_COMBAT_HEADER: &str = "POWER_COMBAT";
const CARD_FILE_PREFIX: &str = "Card_";

/// Fills up to `number_of_cards` blank cells of `field` with one fixed value
fn fill_constant(ctx: &PipelineContext, field: CardField, value: &str) -> Result<StepOutcome> {
    let filled = repo::fill_missing(&ctx.pool, field, Some(ctx.config.number_of_cards), |_| {
        Some(value.to_string())
    })?;
    Ok(StepOutcome::completed(filled))
}

pub(super) async fn fetch_coins(ctx: &PipelineContext) -> Result<StepOutcome> {
    let coins = coingecko::fetch_top_coins(&ctx.http, &ctx.config.coingecko_url, TOP_COINS_LIMIT).await?;
    if coins.is_empty() {
        bail!("CoinGecko returned no usable coins");
    }

    coingecko::save_coins(&ctx.config.coins_db_json, &coins)?;
    Ok(StepOutcome::completed(coins.len()))
}

pub(super) fn card_ids(ctx: &PipelineContext) -> Result<StepOutcome> {
    let existing: HashSet<String> = repo::list_card_ids(&ctx.pool)?.into_iter().collect();
    let ids = generators::unique_ids(
        &mut rand::rng(),
        CARD_ID_PREFIX,
        ctx.config.number_of_cards,
        &existing,
    )?;

    let inserted = repo::insert_cards(&ctx.pool, &ids)?;
    debug!("New cards: {:?}", ids);
    Ok(StepOutcome::completed(inserted))
}

pub(super) fn pack_id(ctx: &PipelineContext) -> Result<StepOutcome> {
    let existing: HashSet<String> = repo::distinct_values(&ctx.pool, CardField::PackId)?
        .into_iter()
        .collect();
    let pack = generators::unique_ids(&mut rand::rng(), PACK_ID_PREFIX, 1, &existing)?
        .pop()
        .ok_or_else(|| anyhow!("No pack id generated"))?;

    info!("Pack for this run: {}", pack);
    fill_constant(ctx, CardField::PackId, &pack)
}

pub(super) fn card_date(ctx: &PipelineContext) -> Result<StepOutcome> {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    fill_constant(ctx, CardField::CardDate, &today)
}

pub(super) fn user_type(ctx: &PipelineContext) -> Result<StepOutcome> {
    fill_constant(ctx, CardField::UserType, SYSTEM_OWNER)
}

pub(super) fn owner(ctx: &PipelineContext) -> Result<StepOutcome> {
    fill_constant(ctx, CardField::Owner, SYSTEM_OWNER)
}

pub(super) fn coins(ctx: &PipelineContext) -> Result<StepOutcome> {
    let symbols = coingecko::load_coin_symbols(&ctx.config.coins_db_json)?;
    if symbols.len() < MIN_COINS_PER_CARD {
        bail!(
            "{} holds {} coins, at least {} needed",
            ctx.config.coins_db_json.display(),
            symbols.len(),
            MIN_COINS_PER_CARD
        );
    }

    let mut rng = rand::rng();
    let filled = repo::fill_missing(&ctx.pool, CardField::Coins, Some(ctx.config.number_of_cards), |_| {
        generators::sample_coins(&mut rng, &symbols).ok()
    })?;
    Ok(StepOutcome::completed(filled))
}

pub(super) fn usd_amount(ctx: &PipelineContext) -> Result<StepOutcome> {
    let coins_by_card: HashMap<String, String> = repo::list_cards(&ctx.pool)?
        .into_iter()
        .filter_map(|card| {
            let coins = card.get(CardField::Coins)?.to_string();
            Some((card.get_card_id(), coins))
        })
        .collect();

    let mut rng = rand::rng();
    let filled = repo::fill_missing(&ctx.pool, CardField::UsdAmount, Some(ctx.config.number_of_cards), |id| {
        let coins = coins_by_card.get(id)?;
        match generators::usd_amounts_for(&mut rng, coins) {
            Ok(amounts) => amounts,
            Err(e) => {
                warn!("No USD amounts for {}: {:#}", id, e);
                None
            }
        }
    })?;
    Ok(StepOutcome::completed(filled))
}

pub(super) fn name(ctx: &PipelineContext) -> Result<StepOutcome> {
    let mut rng = rand::rng();
    let filled = repo::fill_missing(&ctx.pool, CardField::Name, Some(ctx.config.number_of_cards), |_| {
        Some(generators::legendary_name(&mut rng))
    })?;
    Ok(StepOutcome::completed(filled))
}

pub(super) fn chain(ctx: &PipelineContext) -> Result<StepOutcome> {
    let chain = generators::pick_one(&mut rand::rng(), &generators::BLOCKCHAINS)?;
    info!("Chain for this run: {}", chain);
    fill_constant(ctx, CardField::Chain, &chain)
}

pub(super) fn theme(ctx: &PipelineContext) -> Result<StepOutcome> {
    let theme = generators::pick_one(&mut rand::rng(), &generators::THEMES)?;
    info!("Theme for this run: {}", theme);
    fill_constant(ctx, CardField::Theme, &theme)
}

pub(super) fn card_type(ctx: &PipelineContext) -> Result<StepOutcome> {
    let mut rng = rand::rng();
    let filled = repo::fill_missing(&ctx.pool, CardField::CardType, Some(ctx.config.number_of_cards), |_| {
        generators::pick_one(&mut rng, &generators::CARD_TYPES).ok()
    })?;
    Ok(StepOutcome::completed(filled))
}

pub(super) fn keys(ctx: &PipelineContext) -> Result<StepOutcome> {
    let mut rng = rand::rng();
    let urls = repo::fill_missing(&ctx.pool, CardField::CardUrl, None, |_| {
        Some(generators::url_key(&mut rng))
    })?;
    let keys = repo::fill_missing(&ctx.pool, CardField::CardKeys, None, |_| {
        Some(generators::url_key(&mut rng))
    })?;
    Ok(StepOutcome::completed(urls + keys))
}

pub(super) fn url(ctx: &PipelineContext) -> Result<StepOutcome> {
    let prefix = generators::card_url_prefix(&ctx.config.public_base_url)?;

    let mut rewritten = 0;
    for card in repo::list_cards(&ctx.pool)? {
        let Some(new_url) = card
            .get(CardField::CardUrl)
            .and_then(|current| generators::rewrite_card_url(current, &prefix))
        else {
            continue;
        };
        rewritten += repo::update_card_field(&ctx.pool, &card.get_card_id(), CardField::CardUrl, Some(&new_url))?;
    }

    Ok(StepOutcome::completed(rewritten))
}

/// Cycles `values` over every blank cell of `field`
fn fill_cycled(ctx: &PipelineContext, field: CardField, values: Vec<String>, source: &Path) -> Result<StepOutcome> {
    if values.is_empty() {
        return Ok(StepOutcome::skipped(format!("no values in {}", source.display())));
    }

    let mut cycle = values.iter().cycle();
    let filled = repo::fill_missing(&ctx.pool, field, None, |_| cycle.next().cloned())?;
    Ok(StepOutcome::completed(filled))
}

pub(super) fn monster_power(ctx: &PipelineContext) -> Result<StepOutcome> {
    let path = &ctx.config.game_stats_csv;
    let values = seeds::column_values(path, MONSTER_POWER_HEADER)?;
    fill_cycled(ctx, CardField::MonsterPower, values, path)
}

pub(super) fn power_combat(ctx: &PipelineContext) -> Result<StepOutcome> {
    let path = &ctx.config.game_stats_csv;
    let values = seeds::column_values(path, POWER_COMBAT_HEADER)?;
    fill_cycled(ctx, CardField::PowerCombat, values, path)
}

pub(super) fn description(ctx: &PipelineContext) -> Result<StepOutcome> {
    let path = &ctx.config.descriptions_csv;
    let values = seeds::first_column_values(path)?;
    fill_cycled(ctx, CardField::Description, values, path)
}

pub(super) async fn qr_codes(ctx: &PipelineContext) -> Result<StepOutcome> {
    let pool = ctx.pool.clone();
    let folder = ctx.config.qr_codes_folder.clone();

    let written = tokio::task::spawn_blocking(move || write_qr_codes(&pool, &folder)).await??;
    Ok(StepOutcome::completed(written))
}

fn write_qr_codes(pool: &DbPool, folder: &Path) -> Result<usize> {
    fs::create_dir_all(folder).with_context(|| format!("Failed to create {}", folder.display()))?;

    let mut written = 0;
    for card in repo::list_cards(pool)? {
        let Some(url) = card.get(CardField::CardUrl).filter(|u| !u.trim().is_empty()) else {
            continue;
        };

        let path = folder.join(format!("{}.png", generators::sanitize_file_stem(&card.get_card_id())));
        if path.exists() {
            continue;
        }

        generators::qr_image(url)?
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += 1;
    }

    Ok(written)
}

pub(super) async fn images(ctx: &PipelineContext) -> Result<StepOutcome> {
    let folder = ctx.config.cards_folder.clone();
    let count = ctx.config.images_per_run;

    let written = tokio::task::spawn_blocking(move || draw_images(&folder, count)).await??;
    Ok(StepOutcome::completed(written))
}

fn file_names(folder: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(folder).with_context(|| format!("Failed to read {}", folder.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str().filter(|n| !n.starts_with('.')) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn draw_images(folder: &Path, count: usize) -> Result<usize> {
    fs::create_dir_all(folder).with_context(|| format!("Failed to create {}", folder.display()))?;

    let existing = file_names(folder)?;
    let first = generators::next_image_index(existing.iter().map(String::as_str))
        .with_context(|| format!("No image numbers left in {}", folder.display()))?;

    let mut rng = rand::rng();
    for offset in 0..count {
        let index = u32::try_from(offset)
            .ok()
            .and_then(|offset| first.checked_add(offset))
            .with_context(|| format!("No image numbers left in {}", folder.display()))?;
        let path = folder.join(generators::image_file_name(index));

        generators::draw_card_image(&mut rng, generators::Shape::for_index(index))
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(count)
}

pub(super) async fn image_names(ctx: &PipelineContext) -> Result<StepOutcome> {
    let pool = ctx.pool.clone();
    let folder = ctx.config.cards_folder.clone();

    let renamed = tokio::task::spawn_blocking(move || assign_images(&pool, &folder)).await??;
    Ok(StepOutcome::completed(renamed))
}

fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

/// Renames unassigned images to the next cards without an image
fn assign_images(pool: &DbPool, folder: &Path) -> Result<usize> {
    if !folder.exists() {
        return Ok(0);
    }

    let names = file_names(folder)?;
    let taken: HashSet<&str> = names
        .iter()
        .filter(|n| n.starts_with(CARD_FILE_PREFIX))
        .map(|n| file_stem(n))
        .collect();

    let free_cards: Vec<String> = repo::list_card_ids(pool)?
        .into_iter()
        .filter(|id| !taken.contains(generators::sanitize_file_stem(id).as_str()))
        .collect();

    let unassigned = names.iter().filter(|n| !n.starts_with(CARD_FILE_PREFIX));

    let mut renamed = 0;
    for (name, card_id) in unassigned.zip(free_cards.iter()) {
        let new_name = match Path::new(name).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", generators::sanitize_file_stem(card_id), ext),
            None => generators::sanitize_file_stem(card_id),
        };
        let target = folder.join(&new_name);
        if target.exists() {
            warn!("{} already exists, leaving {} in place", new_name, name);
            continue;
        }

        fs::rename(folder.join(name), &target)
            .with_context(|| format!("Failed to rename {} to {}", name, new_name))?;
        repo::update_card_field(pool, card_id, CardField::ImageFilename, Some(&new_name))?;
        debug!("Assigned {} to {}", new_name, card_id);
        renamed += 1;
    }

    Ok(renamed)
}

pub(super) fn status(ctx: &PipelineContext) -> Result<StepOutcome> {
    let filled = repo::fill_missing(&ctx.pool, CardField::Status, None, |_| Some(DEFAULT_STATUS.to_string()))?;
    Ok(StepOutcome::completed(filled))
}

pub(super) async fn airtable_sync(ctx: &PipelineContext) -> Result<StepOutcome> {
    let Some(settings) = ctx.config.airtable() else {
        return Ok(StepOutcome::skipped("Airtable is not configured"));
    };

    let snapshot = repo::table_snapshot(&ctx.pool)?;
    let summary = airtable::sync_table(&ctx.http, &settings, &snapshot).await?;

    if !summary.failures.is_empty() {
        bail!(
            "{} Airtable requests failed: {}",
            summary.failures.len(),
            summary.failures.join("; ")
        );
    }

    Ok(StepOutcome::completed(summary.written()))
}

pub(super) fn apply_claims(ctx: &PipelineContext) -> Result<StepOutcome> {
    let mut transferred = 0;

    for claim in repo::list_claims(&ctx.pool)? {
        let claimed_url = claim.get_card_url();
        let card = match url_key_of(&claimed_url) {
            Some(key) => repo::find_card_by_url_key(&ctx.pool, &key)?,
            None => None,
        };

        match card {
            Some(card) => {
                if repo::claim_system_card(&ctx.pool, &card.get_card_id(), &claim.get_email())? {
                    info!("{} now owns {}", claim.get_email(), card.get_card_id());
                    transferred += 1;
                } else {
                    warn!("{} is already owned, claim by {} dropped", card.get_card_id(), claim.get_email());
                }
            }
            None => warn!("No card matches claimed URL {}", claimed_url),
        }

        repo::delete_claim(&ctx.pool, &claim.get_id())?;
    }

    Ok(StepOutcome::completed(transferred))
}

pub(super) fn sync_user_types(ctx: &PipelineContext) -> Result<StepOutcome> {
    let roles: HashMap<String, &'static str> = repo::list_users(&ctx.pool)?
        .into_iter()
        .map(|user| (user.get_username(), user.get_role().as_str()))
        .collect();

    let mut changed = 0;
    for card in repo::list_cards(&ctx.pool)? {
        let expected = card
            .get(CardField::Owner)
            .and_then(|owner| roles.get(&normalize_username(owner)).copied())
            .unwrap_or(SYSTEM_OWNER);

        if card.get(CardField::UserType) != Some(expected) {
            changed += repo::update_card_field(&ctx.pool, &card.get_card_id(), CardField::UserType, Some(expected))?;
        }
    }

    Ok(StepOutcome::completed(changed))
}
