//! Pure, seedable value generators used by the card pipeline steps.

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use image::{GrayImage, Luma, Rgb, RgbImage};
use qrcode::{EcLevel, QrCode};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use std::collections::{BTreeSet, HashSet};
use url::Url;

use crate::models::CARD_URL_SEGMENT;

/// Largest number a `Card_NNNNNN` or `Pack_NNNNNN` id can carry
pub const MAX_ID_NUMBER: u32 = 999_999;

pub const CARD_ID_PREFIX: &str = "Card";
pub const PACK_ID_PREFIX: &str = "Pack";

pub const ADJECTIVES: [&str; 30] = [
    "Genesis", "Quantum", "Decentralized", "Atomic", "Hyper",
    "Satoshi's", "Bullish", "Bearish", "Digital", "Immutable",
    "Tokenized", "Algorithmic", "Lightning", "Infinite", "Smart",
    "Permissionless", "Cryptic", "Yield", "Staked", "Wrapped",
    "Governed", "Onchain", "Layered", "Cold", "Hashpower",
    "Peer", "Liquid", "Frozen", "Oracle-linked", "Meta",
];

pub const NOUNS: [&str; 30] = [
    "Block", "Chain", "Node", "Vault", "Oracle",
    "Fork", "Whale", "Moon", "Lambo", "Satoshi",
    "Hashrate", "Token", "DApp", "Trezor", "Ledger",
    "Miner", "Shark", "HODL", "FOMO", "FUD",
    "DEX", "CEX", "Bridge", "Protocol", "GenesisBlock",
    "Gas", "Liquidity", "Staker", "Explorer", "Governance",
];

/// Name templates; `{adj}`, `{noun}` and `{noun2}` are substituted
pub const NAME_TEMPLATES: [&str; 20] = [
    "{adj} {noun}",
    "The {adj} {noun}",
    "{noun} of the {adj} {noun2}",
    "{adj} {noun} of {noun2}",
    "{noun} Protocol of {adj}",
    "Genesis {noun}",
    "The {noun} on {adj} Chain",
    "{adj} {noun} Network",
    "Shroud of the {adj} {noun}",
    "Heart of {noun}",
    "Soul of the {adj} {noun2}",
    "Eye of {adj} {noun}",
    "{adj} {noun} Bridge",
    "{noun} of Eternal {noun2}",
    "{adj} {noun} at Dawn",
    "Twilight {noun} of {adj}",
    "{adj} {noun} Governance",
    "{adj} {noun} Yield",
    "{noun} and {noun2} United",
    "{adj} {noun} Union",
];

pub const BLOCKCHAINS: [&str; 9] = [
    "Ethereum",
    "Binance Smart Chain",
    "Cardano",
    "Solana",
    "XRP Ledger",
    "Polkadot",
    "Avalanche",
    "Tron",
    "Polygon",
];

pub const THEMES: [&str; 9] = [
    "Games",
    "Design",
    "Tech innovations",
    "Film",
    "Music",
    "Publishing",
    "Art",
    "Charity",
    "Tourism",
];

/// Rarity tiers
pub const CARD_TYPES: [&str; 30] = [
    "Legendary",
    "Super Legendary",
    "Alpha Type",
    "Mythic",
    "Ultra Mythic",
    "Masterpiece",
    "Collector's Edition",
    "Grail",
    "Divine",
    "Supreme",
    "Cosmic",
    "Eternal",
    "Genesis",
    "Prototype",
    "Signature Series",
    "Royal",
    "Immortal",
    "Celestial",
    "Phantom",
    "Shadow",
    "Zenith",
    "Apex",
    "Infinity",
    "Primordial",
    "Relic",
    "Vanguard",
    "Legacy",
    "Emperor",
    "Godlike",
    "Transcendent",
];

pub const MIN_COINS_PER_CARD: usize = 2;
pub const MAX_COINS_PER_CARD: usize = 7;

/// Bounds of one USD amount and of a card's total, in cents
pub const MIN_AMOUNT_CENTS: u32 = 2;
pub const MAX_AMOUNT_CENTS: u32 = 499;
pub const MAX_TOTAL_CENTS: u32 = 1_000;

pub const IMAGE_WIDTH: u32 = 768;
pub const IMAGE_HEIGHT: u32 = 1152;
pub const IMAGE_BACKGROUND: [u8; 3] = [30, 30, 30];
pub const SHAPES_PER_IMAGE: usize = 10;
const MIN_SHAPE_SIZE: u32 = 10;
const MAX_SHAPE_SIZE: u32 = 100;

pub const QR_MODULE_PIXELS: u32 = 10;

/// Bytes of randomness behind a card key
pub const KEY_BYTES: usize = 32;

/// Formats an id like `Card_000042`
pub fn format_prefixed_id(prefix: &str, number: u32) -> String {
    format!("{}_{:06}", prefix, number)
}

fn parse_prefixed_id(prefix: &str, id: &str) -> Option<u32> {
    let digits = id.trim().strip_prefix(prefix)?.strip_prefix('_')?;
    digits.parse::<u32>().ok().filter(|n| (1..=MAX_ID_NUMBER).contains(n))
}

/// Draws `count` fresh ids `<prefix>_NNNNNN` not present in `existing`
///
/// Numbers are uniform over `1..=999999`.
///
/// ### Errors
///
/// Fails when fewer than `count` numbers remain free
pub fn unique_ids<R: Rng + ?Sized>(
    rng: &mut R,
    prefix: &str,
    count: usize,
    existing: &HashSet<String>,
) -> Result<Vec<String>> {
    let used: HashSet<u32> = existing
        .iter()
        .filter_map(|id| parse_prefixed_id(prefix, id))
        .collect();
    let available = MAX_ID_NUMBER as usize - used.len();

    if count > available {
        bail!(
            "Only {} unused {} ids remain, {} requested",
            available,
            prefix,
            count
        );
    }

    // Rejection sampling degrades when the space is nearly full
    if available < count.saturating_mul(4).max(1_000) {
        let free: Vec<u32> = (1..=MAX_ID_NUMBER).filter(|n| !used.contains(n)).collect();
        return Ok(free
            .choose_multiple(rng, count)
            .map(|n| format_prefixed_id(prefix, *n))
            .collect());
    }

    let mut chosen = BTreeSet::new();
    while chosen.len() < count {
        let n = rng.random_range(1..=MAX_ID_NUMBER);
        if !used.contains(&n) {
            chosen.insert(n);
        }
    }

    let mut ids: Vec<String> = chosen
        .into_iter()
        .map(|n| format_prefixed_id(prefix, n))
        .collect();
    ids.shuffle(rng);
    Ok(ids)
}

/// A random legendary card name
pub fn legendary_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let pick = |rng: &mut R, list: &[&'static str]| list.choose(rng).copied().unwrap_or_default();

    let template = pick(rng, &NAME_TEMPLATES);
    let adj = pick(rng, &ADJECTIVES);
    let noun = pick(rng, &NOUNS);
    let noun2 = pick(rng, &NOUNS);

    template
        .replace("{adj}", adj)
        .replace("{noun2}", noun2)
        .replace("{noun}", noun)
}

/// One random entry of a fixed list
pub fn pick_one<R: Rng + ?Sized>(rng: &mut R, list: &[&'static str]) -> Result<String> {
    list.choose(rng)
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Nothing to choose from"))
}

/// A random sample of 2 to 7 distinct symbols joined by `", "`
///
/// Symbols are upper-cased and de-duplicated first; fewer than two distinct
/// symbols yields all of them.
pub fn sample_coins<R: Rng + ?Sized>(rng: &mut R, symbols: &[String]) -> Result<String> {
    let distinct: Vec<String> = symbols
        .iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if distinct.is_empty() {
        bail!("No coin symbols available");
    }

    let wanted = rng
        .random_range(MIN_COINS_PER_CARD..=MAX_COINS_PER_CARD)
        .min(distinct.len());

    Ok(distinct
        .choose_multiple(rng, wanted)
        .cloned()
        .collect::<Vec<_>>()
        .join(", "))
}

/// Splits a budget into `count` random amounts in cents
///
/// Each amount lies in `[2, 499]` and the sum never exceeds 1000.
///
/// ### Errors
///
/// Fails when `count` amounts of the minimum already exceed the budget
pub fn usd_split_cents<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Result<Vec<u32>> {
    let count_u32 = u32::try_from(count).context("Too many amounts requested")?;
    if count_u32.saturating_mul(MIN_AMOUNT_CENTS) > MAX_TOTAL_CENTS {
        bail!("Cannot split {} cents into {} amounts", MAX_TOTAL_CENTS, count);
    }

    let mut remaining = MAX_TOTAL_CENTS;
    let mut values = Vec::with_capacity(count);

    for i in 0..count_u32 {
        let slots_after = count_u32 - i - 1;
        let upper = MAX_AMOUNT_CENTS.min(remaining - slots_after * MIN_AMOUNT_CENTS);
        let value = rng.random_range(MIN_AMOUNT_CENTS..=upper.max(MIN_AMOUNT_CENTS));
        remaining -= value;
        values.push(value);
    }

    Ok(values)
}

/// Formats cents as `X.YY`
pub fn format_cents(cents: u32) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Counts the symbols of a `", "`-joined coin list
pub fn coin_count(coins: &str) -> usize {
    coins.split(',').filter(|s| !s.trim().is_empty()).count()
}

/// One USD amount per coin of the list, joined by `", "`
///
/// Returns `None` for an empty coin list.
pub fn usd_amounts_for<R: Rng + ?Sized>(rng: &mut R, coins: &str) -> Result<Option<String>> {
    let count = coin_count(coins);
    if count == 0 {
        return Ok(None);
    }

    let amounts = usd_split_cents(rng, count)?;
    Ok(Some(
        amounts
            .into_iter()
            .map(format_cents)
            .collect::<Vec<_>>()
            .join(", "),
    ))
}

/// A fresh secret key: 32 random bytes as URL-safe base64 with padding
pub fn url_key<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; KEY_BYTES];
    rng.fill(&mut bytes[..]);
    URL_SAFE.encode(bytes)
}

/// The `<scheme>://<host>/card/` prefix of card URLs for a public origin
pub fn card_url_prefix(public_base_url: &str) -> Result<String> {
    let base = Url::parse(public_base_url.trim())
        .with_context(|| format!("Invalid public base URL: {}", public_base_url))?;
    let host = base
        .host_str()
        .ok_or_else(|| anyhow!("Public base URL has no host: {}", public_base_url))?;

    let origin = match base.port() {
        Some(port) => format!("{}://{}:{}", base.scheme(), host, port),
        None => format!("{}://{}", base.scheme(), host),
    };

    Ok(format!("{}/{}/", origin, CARD_URL_SEGMENT))
}

/// Rewrites a stored card URL onto the public prefix
///
/// The key is the last path segment of the value, or the whole value when
/// it has no `/`. Returns `None` when the value already carries the prefix
/// or has no usable key.
pub fn rewrite_card_url(value: &str, prefix: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.starts_with(prefix) {
        return None;
    }

    let key = value.trim_end_matches('/').rsplit('/').next()?.trim();
    if key.is_empty() {
        return None;
    }

    Some(format!("{}{}", prefix, key))
}

/// Replaces characters that are unsafe in file names with `_`
pub fn sanitize_file_stem(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();

    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Encodes a URL as a QR code image
///
/// Error correction L, 10 pixel modules and the standard 4-module quiet zone.
pub fn qr_image(data: &str) -> Result<GrayImage> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)
        .map_err(|e| anyhow!("Failed to encode QR code: {}", e))?;

    Ok(code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .module_dimensions(QR_MODULE_PIXELS, QR_MODULE_PIXELS)
        .build())
}

/// Shape drawn on a placeholder image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Circle,
    Rectangle,
}

impl Shape {
    /// Images alternate between circles and rectangles, starting with circles at index 1
    pub fn for_index(index: u32) -> Self {
        if index.saturating_sub(1) % 2 == 0 {
            Shape::Circle
        } else {
            Shape::Rectangle
        }
    }
}

/// Draws a placeholder card image with ten random shapes
pub fn draw_card_image<R: Rng + ?Sized>(rng: &mut R, shape: Shape) -> RgbImage {
    let mut image = RgbImage::from_pixel(IMAGE_WIDTH, IMAGE_HEIGHT, Rgb(IMAGE_BACKGROUND));

    for _ in 0..SHAPES_PER_IMAGE {
        let x0 = rng.random_range(0..=IMAGE_WIDTH);
        let y0 = rng.random_range(0..=IMAGE_HEIGHT);
        let x1 = x0 + rng.random_range(MIN_SHAPE_SIZE..=MAX_SHAPE_SIZE);
        let y1 = y0 + rng.random_range(MIN_SHAPE_SIZE..=MAX_SHAPE_SIZE);
        let color = Rgb([rng.random(), rng.random(), rng.random()]);

        match shape {
            Shape::Circle => fill_ellipse(&mut image, (x0, y0, x1, y1), color),
            Shape::Rectangle => fill_rect(&mut image, (x0, y0, x1, y1), color),
        }
    }

    image
}

fn fill_rect(image: &mut RgbImage, (x0, y0, x1, y1): (u32, u32, u32, u32), color: Rgb<u8>) {
    let x_end = x1.min(image.width().saturating_sub(1));
    let y_end = y1.min(image.height().saturating_sub(1));
    for y in y0..=y_end {
        for x in x0..=x_end {
            image.put_pixel(x, y, color);
        }
    }
}

fn fill_ellipse(image: &mut RgbImage, (x0, y0, x1, y1): (u32, u32, u32, u32), color: Rgb<u8>) {
    let cx = (x0 + x1) as f64 / 2.0;
    let cy = (y0 + y1) as f64 / 2.0;
    let rx = ((x1 - x0) as f64 / 2.0).max(0.5);
    let ry = ((y1 - y0) as f64 / 2.0).max(0.5);

    let x_end = x1.min(image.width().saturating_sub(1));
    let y_end = y1.min(image.height().saturating_sub(1));
    for y in y0..=y_end {
        for x in x0..=x_end {
            let dx = (x as f64 - cx) / rx;
            let dy = (y as f64 - cy) / ry;
            if dx * dx + dy * dy <= 1.0 {
                image.put_pixel(x, y, color);
            }
        }
    }
}

/// The index after the highest `NNN.png` among `file_names`, or 1
///
/// `None` once the numbering is exhausted.
pub fn next_image_index<'a, I>(file_names: I) -> Option<u32>
where
    I: IntoIterator<Item = &'a str>,
{
    file_names
        .into_iter()
        .filter_map(|name| {
            let stem = name.strip_suffix(".png")?;
            (stem.len() >= 3 && stem.chars().all(|c| c.is_ascii_digit()))
                .then(|| stem.parse::<u32>().ok())
                .flatten()
        })
        .max()
        .map_or(Some(1), |n| n.checked_add(1))
}

/// File name of the generated image with this index
pub fn image_file_name(index: u32) -> String {
    format!("{:03}.png", index)
}
