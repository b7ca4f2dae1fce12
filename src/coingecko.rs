use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::models::CoinListing;

/// Coins collected per fetch
pub const TOP_COINS_LIMIT: usize = 20;
const PER_PAGE: u32 = 250;
const MAX_PAGES: u32 = 10;

/// Tickers of known stablecoins, never used on cards
pub const STABLECOINS: [&str; 29] = [
    "USDT", "USDC", "BUSD", "DAI", "TUSD", "USDP", "GUSD", "USDN", "SUSD", "EURT",
    "EURS", "XAUT", "PAXG", "FEI", "FRAX", "UST", "LUSD", "HUSD", "ALUSD", "USDD",
    "USD", "USDS", "USDX", "CUSD", "MIM", "MUSD", "USDJ", "USDK", "USDQ",
];

pub fn is_stablecoin(symbol: &str) -> bool {
    let symbol = symbol.trim().to_uppercase();
    STABLECOINS.contains(&symbol.as_str())
}

/// Fetches the top coins by market cap, skipping stablecoins
///
/// ### Arguments
///
/// * `http` - The HTTP client
/// * `api_url` - Base URL of the CoinGecko v3 API
/// * `limit` - Number of coins to collect
///
/// ### Returns
///
/// At most `limit` coins in market cap order. Paging stops at the first
/// non-success response or empty page.
#[instrument(skip(http))]
pub async fn fetch_top_coins(http: &reqwest::Client, api_url: &str, limit: usize) -> Result<Vec<CoinListing>> {
    let url = format!("{}/coins/markets", api_url.trim_end_matches('/'));
    let mut coins = Vec::with_capacity(limit);

    for page in 1..=MAX_PAGES {
        if coins.len() >= limit {
            break;
        }

        let per_page = PER_PAGE.to_string();
        let page_number = page.to_string();
        let response = http
            .get(&url)
            .query(&[
                ("vs_currency", "usd"),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", page_number.as_str()),
                ("sparkline", "false"),
            ])
            .send()
            .await
            .context("CoinGecko request failed")?;

        if !response.status().is_success() {
            warn!("CoinGecko returned {} for page {}", response.status(), page);
            break;
        }

        let listing: Vec<CoinListing> = response
            .json()
            .await
            .context("Failed to decode CoinGecko response")?;
        debug!("Page {} returned {} coins", page, listing.len());

        if listing.is_empty() {
            break;
        }

        coins.extend(
            listing
                .into_iter()
                .filter(|coin| !is_stablecoin(&coin.symbol))
                .take(limit - coins.len()),
        );
    }

    info!("Collected {} coins", coins.len());
    Ok(coins)
}

/// Writes the coins file, replacing it atomically
pub fn save_coins(path: &Path, coins: &[CoinListing]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(coins)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}

/// Reads the upper-cased symbols from the coins file
pub fn load_coin_symbols(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read coins file {}", path.display()))?;
    let coins: Vec<CoinListing> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid coins file {}", path.display()))?;

    Ok(coins.iter().map(CoinListing::ticker).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn coin(symbol: &str) -> CoinListing {
        CoinListing {
            id: symbol.to_lowercase(),
            symbol: symbol.to_lowercase(),
            name: symbol.to_string(),
            market_cap: Some(1.0),
            current_price: None,
        }
    }

    #[test]
    fn test_is_stablecoin() {
        assert!(is_stablecoin("usdt"));
        assert!(is_stablecoin(" DAI "));
        assert!(!is_stablecoin("btc"));
    }

    #[test]
    fn test_save_and_load_symbols() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("coins_db.json");

        save_coins(&path, &[coin("BTC"), coin("eth")]).unwrap();
        let symbols = load_coin_symbols(&path).unwrap();

        assert_eq!(symbols, vec!["BTC", "ETH"]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_symbols_missing_file() {
        let dir = tempdir().unwrap();
        assert!(load_coin_symbols(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_coin_listing_tolerates_missing_numbers() {
        let json = r#"[{"id":"bitcoin","symbol":"btc","name":"Bitcoin","market_cap":null}]"#;
        let coins: Vec<CoinListing> = serde_json::from_str(json).unwrap();
        assert_eq!(coins[0].ticker(), "BTC");
        assert_eq!(coins[0].current_price, None);
    }
}
