use serde::{Deserialize, Serialize};

/// One entry of the CoinGecko markets listing, as kept in the coins file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinListing {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub current_price: Option<f64>,
}

impl CoinListing {
    /// The ticker symbol in upper case
    pub fn ticker(&self) -> String {
        self.symbol.trim().to_uppercase()
    }
}
