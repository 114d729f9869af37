//! Types for the crypto overlay synchronization engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coins selectable in the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Coin {
    /// Bitcoin
    #[default]
    BTC,
    /// Ethereum
    ETH,
    /// Solana
    SOL,
    /// BNB
    BNB,
    /// XRP
    XRP,
}

impl Coin {
    /// Get the ticker symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Coin::BTC => "BTC",
            Coin::ETH => "ETH",
            Coin::SOL => "SOL",
            Coin::BNB => "BNB",
            Coin::XRP => "XRP",
        }
    }

    /// Get the human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Coin::BTC => "Bitcoin",
            Coin::ETH => "Ethereum",
            Coin::SOL => "Solana",
            Coin::BNB => "BNB",
            Coin::XRP => "XRP",
        }
    }

    /// Get the settings-menu label (glyph + name)
    pub fn label(&self) -> &'static str {
        match self {
            Coin::BTC => "₿ Bitcoin",
            Coin::ETH => "Ξ Ethereum",
            Coin::SOL => "◎ Solana",
            Coin::BNB => "BNB",
            Coin::XRP => "✕ XRP",
        }
    }

    /// Lowercase id used inside cache keys
    pub fn cache_id(&self) -> &'static str {
        match self {
            Coin::BTC => "btc",
            Coin::ETH => "eth",
            Coin::SOL => "sol",
            Coin::BNB => "bnb",
            Coin::XRP => "xrp",
        }
    }

    /// Get the CoinGecko ID for this coin
    pub fn coingecko_id(&self) -> &'static str {
        match self {
            Coin::BTC => "bitcoin",
            Coin::ETH => "ethereum",
            Coin::SOL => "solana",
            Coin::BNB => "binancecoin",
            Coin::XRP => "ripple",
        }
    }

    /// Get the CoinCap ID for this coin
    pub fn coincap_id(&self) -> &'static str {
        match self {
            Coin::BTC => "bitcoin",
            Coin::ETH => "ethereum",
            Coin::SOL => "solana",
            Coin::BNB => "binance-coin",
            Coin::XRP => "xrp",
        }
    }

    /// Get all selectable coins
    pub fn all() -> &'static [Coin] {
        &[Coin::BTC, Coin::ETH, Coin::SOL, Coin::BNB, Coin::XRP]
    }
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Spot price of the selected coin with its 24h change percentage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoinQuote {
    /// Price in USD
    pub price: f64,

    /// 24h price change percentage (not every source reports it)
    pub change_24h: Option<f64>,
}

impl CoinQuote {
    pub fn new(price: f64, change_24h: Option<f64>) -> Self {
        Self { price, change_24h }
    }
}

/// The three synchronized feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Price,
    History,
    Fx,
}

impl FeedKind {
    pub fn name(&self) -> &'static str {
        match self {
            FeedKind::Price => "price",
            FeedKind::History => "history",
            FeedKind::Fx => "fx",
        }
    }

    pub fn all() -> &'static [FeedKind] {
        &[FeedKind::Price, FeedKind::History, FeedKind::Fx]
    }
}

/// Data the overlay renders
///
/// Every numeric field is either a fetched value, a cached value, or absent.
/// Consumers render absent values as a placeholder, never as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub coin_price: Option<f64>,
    pub coin_change_24h: Option<f64>,
    /// Hourly prices over the last 24h, oldest first
    pub coin_history: Vec<f64>,
    pub coin_symbol: String,
    pub coin_name: String,
    pub usd_rub: Option<f64>,
    pub coin_stale: bool,
    pub history_stale: bool,
    pub fx_stale: bool,
}

impl Snapshot {
    /// Empty snapshot labelled for `coin`
    pub fn empty(coin: Coin) -> Self {
        Self {
            coin_price: None,
            coin_change_24h: None,
            coin_history: Vec::new(),
            coin_symbol: coin.symbol().to_string(),
            coin_name: coin.display_name().to_string(),
            usd_rub: None,
            coin_stale: false,
            history_stale: false,
            fx_stale: false,
        }
    }

    /// Whether the snapshot is labelled for `coin`
    pub fn is_for(&self, coin: Coin) -> bool {
        self.coin_symbol == coin.symbol()
    }

    pub(crate) fn apply_quote(&mut self, quote: CoinQuote, stale: bool) {
        self.coin_price = Some(quote.price);
        self.coin_change_24h = quote.change_24h;
        self.coin_stale = stale;
    }

    pub(crate) fn apply_history(&mut self, history: Vec<f64>, stale: bool) {
        self.coin_history = history;
        self.history_stale = stale;
    }

    pub(crate) fn apply_fx(&mut self, rate: f64, stale: bool) {
        self.usd_rub = Some(rate);
        self.fx_stale = stale;
    }
}

/// Overall health of a feed or of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Fresh data from the network
    Healthy,
    /// Only cached data is available
    Degraded,
    /// No data at all
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
