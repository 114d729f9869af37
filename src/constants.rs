//! Constants for the crypto overlay synchronization engine
//!
//! Upstream endpoints, default refresh cadences and cache layout live here.
//! Runtime configuration is limited to the coin and the three intervals in
//! [`SyncConfig`](crate::config::SyncConfig).

/// Default price refresh interval (in milliseconds)
pub const DEFAULT_PRICE_INTERVAL_MS: u64 = 30_000;

/// Default history refresh interval (in milliseconds)
pub const DEFAULT_HISTORY_INTERVAL_MS: u64 = 300_000;

/// Default exchange rate refresh interval (in milliseconds)
pub const DEFAULT_FX_INTERVAL_MS: u64 = 300_000;

/// Smallest period a feed timer is built with; zero would not tick
pub const MIN_TIMER_PERIOD_MS: u64 = 1;

/// HTTP transport timeout (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Minimum number of samples for a usable history series
pub const MIN_HISTORY_POINTS: usize = 3;

/// Look-back window of the history feed (in milliseconds)
pub const HISTORY_WINDOW_MS: i64 = 86_400_000;

/// Namespace prefix of every persisted cache entry
pub const CACHE_NAMESPACE: &str = "overlay_crypto_";

/// Cache key of the shared exchange rate entry
pub const FX_CACHE_KEY: &str = "usd_rub";

/// Environment variable overriding the data directory (cache + settings)
pub const DATA_DIR_ENV: &str = "CRYPTO_OVERLAY_DATA_DIR";

/// Settings file name inside the data directory
pub const SETTINGS_FILE_NAME: &str = "crypto-settings.json";

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko API endpoint for simple price queries
pub const COINGECKO_SIMPLE_PRICE_ENDPOINT: &str = "/simple/price";

/// CoinCap API base URL
pub const COINCAP_API_URL: &str = "https://api.coincap.io/v2";

/// blockchain.info ticker (BTC only)
pub const BLOCKCHAIN_INFO_TICKER_URL: &str = "https://blockchain.info/ticker";

/// fawazahmed0 currency API, USD base
pub const CURRENCY_API_USD_URL: &str =
    "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1/currencies/usd.json";

/// open.er-api latest rates, USD base
pub const OPEN_ER_API_USD_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// exchangerate-api latest rates, USD base
pub const EXCHANGERATE_API_USD_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";

/// Quote currency of the fx feed, lowercase form
pub const FX_QUOTE_LOWER: &str = "rub";

/// Quote currency of the fx feed, uppercase form
pub const FX_QUOTE_UPPER: &str = "RUB";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "crypto-overlay-sdk/0.1.0";
