//! # Crypto Overlay Data Synchronization
//!
//! Keeps a live snapshot of one coin's price, 24h change and intraday history
//! plus the USD/RUB exchange rate, refreshed on independent timers from public
//! HTTP APIs.
//!
//! Every feed walks an ordered chain of providers until one returns valid
//! data. Fresh values are written through to a persistent cache; when every
//! provider fails the last cached value is served and flagged stale.
//!
//! ## Usage
//!
//! ```no_run
//! use crypto_overlay_sdk::{Coin, SyncConfig, SyncEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = SyncEngine::with_defaults()?;
//! let mut snapshots = engine.subscribe();
//!
//! engine.start(SyncConfig {
//!     coin: Coin::ETH,
//!     ..SyncConfig::default()
//! });
//!
//! while snapshots.changed().await.is_ok() {
//!     let snapshot = snapshots.borrow_and_update().clone();
//!     println!("{}: {:?}", snapshot.coin_symbol, snapshot.coin_price);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cancel;
pub mod config;
pub mod constants;
pub mod display;
pub mod driver;
pub mod engine;
pub mod error;
pub mod feeds;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod types;

// Re-export commonly used types
pub use cache::{CacheKey, CacheStorage, FeedCache, FileStorage, MemoryStorage};
pub use config::{ConfigSource, SettingsUpdate, SyncConfig};
pub use driver::SyncDriver;
pub use engine::{SessionState, SyncEngine};
pub use error::{CacheError, ConfigError, ProviderError, SetupError};
pub use feeds::{FeedCatalog, HttpFeedCatalog};
pub use metrics::FeedMetrics;
pub use provider::FetchStrategy;
pub use types::{Coin, CoinQuote, ComponentHealth, FeedKind, HealthStatus, Snapshot};
