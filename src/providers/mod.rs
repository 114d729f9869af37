//! Upstream provider implementations and the fallback chain executor

pub mod blockchain_info;
pub mod chain;
pub mod coincap;
pub mod coingecko;
pub mod currency_api;
pub mod http;
pub mod rates_api;

pub use blockchain_info::BlockchainInfoProvider;
pub use chain::{ChainOutcome, ProviderChain};
pub use coincap::{CoinCapHistoryProvider, CoinCapPriceProvider};
pub use coingecko::{CoinGeckoHistoryProvider, CoinGeckoPriceProvider};
pub use currency_api::CurrencyApiProvider;
pub use rates_api::RatesApiProvider;
