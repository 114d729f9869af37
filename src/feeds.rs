//! Feed definitions: cache key, cadence, provider chain, validation

use crate::{
    cache::CacheKey,
    config::SyncConfig,
    constants::MIN_HISTORY_POINTS,
    error::ProviderError,
    provider::FetchStrategy,
    providers::{
        http::build_client, BlockchainInfoProvider, CoinCapHistoryProvider, CoinCapPriceProvider,
        CoinGeckoHistoryProvider, CoinGeckoPriceProvider, CurrencyApiProvider, ProviderChain,
        RatesApiProvider,
    },
    types::{Coin, CoinQuote, FeedKind},
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// One independently refreshed data item
pub struct Feed<T> {
    pub kind: FeedKind,
    pub key: CacheKey,
    pub interval: Duration,
    pub chain: ProviderChain<T>,
}

impl<T: Send + 'static> Feed<T> {
    pub fn new(
        kind: FeedKind,
        key: CacheKey,
        interval: Duration,
        providers: Vec<Arc<dyn FetchStrategy<T>>>,
        validate: fn(&T) -> bool,
    ) -> Self {
        Self {
            kind,
            key,
            interval,
            chain: ProviderChain::new(providers, validate),
        }
    }
}

/// The three feeds of one sync session
pub struct FeedSet {
    pub price: Feed<CoinQuote>,
    pub history: Feed<Vec<f64>>,
    pub fx: Feed<f64>,
}

/// Builds the feeds for a session configuration
///
/// The engine asks for a fresh set on every start, so coin-bound strategies
/// always match the session's coin.
pub trait FeedCatalog: Send + Sync {
    fn feeds(&self, config: &SyncConfig) -> FeedSet;
}

pub fn valid_quote(quote: &CoinQuote) -> bool {
    quote.price.is_finite() && quote.price > 0.0
}

#[allow(clippy::ptr_arg)]
pub fn valid_history(history: &Vec<f64>) -> bool {
    history.len() >= MIN_HISTORY_POINTS
}

pub fn valid_rate(rate: &f64) -> bool {
    rate.is_finite() && *rate > 0.0
}

/// Feeds backed by the public HTTP APIs
pub struct HttpFeedCatalog {
    client: Client,
}

impl HttpFeedCatalog {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self::with_client(build_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Price strategies in priority order for `coin`
    pub fn price_providers(&self, coin: Coin) -> Vec<Arc<dyn FetchStrategy<CoinQuote>>> {
        let mut providers: Vec<Arc<dyn FetchStrategy<CoinQuote>>> = vec![
            Arc::new(CoinGeckoPriceProvider::new(self.client.clone(), coin)),
            Arc::new(CoinCapPriceProvider::new(self.client.clone(), coin)),
        ];
        if BlockchainInfoProvider::supports(coin) {
            providers.push(Arc::new(BlockchainInfoProvider::new(self.client.clone())));
        }
        providers
    }

    /// History strategies in priority order for `coin`
    pub fn history_providers(&self, coin: Coin) -> Vec<Arc<dyn FetchStrategy<Vec<f64>>>> {
        vec![
            Arc::new(CoinGeckoHistoryProvider::new(self.client.clone(), coin)),
            Arc::new(CoinCapHistoryProvider::new(self.client.clone(), coin)),
        ]
    }

    /// USD/RUB strategies in priority order
    pub fn fx_providers(&self) -> Vec<Arc<dyn FetchStrategy<f64>>> {
        vec![
            Arc::new(CurrencyApiProvider::new(self.client.clone())),
            Arc::new(RatesApiProvider::open_er_api(self.client.clone())),
            Arc::new(RatesApiProvider::exchangerate_api(self.client.clone())),
        ]
    }
}

impl FeedCatalog for HttpFeedCatalog {
    fn feeds(&self, config: &SyncConfig) -> FeedSet {
        FeedSet {
            price: Feed::new(
                FeedKind::Price,
                CacheKey::price(config.coin),
                config.price_interval(),
                self.price_providers(config.coin),
                valid_quote,
            ),
            history: Feed::new(
                FeedKind::History,
                CacheKey::history(config.coin),
                config.history_interval(),
                self.history_providers(config.coin),
                valid_history,
            ),
            fx: Feed::new(
                FeedKind::Fx,
                CacheKey::fx(),
                config.fx_interval(),
                self.fx_providers(),
                valid_rate,
            ),
        }
    }
}
