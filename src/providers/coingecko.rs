//! CoinGecko price and history providers

use crate::{
    constants::{COINGECKO_API_URL, COINGECKO_SIMPLE_PRICE_ENDPOINT},
    error::ProviderError,
    provider::FetchStrategy,
    providers::http::get_json,
    types::{Coin, CoinQuote},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

/// CoinGecko API response for simple price queries
#[derive(Debug, Deserialize)]
struct CoinGeckoResponse {
    #[serde(flatten)]
    prices: HashMap<String, CoinGeckoPriceData>,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoPriceData {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
}

/// CoinGecko API response for market chart queries
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    /// `[timestamp_ms, price]` pairs
    prices: Option<Vec<(f64, f64)>>,
}

/// Spot price + 24h change from CoinGecko
pub struct CoinGeckoPriceProvider {
    client: Client,
    coin: Coin,
}

impl CoinGeckoPriceProvider {
    pub fn new(client: Client, coin: Coin) -> Self {
        Self { client, coin }
    }

    fn build_url(&self) -> String {
        format!(
            "{}{}?ids={}&vs_currencies=usd&include_24hr_change=true",
            COINGECKO_API_URL,
            COINGECKO_SIMPLE_PRICE_ENDPOINT,
            self.coin.coingecko_id()
        )
    }
}

fn parse_price(response: CoinGeckoResponse, coin: Coin) -> Result<CoinQuote, ProviderError> {
    let data = response
        .prices
        .get(coin.coingecko_id())
        .ok_or_else(|| ProviderError::UnsupportedAsset(coin.symbol().to_string()))?;
    let price = data.usd.ok_or(ProviderError::MissingField("usd"))?;

    Ok(CoinQuote::new(price, data.usd_24h_change))
}

#[async_trait]
impl FetchStrategy<CoinQuote> for CoinGeckoPriceProvider {
    async fn fetch(&self) -> Result<CoinQuote, ProviderError> {
        let response: CoinGeckoResponse =
            get_json(&self.client, &self.build_url(), self.provider_name()).await?;
        parse_price(response, self.coin)
    }

    fn provider_name(&self) -> &'static str {
        "coingecko"
    }
}

/// Hourly prices over the last day from CoinGecko
pub struct CoinGeckoHistoryProvider {
    client: Client,
    coin: Coin,
}

impl CoinGeckoHistoryProvider {
    pub fn new(client: Client, coin: Coin) -> Self {
        Self { client, coin }
    }

    fn build_url(&self) -> String {
        format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days=1&interval=hourly",
            COINGECKO_API_URL,
            self.coin.coingecko_id()
        )
    }
}

fn parse_history(response: MarketChartResponse) -> Result<Vec<f64>, ProviderError> {
    let mut points = response.prices.ok_or(ProviderError::MissingField("prices"))?;
    points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    Ok(points.into_iter().map(|(_, price)| price).collect())
}

#[async_trait]
impl FetchStrategy<Vec<f64>> for CoinGeckoHistoryProvider {
    async fn fetch(&self) -> Result<Vec<f64>, ProviderError> {
        let response: MarketChartResponse =
            get_json(&self.client, &self.build_url(), self.provider_name()).await?;
        parse_history(response)
    }

    fn provider_name(&self) -> &'static str {
        "coingecko_market_chart"
    }
}
