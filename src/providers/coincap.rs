//! CoinCap price and history providers
//!
//! CoinCap encodes every number as a string.

use crate::{
    constants::{COINCAP_API_URL, HISTORY_WINDOW_MS},
    error::ProviderError,
    provider::FetchStrategy,
    providers::http::{get_json, parse_decimal},
    types::{Coin, CoinQuote},
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AssetResponse {
    data: Option<AssetData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetData {
    price_usd: Option<String>,
    change_percent_24_hr: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    data: Option<Vec<HistoryPoint>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryPoint {
    price_usd: Option<String>,
    time: Option<i64>,
}

/// Spot price + 24h change from CoinCap
pub struct CoinCapPriceProvider {
    client: Client,
    coin: Coin,
}

impl CoinCapPriceProvider {
    pub fn new(client: Client, coin: Coin) -> Self {
        Self { client, coin }
    }

    fn build_url(&self) -> String {
        format!("{}/assets/{}", COINCAP_API_URL, self.coin.coincap_id())
    }
}

fn parse_asset(response: AssetResponse) -> Result<CoinQuote, ProviderError> {
    let data = response.data.ok_or(ProviderError::MissingField("data"))?;
    let price = data
        .price_usd
        .as_deref()
        .ok_or(ProviderError::MissingField("priceUsd"))
        .and_then(|raw| parse_decimal(raw, "priceUsd"))?;
    // An unusable change figure only loses the change, not the price
    let change = data
        .change_percent_24_hr
        .as_deref()
        .and_then(|raw| parse_decimal(raw, "changePercent24Hr").ok());

    Ok(CoinQuote::new(price, change))
}

#[async_trait]
impl FetchStrategy<CoinQuote> for CoinCapPriceProvider {
    async fn fetch(&self) -> Result<CoinQuote, ProviderError> {
        let response: AssetResponse =
            get_json(&self.client, &self.build_url(), self.provider_name()).await?;
        parse_asset(response)
    }

    fn provider_name(&self) -> &'static str {
        "coincap"
    }
}

/// Hourly prices over the last day from CoinCap
pub struct CoinCapHistoryProvider {
    client: Client,
    coin: Coin,
}

impl CoinCapHistoryProvider {
    pub fn new(client: Client, coin: Coin) -> Self {
        Self { client, coin }
    }

    fn build_url(&self, end_ms: i64) -> String {
        format!(
            "{}/assets/{}/history?interval=h1&start={}&end={}",
            COINCAP_API_URL,
            self.coin.coincap_id(),
            end_ms - HISTORY_WINDOW_MS,
            end_ms
        )
    }
}

fn parse_history(response: HistoryResponse) -> Result<Vec<f64>, ProviderError> {
    let mut points = response.data.ok_or(ProviderError::MissingField("data"))?;
    points.sort_by_key(|p| p.time.unwrap_or(i64::MIN));

    points
        .iter()
        .map(|p| {
            p.price_usd
                .as_deref()
                .ok_or(ProviderError::MissingField("priceUsd"))
                .and_then(|raw| parse_decimal(raw, "priceUsd"))
        })
        .collect()
}

#[async_trait]
impl FetchStrategy<Vec<f64>> for CoinCapHistoryProvider {
    async fn fetch(&self) -> Result<Vec<f64>, ProviderError> {
        let url = self.build_url(Utc::now().timestamp_millis());
        let response: HistoryResponse = get_json(&self.client, &url, self.provider_name()).await?;
        parse_history(response)
    }

    fn provider_name(&self) -> &'static str {
        "coincap_history"
    }
}
