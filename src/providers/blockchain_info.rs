//! blockchain.info ticker provider (BTC only, no 24h change)

use crate::{
    constants::BLOCKCHAIN_INFO_TICKER_URL,
    error::ProviderError,
    provider::FetchStrategy,
    providers::http::get_json,
    types::{Coin, CoinQuote},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct TickerEntry {
    last: Option<f64>,
}

/// Legacy ticker keyed by fiat currency
#[derive(Debug, Deserialize)]
struct TickerResponse(HashMap<String, TickerEntry>);

pub struct BlockchainInfoProvider {
    client: Client,
}

impl BlockchainInfoProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Whether the ticker quotes `coin`
    pub fn supports(coin: Coin) -> bool {
        coin == Coin::BTC
    }
}

fn parse_ticker(response: TickerResponse) -> Result<CoinQuote, ProviderError> {
    let price = response
        .0
        .get("USD")
        .and_then(|entry| entry.last)
        .ok_or(ProviderError::MissingField("USD.last"))?;

    Ok(CoinQuote::new(price, None))
}

#[async_trait]
impl FetchStrategy<CoinQuote> for BlockchainInfoProvider {
    async fn fetch(&self) -> Result<CoinQuote, ProviderError> {
        let response: TickerResponse =
            get_json(&self.client, BLOCKCHAIN_INFO_TICKER_URL, self.provider_name()).await?;
        parse_ticker(response)
    }

    fn provider_name(&self) -> &'static str {
        "blockchain_info"
    }
}
