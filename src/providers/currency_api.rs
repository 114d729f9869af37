//! fawazahmed0 currency API (jsDelivr CDN)

use crate::{
    constants::{CURRENCY_API_USD_URL, FX_QUOTE_LOWER},
    error::ProviderError,
    provider::FetchStrategy,
    providers::http::get_json,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

/// `{ "date": "...", "usd": { "rub": 92.1, ... } }`
#[derive(Debug, Deserialize)]
struct CurrencyResponse {
    usd: Option<HashMap<String, f64>>,
}

pub struct CurrencyApiProvider {
    client: Client,
}

impl CurrencyApiProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn parse_rate(response: CurrencyResponse) -> Result<f64, ProviderError> {
    response
        .usd
        .as_ref()
        .and_then(|rates| rates.get(FX_QUOTE_LOWER))
        .copied()
        .filter(|rate| *rate != 0.0)
        .ok_or(ProviderError::MissingField("usd.rub"))
}

#[async_trait]
impl FetchStrategy<f64> for CurrencyApiProvider {
    async fn fetch(&self) -> Result<f64, ProviderError> {
        let response: CurrencyResponse =
            get_json(&self.client, CURRENCY_API_USD_URL, self.provider_name()).await?;
        parse_rate(response)
    }

    fn provider_name(&self) -> &'static str {
        "currency_api"
    }
}
