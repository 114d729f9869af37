//! `{ "rates": { "RUB": ... } }` style exchange rate APIs
//!
//! open.er-api.com and exchangerate-api.com share this response schema, so
//! one provider type serves both with a different endpoint.

use crate::{
    constants::{EXCHANGERATE_API_USD_URL, FX_QUOTE_UPPER, OPEN_ER_API_USD_URL},
    error::ProviderError,
    provider::FetchStrategy,
    providers::http::get_json,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: Option<HashMap<String, f64>>,
}

pub struct RatesApiProvider {
    client: Client,
    url: &'static str,
    name: &'static str,
}

impl RatesApiProvider {
    /// open.er-api.com latest USD rates
    pub fn open_er_api(client: Client) -> Self {
        Self {
            client,
            url: OPEN_ER_API_USD_URL,
            name: "open_er_api",
        }
    }

    /// exchangerate-api.com v4 latest USD rates
    pub fn exchangerate_api(client: Client) -> Self {
        Self {
            client,
            url: EXCHANGERATE_API_USD_URL,
            name: "exchangerate_api",
        }
    }
}

fn parse_rate(response: RatesResponse) -> Result<f64, ProviderError> {
    response
        .rates
        .as_ref()
        .and_then(|rates| rates.get(FX_QUOTE_UPPER))
        .copied()
        .filter(|rate| *rate != 0.0)
        .ok_or(ProviderError::MissingField("rates.RUB"))
}

#[async_trait]
impl FetchStrategy<f64> for RatesApiProvider {
    async fn fetch(&self) -> Result<f64, ProviderError> {
        let response: RatesResponse = get_json(&self.client, self.url, self.name).await?;
        parse_rate(response)
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}
