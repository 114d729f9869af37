//! Shared HTTP plumbing for the upstream providers

use crate::{
    constants::{REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::ProviderError,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Builds the client every provider shares
pub fn build_client() -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(ProviderError::NetworkError)
}

/// Issues a GET and decodes the JSON body
///
/// Non-2xx statuses are provider failures; 429 is reported separately so it
/// shows up distinctly in logs.
pub async fn get_json<R: DeserializeOwned>(
    client: &Client,
    url: &str,
    provider: &'static str,
) -> Result<R, ProviderError> {
    tracing::debug!(provider, url, "Fetching");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(ProviderError::NetworkError)?;

    let status = response.status();
    if status.as_u16() == 429 {
        return Err(ProviderError::RateLimitExceeded);
    }
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.text().await.map_err(ProviderError::NetworkError)?;
    parse_json(&body, provider)
}

/// Decodes a response body, keeping a short excerpt for diagnostics
pub fn parse_json<R: DeserializeOwned>(body: &str, provider: &'static str) -> Result<R, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        let excerpt: String = body.chars().take(200).collect();
        ProviderError::InvalidResponse(format!(
            "Failed to parse {} response: {}. Response: {}",
            provider, e, excerpt
        ))
    })
}

/// Parses a string-encoded decimal as sent by CoinCap
pub fn parse_decimal(raw: &str, field: &'static str) -> Result<f64, ProviderError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(ProviderError::MissingField(field))
}
