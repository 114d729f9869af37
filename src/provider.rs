//! Fetch strategy abstraction shared by every feed

use crate::error::ProviderError;
use async_trait::async_trait;

/// One way of obtaining a feed value from one upstream source
///
/// Strategies are bound to their parameters (coin, currency pair) when
/// built, so a provider chain can call them without arguments. A response
/// that decodes but lacks the expected field must be reported as an error,
/// never as a placeholder value, so the chain moves on.
#[async_trait]
pub trait FetchStrategy<T>: Send + Sync {
    /// Attempts to produce a value
    async fn fetch(&self) -> Result<T, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}
