//! Ordered fallback chain of fetch strategies

use crate::{cancel::CancelSignal, provider::FetchStrategy};
use std::sync::Arc;

/// Result of running a provider chain once
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome<T> {
    /// A strategy produced a value that passed validation
    Fetched { value: T, provider: &'static str },
    /// Every strategy failed or produced an invalid value
    Exhausted,
    /// The session signal fired before a value was produced
    Cancelled,
}

impl<T> ChainOutcome<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            ChainOutcome::Fetched { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Tries strategies in declared order until one yields a valid value
///
/// Strategies are never raced: the chain's duration is the sum of the
/// attempted strategies, and provider priority decides the result.
pub struct ProviderChain<T> {
    providers: Vec<Arc<dyn FetchStrategy<T>>>,
    validate: fn(&T) -> bool,
}

impl<T: Send + 'static> ProviderChain<T> {
    /// Creates a chain; `providers` are tried in the order given
    pub fn new(providers: Vec<Arc<dyn FetchStrategy<T>>>, validate: fn(&T) -> bool) -> Self {
        Self {
            providers,
            validate,
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.provider_name()).collect()
    }

    pub fn is_valid(&self, value: &T) -> bool {
        (self.validate)(value)
    }

    /// Runs the chain once
    ///
    /// Provider errors never escape: they are logged and the next strategy is
    /// tried. Triggering `cancel` drops the in-flight strategy future, which
    /// aborts its HTTP request.
    pub async fn execute(&self, cancel: &CancelSignal) -> ChainOutcome<T> {
        for provider in &self.providers {
            if cancel.is_cancelled() {
                return ChainOutcome::Cancelled;
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return ChainOutcome::Cancelled,
                result = provider.fetch() => result,
            };

            match result {
                Ok(value) if (self.validate)(&value) => {
                    return ChainOutcome::Fetched {
                        value,
                        provider: provider.provider_name(),
                    };
                }
                Ok(_) => {
                    tracing::debug!(
                        provider = provider.provider_name(),
                        "Provider returned a value that failed validation"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        provider = provider.provider_name(),
                        error = %e,
                        "Provider failed"
                    );
                }
            }
        }

        ChainOutcome::Exhausted
    }
}
