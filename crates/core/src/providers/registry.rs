use std::collections::HashMap;

use super::alphavantage::AlphaVantageProvider;
use super::frankfurter::FrankfurterProvider;
use super::traits::{QuoteKind, QuoteProvider};
use super::yahoo_finance::YahooFinanceProvider;

/// Registry of all available quote providers.
///
/// Routes requests by [`QuoteKind`]; providers registered first are tried first.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn QuoteProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registry with the built-in providers.
    ///
    /// There is no built-in bond source; bonds only update when a bond
    /// provider is registered explicitly.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();

        // Frankfurter: ECB exchange rates, no key
        registry.register(Box::new(FrankfurterProvider::new()));

        // Yahoo Finance: stocks, no key (primary)
        match YahooFinanceProvider::new() {
            Ok(yahoo) => registry.register(Box::new(yahoo)),
            Err(e) => tracing::warn!(error = %e, "Yahoo Finance unavailable"),
        }

        // Alpha Vantage: stocks, requires key (fallback)
        if let Some(key) = api_keys.get("alphavantage").filter(|k| !k.trim().is_empty()) {
            registry.register(Box::new(AlphaVantageProvider::new(key.clone())));
        }

        registry
    }

    pub fn register(&mut self, provider: Box<dyn QuoteProvider>) {
        self.providers.push(provider);
    }

    pub fn get_provider_for(&self, kind: QuoteKind) -> Option<&dyn QuoteProvider> {
        self.providers
            .iter()
            .find(|p| p.supported_kinds().contains(&kind))
            .map(|p| p.as_ref())
    }

    /// All providers for `kind`, in fallback order.
    pub fn get_providers_for(&self, kind: QuoteKind) -> Vec<&dyn QuoteProvider> {
        self.providers
            .iter()
            .filter(|p| p.supported_kinds().contains(&kind))
            .map(|p| p.as_ref())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
