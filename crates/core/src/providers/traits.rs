use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::money::Currency;
use crate::models::price::PricePoint;
use crate::models::stock::Market;

/// What kind of quote a provider can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteKind {
    Stock,
    /// Bond prices, as a percentage of face value
    Bond,
    /// Exchange rate between two currencies
    Fx,
}

impl std::fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteKind::Stock => write!(f, "stock"),
            QuoteKind::Bond => write!(f, "bond"),
            QuoteKind::Fx => write!(f, "fx"),
        }
    }
}

/// The instrument a quote is requested for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuoteRequest {
    Stock { market: Market, ticker: String },
    Bond { code: String },
    /// Price of one unit of `from` expressed in `to`
    Fx { from: Currency, to: Currency },
}

impl QuoteRequest {
    pub fn stock(market: Market, ticker: impl Into<String>) -> Self {
        QuoteRequest::Stock {
            market,
            ticker: ticker.into().trim().to_uppercase(),
        }
    }

    pub fn bond(code: impl Into<String>) -> Self {
        QuoteRequest::Bond {
            code: code.into().trim().to_string(),
        }
    }

    pub fn fx(from: Currency, to: Currency) -> Self {
        QuoteRequest::Fx { from, to }
    }

    pub fn kind(&self) -> QuoteKind {
        match self {
            QuoteRequest::Stock { .. } => QuoteKind::Stock,
            QuoteRequest::Bond { .. } => QuoteKind::Bond,
            QuoteRequest::Fx { .. } => QuoteKind::Fx,
        }
    }

    /// Label used in logs and errors.
    pub fn symbol(&self) -> String {
        match self {
            QuoteRequest::Stock { market, ticker } => format!("{ticker}:{market}"),
            QuoteRequest::Bond { code } => code.clone(),
            QuoteRequest::Fx { from, to } => format!("{from}/{to}"),
        }
    }
}

impl std::fmt::Display for QuoteRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.symbol())
    }
}

/// Trait abstraction for every quote source.
///
/// Each API (Yahoo Finance, Alpha Vantage, Frankfurter) implements this
/// trait; services only ever talk to `dyn QuoteProvider` through the
/// registry, so tests can plug in mocks.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs and history records).
    fn name(&self) -> &str;

    fn supported_kinds(&self) -> Vec<QuoteKind>;

    /// Latest available quote.
    async fn latest_quote(&self, request: &QuoteRequest) -> Result<f64, CoreError>;

    /// Quote on a specific date (closest trading day for markets).
    async fn quote_on(&self, request: &QuoteRequest, date: NaiveDate) -> Result<f64, CoreError>;

    /// Quotes for a date range, sorted by date.
    async fn quote_range(
        &self,
        request: &QuoteRequest,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError>;
}

/// Shared "wrong request type" error for providers that only serve one kind.
pub(crate) fn unsupported(provider: &str, request: &QuoteRequest) -> CoreError {
    CoreError::Api {
        provider: provider.to_string(),
        message: format!("{} quotes are not supported ({request})", request.kind()),
    }
}
