use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::traits::{unsupported, QuoteKind, QuoteProvider, QuoteRequest};
use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::stock::Market;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage provider for US stock prices.
///
/// - **Free tier**: 25 requests/day across all endpoints.
/// - **Requires**: API key (settings key `"alphavantage"`).
/// - Used as the fallback behind Yahoo Finance; Korean listings are not served.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Point the provider at another endpoint (used by tests).
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            base_url: base_url.into(),
        }
    }

    fn us_symbol(request: &QuoteRequest) -> Result<&str, CoreError> {
        match request {
            QuoteRequest::Stock {
                market: Market::US,
                ticker,
            } => Ok(ticker.as_str()),
            other => Err(unsupported(PROVIDER, other)),
        }
    }

    fn api_error(message: String) -> CoreError {
        CoreError::Api {
            provider: PROVIDER.into(),
            message,
        }
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
}

#[derive(Deserialize)]
struct DailyData {
    #[serde(rename = "4. close")]
    close: String,
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_kinds(&self) -> Vec<QuoteKind> {
        vec![QuoteKind::Stock]
    }

    async fn latest_quote(&self, request: &QuoteRequest) -> Result<f64, CoreError> {
        let symbol = Self::us_symbol(request)?;
        let resp: GlobalQuoteResponse = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| Self::api_error(format!("Failed to parse quote for {symbol}: {e}")))?;

        let price_str = resp.global_quote.and_then(|q| q.price).ok_or_else(|| {
            Self::api_error(format!("No quote data for {symbol}. API limit may be exceeded."))
        })?;

        price_str
            .trim()
            .parse()
            .map_err(|e| Self::api_error(format!("Invalid price format for {symbol}: {e}")))
    }

    async fn quote_on(&self, request: &QuoteRequest, date: NaiveDate) -> Result<f64, CoreError> {
        let series = self.fetch_daily_series(request).await?;
        let key = date.format("%Y-%m-%d").to_string();
        series
            .get(&key)
            .and_then(|d| d.close.trim().parse().ok())
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: request.symbol(),
                currency: "USD".to_string(),
                date: date.to_string(),
            })
    }

    async fn quote_range(
        &self,
        request: &QuoteRequest,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let series = self.fetch_daily_series(request).await?;

        let mut points: Vec<PricePoint> = series
            .iter()
            .filter_map(|(date_str, data)| {
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
                if date < from || date > to {
                    return None;
                }
                let price: f64 = data.close.trim().parse().ok()?;
                Some(PricePoint { date, price })
            })
            .collect();

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

impl AlphaVantageProvider {
    /// Compact daily series (last 100 trading days).
    async fn fetch_daily_series(
        &self,
        request: &QuoteRequest,
    ) -> Result<HashMap<String, DailyData>, CoreError> {
        let symbol = Self::us_symbol(request)?;
        let resp: TimeSeriesResponse = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "compact"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| Self::api_error(format!("Failed to parse time series for {symbol}: {e}")))?;

        resp.time_series.ok_or_else(|| {
            Self::api_error(format!(
                "No time series data for {symbol}. API limit may be exceeded."
            ))
        })
    }
}
