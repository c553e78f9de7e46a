use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::traits::{unsupported, QuoteKind, QuoteProvider, QuoteRequest};
use crate::errors::CoreError;
use crate::models::money::Currency;
use crate::models::price::PricePoint;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";
const PROVIDER: &str = "Frankfurter";

/// Frankfurter provider for exchange rates (European Central Bank data).
///
/// No API key, no rate limits. Endpoints used: `/latest`, `/{date}` and
/// `/{start}..{end}`.
pub struct FrankfurterProvider {
    client: Client,
    base_url: String,
}

impl FrankfurterProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Point the provider at another endpoint (used by tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn pair(request: &QuoteRequest) -> Result<(Currency, Currency), CoreError> {
        match request {
            QuoteRequest::Fx { from, to } => Ok((*from, *to)),
            other => Err(unsupported(PROVIDER, other)),
        }
    }

    async fn fetch_rates(&self, path: &str, from: Currency, to: Currency) -> Result<RatesResponse, CoreError> {
        let url = format!("{}/{path}", self.base_url);
        self.client
            .get(&url)
            .query(&[("base", from.code()), ("symbols", to.code())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse {path} rate for {from}/{to}: {e}"),
            })
    }
}

impl Default for FrankfurterProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── Frankfurter API response types ──────────────────────────────────

#[derive(Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    rates: HashMap<String, HashMap<String, f64>>,
}

#[async_trait]
impl QuoteProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_kinds(&self) -> Vec<QuoteKind> {
        vec![QuoteKind::Fx]
    }

    async fn latest_quote(&self, request: &QuoteRequest) -> Result<f64, CoreError> {
        let (from, to) = Self::pair(request)?;
        if from == to {
            return Ok(1.0);
        }

        let resp = self.fetch_rates("latest", from, to).await?;
        resp.rates.get(to.code()).copied().ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No rate found for {from} -> {to}"),
        })
    }

    async fn quote_on(&self, request: &QuoteRequest, date: NaiveDate) -> Result<f64, CoreError> {
        let (from, to) = Self::pair(request)?;
        if from == to {
            return Ok(1.0);
        }

        let path = date.format("%Y-%m-%d").to_string();
        let resp = self.fetch_rates(&path, from, to).await?;
        resp.rates
            .get(to.code())
            .copied()
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: from.to_string(),
                currency: to.to_string(),
                date: date.to_string(),
            })
    }

    async fn quote_range(
        &self,
        request: &QuoteRequest,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let (from, to) = Self::pair(request)?;

        if from == to {
            return Ok(from_date
                .iter_days()
                .take_while(|d| *d <= to_date)
                .map(|date| PricePoint { date, price: 1.0 })
                .collect());
        }

        let url = format!(
            "{}/{}..{}",
            self.base_url,
            from_date.format("%Y-%m-%d"),
            to_date.format("%Y-%m-%d")
        );

        let resp: TimeSeriesResponse = self
            .client
            .get(&url)
            .query(&[("base", from.code()), ("symbols", to.code())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse time series for {from}/{to}: {e}"),
            })?;

        let mut points: Vec<PricePoint> = resp
            .rates
            .iter()
            .filter_map(|(date_str, rates)| {
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
                let price = rates.get(to.code())?;
                Some(PricePoint {
                    date,
                    price: *price,
                })
            })
            .collect();

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}
