use async_trait::async_trait;
use chrono::NaiveDate;
use time::OffsetDateTime;

use super::traits::{unsupported, QuoteKind, QuoteProvider, QuoteRequest};
use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::stock::Market;

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance provider for listed stocks.
///
/// - **Free**: no API key.
/// - **Coverage**: US tickers as-is; Korean codes are looked up on KOSPI
///   (`.KS`) first and KOSDAQ (`.KQ`) second.
/// - Prices come back in the listing's own currency.
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Yahoo symbols to try for a listing, in order.
    pub fn candidate_symbols(market: Market, ticker: &str) -> Vec<String> {
        let ticker = ticker.trim().to_uppercase();
        match market {
            Market::US => vec![ticker],
            Market::KR if ticker.contains('.') => vec![ticker],
            Market::KR => vec![format!("{ticker}.KS"), format!("{ticker}.KQ")],
        }
    }

    fn symbols_for(request: &QuoteRequest) -> Result<Vec<String>, CoreError> {
        match request {
            QuoteRequest::Stock { market, ticker } => Ok(Self::candidate_symbols(*market, ticker)),
            other => Err(unsupported(PROVIDER, other)),
        }
    }

    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let ts = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| CoreError::ValidationError(format!("Invalid date {date}")))?;
        OffsetDateTime::from_unix_timestamp(ts).map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid date {date}: {e}"),
        })
    }

    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }

    async fn latest_for_symbol(&self, symbol: &str) -> Result<f64, CoreError> {
        let resp = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch latest quote for {symbol}: {e}"),
            })?;

        let quote = resp.last_quote().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No quote data for {symbol}: {e}"),
        })?;

        Ok(quote.close)
    }

    async fn history_for_symbol(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let start = Self::to_offset_datetime(from)?;
        // inclusive end
        let end = Self::to_offset_datetime(to + chrono::Duration::days(1))?;

        let resp = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch history for {symbol}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let mut points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp)?;
                (date >= from && date <= to).then_some(PricePoint {
                    date,
                    price: q.close,
                })
            })
            .collect();
        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

#[async_trait]
impl QuoteProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_kinds(&self) -> Vec<QuoteKind> {
        vec![QuoteKind::Stock]
    }

    async fn latest_quote(&self, request: &QuoteRequest) -> Result<f64, CoreError> {
        let mut last_err = None;
        for symbol in Self::symbols_for(request)? {
            match self.latest_for_symbol(&symbol).await {
                Ok(price) => return Ok(price),
                Err(e) => {
                    tracing::debug!(symbol = %symbol, error = %e, "Yahoo symbol lookup failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| unsupported(PROVIDER, request)))
    }

    async fn quote_on(&self, request: &QuoteRequest, date: NaiveDate) -> Result<f64, CoreError> {
        // A short window covers weekends and holidays.
        let from = date - chrono::Duration::days(3);
        let points = self.quote_range(request, from, date).await?;
        points
            .last()
            .map(|p| p.price)
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: request.symbol(),
                currency: "-".to_string(),
                date: date.to_string(),
            })
    }

    async fn quote_range(
        &self,
        request: &QuoteRequest,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let mut last_err = None;
        for symbol in Self::symbols_for(request)? {
            match self.history_for_symbol(&symbol, from, to).await {
                Ok(points) if !points.is_empty() => return Ok(points),
                Ok(_) => {}
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}
