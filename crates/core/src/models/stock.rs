use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::Currency;
use crate::validation::{self, FormErrors};

/// Exchange the stock is listed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    /// Korea Exchange (6-digit codes)
    KR,
    /// US exchanges (ticker symbols)
    US,
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Market::KR => write!(f, "KR"),
            Market::US => write!(f, "US"),
        }
    }
}

/// A position in a listed stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockHolding {
    pub id: u64,
    pub user_id: u64,
    pub market: Market,
    /// Ticker or exchange code, uppercased
    pub ticker: String,
    pub name: String,
    pub quantity: f64,
    /// Average purchase price in the trading currency
    pub average_price: f64,
    pub currency: Currency,
    pub current_price: Option<f64>,
    pub last_price_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockHolding {
    /// Price used for valuation: the latest quote, or the purchase price.
    pub fn effective_price(&self) -> f64 {
        self.current_price.unwrap_or(self.average_price)
    }

    pub fn estimated_value(&self) -> f64 {
        self.effective_price() * self.quantity
    }
}

impl std::fmt::Display for StockHolding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.ticker, self.market)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockInput {
    pub market: Market,
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    pub quantity: f64,
    pub average_price: f64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub current_price: Option<f64>,
}

impl StockInput {
    pub fn clean(mut self) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();
        self.ticker = validation::required_text(&mut errors, "ticker", &self.ticker, 20).to_uppercase();
        self.name = validation::optional_text(&mut errors, "name", &self.name, 150);
        validation::decimal(&mut errors, "quantity", self.quantity, 18, 4);
        validation::decimal(&mut errors, "average_price", self.average_price, 18, 4);
        validation::optional_decimal(&mut errors, "current_price", self.current_price, 18, 4);
        if self.market == Market::KR
            && !self.ticker.is_empty()
            && !self.ticker.chars().all(|c| c.is_ascii_alphanumeric())
        {
            errors.add("ticker", "Korean listings use an alphanumeric exchange code (e.g. 005930).");
        }
        errors.into_result()?;
        Ok(self)
    }
}
