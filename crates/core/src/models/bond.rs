use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::money::Currency;
use crate::validation::{self, FormErrors};

/// A bond position. Prices are quoted as a percentage of face value (par = 100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondHolding {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    pub issuer: String,
    pub currency: Currency,
    /// Total face amount held
    pub face_amount: f64,
    /// Coupon rate in percent
    pub coupon_rate: f64,
    pub purchase_price_pct: f64,
    pub current_price_pct: Option<f64>,
    pub maturity_date: NaiveDate,
    /// Exchange code or ISIN used to look up quotes; empty when unknown
    pub bond_code: String,
    pub last_price_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BondHolding {
    pub fn effective_price_pct(&self) -> f64 {
        self.current_price_pct.unwrap_or(self.purchase_price_pct)
    }

    pub fn estimated_value(&self) -> f64 {
        self.face_amount * (self.effective_price_pct() / 100.0)
    }
}

impl std::fmt::Display for BondHolding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.currency)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondInput {
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub currency: Currency,
    pub face_amount: f64,
    pub coupon_rate: f64,
    pub purchase_price_pct: f64,
    #[serde(default)]
    pub current_price_pct: Option<f64>,
    pub maturity_date: NaiveDate,
    #[serde(default)]
    pub bond_code: String,
}

impl BondInput {
    pub fn clean(mut self) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();
        self.name = validation::required_text(&mut errors, "name", &self.name, 150);
        self.issuer = validation::optional_text(&mut errors, "issuer", &self.issuer, 150);
        self.bond_code = validation::optional_text(&mut errors, "bond_code", &self.bond_code, 32);
        validation::decimal(&mut errors, "face_amount", self.face_amount, 18, 2);
        validation::decimal(&mut errors, "coupon_rate", self.coupon_rate, 5, 2);
        validation::decimal(&mut errors, "purchase_price_pct", self.purchase_price_pct, 6, 3);
        validation::optional_decimal(&mut errors, "current_price_pct", self.current_price_pct, 6, 3);
        errors.into_result()?;
        Ok(self)
    }
}
