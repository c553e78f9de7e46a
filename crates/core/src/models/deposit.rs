use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::money::{round2, Currency};
use crate::validation::{self, FormErrors};

/// Deposit (lump sum) or installment saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    Deposit,
    Saving,
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductType::Deposit => write!(f, "DEPOSIT"),
            ProductType::Saving => write!(f, "SAVING"),
        }
    }
}

/// How often interest is compounded. `None` means simple interest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compounding {
    #[default]
    None,
    Monthly,
    Quarterly,
    Annually,
}

impl Compounding {
    /// `(days per period, periods per year)` used by the compound approximation.
    fn period(&self) -> Option<(i64, f64)> {
        match self {
            Compounding::None => None,
            Compounding::Monthly => Some((30, 12.0)),
            Compounding::Quarterly => Some((91, 4.0)),
            Compounding::Annually => Some((365, 1.0)),
        }
    }
}

/// A bank deposit or savings product held by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositSaving {
    pub id: u64,
    pub user_id: u64,
    pub product_type: ProductType,
    pub bank_name: String,
    pub product_name: String,
    pub principal_amount: f64,
    /// Annual interest rate in percent (3.5 means 3.5%)
    pub annual_rate: f64,
    pub compounding: Compounding,
    pub start_date: NaiveDate,
    pub maturity_date: Option<NaiveDate>,
    pub currency: Currency,
    /// User-entered current value; overrides the interest estimate when set
    pub current_value_manual: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DepositSaving {
    /// Estimate the value on `as_of`.
    ///
    /// Interest stops accruing at maturity. Compounding is approximated by
    /// whole periods of fixed length (30, 91 or 365 days).
    pub fn estimated_value(&self, as_of: NaiveDate) -> f64 {
        if let Some(manual) = self.current_value_manual {
            return manual;
        }

        let end = match self.maturity_date {
            Some(maturity) => as_of.min(maturity),
            None => as_of,
        };
        let days = (end - self.start_date).num_days();
        if days <= 0 {
            return self.principal_amount;
        }

        let rate = self.annual_rate / 100.0;
        let value = match self.compounding.period() {
            None => {
                let years = days as f64 / 365.0;
                self.principal_amount * (1.0 + rate * years)
            }
            Some((period_days, per_year)) => {
                let periods = (days / period_days) as i32;
                self.principal_amount * (1.0 + rate / per_year).powi(periods)
            }
        };
        round2(value)
    }
}

impl std::fmt::Display for DepositSaving {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.bank_name, self.product_name, self.product_type
        )
    }
}

/// Submitted fields for creating or editing a deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositInput {
    pub product_type: ProductType,
    pub bank_name: String,
    pub product_name: String,
    pub principal_amount: f64,
    pub annual_rate: f64,
    #[serde(default)]
    pub compounding: Compounding,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub maturity_date: Option<NaiveDate>,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub current_value_manual: Option<f64>,
}

impl DepositInput {
    /// Validate and normalize (trimmed text) the submitted fields.
    pub fn clean(mut self) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();
        self.bank_name = validation::required_text(&mut errors, "bank_name", &self.bank_name, 100);
        self.product_name =
            validation::required_text(&mut errors, "product_name", &self.product_name, 150);
        validation::decimal(&mut errors, "principal_amount", self.principal_amount, 18, 2);
        validation::decimal(&mut errors, "annual_rate", self.annual_rate, 5, 2);
        validation::optional_decimal(
            &mut errors,
            "current_value_manual",
            self.current_value_manual,
            18,
            2,
        );
        if let Some(maturity) = self.maturity_date {
            if maturity < self.start_date {
                errors.add("maturity_date", "Maturity date must not be before the start date.");
            }
        }
        errors.into_result()?;
        Ok(self)
    }
}
