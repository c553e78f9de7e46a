use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Currencies a holding can be denominated in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    KRW,
    USD,
    JPY,
    EUR,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::KRW, Currency::USD, Currency::JPY, Currency::EUR];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::KRW => "KRW",
            Currency::USD => "USD",
            Currency::JPY => "JPY",
            Currency::EUR => "EUR",
        }
    }

    /// Human-readable label shown next to amounts.
    pub fn label(&self) -> &'static str {
        match self {
            Currency::KRW => "Korean Won (KRW)",
            Currency::USD => "US Dollar (USD)",
            Currency::JPY => "Japanese Yen (JPY)",
            Currency::EUR => "Euro (EUR)",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "KRW" => Ok(Currency::KRW),
            "USD" => Ok(Currency::USD),
            "JPY" => Ok(Currency::JPY),
            "EUR" => Ok(Currency::EUR),
            other => Err(CoreError::ValidationError(format!(
                "Unsupported currency '{other}' (expected one of KRW, USD, JPY, EUR)"
            ))),
        }
    }
}

/// Broad asset class used for allocation breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetClass {
    /// Deposits and savings products
    Cash,
    Stock,
    Bond,
}

impl AssetClass {
    /// Fixed presentation order.
    pub const ORDER: [AssetClass; 3] = [AssetClass::Cash, AssetClass::Stock, AssetClass::Bond];

    pub fn key(&self) -> &'static str {
        match self {
            AssetClass::Cash => "CASH",
            AssetClass::Stock => "STOCK",
            AssetClass::Bond => "BOND",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssetClass::Cash => "Deposits",
            AssetClass::Stock => "Stocks",
            AssetClass::Bond => "Bonds",
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for AssetClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "deposit" | "deposits" => Ok(AssetClass::Cash),
            "stock" | "stocks" => Ok(AssetClass::Stock),
            "bond" | "bonds" => Ok(AssetClass::Bond),
            other => Err(CoreError::ValidationError(format!(
                "Unknown asset class '{other}'"
            ))),
        }
    }
}

/// Round to two decimal places (cents / percentage points).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
