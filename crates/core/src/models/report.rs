use serde::{Deserialize, Serialize};

use super::bond::BondHolding;
use super::deposit::DepositSaving;
use super::history::LastChange;
use super::money::{AssetClass, Currency};
use super::stock::StockHolding;

/// A holding together with its current estimate and latest recorded change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Valued<H> {
    pub holding: H,
    pub estimated_value: f64,
    pub last_change: LastChange,
}

/// Per-class amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassTotals {
    #[serde(rename = "CASH")]
    pub cash: f64,
    #[serde(rename = "STOCK")]
    pub stock: f64,
    #[serde(rename = "BOND")]
    pub bond: f64,
}

impl ClassTotals {
    pub fn get(&self, class: AssetClass) -> f64 {
        match class {
            AssetClass::Cash => self.cash,
            AssetClass::Stock => self.stock,
            AssetClass::Bond => self.bond,
        }
    }

    pub fn add(&mut self, class: AssetClass, amount: f64) {
        match class {
            AssetClass::Cash => self.cash += amount,
            AssetClass::Stock => self.stock += amount,
            AssetClass::Bond => self.bond += amount,
        }
    }

    pub fn sum(&self) -> f64 {
        self.cash + self.stock + self.bond
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyTotal {
    pub currency: Currency,
    pub total: f64,
}

/// Everything the portfolio landing page shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioOverview {
    pub deposits: Vec<Valued<DepositSaving>>,
    pub stocks: Vec<Valued<StockHolding>>,
    pub bonds: Vec<Valued<BondHolding>>,
    /// Native-currency sums in first-seen order
    pub totals_by_currency: Vec<CurrencyTotal>,
    pub class_totals: ClassTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAllocation {
    pub class: AssetClass,
    pub label: String,
    /// Share of the portfolio in percent, rounded to 2 decimals
    pub ratio: f64,
    /// Total in the base currency
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyAllocation {
    pub currency: Currency,
    pub label: String,
    pub ratio: f64,
    /// Total in the holdings' own currency
    pub total: f64,
    /// Total converted into the base currency
    pub converted_total: f64,
}

/// Allocation by asset class and by currency, ready for pie charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationReport {
    pub base_currency: Currency,
    /// True when every currency was converted with a real exchange rate
    pub converted: bool,
    pub class_items: Vec<ClassAllocation>,
    pub currency_items: Vec<CurrencyAllocation>,
    pub class_labels: Vec<String>,
    pub class_data: Vec<f64>,
    pub currency_labels: Vec<String>,
    pub currency_data: Vec<f64>,
    /// Sum of the latest recorded value changes per class, in base currency
    pub class_change_sums: ClassTotals,
    pub total_sum: f64,
}

/// One asset class listed with its totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryList<H> {
    pub class: AssetClass,
    pub items: Vec<Valued<H>>,
    /// Sum of estimated values (native amounts, not converted)
    pub total: f64,
    /// Sum of the latest recorded value changes
    pub change_sum: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HoldingSearchResults {
    pub deposits: Vec<DepositSaving>,
    pub stocks: Vec<StockHolding>,
    pub bonds: Vec<BondHolding>,
}

impl HoldingSearchResults {
    pub fn len(&self) -> usize {
        self.deposits.len() + self.stocks.len() + self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of a price refresh run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub stocks_updated: usize,
    pub stocks_total: usize,
    pub bonds_updated: usize,
    pub bonds_total: usize,
    pub deposits_snapshotted: usize,
}

impl std::fmt::Display for RefreshSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Stocks: {}/{} updated, Bonds: {}/{} updated, Deposits: {} snapshotted",
            self.stocks_updated,
            self.stocks_total,
            self.bonds_updated,
            self.bonds_total,
            self.deposits_snapshotted
        )
    }
}
