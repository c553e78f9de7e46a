use chrono::NaiveDate;

use crate::models::bond::BondHolding;
use crate::models::database::Database;
use crate::models::deposit::DepositSaving;
use crate::models::history::LastChange;
use crate::models::money::{round2, AssetClass, Currency};
use crate::models::report::{
    AllocationReport, CategoryList, ClassAllocation, ClassTotals, CurrencyAllocation,
    CurrencyTotal, PortfolioOverview, Valued,
};
use crate::models::stock::StockHolding;
use crate::services::currency_service::FxTable;

/// Portfolio aggregation: per-row valuation, totals and allocation ratios.
///
/// Pure computation over the in-memory [`Database`]. Exchange rates come in
/// as an [`FxTable`] so the numbers can be reproduced offline.
pub struct AllocationService;

/// Change in holding value implied by the latest recorded change.
pub fn deposit_change(change: &LastChange) -> f64 {
    change.delta.unwrap_or(0.0)
}

/// Price delta times the quantity held.
pub fn stock_change(stock: &StockHolding, change: &LastChange) -> f64 {
    change.delta.unwrap_or(0.0) * stock.quantity
}

/// Face amount times the percentage-point delta.
pub fn bond_change(bond: &BondHolding, change: &LastChange) -> f64 {
    bond.face_amount * change.delta.unwrap_or(0.0) / 100.0
}

/// Percentage of `part` in `whole`, 0 when there is nothing to divide.
fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        round2(part * 100.0 / whole)
    } else {
        0.0
    }
}

impl AllocationService {
    pub fn new() -> Self {
        Self
    }

    pub fn valued_deposits(
        &self,
        db: &Database,
        user_id: u64,
        today: NaiveDate,
    ) -> Vec<Valued<DepositSaving>> {
        db.deposits_of(user_id)
            .into_iter()
            .map(|d| Valued {
                estimated_value: d.estimated_value(today),
                last_change: LastChange::of(&db.deposit_values, d.id),
                holding: d.clone(),
            })
            .collect()
    }

    pub fn valued_stocks(&self, db: &Database, user_id: u64) -> Vec<Valued<StockHolding>> {
        db.stocks_of(user_id)
            .into_iter()
            .map(|s| Valued {
                estimated_value: s.estimated_value(),
                last_change: LastChange::of(&db.stock_prices, s.id),
                holding: s.clone(),
            })
            .collect()
    }

    pub fn valued_bonds(&self, db: &Database, user_id: u64) -> Vec<Valued<BondHolding>> {
        db.bonds_of(user_id)
            .into_iter()
            .map(|b| Valued {
                estimated_value: b.estimated_value(),
                last_change: LastChange::of(&db.bond_prices, b.id),
                holding: b.clone(),
            })
            .collect()
    }

    /// Currencies of a user's holdings in first-seen order (deposits, stocks, bonds).
    pub fn currencies_of(&self, db: &Database, user_id: u64) -> Vec<Currency> {
        let mut seen = Vec::new();
        let all = db
            .deposits_of(user_id)
            .into_iter()
            .map(|d| d.currency)
            .chain(db.stocks_of(user_id).into_iter().map(|s| s.currency))
            .chain(db.bonds_of(user_id).into_iter().map(|b| b.currency));
        for currency in all {
            if !seen.contains(&currency) {
                seen.push(currency);
            }
        }
        seen
    }

    /// Holdings with their estimates plus native per-currency and per-class sums.
    pub fn overview(&self, db: &Database, user_id: u64, today: NaiveDate) -> PortfolioOverview {
        let deposits = self.valued_deposits(db, user_id, today);
        let stocks = self.valued_stocks(db, user_id);
        let bonds = self.valued_bonds(db, user_id);

        let mut totals_by_currency: Vec<CurrencyTotal> = Vec::new();
        let mut class_totals = ClassTotals::default();
        let rows = deposits
            .iter()
            .map(|v| (AssetClass::Cash, v.holding.currency, v.estimated_value))
            .chain(
                stocks
                    .iter()
                    .map(|v| (AssetClass::Stock, v.holding.currency, v.estimated_value)),
            )
            .chain(
                bonds
                    .iter()
                    .map(|v| (AssetClass::Bond, v.holding.currency, v.estimated_value)),
            );
        for (class, currency, value) in rows {
            class_totals.add(class, value);
            match totals_by_currency.iter_mut().find(|t| t.currency == currency) {
                Some(total) => total.total += value,
                None => totals_by_currency.push(CurrencyTotal {
                    currency,
                    total: value,
                }),
            }
        }

        PortfolioOverview {
            deposits,
            stocks,
            bonds,
            totals_by_currency,
            class_totals,
        }
    }

    /// Allocation by class (fixed order) and by currency (first-seen order).
    ///
    /// Every amount is converted through `fx` before summing; ratios are
    /// percentages of the converted grand total.
    pub fn allocation(
        &self,
        db: &Database,
        user_id: u64,
        today: NaiveDate,
        fx: &FxTable,
    ) -> AllocationReport {
        let overview = self.overview(db, user_id, today);

        let mut class_totals = ClassTotals::default();
        let mut class_change_sums = ClassTotals::default();

        for v in &overview.deposits {
            let c = v.holding.currency;
            class_totals.add(AssetClass::Cash, fx.convert(v.estimated_value, c));
            class_change_sums.add(AssetClass::Cash, fx.convert(deposit_change(&v.last_change), c));
        }
        for v in &overview.stocks {
            let c = v.holding.currency;
            class_totals.add(AssetClass::Stock, fx.convert(v.estimated_value, c));
            class_change_sums.add(
                AssetClass::Stock,
                fx.convert(stock_change(&v.holding, &v.last_change), c),
            );
        }
        for v in &overview.bonds {
            let c = v.holding.currency;
            class_totals.add(AssetClass::Bond, fx.convert(v.estimated_value, c));
            class_change_sums.add(
                AssetClass::Bond,
                fx.convert(bond_change(&v.holding, &v.last_change), c),
            );
        }

        let total_sum = class_totals.sum();

        let class_items: Vec<ClassAllocation> = AssetClass::ORDER
            .iter()
            .map(|&class| ClassAllocation {
                class,
                label: class.label().to_string(),
                ratio: ratio(class_totals.get(class), total_sum),
                total: class_totals.get(class),
            })
            .collect();

        let currency_items: Vec<CurrencyAllocation> = overview
            .totals_by_currency
            .iter()
            .map(|t| {
                let converted_total = fx.convert(t.total, t.currency);
                CurrencyAllocation {
                    currency: t.currency,
                    label: t.currency.code().to_string(),
                    ratio: ratio(converted_total, total_sum),
                    total: t.total,
                    converted_total,
                }
            })
            .collect();

        AllocationReport {
            base_currency: fx.base(),
            converted: fx.is_converted(),
            class_labels: class_items.iter().map(|i| i.label.clone()).collect(),
            class_data: class_items.iter().map(|i| i.ratio).collect(),
            currency_labels: currency_items.iter().map(|i| i.label.clone()).collect(),
            currency_data: currency_items.iter().map(|i| i.ratio).collect(),
            class_items,
            currency_items,
            class_change_sums,
            total_sum,
        }
    }

    pub fn deposit_list(
        &self,
        db: &Database,
        user_id: u64,
        today: NaiveDate,
    ) -> CategoryList<DepositSaving> {
        let items = self.valued_deposits(db, user_id, today);
        CategoryList {
            class: AssetClass::Cash,
            total: items.iter().map(|v| v.estimated_value).sum(),
            change_sum: items.iter().map(|v| deposit_change(&v.last_change)).sum(),
            items,
        }
    }

    pub fn stock_list(&self, db: &Database, user_id: u64) -> CategoryList<StockHolding> {
        let items = self.valued_stocks(db, user_id);
        CategoryList {
            class: AssetClass::Stock,
            total: items.iter().map(|v| v.estimated_value).sum(),
            change_sum: items
                .iter()
                .map(|v| stock_change(&v.holding, &v.last_change))
                .sum(),
            items,
        }
    }

    pub fn bond_list(&self, db: &Database, user_id: u64) -> CategoryList<BondHolding> {
        let items = self.valued_bonds(db, user_id);
        CategoryList {
            class: AssetClass::Bond,
            total: items.iter().map(|v| v.estimated_value).sum(),
            change_sum: items
                .iter()
                .map(|v| bond_change(&v.holding, &v.last_change))
                .sum(),
            items,
        }
    }
}

impl Default for AllocationService {
    fn default() -> Self {
        Self::new()
    }
}
