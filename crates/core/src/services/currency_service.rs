use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::price_service::PriceService;
use crate::models::money::Currency;
use crate::models::price::RateCache;
use crate::providers::traits::QuoteRequest;

/// Exchange rates into one base currency, fixed for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxTable {
    base: Currency,
    /// Units of `base` per unit of the key currency
    rates: BTreeMap<Currency, f64>,
    /// False when at least one currency fell back to a 1:1 rate
    converted: bool,
}

impl FxTable {
    /// Every currency counts 1:1, so totals are plain sums of native amounts.
    pub fn identity(base: Currency) -> Self {
        Self {
            base,
            rates: BTreeMap::new(),
            converted: false,
        }
    }

    pub fn with_rates(base: Currency, rates: impl IntoIterator<Item = (Currency, f64)>) -> Self {
        Self {
            base,
            rates: rates.into_iter().collect(),
            converted: true,
        }
    }

    pub fn base(&self) -> Currency {
        self.base
    }

    pub fn is_converted(&self) -> bool {
        self.converted
    }

    pub fn rate(&self, from: Currency) -> f64 {
        if from == self.base {
            return 1.0;
        }
        self.rates.get(&from).copied().unwrap_or(1.0)
    }

    pub fn convert(&self, amount: f64, from: Currency) -> f64 {
        amount * self.rate(from)
    }
}

/// Rates an [`FxTable`] needs, split into what the cache already had and
/// what still has to be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct FxPlan {
    base: Currency,
    date: NaiveDate,
    rates: BTreeMap<Currency, f64>,
    missing: Vec<Currency>,
}

impl FxPlan {
    pub fn missing(&self) -> &[Currency] {
        &self.missing
    }

    /// Fetch every missing rate. Failed or non-positive quotes are left out.
    pub async fn fetch(&self, price_service: &PriceService) -> Vec<(Currency, f64)> {
        let mut fetched = Vec::new();
        for &currency in &self.missing {
            let request = QuoteRequest::fx(currency, self.base);
            match price_service.quote_on(&request, self.date).await {
                Ok(quote) if quote.price > 0.0 => fetched.push((currency, quote.price)),
                Ok(quote) => {
                    tracing::debug!(symbol = %request, price = quote.price, "Ignoring non-positive rate")
                }
                Err(e) => tracing::debug!(symbol = %request, error = %e, "Exchange rate fetch failed"),
            }
        }
        fetched
    }
}

/// Builds [`FxTable`]s from cached or freshly fetched exchange rates.
pub struct CurrencyService;

impl CurrencyService {
    pub fn new() -> Self {
        Self
    }

    /// Rates from each of `currencies` into `base` on `date`.
    ///
    /// Cached rates are reused; missing ones are fetched and cached. When a
    /// rate cannot be obtained the currency is counted 1:1 and the table is
    /// marked as not converted.
    pub async fn fx_table(
        &self,
        price_service: &PriceService,
        cache: &mut RateCache,
        base: Currency,
        currencies: &[Currency],
        date: NaiveDate,
    ) -> FxTable {
        let plan = self.plan(cache, base, currencies, date);
        let fetched = plan.fetch(price_service).await;
        self.apply(cache, plan, fetched)
    }

    /// Look up what the cache already knows for `date`.
    pub fn plan(&self, cache: &RateCache, base: Currency, currencies: &[Currency], date: NaiveDate) -> FxPlan {
        let mut plan = FxPlan {
            base,
            date,
            rates: BTreeMap::new(),
            missing: Vec::new(),
        };
        for &currency in currencies {
            if currency == base || plan.rates.contains_key(&currency) || plan.missing.contains(&currency) {
                continue;
            }
            match cache.get(currency, base, date) {
                Some(rate) => {
                    plan.rates.insert(currency, rate);
                }
                None => plan.missing.push(currency),
            }
        }
        plan
    }

    /// Cache the fetched rates and build the table. A currency still
    /// missing falls back to its latest older cached rate, else 1:1.
    pub fn apply(&self, cache: &mut RateCache, plan: FxPlan, fetched: Vec<(Currency, f64)>) -> FxTable {
        let FxPlan {
            base,
            date,
            mut rates,
            missing,
        } = plan;
        let mut converted = true;

        for (currency, rate) in fetched {
            if missing.contains(&currency) {
                cache.set(currency, base, date, rate);
                rates.insert(currency, rate);
            }
        }

        for currency in missing {
            if rates.contains_key(&currency) {
                continue;
            }
            if let Some(rate) = cache.get_at_or_before(currency, base, date) {
                rates.insert(currency, rate);
            } else {
                tracing::warn!(%currency, %base, %date, "No exchange rate, counting 1:1");
                converted = false;
            }
        }

        FxTable {
            base,
            rates,
            converted,
        }
    }
}

impl Default for CurrencyService {
    fn default() -> Self {
        Self::new()
    }
}
