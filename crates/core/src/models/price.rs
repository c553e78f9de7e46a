use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::money::Currency;

/// A single quote on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Cache key: (from, to) currency pair, e.g. (USD, KRW).
pub type RateKey = (Currency, Currency);

/// Daily exchange rates, kept in the snapshot so past rates are fetched once.
///
/// Points per pair are kept sorted by date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateCache {
    pub entries: HashMap<RateKey, Vec<PricePoint>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<f64> {
        let points = self.entries.get(&(from, to))?;
        points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| points[idx].price)
    }

    /// Most recent rate on or before `date`.
    pub fn get_at_or_before(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<f64> {
        let points = self.entries.get(&(from, to))?;
        let idx = match points.binary_search_by_key(&date, |p| p.date) {
            Ok(idx) => idx,
            Err(0) => return None,
            Err(pos) => pos - 1,
        };
        Some(points[idx].price)
    }

    pub fn set(&mut self, from: Currency, to: Currency, date: NaiveDate, rate: f64) {
        let points = self.entries.entry((from, to)).or_default();
        match points.binary_search_by_key(&date, |p| p.date) {
            Ok(idx) => points[idx].price = rate,
            Err(idx) => points.insert(idx, PricePoint { date, price: rate }),
        }
    }

    pub fn total_entries(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Drop rates older than `before`. Returns how many points were removed.
    pub fn prune_before(&mut self, before: NaiveDate) -> usize {
        let mut removed = 0;
        for points in self.entries.values_mut() {
            let split = points
                .binary_search_by_key(&before, |p| p.date)
                .unwrap_or_else(|pos| pos);
            removed += split;
            points.drain(..split);
        }
        self.entries.retain(|_, v| !v.is_empty());
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
