use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::round2;

/// A recorded stock price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPriceRecord {
    pub id: u64,
    pub holding_id: u64,
    pub recorded_at: DateTime<Utc>,
    pub price: f64,
    /// Which provider produced the quote (empty for manual entries)
    pub source: String,
}

/// A recorded bond price, as a percentage of face value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondPriceRecord {
    pub id: u64,
    pub holding_id: u64,
    pub recorded_at: DateTime<Utc>,
    pub price_pct: f64,
    pub source: String,
}

/// A snapshot of a deposit's estimated value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositValueRecord {
    pub id: u64,
    pub holding_id: u64,
    pub recorded_at: DateTime<Utc>,
    pub value: f64,
}

/// Anything with a timestamp and a value that can be charted.
pub trait Recorded {
    fn id(&self) -> u64;
    fn holding_id(&self) -> u64;
    fn recorded_at(&self) -> DateTime<Utc>;
    fn value(&self) -> f64;
}

impl Recorded for StockPriceRecord {
    fn id(&self) -> u64 {
        self.id
    }
    fn holding_id(&self) -> u64 {
        self.holding_id
    }
    fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
    fn value(&self) -> f64 {
        self.price
    }
}

impl Recorded for BondPriceRecord {
    fn id(&self) -> u64 {
        self.id
    }
    fn holding_id(&self) -> u64 {
        self.holding_id
    }
    fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
    fn value(&self) -> f64 {
        self.price_pct
    }
}

impl Recorded for DepositValueRecord {
    fn id(&self) -> u64 {
        self.id
    }
    fn holding_id(&self) -> u64 {
        self.holding_id
    }
    fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
    fn value(&self) -> f64 {
        self.value
    }
}

/// Records of one holding, newest first (by `recorded_at`, ties broken by id).
pub fn newest_first<R: Recorded>(records: &[R], holding_id: u64) -> Vec<&R> {
    let mut rows: Vec<&R> = records
        .iter()
        .filter(|r| r.holding_id() == holding_id)
        .collect();
    rows.sort_by(|a, b| {
        b.recorded_at()
            .cmp(&a.recorded_at())
            .then_with(|| b.id().cmp(&a.id()))
    });
    rows
}

/// Change between the two most recent values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LastChange {
    pub delta: Option<f64>,
    pub pct: Option<f64>,
}

impl LastChange {
    /// `values` must be newest first. `delta` and `pct` are both `None` with
    /// fewer than two values, and `pct` is `None` when the previous value is 0.
    pub fn from_values(values: &[f64]) -> Self {
        if values.len() < 2 {
            return Self::default();
        }
        let current = values[0];
        let previous = values[1];
        let delta = current - previous;
        let pct = if previous != 0.0 {
            Some(round2(delta / previous * 100.0))
        } else {
            None
        };
        Self {
            delta: Some(delta),
            pct,
        }
    }

    pub fn of<R: Recorded>(records: &[R], holding_id: u64) -> Self {
        let values: Vec<f64> = newest_first(records, holding_id)
            .into_iter()
            .take(2)
            .map(Recorded::value)
            .collect();
        Self::from_values(&values)
    }
}
