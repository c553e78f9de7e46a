use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reconstructed portfolio value on one day, in the base currency.
///
/// The core computes these; the frontend just renders them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub cash: f64,
    pub stock: f64,
    pub bond: f64,
    pub total: f64,
}
