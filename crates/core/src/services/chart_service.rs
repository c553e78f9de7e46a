use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::chart::ValuePoint;
use crate::models::database::Database;
use crate::models::history::Recorded;
use crate::models::money::{round2, Currency};
use crate::services::currency_service::FxTable;

/// Maximum chart date range in days (10 years).
pub const MAX_CHART_RANGE_DAYS: i64 = 3650;

/// A holding's recorded prices as `(day, price)`, oldest first, walked forward
/// one day at a time so the latest known price carries over gaps.
struct PriceTrack {
    points: Vec<(NaiveDate, f64)>,
    next: usize,
    current: Option<f64>,
}

impl PriceTrack {
    fn new<R: Recorded>(records: &[R], holding_id: u64) -> Self {
        let mut rows: Vec<&R> = records
            .iter()
            .filter(|r| r.holding_id() == holding_id)
            .collect();
        rows.sort_by(|a, b| {
            a.recorded_at()
                .cmp(&b.recorded_at())
                .then(a.id().cmp(&b.id()))
        });
        Self {
            points: rows
                .iter()
                .map(|r| (r.recorded_at().date_naive(), r.value()))
                .collect(),
            next: 0,
            current: None,
        }
    }

    /// Latest price recorded on or before `day`. Days must not go backwards.
    fn advance_to(&mut self, day: NaiveDate) -> Option<f64> {
        while let Some(&(date, price)) = self.points.get(self.next) {
            if date > day {
                break;
            }
            self.current = Some(price);
            self.next += 1;
        }
        self.current
    }
}

/// Reconstructs daily portfolio value from holdings and their price history.
///
/// The core computes the numbers; the frontend only renders them.
pub struct ChartService;

impl ChartService {
    pub fn new() -> Self {
        Self
    }

    /// Validate a requested chart window.
    pub fn check_range(from: NaiveDate, to: NaiveDate) -> Result<(), CoreError> {
        if from > to {
            return Err(CoreError::ValidationError(format!(
                "Start date {from} is after end date {to}"
            )));
        }
        let days = (to - from).num_days();
        if days > MAX_CHART_RANGE_DAYS {
            return Err(CoreError::ValidationError(format!(
                "Date range of {days} days exceeds the maximum of {MAX_CHART_RANGE_DAYS} days"
            )));
        }
        Ok(())
    }

    /// Value of one user's portfolio for every day in `from..=to`, in `fx`'s base currency.
    ///
    /// - Deposits count from their start date at their estimated value for that day.
    /// - Stocks and bonds count from the day they were added, priced by the latest
    ///   recorded quote on or before the day, else by their purchase price.
    pub fn value_history(
        &self,
        db: &Database,
        user_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        fx: &FxTable,
    ) -> Result<Vec<ValuePoint>, CoreError> {
        Self::check_range(from, to)?;

        let deposits = db.deposits_of(user_id);
        let mut stocks: Vec<_> = db
            .stocks_of(user_id)
            .into_iter()
            .map(|s| (s, PriceTrack::new(&db.stock_prices, s.id)))
            .collect();
        let mut bonds: Vec<_> = db
            .bonds_of(user_id)
            .into_iter()
            .map(|b| (b, PriceTrack::new(&db.bond_prices, b.id)))
            .collect();

        let convert = |amount: f64, currency: Currency| fx.convert(amount, currency);
        let mut points = Vec::with_capacity((to - from).num_days() as usize + 1);

        for day in from.iter_days().take_while(|d| *d <= to) {
            let cash: f64 = deposits
                .iter()
                .filter(|d| d.start_date <= day)
                .map(|d| convert(d.estimated_value(day), d.currency))
                .sum();

            let mut stock = 0.0;
            for (holding, track) in stocks.iter_mut() {
                let price = track.advance_to(day);
                if holding.created_at.date_naive() > day {
                    continue;
                }
                let price = price.unwrap_or(holding.average_price);
                stock += convert(price * holding.quantity, holding.currency);
            }

            let mut bond = 0.0;
            for (holding, track) in bonds.iter_mut() {
                let pct = track.advance_to(day);
                if holding.created_at.date_naive() > day {
                    continue;
                }
                let pct = pct.unwrap_or(holding.purchase_price_pct);
                bond += convert(holding.face_amount * pct / 100.0, holding.currency);
            }

            points.push(ValuePoint {
                date: day,
                cash: round2(cash),
                stock: round2(stock),
                bond: round2(bond),
                total: round2(cash + stock + bond),
            });
        }

        Ok(points)
    }
}

impl Default for ChartService {
    fn default() -> Self {
        Self::new()
    }
}
