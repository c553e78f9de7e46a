// ═══════════════════════════════════════════════════════════════════
// Model Tests: valuation, history, input forms, rate cache, database
// ═══════════════════════════════════════════════════════════════════

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use finfolio_core::models::bond::{BondHolding, BondInput};
use finfolio_core::models::database::Database;
use finfolio_core::models::deposit::{Compounding, DepositInput, DepositSaving, ProductType};
use finfolio_core::models::history::{newest_first, LastChange, StockPriceRecord};
use finfolio_core::models::inquiry::InquiryInput;
use finfolio_core::models::money::{round2, AssetClass, Currency};
use finfolio_core::models::price::RateCache;
use finfolio_core::models::stock::{Market, StockHolding, StockInput};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn deposit(compounding: Compounding) -> DepositSaving {
    DepositSaving {
        id: 1,
        user_id: 1,
        product_type: ProductType::Deposit,
        bank_name: "Shinhan".into(),
        product_name: "Sol Deposit".into(),
        principal_amount: 1_000_000.0,
        annual_rate: 3.65,
        compounding,
        start_date: date(2024, 1, 1),
        maturity_date: None,
        currency: Currency::KRW,
        current_value_manual: None,
        created_at: at(2024, 1, 1),
        updated_at: at(2024, 1, 1),
    }
}

fn stock(current_price: Option<f64>) -> StockHolding {
    StockHolding {
        id: 2,
        user_id: 1,
        market: Market::US,
        ticker: "AAPL".into(),
        name: "Apple".into(),
        quantity: 10.0,
        average_price: 150.0,
        currency: Currency::USD,
        current_price,
        last_price_updated_at: None,
        created_at: at(2024, 1, 1),
        updated_at: at(2024, 1, 1),
    }
}

fn bond(current_price_pct: Option<f64>) -> BondHolding {
    BondHolding {
        id: 3,
        user_id: 1,
        name: "KTB 3Y".into(),
        issuer: "Republic of Korea".into(),
        currency: Currency::KRW,
        face_amount: 10_000_000.0,
        coupon_rate: 3.25,
        purchase_price_pct: 98.5,
        current_price_pct,
        maturity_date: date(2027, 6, 10),
        bond_code: "KR103502GE97".into(),
        last_price_updated_at: None,
        created_at: at(2024, 1, 1),
        updated_at: at(2024, 1, 1),
    }
}

// ═══════════════════════════════════════════════════════════════════
// Money
// ═══════════════════════════════════════════════════════════════════

mod money {
    use super::*;

    #[test]
    fn currency_parse_is_case_insensitive() {
        assert_eq!(" usd ".parse::<Currency>().unwrap(), Currency::USD);
        assert_eq!("krw".parse::<Currency>().unwrap(), Currency::KRW);
        assert!("GBP".parse::<Currency>().is_err());
        assert_eq!(Currency::default(), Currency::KRW);
    }

    #[test]
    fn asset_class_keys_and_labels() {
        let keys: Vec<&str> = AssetClass::ORDER.iter().map(|c| c.key()).collect();
        assert_eq!(keys, vec!["CASH", "STOCK", "BOND"]);
        assert_eq!(AssetClass::Cash.label(), "Deposits");
        assert_eq!("stocks".parse::<AssetClass>().unwrap(), AssetClass::Stock);
        assert_eq!("deposit".parse::<AssetClass>().unwrap(), AssetClass::Cash);
    }

    #[test]
    fn round2_keeps_two_places() {
        assert_eq!(round2(1005.0), 1005.0);
        assert_eq!(round2(2.3449), 2.34);
        assert_eq!(round2(1.2351), 1.24);
        assert_eq!(round2(-1.2351), -1.24);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Valuation
// ═══════════════════════════════════════════════════════════════════

mod valuation {
    use super::*;

    #[test]
    fn simple_interest_accrues_daily() {
        let d = deposit(Compounding::None);
        // 365 days at 3.65% → +36,500
        assert_eq!(d.estimated_value(date(2024, 12, 31)), 1_036_500.0);
        // 100 days → 1,000,000 × (1 + 0.0365 × 100/365) = 1,010,000
        assert_eq!(d.estimated_value(date(2024, 4, 10)), 1_010_000.0);
    }

    #[test]
    fn before_or_on_start_is_principal() {
        let d = deposit(Compounding::Monthly);
        assert_eq!(d.estimated_value(date(2024, 1, 1)), 1_000_000.0);
        assert_eq!(d.estimated_value(date(2023, 6, 1)), 1_000_000.0);
    }

    #[test]
    fn monthly_compounding_counts_whole_30_day_periods() {
        let d = deposit(Compounding::Monthly);
        // 59 days → one full period only
        let one = round2(1_000_000.0 * (1.0 + 0.0365 / 12.0));
        assert_eq!(d.estimated_value(date(2024, 2, 29)), one);
        // 60 days → two periods
        let two = round2(1_000_000.0 * (1.0 + 0.0365 / 12.0_f64).powi(2));
        assert_eq!(d.estimated_value(date(2024, 3, 1)), two);
    }

    #[test]
    fn quarterly_and_annual_periods() {
        let q = deposit(Compounding::Quarterly);
        // 182 days → 2 quarters
        let expected = round2(1_000_000.0 * (1.0 + 0.0365 / 4.0_f64).powi(2));
        assert_eq!(q.estimated_value(date(2024, 1, 1) + Duration::days(182)), expected);

        let a = deposit(Compounding::Annually);
        // 364 days → no full year yet
        assert_eq!(a.estimated_value(date(2024, 1, 1) + Duration::days(364)), 1_000_000.0);
        assert_eq!(
            a.estimated_value(date(2024, 1, 1) + Duration::days(365)),
            1_036_500.0
        );
    }

    #[test]
    fn interest_stops_at_maturity() {
        let mut d = deposit(Compounding::None);
        d.maturity_date = Some(date(2024, 4, 10));
        assert_eq!(d.estimated_value(date(2030, 1, 1)), 1_010_000.0);
    }

    #[test]
    fn manual_value_wins() {
        let mut d = deposit(Compounding::Monthly);
        d.current_value_manual = Some(1_234_567.89);
        assert_eq!(d.estimated_value(date(2030, 1, 1)), 1_234_567.89);
        assert_eq!(d.estimated_value(date(2020, 1, 1)), 1_234_567.89);
    }

    #[test]
    fn stock_uses_current_price_else_average() {
        assert_eq!(stock(None).estimated_value(), 1500.0);
        assert_eq!(stock(Some(190.5)).estimated_value(), 1905.0);
    }

    #[test]
    fn bond_uses_percent_of_face() {
        assert!((bond(None).estimated_value() - 9_850_000.0).abs() < 1e-6);
        assert!((bond(Some(101.0)).estimated_value() - 10_100_000.0).abs() < 1e-6);
    }
}

// ═══════════════════════════════════════════════════════════════════
// History & LastChange
// ═══════════════════════════════════════════════════════════════════

mod history {
    use super::*;

    fn record(id: u64, holding_id: u64, when: DateTime<Utc>, price: f64) -> StockPriceRecord {
        StockPriceRecord {
            id,
            holding_id,
            recorded_at: when,
            price,
            source: "test".into(),
        }
    }

    #[test]
    fn fewer_than_two_values() {
        assert_eq!(LastChange::from_values(&[]), LastChange::default());
        assert_eq!(LastChange::from_values(&[5.0]).delta, None);
    }

    #[test]
    fn delta_and_pct() {
        let change = LastChange::from_values(&[110.0, 100.0, 50.0]);
        assert_eq!(change.delta, Some(10.0));
        assert_eq!(change.pct, Some(10.0));

        let down = LastChange::from_values(&[97.0, 100.0]);
        assert_eq!(down.delta, Some(-3.0));
        assert_eq!(down.pct, Some(-3.0));
    }

    #[test]
    fn zero_previous_has_no_pct() {
        let change = LastChange::from_values(&[10.0, 0.0]);
        assert_eq!(change.delta, Some(10.0));
        assert_eq!(change.pct, None);
    }

    #[test]
    fn newest_first_orders_by_time_then_id() {
        let t = at(2025, 1, 10);
        let records = vec![
            record(1, 7, t - Duration::days(1), 100.0),
            record(2, 7, t, 105.0),
            record(3, 7, t, 107.0),
            record(4, 8, t + Duration::days(1), 999.0),
        ];
        let ids: Vec<u64> = newest_first(&records, 7).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let change = LastChange::of(&records, 7);
        assert_eq!(change.delta, Some(2.0));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Input Forms
// ═══════════════════════════════════════════════════════════════════

mod forms {
    use super::*;

    fn deposit_input() -> DepositInput {
        DepositInput {
            product_type: ProductType::Saving,
            bank_name: "  Woori ".into(),
            product_name: "Monthly Saver".into(),
            principal_amount: 500_000.0,
            annual_rate: 4.2,
            compounding: Compounding::None,
            start_date: date(2025, 1, 1),
            maturity_date: Some(date(2026, 1, 1)),
            currency: Currency::KRW,
            current_value_manual: None,
        }
    }

    #[test]
    fn deposit_input_trims_text() {
        let cleaned = deposit_input().clean().unwrap();
        assert_eq!(cleaned.bank_name, "Woori");
    }

    #[test]
    fn deposit_maturity_before_start_rejected() {
        let mut input = deposit_input();
        input.maturity_date = Some(date(2024, 12, 31));
        let errors = input.clean().unwrap_err();
        assert!(errors.has("maturity_date"));
    }

    #[test]
    fn deposit_bad_numbers_rejected() {
        let mut input = deposit_input();
        input.principal_amount = -1.0;
        input.annual_rate = 3.333;
        input.bank_name = "   ".into();
        let errors = input.clean().unwrap_err();
        assert!(errors.has("principal_amount"));
        assert!(errors.has("annual_rate"));
        assert!(errors.has("bank_name"));
    }

    #[test]
    fn stock_ticker_uppercased() {
        let input = StockInput {
            market: Market::KR,
            ticker: " 005930 ".into(),
            name: String::new(),
            quantity: 3.0,
            average_price: 71_000.0,
            currency: Currency::KRW,
            current_price: None,
        };
        let cleaned = input.clean().unwrap();
        assert_eq!(cleaned.ticker, "005930");

        let lower = StockInput {
            market: Market::US,
            ticker: "tsla".into(),
            ..cleaned
        };
        assert_eq!(lower.clean().unwrap().ticker, "TSLA");
    }

    #[test]
    fn stock_requires_ticker_and_finite_quantity() {
        let input = StockInput {
            market: Market::US,
            ticker: String::new(),
            name: "x".repeat(151),
            quantity: f64::NAN,
            average_price: 1.0,
            currency: Currency::USD,
            current_price: None,
        };
        let errors = input.clean().unwrap_err();
        assert!(errors.has("ticker"));
        assert!(errors.has("name"));
        assert!(errors.has("quantity"));
    }

    #[test]
    fn bond_price_pct_shape() {
        let input = BondInput {
            name: "Corp 2027".into(),
            issuer: String::new(),
            currency: Currency::KRW,
            face_amount: 1_000_000.0,
            coupon_rate: 4.1,
            purchase_price_pct: 99.8755,
            current_price_pct: None,
            maturity_date: date(2027, 1, 1),
            bond_code: String::new(),
        };
        let errors = input.clean().unwrap_err();
        assert!(errors.has("purchase_price_pct"));
    }

    #[test]
    fn inquiry_requires_title_and_content() {
        let errors = InquiryInput {
            title: "x".repeat(101),
            content: "  ".into(),
        }
        .clean()
        .unwrap_err();
        assert!(errors.has("title"));
        assert!(errors.has("content"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// RateCache
// ═══════════════════════════════════════════════════════════════════

mod rate_cache {
    use super::*;

    #[test]
    fn exact_and_at_or_before() {
        let mut cache = RateCache::new();
        cache.set(Currency::USD, Currency::KRW, date(2025, 1, 10), 1450.0);
        cache.set(Currency::USD, Currency::KRW, date(2025, 1, 6), 1440.0);

        assert_eq!(cache.get(Currency::USD, Currency::KRW, date(2025, 1, 10)), Some(1450.0));
        assert_eq!(cache.get(Currency::USD, Currency::KRW, date(2025, 1, 8)), None);
        assert_eq!(
            cache.get_at_or_before(Currency::USD, Currency::KRW, date(2025, 1, 8)),
            Some(1440.0)
        );
        assert_eq!(
            cache.get_at_or_before(Currency::USD, Currency::KRW, date(2025, 1, 1)),
            None
        );
        // Direction matters
        assert_eq!(cache.get(Currency::KRW, Currency::USD, date(2025, 1, 10)), None);
    }

    #[test]
    fn set_overwrites_same_day() {
        let mut cache = RateCache::new();
        cache.set(Currency::EUR, Currency::KRW, date(2025, 1, 10), 1500.0);
        cache.set(Currency::EUR, Currency::KRW, date(2025, 1, 10), 1510.0);
        assert_eq!(cache.total_entries(), 1);
        assert_eq!(cache.get(Currency::EUR, Currency::KRW, date(2025, 1, 10)), Some(1510.0));
    }

    #[test]
    fn prune_and_clear() {
        let mut cache = RateCache::new();
        cache.set(Currency::USD, Currency::KRW, date(2025, 1, 1), 1.0);
        cache.set(Currency::USD, Currency::KRW, date(2025, 1, 2), 2.0);
        cache.set(Currency::JPY, Currency::KRW, date(2024, 12, 1), 9.0);

        assert_eq!(cache.prune_before(date(2025, 1, 2)), 2);
        assert_eq!(cache.total_entries(), 1);
        assert!(cache.entries.get(&(Currency::JPY, Currency::KRW)).is_none());

        cache.clear();
        assert_eq!(cache.total_entries(), 0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Database
// ═══════════════════════════════════════════════════════════════════

mod database {
    use super::*;

    #[test]
    fn ids_are_shared_and_increasing() {
        let mut db = Database::default();
        assert_eq!(db.next_id(), 1);
        assert_eq!(db.next_id(), 2);
    }

    #[test]
    fn holdings_listed_newest_first() {
        let mut db = Database::default();
        let mut old = stock(None);
        old.id = 10;
        old.created_at = at(2024, 1, 1);
        let mut new = stock(None);
        new.id = 11;
        new.created_at = at(2024, 6, 1);
        let mut other_user = stock(None);
        other_user.id = 12;
        other_user.user_id = 2;
        db.stocks = vec![old, new, other_user];

        let ids: Vec<u64> = db.stocks_of(1).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![11, 10]);
    }

    #[test]
    fn cascade_delete_removes_owned_rows_and_history() {
        let mut db = Database::default();
        db.deposits.push(deposit(Compounding::None));
        db.stocks.push(stock(None));
        db.stock_prices.push(StockPriceRecord {
            id: 20,
            holding_id: 2,
            recorded_at: at(2025, 1, 1),
            price: 1.0,
            source: String::new(),
        });
        let mut foreign = bond(None);
        foreign.user_id = 9;
        db.bonds.push(foreign);

        db.cascade_delete_user(1);

        assert!(db.deposits.is_empty());
        assert!(db.stocks.is_empty());
        assert!(db.stock_prices.is_empty());
        assert_eq!(db.bonds.len(), 1);
    }
}
