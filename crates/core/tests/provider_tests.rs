// ═══════════════════════════════════════════════════════════════════
// Provider Tests: Registry, Yahoo symbols, Frankfurter, Alpha Vantage
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use finfolio_core::errors::CoreError;
use finfolio_core::models::money::Currency;
use finfolio_core::models::price::PricePoint;
use finfolio_core::models::stock::Market;
use finfolio_core::providers::alphavantage::AlphaVantageProvider;
use finfolio_core::providers::frankfurter::FrankfurterProvider;
use finfolio_core::providers::registry::ProviderRegistry;
use finfolio_core::providers::traits::{QuoteKind, QuoteProvider, QuoteRequest};
use finfolio_core::providers::yahoo_finance::YahooFinanceProvider;

// ═══════════════════════════════════════════════════════════════════
// Test Helpers: Mock Providers
// ═══════════════════════════════════════════════════════════════════

/// A mock provider that serves only the given kinds.
struct MockProvider {
    name: String,
    kinds: Vec<QuoteKind>,
}

impl MockProvider {
    fn new(name: &str, kinds: Vec<QuoteKind>) -> Self {
        Self {
            name: name.to_string(),
            kinds,
        }
    }
}

#[async_trait]
impl QuoteProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_kinds(&self) -> Vec<QuoteKind> {
        self.kinds.clone()
    }

    async fn latest_quote(&self, _request: &QuoteRequest) -> Result<f64, CoreError> {
        Ok(100.0)
    }

    async fn quote_on(&self, _request: &QuoteRequest, _date: NaiveDate) -> Result<f64, CoreError> {
        Ok(99.0)
    }

    async fn quote_range(
        &self,
        _request: &QuoteRequest,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        Ok(vec![])
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
// QuoteRequest
// ═══════════════════════════════════════════════════════════════════

mod quote_request {
    use super::*;

    #[test]
    fn stock_ticker_normalized() {
        let req = QuoteRequest::stock(Market::US, "  aapl ");
        assert_eq!(
            req,
            QuoteRequest::Stock {
                market: Market::US,
                ticker: "AAPL".into()
            }
        );
        assert_eq!(req.kind(), QuoteKind::Stock);
        assert_eq!(req.to_string(), "AAPL:US");
    }

    #[test]
    fn bond_and_fx_labels() {
        assert_eq!(QuoteRequest::bond(" KR103502 ").symbol(), "KR103502");
        let fx = QuoteRequest::fx(Currency::USD, Currency::KRW);
        assert_eq!(fx.kind(), QuoteKind::Fx);
        assert_eq!(fx.to_string(), "USD/KRW");
    }

    #[test]
    fn kind_display() {
        assert_eq!(QuoteKind::Stock.to_string(), "stock");
        assert_eq!(QuoteKind::Bond.to_string(), "bond");
        assert_eq!(QuoteKind::Fx.to_string(), "fx");
    }
}

// ═══════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════

mod registry {
    use super::*;

    #[test]
    fn empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get_provider_for(QuoteKind::Stock).is_none());
        assert!(registry.get_providers_for(QuoteKind::Fx).is_empty());
    }

    #[test]
    fn routes_by_kind_in_registration_order() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(MockProvider::new("fx-a", vec![QuoteKind::Fx])));
        registry.register(Box::new(MockProvider::new(
            "stocks",
            vec![QuoteKind::Stock],
        )));
        registry.register(Box::new(MockProvider::new(
            "fx-b",
            vec![QuoteKind::Fx, QuoteKind::Stock],
        )));

        assert_eq!(registry.len(), 3);
        let fx: Vec<&str> = registry
            .get_providers_for(QuoteKind::Fx)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(fx, vec!["fx-a", "fx-b"]);
        assert_eq!(
            registry.get_provider_for(QuoteKind::Stock).map(|p| p.name()),
            Some("stocks")
        );
        assert!(registry.get_provider_for(QuoteKind::Bond).is_none());
    }

    #[test]
    fn defaults_have_no_bond_source() {
        let registry = ProviderRegistry::new_with_defaults(&HashMap::new());
        assert!(registry.get_provider_for(QuoteKind::Bond).is_none());
        assert_eq!(
            registry.get_provider_for(QuoteKind::Fx).map(|p| p.name()),
            Some("Frankfurter")
        );
    }

    #[test]
    fn alphavantage_only_with_key() {
        let without = ProviderRegistry::new_with_defaults(&HashMap::new());
        assert!(!without
            .get_providers_for(QuoteKind::Stock)
            .iter()
            .any(|p| p.name() == "Alpha Vantage"));

        let mut keys = HashMap::new();
        keys.insert("alphavantage".to_string(), "demo".to_string());
        let with = ProviderRegistry::new_with_defaults(&keys);
        let names: Vec<&str> = with
            .get_providers_for(QuoteKind::Stock)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names.last(), Some(&"Alpha Vantage"));
    }

    #[test]
    fn blank_key_ignored() {
        let mut keys = HashMap::new();
        keys.insert("alphavantage".to_string(), "   ".to_string());
        let registry = ProviderRegistry::new_with_defaults(&keys);
        assert!(!registry
            .get_providers_for(QuoteKind::Stock)
            .iter()
            .any(|p| p.name() == "Alpha Vantage"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Yahoo Finance: symbol mapping (no network)
// ═══════════════════════════════════════════════════════════════════

mod yahoo_symbols {
    use super::*;

    #[test]
    fn us_ticker_as_is() {
        assert_eq!(
            YahooFinanceProvider::candidate_symbols(Market::US, "msft"),
            vec!["MSFT".to_string()]
        );
    }

    #[test]
    fn korean_code_tries_kospi_then_kosdaq() {
        assert_eq!(
            YahooFinanceProvider::candidate_symbols(Market::KR, "005930"),
            vec!["005930.KS".to_string(), "005930.KQ".to_string()]
        );
    }

    #[test]
    fn korean_code_with_suffix_kept() {
        assert_eq!(
            YahooFinanceProvider::candidate_symbols(Market::KR, "035720.kq"),
            vec!["035720.KQ".to_string()]
        );
    }

    #[tokio::test]
    async fn rejects_fx_requests() {
        let yahoo = YahooFinanceProvider::new().unwrap();
        let result = yahoo
            .latest_quote(&QuoteRequest::fx(Currency::USD, Currency::KRW))
            .await;
        assert!(matches!(result, Err(CoreError::Api { .. })));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Frankfurter (wiremock)
// ═══════════════════════════════════════════════════════════════════

mod frankfurter {
    use super::*;

    #[tokio::test]
    async fn same_currency_skips_http() {
        let server = MockServer::start().await;
        let provider = FrankfurterProvider::with_base_url(server.uri());

        let rate = provider
            .latest_quote(&QuoteRequest::fx(Currency::KRW, Currency::KRW))
            .await
            .unwrap();
        assert_eq!(rate, 1.0);

        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.is_empty(), "expected no HTTP requests");
    }

    #[tokio::test]
    async fn latest_rate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("base", "USD"))
            .and(query_param("symbols", "KRW"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"amount":1.0,"base":"USD","date":"2025-01-15","rates":{"KRW":1465.3}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider = FrankfurterProvider::with_base_url(server.uri());
        let rate = provider
            .latest_quote(&QuoteRequest::fx(Currency::USD, Currency::KRW))
            .await
            .unwrap();
        assert!((rate - 1465.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn historical_rate_uses_date_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2024-03-04"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"base":"EUR","date":"2024-03-04","rates":{"JPY":162.9}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider = FrankfurterProvider::with_base_url(server.uri());
        let rate = provider
            .quote_on(&QuoteRequest::fx(Currency::EUR, Currency::JPY), date(2024, 3, 4))
            .await
            .unwrap();
        assert!((rate - 162.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_symbol_is_price_not_available() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2024-03-04"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"base":"EUR","date":"2024-03-04","rates":{}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider = FrankfurterProvider::with_base_url(server.uri());
        let result = provider
            .quote_on(&QuoteRequest::fx(Currency::EUR, Currency::JPY), date(2024, 3, 4))
            .await;
        assert!(matches!(result, Err(CoreError::PriceNotAvailable { .. })));
    }

    #[tokio::test]
    async fn server_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = FrankfurterProvider::with_base_url(server.uri());
        let result = provider
            .latest_quote(&QuoteRequest::fx(Currency::USD, Currency::KRW))
            .await;
        assert!(matches!(result, Err(CoreError::Network(_))));
    }

    #[tokio::test]
    async fn range_sorted_by_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2024-01-01..2024-01-03"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"base":"USD","rates":{
                    "2024-01-03":{"KRW":1310.0},
                    "2024-01-02":{"KRW":1300.5}
                }}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider = FrankfurterProvider::with_base_url(server.uri());
        let points = provider
            .quote_range(
                &QuoteRequest::fx(Currency::USD, Currency::KRW),
                date(2024, 1, 1),
                date(2024, 1, 3),
            )
            .await
            .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, date(2024, 1, 2));
        assert_eq!(points[1].price, 1310.0);
    }

    #[tokio::test]
    async fn rejects_stock_requests() {
        let provider = FrankfurterProvider::with_base_url("http://127.0.0.1:9");
        let result = provider
            .latest_quote(&QuoteRequest::stock(Market::US, "AAPL"))
            .await;
        assert!(matches!(result, Err(CoreError::Api { .. })));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Alpha Vantage (wiremock)
// ═══════════════════════════════════════════════════════════════════

mod alphavantage {
    use super::*;

    #[tokio::test]
    async fn global_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "GLOBAL_QUOTE"))
            .and(query_param("symbol", "IBM"))
            .and(query_param("apikey", "demo"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"Global Quote":{"01. symbol":"IBM","05. price":"187.3400"}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider =
            AlphaVantageProvider::with_base_url("demo".into(), format!("{}/query", server.uri()));
        let price = provider
            .latest_quote(&QuoteRequest::stock(Market::US, "ibm"))
            .await
            .unwrap();
        assert!((price - 187.34).abs() < 1e-9);
    }

    #[tokio::test]
    async fn rate_limited_response_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"Note":"Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider =
            AlphaVantageProvider::with_base_url("demo".into(), format!("{}/query", server.uri()));
        let result = provider
            .latest_quote(&QuoteRequest::stock(Market::US, "IBM"))
            .await;
        assert!(matches!(result, Err(CoreError::Api { message, .. }) if message.contains("limit")));
    }

    #[tokio::test]
    async fn daily_close_on_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "TIME_SERIES_DAILY"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"Time Series (Daily)":{
                    "2024-05-02":{"1. open":"1","4. close":"165.10"},
                    "2024-05-01":{"1. open":"1","4. close":"164.00"}
                }}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider =
            AlphaVantageProvider::with_base_url("demo".into(), format!("{}/query", server.uri()));
        let request = QuoteRequest::stock(Market::US, "IBM");

        let close = provider.quote_on(&request, date(2024, 5, 2)).await.unwrap();
        assert!((close - 165.10).abs() < 1e-9);

        let missing = provider.quote_on(&request, date(2024, 5, 3)).await;
        assert!(matches!(missing, Err(CoreError::PriceNotAvailable { .. })));

        let range = provider
            .quote_range(&request, date(2024, 5, 1), date(2024, 5, 1))
            .await
            .unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range[0].price, 164.0);
    }

    #[tokio::test]
    async fn korean_listing_not_served() {
        let provider = AlphaVantageProvider::with_base_url("demo".into(), "http://127.0.0.1:9");
        let result = provider
            .latest_quote(&QuoteRequest::stock(Market::KR, "005930"))
            .await;
        assert!(matches!(result, Err(CoreError::Api { .. })));
    }
}
