use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::database::Database;
use crate::models::history::{BondPriceRecord, DepositValueRecord, StockPriceRecord};
use crate::models::report::RefreshSummary;
use crate::providers::registry::ProviderRegistry;
use crate::providers::traits::{QuoteKind, QuoteRequest};

/// A validated quote and the provider that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub source: String,
}

/// Fetches quotes from the registered providers with automatic fallback.
///
/// Providers are tried in registration order; a provider that errors or
/// returns a non-finite or negative price is skipped. Clones share the
/// registry, so a clone can fetch while the database is borrowed elsewhere.
#[derive(Clone)]
pub struct PriceService {
    registry: Arc<ProviderRegistry>,
}

/// Holdings picked for a price refresh, collected before any quote is fetched.
#[derive(Debug, Clone)]
pub struct RefreshPlan {
    user_id: Option<u64>,
    only: Option<QuoteKind>,
    stocks: Vec<(u64, QuoteRequest)>,
    /// Bonds with a code; the rest are only counted
    bonds: Vec<(u64, QuoteRequest)>,
    bonds_total: usize,
}

/// Quotes fetched for a [`RefreshPlan`], keyed by holding id.
///
/// A refresh runs in three steps: [`RefreshPlan::collect`] reads the
/// database, [`PriceService::fetch_refresh`] talks to the providers, and
/// [`PriceService::apply_refresh`] writes the results back.
#[derive(Debug, Clone, Default)]
pub struct RefreshQuotes {
    stocks: Vec<(u64, QuoteRequest, Quote)>,
    bonds: Vec<(u64, QuoteRequest, Quote)>,
}

impl RefreshPlan {
    /// Stocks and bonds of the given user (all users when `None`).
    /// `only` limits the plan to one kind of holding.
    pub fn collect(db: &Database, user_id: Option<u64>, only: Option<QuoteKind>) -> Self {
        let in_scope = |owner: u64| user_id.map_or(true, |id| id == owner);
        let mut plan = Self {
            user_id,
            only,
            stocks: Vec::new(),
            bonds: Vec::new(),
            bonds_total: 0,
        };

        if matches!(only, None | Some(QuoteKind::Stock)) {
            plan.stocks = db
                .stocks
                .iter()
                .filter(|s| in_scope(s.user_id))
                .map(|s| (s.id, QuoteRequest::stock(s.market, s.ticker.clone())))
                .collect();
        }

        if matches!(only, None | Some(QuoteKind::Bond)) {
            let bonds: Vec<_> = db.bonds.iter().filter(|b| in_scope(b.user_id)).collect();
            plan.bonds_total = bonds.len();
            plan.bonds = bonds
                .into_iter()
                .map(|b| (b.id, b.bond_code.trim()))
                .filter(|(_, code)| !code.is_empty())
                .map(|(id, code)| (id, QuoteRequest::bond(code)))
                .collect();
        }

        plan
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user_id
    }

    /// Number of quotes the plan will ask for.
    pub fn quote_count(&self) -> usize {
        self.stocks.len() + self.bonds.len()
    }
}

impl PriceService {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn has_provider_for(&self, kind: QuoteKind) -> bool {
        self.registry.get_provider_for(kind).is_some()
    }

    pub fn get_provider_names(&self, kind: QuoteKind) -> Vec<String> {
        self.registry
            .get_providers_for(kind)
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Latest quote for `request`.
    pub async fn latest_quote(&self, request: &QuoteRequest) -> Result<Quote, CoreError> {
        self.fetch(request, None).await
    }

    /// Quote for `request` on `date`; dates from today on use the latest quote.
    pub async fn quote_on(&self, request: &QuoteRequest, date: NaiveDate) -> Result<Quote, CoreError> {
        self.fetch(request, Some(date)).await
    }

    async fn fetch(&self, request: &QuoteRequest, date: Option<NaiveDate>) -> Result<Quote, CoreError> {
        let kind = request.kind();
        let providers = self.registry.get_providers_for(kind);
        if providers.is_empty() {
            return Err(CoreError::NoProvider(kind.to_string()));
        }

        let today = Utc::now().date_naive();
        let mut last_error = None;

        for provider in &providers {
            let result = match date {
                Some(d) if d < today => provider.quote_on(request, d).await,
                _ => provider.latest_quote(request).await,
            };

            match result {
                Ok(price) if price.is_finite() && price >= 0.0 => {
                    return Ok(Quote {
                        price,
                        source: provider.name().to_string(),
                    });
                }
                Ok(price) => {
                    last_error = Some(CoreError::Api {
                        provider: provider.name().to_string(),
                        message: format!(
                            "Invalid price returned for {request}: {price} (must be finite and non-negative)"
                        ),
                    });
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), symbol = %request, error = %e, "Quote failed, trying next provider");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::NoProvider(kind.to_string())))
    }

    /// Fetch the latest quote for every holding in `plan`.
    /// Failures are logged and left out.
    pub async fn fetch_refresh(&self, plan: &RefreshPlan) -> RefreshQuotes {
        let mut quotes = RefreshQuotes::default();

        for (holding_id, request) in &plan.stocks {
            match self.latest_quote(request).await {
                Ok(quote) => quotes.stocks.push((*holding_id, request.clone(), quote)),
                Err(e) => tracing::warn!(symbol = %request, error = %e, "Stock price not updated"),
            }
        }

        for (holding_id, request) in &plan.bonds {
            match self.latest_quote(request).await {
                Ok(quote) => quotes.bonds.push((*holding_id, request.clone(), quote)),
                Err(e) => tracing::debug!(symbol = %request, error = %e, "Bond price not updated"),
            }
        }

        quotes
    }

    /// Store fetched quotes and snapshot deposits.
    ///
    /// A holding deleted since the plan was made, or whose symbol changed,
    /// keeps its current price. Deposits are snapshotted only when the plan
    /// covers every kind of holding.
    pub fn apply_refresh(
        &self,
        db: &mut Database,
        plan: &RefreshPlan,
        quotes: RefreshQuotes,
        now: DateTime<Utc>,
    ) -> RefreshSummary {
        let mut summary = RefreshSummary {
            stocks_total: plan.stocks.len(),
            bonds_total: plan.bonds_total,
            ..RefreshSummary::default()
        };

        for (holding_id, request, quote) in quotes.stocks {
            let record_id = db.next_id();
            let Some(stock) = db
                .stocks
                .iter_mut()
                .find(|s| s.id == holding_id && QuoteRequest::stock(s.market, s.ticker.as_str()) == request)
            else {
                continue;
            };
            stock.current_price = Some(quote.price);
            stock.last_price_updated_at = Some(now);
            db.stock_prices.push(StockPriceRecord {
                id: record_id,
                holding_id,
                recorded_at: now,
                price: quote.price,
                source: quote.source,
            });
            summary.stocks_updated += 1;
        }

        for (holding_id, request, quote) in quotes.bonds {
            let record_id = db.next_id();
            let Some(bond) = db
                .bonds
                .iter_mut()
                .find(|b| b.id == holding_id && QuoteRequest::bond(b.bond_code.trim()) == request)
            else {
                continue;
            };
            bond.current_price_pct = Some(quote.price);
            bond.last_price_updated_at = Some(now);
            db.bond_prices.push(BondPriceRecord {
                id: record_id,
                holding_id,
                recorded_at: now,
                price_pct: quote.price,
                source: quote.source,
            });
            summary.bonds_updated += 1;
        }

        if plan.only.is_none() {
            let today = now.date_naive();
            let snapshots: Vec<(u64, f64)> = db
                .deposits
                .iter()
                .filter(|d| plan.user_id.map_or(true, |id| id == d.user_id))
                .map(|d| (d.id, d.estimated_value(today)))
                .collect();
            for (holding_id, value) in snapshots {
                let id = db.next_id();
                db.deposit_values.push(DepositValueRecord {
                    id,
                    holding_id,
                    recorded_at: now,
                    value,
                });
                summary.deposits_snapshotted += 1;
            }
        }

        tracing::info!(%summary, "Price refresh finished");
        summary
    }
}
