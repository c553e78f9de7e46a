pub mod errors;
pub mod models;
pub mod news;
pub mod providers;
pub mod services;
pub mod storage;
pub mod validation;

use chrono::{NaiveDate, Utc};
use models::{
    bond::{BondHolding, BondInput},
    chart::ValuePoint,
    database::Database,
    deposit::{DepositInput, DepositSaving},
    inquiry::{Inquiry, InquiryInput},
    money::{AssetClass, Currency},
    report::{AllocationReport, CategoryList, HoldingSearchResults, PortfolioOverview, RefreshSummary},
    settings::Settings,
    stock::{StockHolding, StockInput},
    user::{PasswordChangeInput, PasswordResetInput, Profile, ProfileInput, SignupInput},
};
use providers::{registry::ProviderRegistry, traits::QuoteKind};
use services::{
    account_service::{AccountService, PasswordJob, PasswordOutcome},
    allocation_service::AllocationService,
    chart_service::ChartService,
    currency_service::{CurrencyService, FxPlan, FxTable},
    holding_service::HoldingService,
    inquiry_service::InquiryService,
    price_service::{PriceService, RefreshPlan, RefreshQuotes},
};
use std::path::Path;
use storage::manager::StorageManager;

use errors::CoreError;

/// Main entry point for the Finfolio core library.
/// Holds the database and all services needed to operate on it.
#[must_use]
pub struct Finfolio {
    db: Database,
    account_service: AccountService,
    holding_service: HoldingService,
    allocation_service: AllocationService,
    chart_service: ChartService,
    currency_service: CurrencyService,
    price_service: PriceService,
    inquiry_service: InquiryService,
    /// Tracks whether any mutation has occurred since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for Finfolio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Finfolio")
            .field("users", &self.db.users.len())
            .field("deposits", &self.db.deposits.len())
            .field("stocks", &self.db.stocks.len())
            .field("bonds", &self.db.bonds.len())
            .field("inquiries", &self.db.inquiries.len())
            .field("settings", &self.db.settings)
            .field("cached_rates", &self.db.rate_cache.total_entries())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Finfolio {
    /// Create a brand new empty database with default settings.
    pub fn create_new() -> Self {
        Self::build(Database::default())
    }

    /// Wrap an existing database, e.g. one assembled in a test.
    pub fn from_database(db: Database) -> Self {
        Self::build(db)
    }

    /// Replace the default providers, e.g. with mocks or a bond price source.
    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.price_service = PriceService::new(registry);
        self
    }

    /// Load a database from encrypted bytes (passphrase required).
    pub fn load_from_bytes(encrypted: &[u8], passphrase: &str) -> Result<Self, CoreError> {
        let db = StorageManager::load_from_bytes(encrypted, passphrase)?;
        Ok(Self::build(db))
    }

    /// Save the database to encrypted bytes.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_bytes(&mut self, passphrase: &str) -> Result<Vec<u8>, CoreError> {
        let bytes = StorageManager::save_to_bytes(&self.db, passphrase)?;
        self.dirty = false;
        Ok(bytes)
    }

    pub fn load_from_file(path: impl AsRef<Path>, passphrase: &str) -> Result<Self, CoreError> {
        let db = StorageManager::load_from_file(path, passphrase)?;
        Ok(Self::build(db))
    }

    /// Save to an encrypted file on disk.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_file(&mut self, path: impl AsRef<Path>, passphrase: &str) -> Result<(), CoreError> {
        StorageManager::save_to_file(&self.db, path, passphrase)?;
        self.dirty = false;
        Ok(())
    }

    /// Copy of the database for a save done elsewhere, e.g. on a blocking thread.
    /// Clears the unsaved-changes flag; call [`Finfolio::mark_unsaved`] if the save fails.
    pub fn begin_save(&mut self) -> Database {
        self.dirty = false;
        self.db.clone()
    }

    pub fn mark_unsaved(&mut self) {
        self.dirty = true;
    }

    /// Returns `true` if the database has been modified since the last save or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Read-only view of everything stored.
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ── Accounts ────────────────────────────────────────────────────

    pub fn register(&mut self, input: SignupInput) -> Result<Profile, CoreError> {
        let outcome = self.prepare_register(&input)?.run()?;
        self.finish_register(&input, outcome)
    }

    /// Validate a signup and return the hashing it needs.
    pub fn prepare_register(&self, input: &SignupInput) -> Result<PasswordJob, CoreError> {
        self.account_service.prepare_register(&self.db, input)
    }

    pub fn finish_register(
        &mut self,
        input: &SignupInput,
        outcome: PasswordOutcome,
    ) -> Result<Profile, CoreError> {
        let profile = self
            .account_service
            .finish_register(&mut self.db, input, outcome, Utc::now())?;
        self.dirty = true;
        Ok(profile)
    }

    /// Verify credentials and stamp `last_login`.
    pub fn login(&mut self, username: &str, password: &str) -> Result<Profile, CoreError> {
        let outcome = self.prepare_login(username, password)?.run()?;
        self.finish_login(username, outcome)
    }

    pub fn prepare_login(&self, username: &str, password: &str) -> Result<PasswordJob, CoreError> {
        self.account_service.prepare_login(&self.db, username, password)
    }

    pub fn finish_login(&mut self, username: &str, outcome: PasswordOutcome) -> Result<Profile, CoreError> {
        let profile = self
            .account_service
            .finish_login(&mut self.db, username, outcome, Utc::now())?;
        self.dirty = true;
        Ok(profile)
    }

    pub fn profile(&self, user_id: u64) -> Result<Profile, CoreError> {
        self.account_service.profile(&self.db, user_id)
    }

    #[must_use]
    pub fn is_staff(&self, user_id: u64) -> bool {
        self.db.user(user_id).is_some_and(|u| u.is_staff)
    }

    pub fn update_profile(&mut self, user_id: u64, input: ProfileInput) -> Result<Profile, CoreError> {
        let profile = self.account_service.update_profile(&mut self.db, user_id, input)?;
        self.dirty = true;
        Ok(profile)
    }

    pub fn change_password(
        &mut self,
        user_id: u64,
        input: PasswordChangeInput,
    ) -> Result<(), CoreError> {
        let outcome = self.prepare_change_password(user_id, &input)?.run()?;
        self.finish_change_password(user_id, &input, outcome)
    }

    pub fn prepare_change_password(
        &self,
        user_id: u64,
        input: &PasswordChangeInput,
    ) -> Result<PasswordJob, CoreError> {
        self.account_service
            .prepare_change_password(&self.db, user_id, input)
    }

    pub fn finish_change_password(
        &mut self,
        user_id: u64,
        input: &PasswordChangeInput,
        outcome: PasswordOutcome,
    ) -> Result<(), CoreError> {
        self.account_service
            .finish_change_password(&mut self.db, user_id, input, outcome)?;
        self.dirty = true;
        Ok(())
    }

    /// Set a new password for the account registered under an email address.
    /// Returns the id of the affected user.
    pub fn reset_password(&mut self, input: PasswordResetInput) -> Result<u64, CoreError> {
        let outcome = self.prepare_reset_password(&input)?.run()?;
        self.finish_reset_password(&input, outcome)
    }

    pub fn prepare_reset_password(&self, input: &PasswordResetInput) -> Result<PasswordJob, CoreError> {
        self.account_service.prepare_reset_password(&self.db, input)
    }

    pub fn finish_reset_password(
        &mut self,
        input: &PasswordResetInput,
        outcome: PasswordOutcome,
    ) -> Result<u64, CoreError> {
        let user_id = self
            .account_service
            .finish_reset_password(&mut self.db, input, outcome)?;
        self.dirty = true;
        Ok(user_id)
    }

    /// Delete an account and everything it owns after confirming the password.
    pub fn delete_account(&mut self, user_id: u64, password: &str) -> Result<(), CoreError> {
        let outcome = self.prepare_delete_account(user_id, password)?.run()?;
        self.finish_delete_account(user_id, outcome)
    }

    pub fn prepare_delete_account(&self, user_id: u64, password: &str) -> Result<PasswordJob, CoreError> {
        self.account_service
            .prepare_delete_account(&self.db, user_id, password)
    }

    pub fn finish_delete_account(&mut self, user_id: u64, outcome: PasswordOutcome) -> Result<(), CoreError> {
        self.account_service
            .finish_delete_account(&mut self.db, user_id, outcome)?;
        self.dirty = true;
        Ok(())
    }

    pub fn create_superuser(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Profile, CoreError> {
        let profile = self.account_service.create_superuser(
            &mut self.db,
            username,
            email,
            password,
            Utc::now(),
        )?;
        self.dirty = true;
        Ok(profile)
    }

    // ── Holdings ────────────────────────────────────────────────────

    pub fn create_deposit(&mut self, user_id: u64, input: DepositInput) -> Result<DepositSaving, CoreError> {
        let deposit = self
            .holding_service
            .create_deposit(&mut self.db, user_id, input, Utc::now())?;
        self.dirty = true;
        Ok(deposit)
    }

    pub fn deposit(&self, user_id: u64, id: u64) -> Result<&DepositSaving, CoreError> {
        self.holding_service.get_deposit(&self.db, user_id, id)
    }

    pub fn update_deposit(
        &mut self,
        user_id: u64,
        id: u64,
        input: DepositInput,
    ) -> Result<DepositSaving, CoreError> {
        let deposit = self
            .holding_service
            .update_deposit(&mut self.db, user_id, id, input, Utc::now())?;
        self.dirty = true;
        Ok(deposit)
    }

    pub fn delete_deposit(&mut self, user_id: u64, id: u64) -> Result<(), CoreError> {
        self.holding_service.delete_deposit(&mut self.db, user_id, id)?;
        self.dirty = true;
        Ok(())
    }

    pub fn create_stock(&mut self, user_id: u64, input: StockInput) -> Result<StockHolding, CoreError> {
        let stock = self
            .holding_service
            .create_stock(&mut self.db, user_id, input, Utc::now())?;
        self.dirty = true;
        Ok(stock)
    }

    pub fn stock(&self, user_id: u64, id: u64) -> Result<&StockHolding, CoreError> {
        self.holding_service.get_stock(&self.db, user_id, id)
    }

    pub fn update_stock(
        &mut self,
        user_id: u64,
        id: u64,
        input: StockInput,
    ) -> Result<StockHolding, CoreError> {
        let stock = self
            .holding_service
            .update_stock(&mut self.db, user_id, id, input, Utc::now())?;
        self.dirty = true;
        Ok(stock)
    }

    pub fn delete_stock(&mut self, user_id: u64, id: u64) -> Result<(), CoreError> {
        self.holding_service.delete_stock(&mut self.db, user_id, id)?;
        self.dirty = true;
        Ok(())
    }

    pub fn create_bond(&mut self, user_id: u64, input: BondInput) -> Result<BondHolding, CoreError> {
        let bond = self
            .holding_service
            .create_bond(&mut self.db, user_id, input, Utc::now())?;
        self.dirty = true;
        Ok(bond)
    }

    pub fn bond(&self, user_id: u64, id: u64) -> Result<&BondHolding, CoreError> {
        self.holding_service.get_bond(&self.db, user_id, id)
    }

    pub fn update_bond(&mut self, user_id: u64, id: u64, input: BondInput) -> Result<BondHolding, CoreError> {
        let bond = self
            .holding_service
            .update_bond(&mut self.db, user_id, id, input, Utc::now())?;
        self.dirty = true;
        Ok(bond)
    }

    pub fn delete_bond(&mut self, user_id: u64, id: u64) -> Result<(), CoreError> {
        self.holding_service.delete_bond(&mut self.db, user_id, id)?;
        self.dirty = true;
        Ok(())
    }

    /// Search one user's holdings (case-insensitive). A blank query finds nothing.
    #[must_use]
    pub fn search_holdings(&self, user_id: u64, query: &str) -> HoldingSearchResults {
        self.holding_service.search(&self.db, user_id, query)
    }

    /// Search every user's holdings, including by owner username.
    #[must_use]
    pub fn search_all_holdings(&self, query: &str, kind: Option<AssetClass>) -> HoldingSearchResults {
        self.holding_service.search_all(&self.db, query, kind)
    }

    // ── Valuation & Allocation ──────────────────────────────────────

    /// All three holding lists with estimates plus native totals.
    #[must_use]
    pub fn overview(&self, user_id: u64, today: NaiveDate) -> PortfolioOverview {
        self.allocation_service.overview(&self.db, user_id, today)
    }

    #[must_use]
    pub fn deposit_list(&self, user_id: u64, today: NaiveDate) -> CategoryList<DepositSaving> {
        self.allocation_service.deposit_list(&self.db, user_id, today)
    }

    #[must_use]
    pub fn stock_list(&self, user_id: u64) -> CategoryList<StockHolding> {
        self.allocation_service.stock_list(&self.db, user_id)
    }

    #[must_use]
    pub fn bond_list(&self, user_id: u64) -> CategoryList<BondHolding> {
        self.allocation_service.bond_list(&self.db, user_id)
    }

    /// Allocation by class and currency in the configured base currency.
    /// Exchange rates are fetched (and cached) as needed.
    pub async fn allocation(&mut self, user_id: u64, today: NaiveDate) -> AllocationReport {
        let fx = self.fx_table(user_id, today).await;
        self.allocation_with(user_id, today, &fx)
    }

    /// Allocation computed with caller-supplied rates.
    #[must_use]
    pub fn allocation_with(&self, user_id: u64, today: NaiveDate, fx: &FxTable) -> AllocationReport {
        self.allocation_service.allocation(&self.db, user_id, today, fx)
    }

    // ── Exchange Rates ──────────────────────────────────────────────

    /// Rates `user_id`'s holdings need on `date`, as far as the cache has them.
    #[must_use]
    pub fn fx_plan(&self, user_id: u64, date: NaiveDate) -> FxPlan {
        let currencies = self.allocation_service.currencies_of(&self.db, user_id);
        self.currency_service.plan(
            &self.db.rate_cache,
            self.db.settings.base_currency,
            &currencies,
            date,
        )
    }

    /// Cache rates fetched for `plan` and build the table.
    pub fn apply_fx(&mut self, plan: FxPlan, fetched: Vec<(Currency, f64)>) -> FxTable {
        let cached_before = self.db.rate_cache.total_entries();
        let fx = self
            .currency_service
            .apply(&mut self.db.rate_cache, plan, fetched);
        if self.db.rate_cache.total_entries() != cached_before {
            self.dirty = true;
        }
        fx
    }

    // ── Charts ──────────────────────────────────────────────────────

    /// Daily portfolio value between two dates (inclusive) in the base currency.
    pub async fn value_history(
        &mut self,
        user_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ValuePoint>, CoreError> {
        ChartService::check_range(from, to)?;
        let fx = self.fx_table(user_id, to).await;
        self.value_history_with(user_id, from, to, &fx)
    }

    /// Value history computed with caller-supplied rates.
    pub fn value_history_with(
        &self,
        user_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        fx: &FxTable,
    ) -> Result<Vec<ValuePoint>, CoreError> {
        self.chart_service
            .value_history(&self.db, user_id, from, to, fx)
    }

    // ── Prices ──────────────────────────────────────────────────────

    /// A handle on the quote providers that can fetch without borrowing `self`.
    #[must_use]
    pub fn price_service(&self) -> PriceService {
        self.price_service.clone()
    }

    /// Refresh one user's stock and bond prices and snapshot their deposits.
    pub async fn refresh_user_prices(&mut self, user_id: u64) -> Result<RefreshSummary, CoreError> {
        let plan = self.plan_user_refresh(user_id)?;
        Ok(self.run_refresh(plan).await)
    }

    pub fn plan_user_refresh(&self, user_id: u64) -> Result<RefreshPlan, CoreError> {
        if self.db.user(user_id).is_none() {
            return Err(CoreError::not_found("User", user_id));
        }
        Ok(RefreshPlan::collect(&self.db, Some(user_id), None))
    }

    /// Batch refresh for every user, or only `username`.
    ///
    /// `only` limits the run to stocks or bonds; deposits are snapshotted
    /// only when it is `None`.
    pub async fn update_asset_prices(
        &mut self,
        username: Option<&str>,
        only: Option<QuoteKind>,
    ) -> Result<RefreshSummary, CoreError> {
        let plan = self.plan_price_update(username, only)?;
        Ok(self.run_refresh(plan).await)
    }

    pub fn plan_price_update(
        &self,
        username: Option<&str>,
        only: Option<QuoteKind>,
    ) -> Result<RefreshPlan, CoreError> {
        if only == Some(QuoteKind::Fx) {
            return Err(CoreError::ValidationError(
                "Only stock or bond prices can be refreshed".to_string(),
            ));
        }
        let user_id = match username {
            Some(name) => Some(
                self.db
                    .user_by_username(name)
                    .map(|u| u.id)
                    .ok_or_else(|| CoreError::not_found("User", name))?,
            ),
            None => None,
        };
        Ok(RefreshPlan::collect(&self.db, user_id, only))
    }

    /// Store quotes fetched for `plan`.
    pub fn apply_refresh(&mut self, plan: &RefreshPlan, quotes: RefreshQuotes) -> RefreshSummary {
        let summary = self
            .price_service
            .apply_refresh(&mut self.db, plan, quotes, Utc::now());
        self.dirty = true;
        summary
    }

    /// Check if at least one provider can serve a kind of quote.
    #[must_use]
    pub fn is_provider_available(&self, kind: QuoteKind) -> bool {
        self.price_service.has_provider_for(kind)
    }

    #[must_use]
    pub fn get_provider_names(&self, kind: QuoteKind) -> Vec<String> {
        self.price_service.get_provider_names(kind)
    }

    // ── Inquiries ───────────────────────────────────────────────────

    pub fn write_inquiry(&mut self, author_id: u64, input: InquiryInput) -> Result<Inquiry, CoreError> {
        let inquiry = self
            .inquiry_service
            .write(&mut self.db, author_id, input, Utc::now())?;
        self.dirty = true;
        Ok(inquiry)
    }

    /// Every inquiry, newest first.
    #[must_use]
    pub fn inquiries(&self) -> Vec<&Inquiry> {
        self.inquiry_service.list_all(&self.db)
    }

    #[must_use]
    pub fn inquiries_by(&self, author_id: u64) -> Vec<&Inquiry> {
        self.inquiry_service.list_by_author(&self.db, author_id)
    }

    pub fn inquiry(&self, id: u64) -> Result<&Inquiry, CoreError> {
        self.inquiry_service.get(&self.db, id)
    }

    pub fn update_inquiry(
        &mut self,
        actor_id: u64,
        id: u64,
        input: InquiryInput,
    ) -> Result<Inquiry, CoreError> {
        let inquiry = self
            .inquiry_service
            .update(&mut self.db, actor_id, id, input, Utc::now())?;
        self.dirty = true;
        Ok(inquiry)
    }

    pub fn delete_inquiry(&mut self, actor_id: u64, id: u64) -> Result<(), CoreError> {
        self.inquiry_service.delete(&mut self.db, actor_id, id)?;
        self.dirty = true;
        Ok(())
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn get_settings(&self) -> &Settings {
        &self.db.settings
    }

    /// Set the currency allocation and history are expressed in.
    pub fn set_base_currency(&mut self, currency: Currency) {
        if self.db.settings.base_currency != currency {
            self.db.settings.base_currency = currency;
            self.dirty = true;
        }
    }

    /// Set an API key for a provider (e.g., "alphavantage").
    /// Rebuilds the provider registry so the new key takes effect immediately.
    pub fn set_api_key(&mut self, provider: String, key: String) {
        self.db.settings.api_keys.insert(provider, key);
        self.rebuild_registry();
        self.dirty = true;
    }

    /// Remove an API key for a provider.
    /// Rebuilds the provider registry so the removal takes effect immediately.
    pub fn remove_api_key(&mut self, provider: &str) -> bool {
        let removed = self.db.settings.api_keys.remove(provider).is_some();
        if removed {
            self.rebuild_registry();
            self.dirty = true;
        }
        removed
    }

    // ── Rate Cache ──────────────────────────────────────────────────

    #[must_use]
    pub fn cache_total_entries(&self) -> usize {
        self.db.rate_cache.total_entries()
    }

    /// Remove cached exchange rates older than `before`.
    /// Returns the number of entries removed.
    pub fn cache_prune_before(&mut self, before: NaiveDate) -> usize {
        let removed = self.db.rate_cache.prune_before(before);
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    pub fn cache_clear(&mut self) {
        self.db.rate_cache.clear();
        self.dirty = true;
    }

    /// Manually insert an exchange rate (offline use and tests).
    pub fn set_cached_rate(&mut self, from: Currency, to: Currency, date: NaiveDate, rate: f64) {
        self.db.rate_cache.set(from, to, date, rate);
        self.dirty = true;
    }

    // ── Internal ────────────────────────────────────────────────────

    async fn fx_table(&mut self, user_id: u64, date: NaiveDate) -> FxTable {
        let currencies = self.allocation_service.currencies_of(&self.db, user_id);
        let cached_before = self.db.rate_cache.total_entries();
        let fx = self
            .currency_service
            .fx_table(
                &self.price_service,
                &mut self.db.rate_cache,
                self.db.settings.base_currency,
                &currencies,
                date,
            )
            .await;
        if self.db.rate_cache.total_entries() != cached_before {
            self.dirty = true;
        }
        fx
    }

    async fn run_refresh(&mut self, plan: RefreshPlan) -> RefreshSummary {
        let quotes = self.price_service.fetch_refresh(&plan).await;
        self.apply_refresh(&plan, quotes)
    }

    fn rebuild_registry(&mut self) {
        let registry = ProviderRegistry::new_with_defaults(&self.db.settings.api_keys);
        self.price_service = PriceService::new(registry);
    }

    fn build(db: Database) -> Self {
        let registry = ProviderRegistry::new_with_defaults(&db.settings.api_keys);

        Self {
            db,
            account_service: AccountService::new(),
            holding_service: HoldingService::new(),
            allocation_service: AllocationService::new(),
            chart_service: ChartService::new(),
            currency_service: CurrencyService::new(),
            price_service: PriceService::new(registry),
            inquiry_service: InquiryService::new(),
            dirty: false,
        }
    }
}
