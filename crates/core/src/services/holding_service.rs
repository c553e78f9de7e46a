use chrono::{DateTime, Utc};

use crate::errors::CoreError;
use crate::models::bond::{BondHolding, BondInput};
use crate::models::database::Database;
use crate::models::deposit::{DepositInput, DepositSaving};
use crate::models::money::AssetClass;
use crate::models::report::HoldingSearchResults;
use crate::models::stock::{StockHolding, StockInput};

/// CRUD for deposits, stocks and bonds.
///
/// Pure business logic over the [`Database`]; every read or write checks that
/// the holding belongs to the acting user.
pub struct HoldingService;

/// Owner check shared by all three holding kinds.
fn check_owner(kind: &'static str, id: u64, owner: u64, user_id: u64) -> Result<(), CoreError> {
    if owner != user_id {
        return Err(CoreError::PermissionDenied(format!(
            "{kind} {id} belongs to another user"
        )));
    }
    Ok(())
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

impl HoldingService {
    pub fn new() -> Self {
        Self
    }

    // ── Deposits ────────────────────────────────────────────────────

    pub fn create_deposit(
        &self,
        db: &mut Database,
        user_id: u64,
        input: DepositInput,
        now: DateTime<Utc>,
    ) -> Result<DepositSaving, CoreError> {
        let input = input.clean()?;
        let deposit = DepositSaving {
            id: db.next_id(),
            user_id,
            product_type: input.product_type,
            bank_name: input.bank_name,
            product_name: input.product_name,
            principal_amount: input.principal_amount,
            annual_rate: input.annual_rate,
            compounding: input.compounding,
            start_date: input.start_date,
            maturity_date: input.maturity_date,
            currency: input.currency,
            current_value_manual: input.current_value_manual,
            created_at: now,
            updated_at: now,
        };
        db.deposits.push(deposit.clone());
        Ok(deposit)
    }

    pub fn get_deposit<'a>(
        &self,
        db: &'a Database,
        user_id: u64,
        id: u64,
    ) -> Result<&'a DepositSaving, CoreError> {
        let deposit = db
            .deposits
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| CoreError::not_found("Deposit", id))?;
        check_owner("Deposit", id, deposit.user_id, user_id)?;
        Ok(deposit)
    }

    pub fn update_deposit(
        &self,
        db: &mut Database,
        user_id: u64,
        id: u64,
        input: DepositInput,
        now: DateTime<Utc>,
    ) -> Result<DepositSaving, CoreError> {
        self.get_deposit(db, user_id, id)?;
        let input = input.clean()?;
        let deposit = db
            .deposits
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| CoreError::not_found("Deposit", id))?;
        deposit.product_type = input.product_type;
        deposit.bank_name = input.bank_name;
        deposit.product_name = input.product_name;
        deposit.principal_amount = input.principal_amount;
        deposit.annual_rate = input.annual_rate;
        deposit.compounding = input.compounding;
        deposit.start_date = input.start_date;
        deposit.maturity_date = input.maturity_date;
        deposit.currency = input.currency;
        deposit.current_value_manual = input.current_value_manual;
        deposit.updated_at = now;
        Ok(deposit.clone())
    }

    pub fn delete_deposit(&self, db: &mut Database, user_id: u64, id: u64) -> Result<(), CoreError> {
        self.get_deposit(db, user_id, id)?;
        db.deposits.retain(|d| d.id != id);
        db.deposit_values.retain(|r| r.holding_id != id);
        Ok(())
    }

    // ── Stocks ──────────────────────────────────────────────────────

    pub fn create_stock(
        &self,
        db: &mut Database,
        user_id: u64,
        input: StockInput,
        now: DateTime<Utc>,
    ) -> Result<StockHolding, CoreError> {
        let input = input.clean()?;
        let stock = StockHolding {
            id: db.next_id(),
            user_id,
            market: input.market,
            ticker: input.ticker,
            name: input.name,
            quantity: input.quantity,
            average_price: input.average_price,
            currency: input.currency,
            current_price: input.current_price,
            last_price_updated_at: None,
            created_at: now,
            updated_at: now,
        };
        db.stocks.push(stock.clone());
        Ok(stock)
    }

    pub fn get_stock<'a>(
        &self,
        db: &'a Database,
        user_id: u64,
        id: u64,
    ) -> Result<&'a StockHolding, CoreError> {
        let stock = db
            .stocks
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::not_found("Stock", id))?;
        check_owner("Stock", id, stock.user_id, user_id)?;
        Ok(stock)
    }

    pub fn update_stock(
        &self,
        db: &mut Database,
        user_id: u64,
        id: u64,
        input: StockInput,
        now: DateTime<Utc>,
    ) -> Result<StockHolding, CoreError> {
        self.get_stock(db, user_id, id)?;
        let input = input.clean()?;
        let stock = db
            .stocks
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::not_found("Stock", id))?;
        stock.market = input.market;
        stock.ticker = input.ticker;
        stock.name = input.name;
        stock.quantity = input.quantity;
        stock.average_price = input.average_price;
        stock.currency = input.currency;
        stock.current_price = input.current_price;
        stock.updated_at = now;
        Ok(stock.clone())
    }

    pub fn delete_stock(&self, db: &mut Database, user_id: u64, id: u64) -> Result<(), CoreError> {
        self.get_stock(db, user_id, id)?;
        db.stocks.retain(|s| s.id != id);
        db.stock_prices.retain(|r| r.holding_id != id);
        Ok(())
    }

    // ── Bonds ───────────────────────────────────────────────────────

    pub fn create_bond(
        &self,
        db: &mut Database,
        user_id: u64,
        input: BondInput,
        now: DateTime<Utc>,
    ) -> Result<BondHolding, CoreError> {
        let input = input.clean()?;
        let bond = BondHolding {
            id: db.next_id(),
            user_id,
            name: input.name,
            issuer: input.issuer,
            currency: input.currency,
            face_amount: input.face_amount,
            coupon_rate: input.coupon_rate,
            purchase_price_pct: input.purchase_price_pct,
            current_price_pct: input.current_price_pct,
            maturity_date: input.maturity_date,
            bond_code: input.bond_code,
            last_price_updated_at: None,
            created_at: now,
            updated_at: now,
        };
        db.bonds.push(bond.clone());
        Ok(bond)
    }

    pub fn get_bond<'a>(
        &self,
        db: &'a Database,
        user_id: u64,
        id: u64,
    ) -> Result<&'a BondHolding, CoreError> {
        let bond = db
            .bonds
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| CoreError::not_found("Bond", id))?;
        check_owner("Bond", id, bond.user_id, user_id)?;
        Ok(bond)
    }

    pub fn update_bond(
        &self,
        db: &mut Database,
        user_id: u64,
        id: u64,
        input: BondInput,
        now: DateTime<Utc>,
    ) -> Result<BondHolding, CoreError> {
        self.get_bond(db, user_id, id)?;
        let input = input.clean()?;
        let bond = db
            .bonds
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| CoreError::not_found("Bond", id))?;
        bond.name = input.name;
        bond.issuer = input.issuer;
        bond.currency = input.currency;
        bond.face_amount = input.face_amount;
        bond.coupon_rate = input.coupon_rate;
        bond.purchase_price_pct = input.purchase_price_pct;
        bond.current_price_pct = input.current_price_pct;
        bond.maturity_date = input.maturity_date;
        bond.bond_code = input.bond_code;
        bond.updated_at = now;
        Ok(bond.clone())
    }

    pub fn delete_bond(&self, db: &mut Database, user_id: u64, id: u64) -> Result<(), CoreError> {
        self.get_bond(db, user_id, id)?;
        db.bonds.retain(|b| b.id != id);
        db.bond_prices.retain(|r| r.holding_id != id);
        Ok(())
    }

    // ── Search ──────────────────────────────────────────────────────

    /// Case-insensitive substring search over one user's holdings.
    ///
    /// Matches bank/product names, ticker/name and bond name/issuer/code.
    /// A blank query returns nothing.
    pub fn search(&self, db: &Database, user_id: u64, query: &str) -> HoldingSearchResults {
        self.search_scoped(db, Some(user_id), query, None)
    }

    /// Staff search across every user; also matches the owner's username.
    /// `kind` restricts the result to one asset class.
    pub fn search_all(
        &self,
        db: &Database,
        query: &str,
        kind: Option<AssetClass>,
    ) -> HoldingSearchResults {
        self.search_scoped(db, None, query, kind)
    }

    fn search_scoped(
        &self,
        db: &Database,
        user_id: Option<u64>,
        query: &str,
        kind: Option<AssetClass>,
    ) -> HoldingSearchResults {
        let needle = query.trim().to_lowercase();
        let admin = user_id.is_none();
        if needle.is_empty() && !admin {
            return HoldingSearchResults::default();
        }

        let in_scope = |owner: u64| user_id.map_or(true, |id| id == owner);
        let owner_matches = |owner: u64| {
            admin
                && db
                    .user(owner)
                    .is_some_and(|u| contains(&u.username, &needle))
        };
        let wanted = |class: AssetClass| kind.map_or(true, |k| k == class);

        let mut results = HoldingSearchResults::default();

        if wanted(AssetClass::Cash) {
            results.deposits = db
                .deposits
                .iter()
                .filter(|d| in_scope(d.user_id))
                .filter(|d| {
                    contains(&d.bank_name, &needle)
                        || contains(&d.product_name, &needle)
                        || owner_matches(d.user_id)
                })
                .cloned()
                .collect();
        }
        if wanted(AssetClass::Stock) {
            results.stocks = db
                .stocks
                .iter()
                .filter(|s| in_scope(s.user_id))
                .filter(|s| {
                    contains(&s.ticker, &needle)
                        || contains(&s.name, &needle)
                        || owner_matches(s.user_id)
                })
                .cloned()
                .collect();
        }
        if wanted(AssetClass::Bond) {
            results.bonds = db
                .bonds
                .iter()
                .filter(|b| in_scope(b.user_id))
                .filter(|b| {
                    contains(&b.name, &needle)
                        || contains(&b.issuer, &needle)
                        || contains(&b.bond_code, &needle)
                        || owner_matches(b.user_id)
                })
                .cloned()
                .collect();
        }

        results.deposits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        results.stocks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        results.bonds.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        results
    }
}

impl Default for HoldingService {
    fn default() -> Self {
        Self::new()
    }
}
