use serde::{Deserialize, Serialize};

use super::bond::BondHolding;
use super::deposit::DepositSaving;
use super::history::{BondPriceRecord, DepositValueRecord, StockPriceRecord};
use super::inquiry::Inquiry;
use super::price::RateCache;
use super::settings::Settings;
use super::stock::StockHolding;
use super::user::User;

/// The main data container. Everything in here gets serialized,
/// encrypted, and saved to the snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub users: Vec<User>,
    pub deposits: Vec<DepositSaving>,
    pub stocks: Vec<StockHolding>,
    pub bonds: Vec<BondHolding>,

    pub stock_prices: Vec<StockPriceRecord>,
    pub bond_prices: Vec<BondPriceRecord>,
    pub deposit_values: Vec<DepositValueRecord>,

    pub inquiries: Vec<Inquiry>,

    pub settings: Settings,

    /// Exchange rates fetched so far; past rates never change.
    pub rate_cache: RateCache,

    /// Last id handed out; ids are shared by every table.
    last_id: u64,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            deposits: Vec::new(),
            stocks: Vec::new(),
            bonds: Vec::new(),
            stock_prices: Vec::new(),
            bond_prices: Vec::new(),
            deposit_values: Vec::new(),
            inquiries: Vec::new(),
            settings: Settings::default(),
            rate_cache: RateCache::new(),
            last_id: 0,
        }
    }
}

impl Database {
    pub fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    pub fn user(&self, id: u64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
    }

    /// Holdings of one user, newest created first.
    pub fn deposits_of(&self, user_id: u64) -> Vec<&DepositSaving> {
        let mut rows: Vec<&DepositSaving> =
            self.deposits.iter().filter(|d| d.user_id == user_id).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }

    pub fn stocks_of(&self, user_id: u64) -> Vec<&StockHolding> {
        let mut rows: Vec<&StockHolding> =
            self.stocks.iter().filter(|s| s.user_id == user_id).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }

    pub fn bonds_of(&self, user_id: u64) -> Vec<&BondHolding> {
        let mut rows: Vec<&BondHolding> =
            self.bonds.iter().filter(|b| b.user_id == user_id).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }

    /// Remove a user and everything they own.
    pub fn cascade_delete_user(&mut self, user_id: u64) {
        let deposit_ids: Vec<u64> = self
            .deposits
            .iter()
            .filter(|d| d.user_id == user_id)
            .map(|d| d.id)
            .collect();
        let stock_ids: Vec<u64> = self
            .stocks
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.id)
            .collect();
        let bond_ids: Vec<u64> = self
            .bonds
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.id)
            .collect();

        self.deposit_values
            .retain(|r| !deposit_ids.contains(&r.holding_id));
        self.stock_prices.retain(|r| !stock_ids.contains(&r.holding_id));
        self.bond_prices.retain(|r| !bond_ids.contains(&r.holding_id));
        self.deposits.retain(|d| d.user_id != user_id);
        self.stocks.retain(|s| s.user_id != user_id);
        self.bonds.retain(|b| b.user_id != user_id);
        self.inquiries.retain(|i| i.author_id != user_id);
        self.users.retain(|u| u.id != user_id);
    }
}
