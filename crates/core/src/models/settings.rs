use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::money::Currency;

/// Site-wide settings, stored inside the encrypted snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Currency that allocation and history charts are expressed in.
    pub base_currency: Currency,

    /// Optional API keys for providers that require them.
    /// Keys: provider name (e.g., "alphavantage").
    pub api_keys: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_currency: Currency::KRW,
            api_keys: HashMap::new(),
        }
    }
}
