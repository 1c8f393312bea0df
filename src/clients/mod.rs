//! Client registry and funds ledger
//!
//! `ClientManager` owns every known client together with their capital and
//! holdings. Registration lives in `registry`, balances and trade settlement
//! in `ledger`.

mod ledger;
mod registry;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::messages::{Side, Trade};

/// Synthetic counterparty used for system-provided liquidity.
/// Exempt from holdings checks and never registered as a client.
pub const SIMULATED_CLIENT: &str = "SIMULATED";

/// Capital a freshly registered client starts with
pub const DEFAULT_STARTING_CAPITAL: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// A registered participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub active: bool,
    pub capital: Decimal,
    pub holdings: HashMap<String, Decimal>,
}

impl Client {
    fn new(id: &str, capital: Decimal) -> Self {
        Self {
            id: id.to_string(),
            active: false,
            capital,
            holdings: HashMap::new(),
        }
    }
}

/// Everything the matching engine needs from the ledger
#[cfg_attr(test, mockall::automock)]
pub trait Funds {
    /// Side that cannot honour `trade`, if any
    fn validate(&self, trade: &Trade) -> Option<Side>;

    /// Move capital and holdings between the two legs of `trade`
    fn settle(&mut self, trade: &Trade);
}

/// Registry of clients and their balances
#[derive(Debug)]
pub struct ClientManager {
    clients: HashMap<String, Client>,
    starting_capital: Decimal,
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_CAPITAL)
    }
}
