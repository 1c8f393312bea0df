//! Top-of-book figures and per-side depth for book snapshots

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PriceLevel;

/// Liquidity resting on one side of a book
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SideDepth {
    pub levels: usize,
    pub orders: usize,
    pub quantity: Decimal,
}

impl SideDepth {
    pub(super) fn add_level(mut self, level: &PriceLevel) -> Self {
        self.levels += 1;
        self.orders += level.order_count();
        self.quantity += level.total_quantity();
        self
    }
}

/// Summary of an order book at the time of the snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookMetrics {
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub mid_price: Option<Decimal>,
    /// Spread in basis points of the mid price
    pub spread_bps: Option<Decimal>,
    pub bids: SideDepth,
    pub asks: SideDepth,
}
