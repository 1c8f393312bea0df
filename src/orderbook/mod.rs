//! Order book module
//!
//! Resting-order storage per ticker, bids and asks kept in price-time priority.

mod book;
mod level;
mod manager;
mod metrics;

pub use book::OrderBook;
pub use level::{PriceLevel, RestingOrder};
pub use manager::OrderBookManager;
pub use metrics::{OrderBookMetrics, SideDepth};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregated view of a single price level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: Decimal,
    pub quantity: Decimal,
    pub orders: usize,
}

impl Level {
    fn from_price_level(price: Decimal, level: &PriceLevel) -> Self {
        Self {
            price,
            quantity: level.total_quantity(),
            orders: level.order_count(),
        }
    }
}

/// Order book state to be published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookState {
    pub ticker: String,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    pub metrics: OrderBookMetrics,
}
