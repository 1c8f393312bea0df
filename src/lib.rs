//! Simulated Exchange - Matching Engine Library
//!
//! This crate provides the price-time priority matching engine, the per-ticker
//! order books and the client funds ledger behind a trading-competition
//! exchange.

use std::sync::Arc;

pub mod clients;
pub mod config;
pub mod error;
pub mod intake;
pub mod matching;
pub mod messages;
pub mod orderbook;
pub mod parser;
pub mod publisher;
pub mod service;
pub mod telemetry;

pub use clients::{Client, ClientManager, Funds, SIMULATED_CLIENT};
pub use config::Config;
pub use error::{ExchangeError, Result};
pub use matching::Engine;
pub use messages::{
    MatchOutcome, ObUpdate, Order, OrderKind, Rejection, Side, Trade, MAX_ORDER_PRICE,
    MAX_ORDER_QUANTITY,
};
pub use orderbook::{OrderBook, OrderBookManager, OrderBookMetrics, OrderBookState};
pub use parser::{CancelRequest, ParsedMessage};
pub use publisher::{FeedEvent, Publisher};
pub use service::{ExchangeHandle, ExchangeService};
pub use telemetry::Metrics;

/// Application state shared across components
pub struct AppState {
    pub exchange: ExchangeHandle,
    pub publisher: Arc<Publisher>,
    pub metrics: Metrics,
    pub config: Arc<Config>,
}
