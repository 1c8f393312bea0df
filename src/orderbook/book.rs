//! Core order book implementation
//!
//! Uses BTreeMap for efficient sorted price level management.

use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::BTreeMap;

use super::level::{PriceLevel, RestingOrder};
use super::{Level, OrderBookMetrics, OrderBookState, SideDepth};
use crate::messages::Side;

/// Order book for a single ticker
#[derive(Debug)]
pub struct OrderBook {
    ticker: String,
    /// Bids sorted by price descending (highest first)
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    /// Asks sorted by price ascending (lowest first)
    asks: BTreeMap<Decimal, PriceLevel>,
}

impl OrderBook {
    /// Create a new empty order book
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// Get best bid price
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first_key_value().map(|(Reverse(p), _)| *p)
    }

    /// Get best ask price
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first_key_value().map(|(p, _)| *p)
    }

    /// Best price an order on `side` could trade against
    pub fn best_opposing_price(&self, side: Side) -> Option<Decimal> {
        match side {
            Side::Buy => self.best_ask(),
            Side::Sell => self.best_bid(),
        }
    }

    fn level(&self, side: Side, price: Decimal) -> Option<&PriceLevel> {
        match side {
            Side::Buy => self.bids.get(&Reverse(price)),
            Side::Sell => self.asks.get(&price),
        }
    }

    fn level_mut(&mut self, side: Side, price: Decimal) -> Option<&mut PriceLevel> {
        match side {
            Side::Buy => self.bids.get_mut(&Reverse(price)),
            Side::Sell => self.asks.get_mut(&price),
        }
    }

    /// Oldest resting order at `price` on `side`
    pub fn peek_front(&self, side: Side, price: Decimal) -> Option<&RestingOrder> {
        self.level(side, price).and_then(PriceLevel::front)
    }

    /// Remove and return the oldest resting order at `price` on `side`
    pub fn pop_front(&mut self, side: Side, price: Decimal) -> Option<RestingOrder> {
        let order = self.level_mut(side, price)?.pop_front();
        self.remove_if_empty(side, price);
        order
    }

    /// Fill the front order at `price` by `fill` without re-queueing it
    ///
    /// Returns what is left of that order. Exhausted orders and empty levels
    /// are dropped.
    pub fn fill_front(&mut self, side: Side, price: Decimal, fill: Decimal) -> Option<Decimal> {
        let remaining = self.level_mut(side, price)?.fill_front(fill);
        self.remove_if_empty(side, price);
        remaining
    }

    /// Append a resting order to the tail of its price level
    pub fn insert(&mut self, side: Side, price: Decimal, order: RestingOrder) {
        if order.remaining <= Decimal::ZERO {
            return;
        }
        match side {
            Side::Buy => self.bids.entry(Reverse(price)).or_default().push_back(order),
            Side::Sell => self.asks.entry(price).or_default().push_back(order),
        }
    }

    /// Drop the level at `price` if nothing rests there
    ///
    /// Returns true if a level was removed.
    pub fn remove_if_empty(&mut self, side: Side, price: Decimal) -> bool {
        let empty = self.level(side, price).is_some_and(PriceLevel::is_empty);
        if empty {
            match side {
                Side::Buy => {
                    self.bids.remove(&Reverse(price));
                }
                Side::Sell => {
                    self.asks.remove(&price);
                }
            }
        }
        empty
    }

    /// Remove the oldest order of `client_id` resting at `price` on `side`
    pub fn cancel(&mut self, side: Side, price: Decimal, client_id: &str) -> Option<RestingOrder> {
        let order = self.level_mut(side, price)?.remove_first_of(client_id);
        self.remove_if_empty(side, price);
        order
    }

    /// True if the best bid reaches the best ask
    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid(), self.best_ask()), (Some(bid), Some(ask)) if bid >= ask)
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Get mid price
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            _ => None,
        }
    }

    /// Get spread in basis points
    pub fn spread_bps(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask(), self.mid_price()) {
            (Some(bid), Some(ask), Some(mid)) if mid > Decimal::ZERO => {
                Some((ask - bid) / mid * Decimal::from(10000))
            }
            _ => None,
        }
    }

    /// Aggregated view of the book
    pub fn state(&self) -> OrderBookState {
        OrderBookState {
            ticker: self.ticker.clone(),
            bids: self
                .bids
                .iter()
                .map(|(Reverse(p), level)| Level::from_price_level(*p, level))
                .collect(),
            asks: self
                .asks
                .iter()
                .map(|(p, level)| Level::from_price_level(*p, level))
                .collect(),
            metrics: self.calculate_metrics(),
        }
    }

    fn calculate_metrics(&self) -> OrderBookMetrics {
        OrderBookMetrics {
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
            mid_price: self.mid_price(),
            spread_bps: self.spread_bps(),
            bids: self.bids.values().fold(SideDepth::default(), SideDepth::add_level),
            asks: self.asks.values().fold(SideDepth::default(), SideDepth::add_level),
        }
    }
}
