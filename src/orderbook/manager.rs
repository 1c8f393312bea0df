//! Order book manager
//!
//! Owns one order book per ticker. Books are created on first use.

use std::collections::HashMap;

use super::{OrderBook, OrderBookState};

/// Manages order books for multiple tickers
#[derive(Debug, Default)]
pub struct OrderBookManager {
    books: HashMap<String, OrderBook>,
}

impl OrderBookManager {
    /// Create a new order book manager
    pub fn new() -> Self {
        Self {
            books: HashMap::new(),
        }
    }

    /// Book for `ticker`, created empty if this is the first time it is seen
    pub fn book_mut(&mut self, ticker: &str) -> &mut OrderBook {
        self.books
            .entry(ticker.to_string())
            .or_insert_with(|| OrderBook::new(ticker))
    }

    pub fn book(&self, ticker: &str) -> Option<&OrderBook> {
        self.books.get(ticker)
    }

    /// Get the state of a specific book
    pub fn get_state(&self, ticker: &str) -> Option<OrderBookState> {
        self.books.get(ticker).map(|book| book.state())
    }
}
