//! Order, trade and book-delta messages
//!
//! These are the values that cross the engine boundary: orders come in,
//! trades and order book updates go out in the order they were produced.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ExchangeError, Result};

/// Largest accepted order price (1e14)
pub const MAX_ORDER_PRICE: Decimal = Decimal::from_parts(276_447_232, 23_283, 0, false, 0);

/// Largest accepted order quantity (1e14)
pub const MAX_ORDER_QUANTITY: Decimal = Decimal::from_parts(276_447_232, 23_283, 0, false, 0);

/// Side of an order, a trade aggressor or a book update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an order of this side trades against
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(ExchangeError::ParseError(format!("unknown side: {other}"))),
        }
    }
}

/// Kind of an incoming order
///
/// `Market` is the only kind the engine matches. It still carries a limit
/// price. Anything else is kept verbatim so the engine can refuse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderKind {
    Market,
    Other(String),
}

impl From<String> for OrderKind {
    fn from(s: String) -> Self {
        if s == "MARKET" {
            OrderKind::Market
        } else {
            OrderKind::Other(s)
        }
    }
}

impl From<OrderKind> for String {
    fn from(kind: OrderKind) -> Self {
        match kind {
            OrderKind::Market => "MARKET".to_string(),
            OrderKind::Other(s) => s,
        }
    }
}

/// An order as submitted by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub client_id: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub kind: OrderKind,
    pub ticker: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl Order {
    pub fn new(
        client_id: impl Into<String>,
        side: Side,
        kind: OrderKind,
        ticker: impl Into<String>,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            side,
            kind,
            ticker: ticker.into(),
            quantity,
            price,
        }
    }

    /// Shorthand for the only kind the engine supports
    pub fn market(
        client_id: impl Into<String>,
        side: Side,
        ticker: impl Into<String>,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self::new(client_id, side, OrderKind::Market, ticker, quantity, price)
    }

    /// Reject orders that must never reach the book
    pub fn validate(&self) -> Result<()> {
        if let OrderKind::Other(kind) = &self.kind {
            return Err(ExchangeError::UnsupportedOrderKind(kind.clone()));
        }
        if self.quantity <= Decimal::ZERO || self.quantity > MAX_ORDER_QUANTITY {
            return Err(ExchangeError::InvalidQuantity(self.quantity));
        }
        if self.price <= Decimal::ZERO || self.price > MAX_ORDER_PRICE {
            return Err(ExchangeError::InvalidPrice(self.price));
        }
        Ok(())
    }
}

/// A finalized match between an incoming order and a resting one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub ticker: String,
    pub buyer_id: String,
    pub seller_id: String,
    /// Side of the aggressor
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl Trade {
    /// Capital that changes hands, `None` if it is not representable
    pub fn value(&self) -> Option<Decimal> {
        self.price.checked_mul(self.quantity)
    }
}

/// Incremental change to one order's position in the book
///
/// A quantity of zero removes the prior state of an order at that price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObUpdate {
    pub ticker: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl ObUpdate {
    pub fn new(ticker: impl Into<String>, side: Side, price: Decimal, quantity: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            side,
            price,
            quantity,
        }
    }
}

/// A candidate trade refused by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    /// Leg that could not pay or deliver
    pub offending_side: Side,
    /// Quantity of the incoming order that was neither filled nor rested
    pub unfilled: Decimal,
}

/// Everything a single `match_order` call produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub trades: Vec<Trade>,
    pub ob_updates: Vec<ObUpdate>,
    pub rejection: Option<Rejection>,
}
