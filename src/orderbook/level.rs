//! FIFO queue of resting orders at one price

use rust_decimal::Decimal;
use std::collections::VecDeque;

/// An order waiting in the book for a counterpart
#[derive(Debug, Clone, PartialEq)]
pub struct RestingOrder {
    /// Arrival sequence, used only for time priority
    pub order_id: u64,
    pub client_id: String,
    pub remaining: Decimal,
}

impl RestingOrder {
    pub fn new(order_id: u64, client_id: impl Into<String>, remaining: Decimal) -> Self {
        Self {
            order_id,
            client_id: client_id.into(),
            remaining,
        }
    }
}

/// All resting orders at a single price on one side of a book
///
/// Insertion order is time priority. The total is kept in step with every
/// mutation so depth queries never walk the queue.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    orders: VecDeque<RestingOrder>,
    total_quantity: Decimal,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order at the back of the queue
    pub fn push_back(&mut self, order: RestingOrder) {
        self.total_quantity += order.remaining;
        self.orders.push_back(order);
    }

    pub fn front(&self) -> Option<&RestingOrder> {
        self.orders.front()
    }

    pub fn pop_front(&mut self) -> Option<RestingOrder> {
        let order = self.orders.pop_front()?;
        self.total_quantity -= order.remaining;
        Some(order)
    }

    /// Reduce the front order by `fill`, keeping its place in the queue
    ///
    /// Returns the front order's new remaining quantity. An order reduced to
    /// zero is dropped from the level.
    pub fn fill_front(&mut self, fill: Decimal) -> Option<Decimal> {
        let front = self.orders.front_mut()?;
        let filled = fill.min(front.remaining);
        front.remaining -= filled;
        self.total_quantity -= filled;

        let remaining = front.remaining;
        if remaining.is_zero() {
            self.orders.pop_front();
        }
        Some(remaining)
    }

    /// Remove the oldest order owned by `client_id`
    pub fn remove_first_of(&mut self, client_id: &str) -> Option<RestingOrder> {
        let position = self.orders.iter().position(|o| o.client_id == client_id)?;
        let order = self.orders.remove(position)?;
        self.total_quantity -= order.remaining;
        Some(order)
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn total_quantity(&self) -> Decimal {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}
