//! Matching engine core

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::crosses;
use crate::clients::Funds;
use crate::error::Result;
use crate::messages::{MatchOutcome, ObUpdate, Order, Rejection, Side, Trade};
use crate::orderbook::{OrderBookManager, OrderBookState, RestingOrder};

/// Matching engine over every ticker's book
#[derive(Debug, Default)]
pub struct Engine {
    books: OrderBookManager,
    /// Arrival sequence handed to the next accepted order
    next_order_id: u64,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match `order` against its ticker's book
    ///
    /// Every candidate trade is checked with `funds` before it is final. A
    /// refused candidate ends matching; the resting order it would have hit
    /// is left as it was and the incoming remainder is reported as unfilled
    /// rather than rested, since resting it would cross the book.
    pub fn match_order<F>(&mut self, order: &Order, funds: &mut F) -> Result<MatchOutcome>
    where
        F: Funds + ?Sized,
    {
        order.validate()?;

        let order_id = self.next_order_id;
        self.next_order_id += 1;

        let book = self.books.book_mut(&order.ticker);
        let resting_side = order.side.opposite();
        let mut remaining = order.quantity;
        let mut outcome = MatchOutcome::default();

        while remaining > Decimal::ZERO {
            let Some(best) = book.best_opposing_price(order.side) else {
                break;
            };
            if !crosses(order.side, order.price, best) {
                break;
            }
            let Some(resting) = book.peek_front(resting_side, best) else {
                break;
            };

            let fill = remaining.min(resting.remaining);
            let (buyer_id, seller_id) = match order.side {
                Side::Buy => (order.client_id.clone(), resting.client_id.clone()),
                Side::Sell => (resting.client_id.clone(), order.client_id.clone()),
            };
            let trade = Trade {
                ticker: order.ticker.clone(),
                buyer_id,
                seller_id,
                side: order.side,
                price: best,
                quantity: fill,
            };

            if let Some(offending_side) = funds.validate(&trade) {
                warn!(
                    ticker = %trade.ticker,
                    buyer = %trade.buyer_id,
                    seller = %trade.seller_id,
                    price = %trade.price,
                    quantity = %trade.quantity,
                    offending_side = %offending_side,
                    "Trade rejected by ledger"
                );
                outcome.rejection = Some(Rejection {
                    offending_side,
                    unfilled: remaining,
                });
                return Ok(outcome);
            }

            outcome
                .ob_updates
                .push(ObUpdate::new(&order.ticker, resting_side, best, Decimal::ZERO));

            let left = book
                .fill_front(resting_side, best, fill)
                .unwrap_or(Decimal::ZERO);
            remaining -= fill;
            if left > Decimal::ZERO {
                outcome
                    .ob_updates
                    .push(ObUpdate::new(&order.ticker, resting_side, best, left));
            }

            funds.settle(&trade);
            debug!(
                ticker = %trade.ticker,
                buyer = %trade.buyer_id,
                seller = %trade.seller_id,
                price = %trade.price,
                quantity = %trade.quantity,
                "Matched"
            );
            outcome.trades.push(trade);
        }

        if remaining > Decimal::ZERO {
            book.insert(
                order.side,
                order.price,
                RestingOrder::new(order_id, &order.client_id, remaining),
            );
            outcome
                .ob_updates
                .push(ObUpdate::new(&order.ticker, order.side, order.price, remaining));
        }
        debug_assert!(!book.is_crossed(), "book {} crossed", order.ticker);

        Ok(outcome)
    }

    /// Withdraw the oldest order of `client_id` resting at `price`
    ///
    /// Returns the removal update, or `None` if the client has nothing there.
    pub fn cancel_order(
        &mut self,
        client_id: &str,
        side: Side,
        ticker: &str,
        price: Decimal,
    ) -> Option<ObUpdate> {
        let book = self.books.book_mut(ticker);
        let cancelled = book.cancel(side, price, client_id)?;
        debug!(
            ticker = %ticker,
            client = %client_id,
            side = %side,
            price = %price,
            quantity = %cancelled.remaining,
            "Cancelled resting order"
        );
        Some(ObUpdate::new(ticker, side, price, Decimal::ZERO))
    }

    pub fn book_state(&self, ticker: &str) -> Option<OrderBookState> {
        self.books.get_state(ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClientManager, MockFunds};
    use crate::error::ExchangeError;
    use crate::messages::OrderKind;
    use rust_decimal_macros::dec;

    fn funded() -> ClientManager {
        let mut clients = ClientManager::new(dec!(1000));
        for id in ["A", "B", "C"] {
            clients.add_client(id).unwrap();
            clients.modify_holdings(id, "ETHUSD", dec!(1000));
        }
        clients
    }

    fn buy(client: &str, qty: Decimal, price: Decimal) -> Order {
        Order::market(client, Side::Buy, "ETHUSD", qty, price)
    }

    fn sell(client: &str, qty: Decimal, price: Decimal) -> Order {
        Order::market(client, Side::Sell, "ETHUSD", qty, price)
    }

    #[test]
    fn test_malformed_orders_leave_book_untouched() {
        let mut engine = Engine::new();
        let mut clients = funded();

        let err = engine
            .match_order(&buy("A", dec!(0), dec!(1)), &mut clients)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidQuantity(_)));

        let err = engine
            .match_order(&sell("A", dec!(1), dec!(0)), &mut clients)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidPrice(_)));

        let stop = Order::new(
            "A",
            Side::Buy,
            OrderKind::Other("STOP".into()),
            "ETHUSD",
            dec!(1),
            dec!(1),
        );
        let err = engine.match_order(&stop, &mut clients).unwrap_err();
        assert!(matches!(err, ExchangeError::UnsupportedOrderKind(_)));

        assert!(engine.book_state("ETHUSD").is_none());
    }

    #[test]
    fn test_fifo_within_level() {
        let mut engine = Engine::new();
        let mut clients = funded();

        engine.match_order(&sell("A", dec!(2), dec!(5)), &mut clients).unwrap();
        engine.match_order(&sell("B", dec!(2), dec!(5)), &mut clients).unwrap();

        let outcome = engine
            .match_order(&buy("C", dec!(3), dec!(5)), &mut clients)
            .unwrap();
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].seller_id, "A");
        assert_eq!(outcome.trades[0].quantity, dec!(2));
        assert_eq!(outcome.trades[1].seller_id, "B");
        assert_eq!(outcome.trades[1].quantity, dec!(1));
        assert_eq!(
            outcome.ob_updates,
            vec![
                ObUpdate::new("ETHUSD", Side::Sell, dec!(5), dec!(0)),
                ObUpdate::new("ETHUSD", Side::Sell, dec!(5), dec!(0)),
                ObUpdate::new("ETHUSD", Side::Sell, dec!(5), dec!(1)),
            ]
        );
    }

    #[test]
    fn test_best_price_first_at_resting_price() {
        let mut engine = Engine::new();
        let mut clients = funded();

        engine.match_order(&sell("A", dec!(1), dec!(7)), &mut clients).unwrap();
        engine.match_order(&sell("B", dec!(1), dec!(6)), &mut clients).unwrap();

        let outcome = engine
            .match_order(&buy("C", dec!(3), dec!(8)), &mut clients)
            .unwrap();
        let prices: Vec<Decimal> = outcome.trades.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![dec!(6), dec!(7)]);

        // Unfilled remainder rests at the aggressor's own limit
        assert_eq!(
            outcome.ob_updates.last(),
            Some(&ObUpdate::new("ETHUSD", Side::Buy, dec!(8), dec!(1)))
        );
        let state = engine.book_state("ETHUSD").unwrap();
        assert!(state.asks.is_empty());
        assert_eq!(state.metrics.best_bid, Some(dec!(8)));
    }

    #[test]
    fn test_partially_filled_order_keeps_front_position() {
        let mut engine = Engine::new();
        let mut clients = funded();

        engine.match_order(&buy("A", dec!(3), dec!(2)), &mut clients).unwrap();
        engine.match_order(&buy("B", dec!(3), dec!(2)), &mut clients).unwrap();
        engine.match_order(&sell("C", dec!(1), dec!(2)), &mut clients).unwrap();

        let outcome = engine
            .match_order(&sell("C", dec!(1), dec!(2)), &mut clients)
            .unwrap();
        assert_eq!(outcome.trades[0].buyer_id, "A");
    }

    #[test]
    fn test_rejection_stops_matching_without_settlement() {
        let mut engine = Engine::new();
        let mut clients = funded();
        engine.match_order(&buy("A", dec!(2), dec!(1)), &mut clients).unwrap();

        let mut funds = MockFunds::new();
        funds.expect_validate().times(1).returning(|_| Some(Side::Sell));
        funds.expect_settle().never();

        let outcome = engine
            .match_order(&sell("B", dec!(1), dec!(1)), &mut funds)
            .unwrap();
        assert!(outcome.trades.is_empty());
        assert!(outcome.ob_updates.is_empty());
        assert_eq!(
            outcome.rejection,
            Some(Rejection {
                offending_side: Side::Sell,
                unfilled: dec!(1)
            })
        );

        let state = engine.book_state("ETHUSD").unwrap();
        assert_eq!(state.bids[0].quantity, dec!(2));
        assert!(state.asks.is_empty());
    }

    #[test]
    fn test_rejection_after_fills_keeps_earlier_trades() {
        let mut engine = Engine::new();
        let mut clients = funded();
        engine.match_order(&sell("A", dec!(1), dec!(1)), &mut clients).unwrap();
        engine.match_order(&sell("B", dec!(1), dec!(2)), &mut clients).unwrap();

        let mut funds = MockFunds::new();
        let mut calls = 0;
        funds.expect_validate().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                None
            } else {
                Some(Side::Buy)
            }
        });
        funds.expect_settle().times(1).return_const(());

        let outcome = engine
            .match_order(&buy("C", dec!(5), dec!(2)), &mut funds)
            .unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].seller_id, "A");
        assert_eq!(
            outcome.rejection,
            Some(Rejection {
                offending_side: Side::Buy,
                unfilled: dec!(4)
            })
        );
        assert!(!engine.books.book("ETHUSD").unwrap().is_crossed());
        assert_eq!(engine.book_state("ETHUSD").unwrap().metrics.best_ask, Some(dec!(2)));
    }

    #[test]
    fn test_self_match_is_left_to_ledger() {
        let mut engine = Engine::new();
        let mut clients = funded();
        engine.match_order(&buy("A", dec!(1), dec!(3)), &mut clients).unwrap();

        let outcome = engine
            .match_order(&sell("A", dec!(1), dec!(3)), &mut clients)
            .unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(clients.get_capital("A"), dec!(1000));
        assert_eq!(clients.get_holdings("A", "ETHUSD"), dec!(1000));
    }

    #[test]
    fn test_cancel_order() {
        let mut engine = Engine::new();
        let mut clients = funded();
        engine.match_order(&buy("A", dec!(1), dec!(3)), &mut clients).unwrap();
        engine.match_order(&buy("B", dec!(1), dec!(3)), &mut clients).unwrap();

        assert!(engine.cancel_order("C", Side::Buy, "ETHUSD", dec!(3)).is_none());
        assert_eq!(
            engine.cancel_order("A", Side::Buy, "ETHUSD", dec!(3)),
            Some(ObUpdate::new("ETHUSD", Side::Buy, dec!(3), dec!(0)))
        );

        let outcome = engine
            .match_order(&sell("C", dec!(1), dec!(3)), &mut clients)
            .unwrap();
        assert_eq!(outcome.trades[0].buyer_id, "B");
        assert!(engine.book_state("ETHUSD").unwrap().bids.is_empty());
    }

    #[test]
    fn test_book_never_crosses_and_value_is_conserved() {
        let mut engine = Engine::new();
        let mut clients = funded();
        let total_capital = |c: &ClientManager| -> Decimal {
            ["A", "B", "C"].iter().map(|id| c.get_capital(id)).sum()
        };
        let total_holdings = |c: &ClientManager| -> Decimal {
            ["A", "B", "C"]
                .iter()
                .map(|id| c.get_holdings(id, "ETHUSD"))
                .sum()
        };
        let capital_before = total_capital(&clients);
        let holdings_before = total_holdings(&clients);

        // Deterministic pseudo-random order flow
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let ids = ["A", "B", "C"];
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let client = ids[(seed % 3) as usize];
            let side = if (seed >> 8) % 2 == 0 { Side::Buy } else { Side::Sell };
            let qty = Decimal::from((seed >> 16) % 5 + 1);
            let price = Decimal::from((seed >> 24) % 10 + 1);

            let order = Order::market(client, side, "ETHUSD", qty, price);
            let outcome = engine.match_order(&order, &mut clients).unwrap();

            for trade in &outcome.trades {
                match side {
                    Side::Buy => assert!(trade.price <= price),
                    Side::Sell => assert!(trade.price >= price),
                }
            }
            assert!(!engine.books.book("ETHUSD").unwrap().is_crossed());
        }

        assert_eq!(total_capital(&clients), capital_before);
        assert_eq!(total_holdings(&clients), holdings_before);
    }
}
