use rust_decimal::Decimal;
use tracing::warn;

use super::{ClientManager, Funds, SIMULATED_CLIENT};
use crate::messages::{Side, Trade};

impl ClientManager {
    /// Capital of `id`, zero for unknown clients
    pub fn get_capital(&self, id: &str) -> Decimal {
        self.get_client(id).map_or(Decimal::ZERO, |c| c.capital)
    }

    /// Quantity of `ticker` held by `id`, zero if either is unknown
    pub fn get_holdings(&self, id: &str, ticker: &str) -> Decimal {
        self.get_client(id)
            .and_then(|c| c.holdings.get(ticker).copied())
            .unwrap_or(Decimal::ZERO)
    }

    /// Adjust capital by `change` and return the new balance
    ///
    /// Unknown clients are left unregistered and read back as zero. A change
    /// that would overflow is dropped.
    pub fn modify_capital(&mut self, id: &str, change: Decimal) -> Decimal {
        match self.clients.get_mut(id) {
            Some(client) => {
                match client.capital.checked_add(change) {
                    Some(capital) => client.capital = capital,
                    None => warn!(client = %id, change = %change, "Capital change overflows, ignored"),
                }
                client.capital
            }
            None => Decimal::ZERO,
        }
    }

    /// Adjust holdings of `ticker` by `change` and return the new position
    pub fn modify_holdings(&mut self, id: &str, ticker: &str, change: Decimal) -> Decimal {
        match self.clients.get_mut(id) {
            Some(client) => {
                let held = client.holdings.entry(ticker.to_string()).or_default();
                match held.checked_add(change) {
                    Some(total) => *held = total,
                    None => warn!(
                        client = %id,
                        ticker = %ticker,
                        change = %change,
                        "Holdings change overflows, ignored"
                    ),
                }
                *held
            }
            None => Decimal::ZERO,
        }
    }

    /// Side of `trade` that cannot pay or deliver
    ///
    /// A leg whose balance would leave the representable range counts as
    /// unable to take part.
    pub fn validate_match(&self, trade: &Trade) -> Option<Side> {
        let Some(value) = trade.value() else {
            return Some(Side::Buy);
        };

        let buyer_capital = self.get_capital(&trade.buyer_id).checked_sub(value);
        if buyer_capital.map_or(true, |c| c < Decimal::ZERO) {
            return Some(Side::Buy);
        }
        if trade.seller_id != SIMULATED_CLIENT {
            let seller_holdings = self
                .get_holdings(&trade.seller_id, &trade.ticker)
                .checked_sub(trade.quantity);
            if seller_holdings.map_or(true, |h| h < Decimal::ZERO) {
                return Some(Side::Sell);
            }
        }

        if self.get_capital(&trade.seller_id).checked_add(value).is_none() {
            return Some(Side::Sell);
        }
        if self
            .get_holdings(&trade.buyer_id, &trade.ticker)
            .checked_add(trade.quantity)
            .is_none()
        {
            return Some(Side::Buy);
        }
        None
    }

    pub fn settle_match(&mut self, trade: &Trade) {
        let Some(value) = trade.value() else {
            warn!(
                ticker = %trade.ticker,
                price = %trade.price,
                quantity = %trade.quantity,
                "Trade value overflows, not settled"
            );
            return;
        };
        self.modify_capital(&trade.buyer_id, -value);
        self.modify_capital(&trade.seller_id, value);
        self.modify_holdings(&trade.seller_id, &trade.ticker, -trade.quantity);
        self.modify_holdings(&trade.buyer_id, &trade.ticker, trade.quantity);
    }
}

impl Funds for ClientManager {
    fn validate(&self, trade: &Trade) -> Option<Side> {
        self.validate_match(trade)
    }

    fn settle(&mut self, trade: &Trade) {
        self.settle_match(trade)
    }
}
