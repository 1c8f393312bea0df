//! Line-oriented order intake
//!
//! Each line is a JSON order or cancel. Clients are marked active on their
//! first accepted order; orders from unregistered clients are dropped.

use std::collections::HashSet;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info, warn};

use crate::clients::SIMULATED_CLIENT;
use crate::error::Result;
use crate::parser::ParsedMessage;
use crate::publisher::{FeedEvent, Publisher};
use crate::service::ExchangeHandle;

/// Feed every line of `reader` through the exchange until EOF
pub async fn run_intake<R>(reader: R, exchange: &ExchangeHandle, publisher: &Publisher) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut active: HashSet<String> = HashSet::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match ParsedMessage::parse(&line) {
            Ok(ParsedMessage::Order(order)) => {
                if let Err(e) = order.validate() {
                    warn!(client = %order.client_id, error = %e, "Order refused");
                    continue;
                }

                if order.client_id != SIMULATED_CLIENT && !active.contains(&order.client_id) {
                    if !exchange.set_active(&order.client_id, true).await? {
                        warn!(client = %order.client_id, "Order from unregistered client dropped");
                        continue;
                    }
                    active.insert(order.client_id.clone());
                }

                let client_id = order.client_id.clone();
                match exchange.submit(order).await {
                    Ok(outcome) => {
                        publisher
                            .publish(&FeedEvent::Matched {
                                client_id: &client_id,
                                outcome: &outcome,
                            })
                            .await?;
                    }
                    Err(e) => warn!(client = %client_id, error = %e, "Order refused"),
                }
            }
            Ok(ParsedMessage::Cancel(cancel)) => {
                let update = exchange
                    .cancel(&cancel.client_id, cancel.side, &cancel.ticker, cancel.price)
                    .await?;
                match update {
                    Some(update) => {
                        publisher
                            .publish(&FeedEvent::Cancelled {
                                client_id: &cancel.client_id,
                                update: &update,
                            })
                            .await?;
                    }
                    None => warn!(client = %cancel.client_id, "Nothing to cancel"),
                }
            }
            Ok(ParsedMessage::Unknown(raw)) => warn!(message = %raw, "Unrecognised message"),
            Err(e) => error!(error = %e, "Failed to parse message"),
        }
    }

    info!("Input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ClientManager;
    use crate::matching::Engine;
    use crate::service::ExchangeService;
    use crate::telemetry::Metrics;
    use rust_decimal_macros::dec;
    use tokio::io::BufReader;

    async fn exchange_with(ids: &[&str]) -> ExchangeHandle {
        let (handle, _task) = ExchangeService::spawn(
            Engine::new(),
            ClientManager::new(dec!(100)),
            Metrics::new().unwrap(),
            16,
        );
        handle
            .add_clients(ids.iter().map(|id| id.to_string()).collect())
            .await
            .unwrap();
        handle
    }

    #[tokio::test]
    async fn test_only_accepted_orders_activate_clients() {
        let exchange = exchange_with(&["A", "B", "C"]).await;
        let publisher = Publisher::new("/nonexistent/feed.sock").await.unwrap();
        let input = [
            r#"{"client_id":"A","side":"BUY","type":"MARKET","ticker":"X","quantity":0,"price":1}"#,
            r#"{"client_id":"B","side":"BUY","type":"LIMIT","ticker":"X","quantity":1,"price":1}"#,
            r#"{"client_id":"ghost","side":"BUY","type":"MARKET","ticker":"X","quantity":1,"price":1}"#,
            r#"not json"#,
            "",
            r#"{"client_id":"C","side":"BUY","type":"MARKET","ticker":"X","quantity":2,"price":3}"#,
        ]
        .join("\n");

        run_intake(BufReader::new(input.as_bytes()), &exchange, &publisher)
            .await
            .unwrap();

        let active = exchange.clients(true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "C");

        let state = exchange.book_state("X").await.unwrap().unwrap();
        assert_eq!(state.bids.len(), 1);
        assert_eq!(state.bids[0].quantity, dec!(2));
    }

    #[tokio::test]
    async fn test_simulated_orders_and_cancels_pass_through() {
        let exchange = exchange_with(&["A"]).await;
        let publisher = Publisher::new("/nonexistent/feed.sock").await.unwrap();
        let input = [
            r#"{"client_id":"SIMULATED","side":"SELL","type":"MARKET","ticker":"X","quantity":1,"price":5}"#,
            r#"{"client_id":"A","side":"BUY","type":"MARKET","ticker":"X","quantity":1,"price":4}"#,
            r#"{"cancel":{"client_id":"A","side":"BUY","ticker":"X","price":"4"}}"#,
        ]
        .join("\n");

        run_intake(BufReader::new(input.as_bytes()), &exchange, &publisher)
            .await
            .unwrap();

        let state = exchange.book_state("X").await.unwrap().unwrap();
        assert_eq!(state.asks.len(), 1);
        assert!(state.bids.is_empty());
        assert!(!exchange.clients(true).await.unwrap().iter().any(|c| c.id == SIMULATED_CLIENT));
    }
}
