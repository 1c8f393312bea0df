//! Prometheus counters for the exchange service

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

use crate::error::{ExchangeError, Result};

/// Counters updated by the exchange service
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_received: IntCounter,
    pub orders_rejected: IntCounter,
    pub trades_executed: IntCounter,
    pub ledger_rejections: IntCounter,
    pub orders_cancelled: IntCounter,
}

impl Metrics {
    /// Create counters in a fresh registry
    pub fn new() -> Result<Self> {
        Self::register(Registry::new())
    }

    pub fn register(registry: Registry) -> Result<Self> {
        let counter = |name: &str, help: &str| -> Result<IntCounter> {
            let c = IntCounter::new(name, help).map_err(metrics_error)?;
            registry
                .register(Box::new(c.clone()))
                .map_err(metrics_error)?;
            Ok(c)
        };

        Ok(Self {
            orders_received: counter("exchange_orders_received_total", "Orders submitted")?,
            orders_rejected: counter(
                "exchange_orders_rejected_total",
                "Orders refused before reaching the book",
            )?,
            trades_executed: counter("exchange_trades_executed_total", "Trades finalized")?,
            ledger_rejections: counter(
                "exchange_ledger_rejections_total",
                "Candidate trades refused by the ledger",
            )?,
            orders_cancelled: counter("exchange_orders_cancelled_total", "Resting orders cancelled")?,
            registry,
        })
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| ExchangeError::SerializationError(e.to_string()))
    }
}

fn metrics_error(err: prometheus::Error) -> ExchangeError {
    ExchangeError::SerializationError(format!("metrics: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.trades_executed.inc_by(3);
        let text = metrics.render().unwrap();
        assert!(text.contains("exchange_trades_executed_total 3"));
        assert!(text.contains("exchange_orders_received_total 0"));
    }
}
