//! Configuration module for the exchange

use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::clients::DEFAULT_STARTING_CAPITAL;
use crate::error::{ExchangeError, Result};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Capital every newly registered client starts with
    pub starting_capital: Decimal,

    /// JSON client directory export to register at startup
    pub clients_file: Option<String>,

    /// IPC socket path for publishing trades and book updates
    pub ipc_socket_path: String,

    /// Port of the health and metrics server
    pub health_port: u16,

    /// Capacity of the exchange service command channel
    pub command_buffer: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let starting_capital = match env::var("STARTING_CAPITAL") {
            Ok(raw) => parse_capital(&raw)?,
            Err(_) => defaults.starting_capital,
        };

        Ok(Self {
            starting_capital,
            clients_file: env::var("CLIENTS_FILE").ok().filter(|p| !p.is_empty()),
            ipc_socket_path: env::var("IPC_SOCKET_PATH").unwrap_or(defaults.ipc_socket_path),
            health_port: env::var("HEALTH_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.health_port),
            command_buffer: env::var("COMMAND_BUFFER")
                .ok()
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.command_buffer),
        })
    }
}

fn parse_capital(raw: &str) -> Result<Decimal> {
    let capital = Decimal::from_str(raw.trim())
        .map_err(|e| ExchangeError::ConfigError(format!("invalid STARTING_CAPITAL {raw:?}: {e}")))?;
    if capital < Decimal::ZERO {
        return Err(ExchangeError::ConfigError(format!(
            "STARTING_CAPITAL must not be negative, got {capital}"
        )));
    }
    Ok(capital)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            starting_capital: DEFAULT_STARTING_CAPITAL,
            clients_file: None,
            ipc_socket_path: "/tmp/sim-exchange.sock".to_string(),
            health_port: 9090,
            command_buffer: 10_000,
        }
    }
}
