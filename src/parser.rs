//! Parser for incoming order messages
//!
//! Each line of input is a JSON object: either an order or a cancel request.
//! Unknown order kinds are kept so the engine can refuse them explicitly.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

use crate::error::{ExchangeError, Result};
use crate::messages::{Order, OrderKind, Side};

/// Order as sent by a client
#[derive(Debug, Clone, Deserialize)]
pub struct OrderMessage {
    pub client_id: String,

    #[serde(deserialize_with = "deserialize_side")]
    pub side: Side,

    /// Order kind literal, e.g. "MARKET"
    #[serde(rename = "type")]
    pub kind: String,

    pub ticker: String,

    #[serde(deserialize_with = "deserialize_decimal")]
    pub quantity: Decimal,

    #[serde(deserialize_with = "deserialize_decimal")]
    pub price: Decimal,
}

impl From<OrderMessage> for Order {
    fn from(msg: OrderMessage) -> Self {
        Order::new(
            msg.client_id,
            msg.side,
            OrderKind::from(msg.kind),
            msg.ticker,
            msg.quantity,
            msg.price,
        )
    }
}

/// Request to withdraw a resting order
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CancelRequest {
    pub client_id: String,

    #[serde(deserialize_with = "deserialize_side")]
    pub side: Side,

    pub ticker: String,

    #[serde(deserialize_with = "deserialize_decimal")]
    pub price: Decimal,
}

/// Cancel wrapper: `{"cancel": {...}}`
#[derive(Debug, Clone, Deserialize)]
struct CancelEnvelope {
    cancel: CancelRequest,
}

/// Parsed input message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Order(Order),
    Cancel(CancelRequest),
    Unknown(String),
}

impl ParsedMessage {
    /// Parse a raw input line
    pub fn parse(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;

        if value.get("cancel").is_some() {
            let envelope: CancelEnvelope = serde_json::from_value(value)?;
            return Ok(ParsedMessage::Cancel(envelope.cancel));
        }

        if value.get("client_id").is_some() && value.get("side").is_some() {
            let msg: OrderMessage = serde_json::from_value(value)?;
            return Ok(ParsedMessage::Order(msg.into()));
        }

        Ok(ParsedMessage::Unknown(raw.to_string()))
    }
}

/// Decimal given either as a JSON string or a JSON number
fn deserialize_decimal<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let text = match raw {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected a decimal, got {other}"
            )))
        }
    };
    Decimal::from_str(&text).map_err(serde::de::Error::custom)
}

fn deserialize_side<'de, D>(deserializer: D) -> std::result::Result<Side, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Side::from_str(&s).map_err(|e: ExchangeError| serde::de::Error::custom(e.to_string()))
}
