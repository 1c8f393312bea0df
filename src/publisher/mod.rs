//! Publisher module for IPC communication
//!
//! Forwards trades and order book updates to downstream consumers.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ExchangeError, Result};
use crate::messages::{MatchOutcome, ObUpdate};

/// What goes out on the feed
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent<'a> {
    Matched {
        client_id: &'a str,
        outcome: &'a MatchOutcome,
    },
    Cancelled {
        client_id: &'a str,
        update: &'a ObUpdate,
    },
}

/// Serialize `message` as MessagePack behind a 4-byte big-endian length
pub fn encode_frame<T: Serialize + ?Sized>(message: &T) -> Result<Bytes> {
    let data = rmp_serde::to_vec_named(message)?;
    let mut frame = BytesMut::with_capacity(4 + data.len());
    frame.put_u32(data.len() as u32);
    frame.extend_from_slice(&data);
    Ok(frame.freeze())
}

/// Publisher for sending feed events via Unix socket
pub struct Publisher {
    socket_path: String,
    stream: Mutex<Option<UnixStream>>,
}

impl Publisher {
    /// Create a new publisher
    pub async fn new(socket_path: &str) -> Result<Self> {
        let publisher = Self {
            socket_path: socket_path.to_string(),
            stream: Mutex::new(None),
        };

        // Consumers may start later; retried on publish
        if let Err(e) = publisher.connect().await {
            warn!(error = %e, "Initial IPC connection failed, will retry on publish");
        }

        Ok(publisher)
    }

    /// Connect to the Unix socket
    async fn connect(&self) -> Result<()> {
        let path = Path::new(&self.socket_path);

        if !path.exists() {
            return Err(ExchangeError::IpcError(format!(
                "Socket path does not exist: {}",
                self.socket_path
            )));
        }

        let stream = UnixStream::connect(path).await.map_err(|e| {
            ExchangeError::IpcError(format!("Failed to connect to {}: {}", self.socket_path, e))
        })?;

        let mut guard = self.stream.lock().await;
        *guard = Some(stream);

        info!(path = %self.socket_path, "Connected to IPC socket");
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    /// Publish one feed event
    ///
    /// Delivery failures are logged and never returned; only serialization
    /// errors are.
    pub async fn publish(&self, event: &FeedEvent<'_>) -> Result<()> {
        let message = encode_frame(event)?;

        let mut guard = self.stream.lock().await;

        if guard.is_none() {
            drop(guard);
            if let Err(e) = self.connect().await {
                debug!(error = %e, "Failed to reconnect to IPC socket");
                return Ok(());
            }
            guard = self.stream.lock().await;
        }

        if let Some(stream) = guard.as_mut() {
            match stream.write_all(&message).await {
                Ok(_) => {
                    debug!(bytes = message.len(), "Published feed event");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to write to IPC socket");
                    *guard = None;
                }
            }
        }

        Ok(())
    }
}
