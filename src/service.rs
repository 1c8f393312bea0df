//! Exchange service
//!
//! A single task owns the engine and the client ledger and applies commands
//! one at a time, so matching and settlement never interleave.

use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clients::{Client, ClientManager};
use crate::error::{ExchangeError, Result};
use crate::matching::Engine;
use crate::messages::{MatchOutcome, ObUpdate, Order, Side};
use crate::orderbook::OrderBookState;
use crate::telemetry::Metrics;

/// Commands processed by the exchange task
#[derive(Debug)]
pub enum Command {
    Submit {
        order: Order,
        response: oneshot::Sender<Result<MatchOutcome>>,
    },
    Cancel {
        client_id: String,
        side: Side,
        ticker: String,
        price: Decimal,
        response: oneshot::Sender<Option<ObUpdate>>,
    },
    AddClients {
        ids: Vec<String>,
        response: oneshot::Sender<Result<usize>>,
    },
    SetActive {
        client_id: String,
        active: bool,
        response: oneshot::Sender<bool>,
    },
    Capital {
        client_id: String,
        response: oneshot::Sender<Decimal>,
    },
    Holdings {
        client_id: String,
        ticker: String,
        response: oneshot::Sender<Decimal>,
    },
    ModifyCapital {
        client_id: String,
        change: Decimal,
        response: oneshot::Sender<Decimal>,
    },
    ModifyHoldings {
        client_id: String,
        ticker: String,
        change: Decimal,
        response: oneshot::Sender<Decimal>,
    },
    Clients {
        active: bool,
        response: oneshot::Sender<Vec<Client>>,
    },
    Results {
        response: oneshot::Sender<Vec<(String, Decimal)>>,
    },
    BookState {
        ticker: String,
        response: oneshot::Sender<Option<OrderBookState>>,
    },
    Shutdown,
}

/// Cloneable handle used to talk to the exchange task
#[derive(Clone)]
pub struct ExchangeHandle {
    sender: mpsc::Sender<Command>,
}

impl ExchangeHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| ExchangeError::ServiceUnavailable)?;
        rx.await.map_err(|_| ExchangeError::ServiceUnavailable)
    }

    /// Submit one order and wait for its trades and book updates
    pub async fn submit(&self, order: Order) -> Result<MatchOutcome> {
        self.request(|response| Command::Submit { order, response })
            .await?
    }

    pub async fn cancel(
        &self,
        client_id: &str,
        side: Side,
        ticker: &str,
        price: Decimal,
    ) -> Result<Option<ObUpdate>> {
        self.request(|response| Command::Cancel {
            client_id: client_id.to_string(),
            side,
            ticker: ticker.to_string(),
            price,
            response,
        })
        .await
    }

    /// Register clients; returns how many were new
    pub async fn add_clients(&self, ids: Vec<String>) -> Result<usize> {
        self.request(|response| Command::AddClients { ids, response })
            .await?
    }

    pub async fn set_active(&self, client_id: &str, active: bool) -> Result<bool> {
        self.request(|response| Command::SetActive {
            client_id: client_id.to_string(),
            active,
            response,
        })
        .await
    }

    pub async fn capital(&self, client_id: &str) -> Result<Decimal> {
        self.request(|response| Command::Capital {
            client_id: client_id.to_string(),
            response,
        })
        .await
    }

    pub async fn holdings(&self, client_id: &str, ticker: &str) -> Result<Decimal> {
        self.request(|response| Command::Holdings {
            client_id: client_id.to_string(),
            ticker: ticker.to_string(),
            response,
        })
        .await
    }

    pub async fn modify_capital(&self, client_id: &str, change: Decimal) -> Result<Decimal> {
        self.request(|response| Command::ModifyCapital {
            client_id: client_id.to_string(),
            change,
            response,
        })
        .await
    }

    pub async fn modify_holdings(
        &self,
        client_id: &str,
        ticker: &str,
        change: Decimal,
    ) -> Result<Decimal> {
        self.request(|response| Command::ModifyHoldings {
            client_id: client_id.to_string(),
            ticker: ticker.to_string(),
            change,
            response,
        })
        .await
    }

    pub async fn clients(&self, active: bool) -> Result<Vec<Client>> {
        self.request(|response| Command::Clients { active, response })
            .await
    }

    pub async fn results(&self) -> Result<Vec<(String, Decimal)>> {
        self.request(|response| Command::Results { response }).await
    }

    pub async fn book_state(&self, ticker: &str) -> Result<Option<OrderBookState>> {
        self.request(|response| Command::BookState {
            ticker: ticker.to_string(),
            response,
        })
        .await
    }

    /// Ask the task to stop after the commands already queued
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(Command::Shutdown)
            .await
            .map_err(|_| ExchangeError::ServiceUnavailable)
    }
}

/// Owner of all matching and ledger state
pub struct ExchangeService {
    engine: Engine,
    clients: ClientManager,
    metrics: Metrics,
    receiver: mpsc::Receiver<Command>,
}

impl ExchangeService {
    /// Start the service task and return its handle
    pub fn spawn(
        engine: Engine,
        clients: ClientManager,
        metrics: Metrics,
        buffer: usize,
    ) -> (ExchangeHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let service = Self {
            engine,
            clients,
            metrics,
            receiver,
        };
        let task = tokio::spawn(service.run());
        (ExchangeHandle { sender }, task)
    }

    async fn run(mut self) {
        info!(clients = self.clients.len(), "Exchange service started");
        while let Some(cmd) = self.receiver.recv().await {
            if !self.process_command(cmd) {
                break;
            }
        }
        info!("Exchange service stopped");
    }

    /// Apply a single command; returns false on shutdown
    fn process_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Submit { order, response } => {
                let _ = response.send(self.handle_submit(order));
            }
            Command::Cancel {
                client_id,
                side,
                ticker,
                price,
                response,
            } => {
                let update = self.engine.cancel_order(&client_id, side, &ticker, price);
                if update.is_some() {
                    self.metrics.orders_cancelled.inc();
                }
                let _ = response.send(update);
            }
            Command::AddClients { ids, response } => {
                let result: Result<usize> = ids.iter().try_fold(0, |added, id| {
                    Ok(added + usize::from(self.clients.add_client(id)?))
                });
                let _ = response.send(result);
            }
            Command::SetActive {
                client_id,
                active,
                response,
            } => {
                let _ = response.send(self.clients.set_client_active(&client_id, active));
            }
            Command::Capital {
                client_id,
                response,
            } => {
                let _ = response.send(self.clients.get_capital(&client_id));
            }
            Command::Holdings {
                client_id,
                ticker,
                response,
            } => {
                let _ = response.send(self.clients.get_holdings(&client_id, &ticker));
            }
            Command::ModifyCapital {
                client_id,
                change,
                response,
            } => {
                let _ = response.send(self.clients.modify_capital(&client_id, change));
            }
            Command::ModifyHoldings {
                client_id,
                ticker,
                change,
                response,
            } => {
                let _ = response.send(self.clients.modify_holdings(&client_id, &ticker, change));
            }
            Command::Clients { active, response } => {
                let _ = response.send(self.clients.get_clients(active));
            }
            Command::Results { response } => {
                let _ = response.send(self.clients.results());
            }
            Command::BookState { ticker, response } => {
                let _ = response.send(self.engine.book_state(&ticker));
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn handle_submit(&mut self, order: Order) -> Result<MatchOutcome> {
        self.metrics.orders_received.inc();

        match self.engine.match_order(&order, &mut self.clients) {
            Ok(outcome) => {
                self.metrics
                    .trades_executed
                    .inc_by(outcome.trades.len() as u64);
                if outcome.rejection.is_some() {
                    self.metrics.ledger_rejections.inc();
                }
                debug!(
                    client = %order.client_id,
                    ticker = %order.ticker,
                    trades = outcome.trades.len(),
                    updates = outcome.ob_updates.len(),
                    "Order processed"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.metrics.orders_rejected.inc();
                warn!(client = %order.client_id, error = %e, "Order rejected");
                Err(e)
            }
        }
    }
}
