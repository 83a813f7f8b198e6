use std::time::Duration;

use shared::protocol::{ClientRequest, ServerEvent};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::error::TransportError;

pub mod codec;
pub mod memory;
pub mod websocket;

pub use memory::{MemoryConnector, MemoryPeer};
pub use websocket::SocketIoConnector;

const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected { sid: Option<String> },
    Disconnected { reason: String },
    Server(ServerEvent),
}

pub trait Connector: Send + Sync {
    fn open(&self, backend_url: &str) -> Result<Connection, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    pub delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl ReconnectPolicy {
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.delay.saturating_mul(factor).min(self.max_delay)
    }
}

pub struct Connection {
    outbound: Option<mpsc::UnboundedSender<ClientRequest>>,
    inbound: mpsc::Receiver<ChannelEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    driver: Option<JoinHandle<()>>,
    closed: bool,
}

impl Connection {
    pub fn new(
        outbound: mpsc::UnboundedSender<ClientRequest>,
        inbound: mpsc::Receiver<ChannelEvent>,
        shutdown: Option<oneshot::Sender<()>>,
        driver: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            outbound: Some(outbound),
            inbound,
            shutdown,
            driver,
            closed: false,
        }
    }

    pub fn emit(&self, request: ClientRequest) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        let name = request.name();
        outbound.send(request).map_err(|_| TransportError::Closed)?;
        debug!(event = name, "transport: queued outbound event");
        Ok(())
    }

    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        if self.closed {
            return None;
        }
        self.inbound.recv().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Detaches the inbound side first so nothing is delivered after this returns.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.inbound.close();
        self.outbound.take();
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(mut driver) = self.driver.take() {
            if tokio::time::timeout(CLOSE_GRACE, &mut driver).await.is_err() {
                warn!("transport: driver did not stop in time; aborting");
                driver.abort();
            }
        }
        debug!("transport: connection closed");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

#[cfg(test)]
#[path = "../tests/transport_tests.rs"]
mod tests;
