use std::sync::Mutex;

use shared::protocol::{ClientRequest, ServerEvent};
use tokio::sync::mpsc;

use super::{ChannelEvent, Connection, Connector};
use crate::error::TransportError;

const MEMORY_EVENT_BUFFER: usize = 64;

type PendingEnds = (
    mpsc::UnboundedSender<ClientRequest>,
    mpsc::Receiver<ChannelEvent>,
);

pub struct MemoryConnector {
    pending: Mutex<Option<PendingEnds>>,
}

impl MemoryConnector {
    pub fn pair() -> (Self, MemoryPeer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(MEMORY_EVENT_BUFFER);
        (
            Self {
                pending: Mutex::new(Some((outbound_tx, inbound_rx))),
            },
            MemoryPeer {
                inbound: inbound_tx,
                outbound: outbound_rx,
            },
        )
    }
}

impl Connector for MemoryConnector {
    fn open(&self, _backend_url: &str) -> Result<Connection, TransportError> {
        let ends = match self.pending.lock() {
            Ok(mut pending) => pending.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let (outbound, inbound) = ends.ok_or(TransportError::AlreadyOpen)?;
        Ok(Connection::new(outbound, inbound, None, None))
    }
}

pub struct MemoryPeer {
    inbound: mpsc::Sender<ChannelEvent>,
    outbound: mpsc::UnboundedReceiver<ClientRequest>,
}

impl MemoryPeer {
    pub async fn push(&self, event: ChannelEvent) -> bool {
        self.inbound.send(event).await.is_ok()
    }

    pub async fn push_server(&self, event: ServerEvent) -> bool {
        self.push(ChannelEvent::Server(event)).await
    }

    pub async fn acknowledge_connect(&self, sid: Option<&str>) -> bool {
        self.push(ChannelEvent::Connected {
            sid: sid.map(str::to_string),
        })
        .await
    }

    pub async fn next_request(&mut self) -> Option<ClientRequest> {
        self.outbound.recv().await
    }

    pub fn drain_requests(&mut self) -> Vec<ClientRequest> {
        let mut requests = Vec::new();
        while let Ok(request) = self.outbound.try_recv() {
            requests.push(request);
        }
        requests
    }

    pub fn is_detached(&self) -> bool {
        self.inbound.is_closed()
    }
}
