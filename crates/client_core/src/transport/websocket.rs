use std::time::Duration;

use futures::{stream::SplitSink, SinkExt, StreamExt};
use shared::protocol::{ClientRequest, ServerEvent};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot},
    time::{sleep, sleep_until, Instant},
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use super::{
    codec::{self, Handshake, Packet, ENGINE_IO_VERSION},
    ChannelEvent, Connection, Connector, ReconnectPolicy,
};
use crate::error::TransportError;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_HEARTBEAT: Duration = Duration::from_secs(300);
pub const DEFAULT_EVENT_BUFFER: usize = 256;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

pub fn socket_io_url(backend_url: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(backend_url).map_err(|source| TransportError::InvalidUrl {
        url: backend_url.to_string(),
        source,
    })?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(TransportError::UnsupportedScheme(backend_url.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|()| TransportError::UnsupportedScheme(backend_url.to_string()))?;
    url.set_path("/socket.io/");
    url.set_query(Some(&format!(
        "EIO={ENGINE_IO_VERSION}&transport=websocket"
    )));
    url.set_fragment(None);
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct SocketIoConnector {
    reconnect: ReconnectPolicy,
    event_buffer: usize,
}

impl SocketIoConnector {
    pub fn new(reconnect: ReconnectPolicy, event_buffer: usize) -> Self {
        Self {
            reconnect,
            event_buffer: event_buffer.max(1),
        }
    }
}

impl Default for SocketIoConnector {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default(), DEFAULT_EVENT_BUFFER)
    }
}

impl Connector for SocketIoConnector {
    fn open(&self, backend_url: &str) -> Result<Connection, TransportError> {
        let url = socket_io_url(backend_url)?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(self.event_buffer);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let driver = Driver {
            url,
            reconnect: self.reconnect,
            outbound: outbound_rx,
            inbound: inbound_tx,
            shutdown: shutdown_rx,
        };
        let handle = tokio::spawn(driver.run());

        Ok(Connection::new(
            outbound_tx,
            inbound_rx,
            Some(shutdown_tx),
            Some(handle),
        ))
    }
}

enum SessionEnd {
    Shutdown,
    ConsumerGone,
    Dropped { reason: String, joined: bool },
}

struct Driver {
    url: Url,
    reconnect: ReconnectPolicy,
    outbound: mpsc::UnboundedReceiver<ClientRequest>,
    inbound: mpsc::Sender<ChannelEvent>,
    shutdown: oneshot::Receiver<()>,
}

impl Driver {
    async fn run(mut self) {
        let mut attempt: u32 = 0;
        loop {
            info!(url = %self.url, attempt, "transport: connecting");
            match self.session().await {
                SessionEnd::Shutdown => {
                    debug!("transport: shut down by owner");
                    return;
                }
                SessionEnd::ConsumerGone => {
                    debug!("transport: event consumer went away");
                    return;
                }
                SessionEnd::Dropped { reason, joined } => {
                    if joined {
                        attempt = 0;
                        let event = ChannelEvent::Disconnected {
                            reason: reason.clone(),
                        };
                        if self.inbound.send(event).await.is_err() {
                            return;
                        }
                    }
                    attempt += 1;
                    if !self.reconnect.allows(attempt) {
                        warn!(%reason, "transport: reconnect attempts exhausted");
                        return;
                    }
                    let delay = self.reconnect.delay_for(attempt);
                    warn!(
                        %reason,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transport: connection lost; reconnecting"
                    );
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = &mut self.shutdown => return,
                    }
                }
            }
        }
    }

    async fn session(&mut self) -> SessionEnd {
        let connected = tokio::select! {
            result = connect_async(self.url.as_str()) => result,
            _ = &mut self.shutdown => return SessionEnd::Shutdown,
        };
        let (ws_stream, _) = match connected {
            Ok(pair) => pair,
            Err(err) => return dropped(err, false),
        };
        let (mut sink, mut stream) = ws_stream.split();

        let mut joined = false;
        let mut heartbeat = HANDSHAKE_TIMEOUT;
        let mut deadline = Instant::now() + heartbeat;

        loop {
            tokio::select! {
                _ = &mut self.shutdown => {
                    say_goodbye(&mut sink, joined).await;
                    return SessionEnd::Shutdown;
                }
                request = self.outbound.recv(), if joined => {
                    let Some(request) = request else {
                        say_goodbye(&mut sink, joined).await;
                        return SessionEnd::Shutdown;
                    };
                    let frame = match encode_request(&request) {
                        Ok(frame) => frame,
                        Err(err) => {
                            warn!(event = request.name(), %err, "transport: dropping unencodable request");
                            continue;
                        }
                    };
                    if let Err(err) = sink.send(Message::Text(frame)).await {
                        return dropped(err, joined);
                    }
                    debug!(event = request.name(), "transport: emitted event");
                }
                _ = sleep_until(deadline) => {
                    return SessionEnd::Dropped {
                        reason: "heartbeat timeout".to_string(),
                        joined,
                    };
                }
                frame = stream.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | None => {
                            return SessionEnd::Dropped {
                                reason: "websocket closed by server".to_string(),
                                joined,
                            };
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => return dropped(err, joined),
                    };
                    let packet = match codec::decode_frame(&text) {
                        Ok(packet) => packet,
                        Err(err) => {
                            warn!(%err, "transport: skipping malformed frame");
                            continue;
                        }
                    };
                    match packet {
                        Packet::Open(handshake) => {
                            heartbeat = heartbeat_window(&handshake);
                            deadline = Instant::now() + heartbeat;
                            debug!(engine_sid = %handshake.sid, "transport: engine.io handshake");
                            if let Err(err) = sink.send(Message::Text(codec::encode_connect())).await {
                                return dropped(err, joined);
                            }
                        }
                        Packet::Ping => {
                            deadline = Instant::now() + heartbeat;
                            if let Err(err) = sink.send(Message::Text(codec::encode_pong())).await {
                                return dropped(err, joined);
                            }
                        }
                        Packet::Connect { sid } => {
                            joined = true;
                            info!(sid = sid.as_deref().unwrap_or_default(), "transport: connected");
                            if self.inbound.send(ChannelEvent::Connected { sid }).await.is_err() {
                                return SessionEnd::ConsumerGone;
                            }
                        }
                        Packet::Event { name, data } => match ServerEvent::decode(&name, data) {
                            Ok(event) => {
                                if self.inbound.send(ChannelEvent::Server(event)).await.is_err() {
                                    return SessionEnd::ConsumerGone;
                                }
                            }
                            Err(err) if err.is_unknown_event() => {
                                debug!(event = %name, "transport: ignoring unknown event");
                            }
                            Err(err) => warn!(event = %name, %err, "transport: dropping undecodable event"),
                        },
                        Packet::ConnectError { message } => {
                            let err = TransportError::ConnectRefused(message.unwrap_or_default());
                            return dropped(err, joined);
                        }
                        Packet::Disconnect | Packet::Close => {
                            return SessionEnd::Dropped {
                                reason: "disconnected by server".to_string(),
                                joined,
                            };
                        }
                        Packet::Pong | Packet::Noop | Packet::Ack => {}
                    }
                }
            }
        }
    }
}

fn dropped(err: impl Into<TransportError>, joined: bool) -> SessionEnd {
    SessionEnd::Dropped {
        reason: err.into().to_string(),
        joined,
    }
}

// The server pings within interval + timeout, capped at MAX_HEARTBEAT.
fn heartbeat_window(handshake: &Handshake) -> Duration {
    Duration::from_millis(handshake.ping_interval.saturating_add(handshake.ping_timeout))
        .min(MAX_HEARTBEAT)
}

fn encode_request(request: &ClientRequest) -> Result<String, TransportError> {
    let payload = request.payload()?;
    Ok(codec::encode_event(request.name(), &payload)?)
}

async fn say_goodbye(sink: &mut WsSink, joined: bool) {
    if joined {
        let _ = sink.send(Message::Text(codec::encode_disconnect())).await;
    }
    let _ = sink.send(Message::Close(None)).await;
}

#[cfg(test)]
#[path = "../tests/websocket_tests.rs"]
mod tests;
