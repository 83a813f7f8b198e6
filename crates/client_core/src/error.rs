use shared::error::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty frame")]
    Empty,
    #[error("unknown packet type {0:?}")]
    UnknownPacketType(char),
    #[error("unsupported packet type {0:?}")]
    UnsupportedPacketType(char),
    #[error("malformed event packet: {0}")]
    MalformedEvent(&'static str),
    #[error("invalid packet json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid backend url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("backend url must start with http://, https://, ws:// or wss://: {0}")]
    UnsupportedScheme(String),
    #[error("websocket failure: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("namespace connection refused: {0}")]
    ConnectRefused(String),
    #[error("connection already opened")]
    AlreadyOpen,
    #[error("connection closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session controller is closed")]
    Closed,
    #[error(transparent)]
    Transport(#[from] TransportError),
}
