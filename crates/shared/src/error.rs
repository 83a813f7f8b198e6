use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("invalid payload for {event}: {source}")]
    InvalidPayload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {event}: {source}")]
    Encode {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    pub fn is_unknown_event(&self) -> bool {
        matches!(self, Self::UnknownEvent(_))
    }
}
