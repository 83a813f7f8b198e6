use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{domain::RunId, error::ProtocolError};

pub mod event_names {
    pub const CONNECTED: &str = "connected";
    pub const ERROR: &str = "error";
    pub const RUN_STARTED: &str = "run_started";
    pub const PROGRESS: &str = "progress";
    pub const MOD_READY: &str = "mod_ready";
    pub const CHAT_RESPONSE: &str = "chat_response";

    pub const START_RUN: &str = "start_run";
    pub const CHAT: &str = "chat";
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConnectedPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub sid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_run_id")]
    pub run_id: Option<RunId>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RunStartedPayload {
    #[serde(default, deserialize_with = "lenient_run_id")]
    pub run_id: Option<RunId>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProgressPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub node: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub snapshot: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_run_id")]
    pub run_id: Option<RunId>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModReadyPayload {
    /// Usually a string, but any JSON value is accepted and rendered as text.
    #[serde(default)]
    pub summary: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub download_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_run_id")]
    pub run_id: Option<RunId>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatResponsePayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_run_id")]
    pub run_id: Option<RunId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connected(ConnectedPayload),
    Error(ErrorPayload),
    RunStarted(RunStartedPayload),
    Progress(ProgressPayload),
    ModReady(ModReadyPayload),
    ChatResponse(ChatResponsePayload),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => event_names::CONNECTED,
            Self::Error(_) => event_names::ERROR,
            Self::RunStarted(_) => event_names::RUN_STARTED,
            Self::Progress(_) => event_names::PROGRESS,
            Self::ModReady(_) => event_names::MOD_READY,
            Self::ChatResponse(_) => event_names::CHAT_RESPONSE,
        }
    }

    pub fn decode(name: &str, data: Option<Value>) -> Result<Self, ProtocolError> {
        let data = data.unwrap_or(Value::Null);
        let event = match name {
            event_names::CONNECTED => Self::Connected(payload(event_names::CONNECTED, data)?),
            event_names::ERROR => Self::Error(payload(event_names::ERROR, data)?),
            event_names::RUN_STARTED => {
                Self::RunStarted(payload(event_names::RUN_STARTED, data)?)
            }
            event_names::PROGRESS => Self::Progress(payload(event_names::PROGRESS, data)?),
            event_names::MOD_READY => Self::ModReady(payload(event_names::MOD_READY, data)?),
            event_names::CHAT_RESPONSE => {
                Self::ChatResponse(payload(event_names::CHAT_RESPONSE, data)?)
            }
            other => return Err(ProtocolError::UnknownEvent(other.to_string())),
        };
        Ok(event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartRunPayload {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mc_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPayload {
    pub run_id: RunId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    StartRun(StartRunPayload),
    Chat(ChatPayload),
}

impl ClientRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartRun(_) => event_names::START_RUN,
            Self::Chat(_) => event_names::CHAT,
        }
    }

    pub fn payload(&self) -> Result<Value, ProtocolError> {
        let encoded = match self {
            Self::StartRun(payload) => serde_json::to_value(payload),
            Self::Chat(payload) => serde_json::to_value(payload),
        };
        encoded.map_err(|source| ProtocolError::Encode {
            event: self.name(),
            source,
        })
    }
}

fn payload<P>(event: &'static str, data: Value) -> Result<P, ProtocolError>
where
    P: DeserializeOwned + Default,
{
    if !data.is_object() {
        return Ok(P::default());
    }
    serde_json::from_value(data).map_err(|source| ProtocolError::InvalidPayload { event, source })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(value)) => Some(value),
        _ => None,
    })
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(value) => Some(value),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

fn lenient_run_id<'de, D>(deserializer: D) -> Result<Option<RunId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.map(RunId))
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
