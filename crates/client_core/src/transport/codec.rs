use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::CodecError;

pub const ENGINE_IO_VERSION: &str = "4";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Noop,
    Connect { sid: Option<String> },
    Disconnect,
    Event { name: String, data: Option<Value> },
    Ack,
    ConnectError { message: Option<String> },
}

pub fn decode_frame(frame: &str) -> Result<Packet, CodecError> {
    let kind = frame.chars().next().ok_or(CodecError::Empty)?;
    let body = &frame[kind.len_utf8()..];
    match kind {
        '0' => Ok(Packet::Open(serde_json::from_str(body)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket_packet(body),
        '5' | '6' => Ok(Packet::Noop),
        other => Err(CodecError::UnknownPacketType(other)),
    }
}

fn decode_socket_packet(packet: &str) -> Result<Packet, CodecError> {
    let kind = packet.chars().next().ok_or(CodecError::Empty)?;
    let body = strip_ack_id(strip_namespace(&packet[kind.len_utf8()..]));
    match kind {
        '0' => Ok(Packet::Connect {
            sid: parse_optional(body)?
                .and_then(|value| value.get("sid").and_then(Value::as_str).map(str::to_string)),
        }),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(body),
        '3' => Ok(Packet::Ack),
        '4' => Ok(Packet::ConnectError {
            message: parse_optional(body)?.and_then(|value| match value {
                Value::String(message) => Some(message),
                other => other
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
        }),
        other @ ('5' | '6') => Err(CodecError::UnsupportedPacketType(other)),
        other => Err(CodecError::UnknownPacketType(other)),
    }
}

fn decode_event(body: &str) -> Result<Packet, CodecError> {
    let Value::Array(mut items) = serde_json::from_str::<Value>(body)? else {
        return Err(CodecError::MalformedEvent("event body is not an array"));
    };
    if items.is_empty() {
        return Err(CodecError::MalformedEvent("event array is empty"));
    }
    let Value::String(name) = items.remove(0) else {
        return Err(CodecError::MalformedEvent("event name is not a string"));
    };
    let data = if items.is_empty() {
        None
    } else {
        Some(items.remove(0))
    };
    Ok(Packet::Event { name, data })
}

fn strip_namespace(body: &str) -> &str {
    if !body.starts_with('/') {
        return body;
    }
    match body.find(',') {
        Some(comma) => &body[comma + 1..],
        None => "",
    }
}

fn strip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn parse_optional(body: &str) -> Result<Option<Value>, CodecError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(body)?))
}

pub fn encode_connect() -> String {
    "40".to_string()
}

pub fn encode_disconnect() -> String {
    "41".to_string()
}

pub fn encode_pong() -> String {
    "3".to_string()
}

pub fn encode_event(name: &str, data: &Value) -> Result<String, CodecError> {
    Ok(format!("42{}", serde_json::to_string(&json!([name, data]))?))
}

#[cfg(test)]
#[path = "../tests/codec_tests.rs"]
mod tests;
