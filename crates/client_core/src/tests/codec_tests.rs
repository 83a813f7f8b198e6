use super::*;

#[test]
fn decodes_engine_io_open_handshake() {
    let packet = decode_frame(
        r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
    )
    .expect("decode");

    assert_eq!(
        packet,
        Packet::Open(Handshake {
            sid: "eio-1".to_string(),
            upgrades: Vec::new(),
            ping_interval: 25000,
            ping_timeout: 20000,
            max_payload: Some(1_000_000),
        })
    );
}

#[test]
fn decodes_heartbeat_and_close_packets() {
    assert_eq!(decode_frame("2").expect("ping"), Packet::Ping);
    assert_eq!(decode_frame("3").expect("pong"), Packet::Pong);
    assert_eq!(decode_frame("1").expect("close"), Packet::Close);
    assert_eq!(decode_frame("6").expect("noop"), Packet::Noop);
}

#[test]
fn decodes_namespace_connect_ack_with_and_without_sid() {
    assert_eq!(
        decode_frame(r#"40{"sid":"sock-9"}"#).expect("decode"),
        Packet::Connect {
            sid: Some("sock-9".to_string())
        }
    );
    assert_eq!(
        decode_frame("40").expect("decode"),
        Packet::Connect { sid: None }
    );
}

#[test]
fn decodes_event_with_payload() {
    let packet = decode_frame(r#"42["run_started",{"run_id":"abc"}]"#).expect("decode");

    assert_eq!(
        packet,
        Packet::Event {
            name: "run_started".to_string(),
            data: Some(serde_json::json!({ "run_id": "abc" })),
        }
    );
}

#[test]
fn decodes_event_without_payload() {
    assert_eq!(
        decode_frame(r#"42["connected"]"#).expect("decode"),
        Packet::Event {
            name: "connected".to_string(),
            data: None,
        }
    );
}

#[test]
fn tolerates_namespace_and_ack_id_prefixes() {
    assert_eq!(
        decode_frame(r#"42/admin,17["progress",{"node":"plan"}]"#).expect("decode"),
        Packet::Event {
            name: "progress".to_string(),
            data: Some(serde_json::json!({ "node": "plan" })),
        }
    );
}

#[test]
fn decodes_connect_error_message() {
    assert_eq!(
        decode_frame(r#"44{"message":"not authorized"}"#).expect("decode"),
        Packet::ConnectError {
            message: Some("not authorized".to_string())
        }
    );
}

#[test]
fn rejects_malformed_frames() {
    assert!(matches!(decode_frame(""), Err(CodecError::Empty)));
    assert!(matches!(
        decode_frame("9"),
        Err(CodecError::UnknownPacketType('9'))
    ));
    assert!(matches!(
        decode_frame(r#"42{"not":"array"}"#),
        Err(CodecError::MalformedEvent(_))
    ));
    assert!(matches!(
        decode_frame("42[7]"),
        Err(CodecError::MalformedEvent(_))
    ));
    assert!(matches!(
        decode_frame(r#"45["binary"]"#),
        Err(CodecError::UnsupportedPacketType('5'))
    ));
}

#[test]
fn encodes_client_packets() {
    assert_eq!(encode_connect(), "40");
    assert_eq!(encode_disconnect(), "41");
    assert_eq!(encode_pong(), "3");
    assert_eq!(
        encode_event("chat", &serde_json::json!({ "message": "hi" })).expect("encode"),
        r#"42["chat",{"message":"hi"}]"#
    );
}
