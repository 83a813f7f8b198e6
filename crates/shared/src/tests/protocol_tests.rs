use super::*;
use serde_json::json;

#[test]
fn decodes_progress_with_all_fields() {
    let event = ServerEvent::decode(
        "progress",
        Some(json!({
            "type": "progress",
            "message": "Generating code",
            "node": "plan",
            "snapshot": ["node: Plan", "other"],
            "run_id": "abc123"
        })),
    )
    .expect("decode");

    let ServerEvent::Progress(payload) = event else {
        panic!("expected progress event");
    };
    assert_eq!(payload.message.as_deref(), Some("Generating code"));
    assert_eq!(payload.node.as_deref(), Some("plan"));
    assert_eq!(
        payload.snapshot,
        Some(vec!["node: Plan".to_string(), "other".to_string()])
    );
    assert_eq!(payload.run_id, Some(RunId::new("abc123")));
}

#[test]
fn wrongly_typed_fields_are_treated_as_absent() {
    let event = ServerEvent::decode(
        "progress",
        Some(json!({ "message": 42, "node": null, "snapshot": "node: x" })),
    )
    .expect("decode");

    assert_eq!(event, ServerEvent::Progress(ProgressPayload::default()));
}

#[test]
fn snapshot_keeps_only_string_entries() {
    let event = ServerEvent::decode(
        "progress",
        Some(json!({ "snapshot": [1, "node: Build", false] })),
    )
    .expect("decode");

    let ServerEvent::Progress(payload) = event else {
        panic!("expected progress event");
    };
    assert_eq!(payload.snapshot, Some(vec!["node: Build".to_string()]));
}

#[test]
fn missing_or_non_object_payload_decodes_to_defaults() {
    assert_eq!(
        ServerEvent::decode("connected", None).expect("decode"),
        ServerEvent::Connected(ConnectedPayload::default())
    );
    assert_eq!(
        ServerEvent::decode("chat_response", Some(json!("not an object"))).expect("decode"),
        ServerEvent::ChatResponse(ChatResponsePayload::default())
    );
}

#[test]
fn mod_ready_keeps_raw_summary_value() {
    let event = ServerEvent::decode(
        "mod_ready",
        Some(json!({ "summary": { "items": 2 }, "download_url": null })),
    )
    .expect("decode");

    let ServerEvent::ModReady(payload) = event else {
        panic!("expected mod_ready event");
    };
    assert_eq!(payload.summary, Some(json!({ "items": 2 })));
    assert_eq!(payload.download_url, None);
}

#[test]
fn unknown_event_names_are_rejected() {
    let err = ServerEvent::decode("disconnect", None).expect_err("unknown event");
    assert!(err.is_unknown_event());
}

#[test]
fn start_run_payload_omits_unset_optionals() {
    let request = ClientRequest::StartRun(StartRunPayload {
        prompt: "add a ruby sword".to_string(),
        author: None,
        mc_version: Some("1.21.1".to_string()),
    });

    assert_eq!(request.name(), "start_run");
    assert_eq!(
        request.payload().expect("encode"),
        json!({ "prompt": "add a ruby sword", "mc_version": "1.21.1" })
    );
}

#[test]
fn chat_payload_carries_run_id_and_message() {
    let request = ClientRequest::Chat(ChatPayload {
        run_id: RunId::new("r1"),
        message: "make it glow".to_string(),
    });

    assert_eq!(request.name(), "chat");
    assert_eq!(
        request.payload().expect("encode"),
        json!({ "run_id": "r1", "message": "make it glow" })
    );
}
