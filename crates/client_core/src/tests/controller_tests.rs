use std::time::Duration;

use super::*;
use crate::transport::{MemoryConnector, MemoryPeer};
use serde_json::json;
use shared::{
    domain::{Role, RunId, Stage},
    protocol::{ChatPayload, ClientRequest, ServerEvent, StartRunPayload},
};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

fn spawn_controller() -> (SessionController, MemoryPeer) {
    let (connector, peer) = MemoryConnector::pair();
    let controller =
        SessionController::spawn(&connector, &ClientSettings::default()).expect("spawn");
    (controller, peer)
}

async fn wait_until(
    controller: &SessionController,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut snapshots = controller.subscribe();
    let snapshot = timeout(WAIT, snapshots.wait_for(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("snapshot channel closed");
    snapshot.clone()
}

fn event(name: &str, data: serde_json::Value) -> ServerEvent {
    ServerEvent::decode(name, Some(data)).expect("event")
}

#[tokio::test]
async fn connect_ack_flips_connected() {
    let (controller, peer) = spawn_controller();
    assert!(!controller.snapshot().connected);

    assert!(peer.acknowledge_connect(Some("sock-1")).await);
    let snapshot = wait_until(&controller, |s| s.connected).await;
    assert_eq!(snapshot.session_sid.as_deref(), Some("sock-1"));
}

#[tokio::test]
async fn start_run_is_optimistic_and_emits_start_run() {
    let (controller, mut peer) = spawn_controller();

    controller
        .start_run("a ruby sword", Some("1.21.1".to_string()), None)
        .expect("start_run");

    let snapshot = wait_until(&controller, |s| !s.messages.is_empty()).await;
    assert_eq!(snapshot.stage, Stage::Result);
    assert!(!snapshot.awaiting_user);
    assert_eq!(snapshot.messages[0].role, Role::User);
    assert_eq!(snapshot.messages[0].text, "a ruby sword");

    let request = timeout(WAIT, peer.next_request())
        .await
        .expect("request")
        .expect("channel open");
    assert_eq!(
        request,
        ClientRequest::StartRun(StartRunPayload {
            prompt: "a ruby sword".to_string(),
            author: None,
            mc_version: Some("1.21.1".to_string()),
        })
    );
}

#[tokio::test]
async fn full_run_then_follow_up_chat() {
    let (controller, mut peer) = spawn_controller();
    controller
        .start_run("a copper golem", None, Some("Alex".to_string()))
        .expect("start_run");
    let _ = timeout(WAIT, peer.next_request()).await.expect("start_run");

    assert!(peer.push_server(event("run_started", json!({ "run_id": "r1" }))).await);
    assert!(peer.push_server(event("progress", json!({ "node": "plan" }))).await);
    assert!(
        peer.push_server(event(
            "mod_ready",
            json!({ "summary": "Done", "download_url": "/files/x.zip" })
        ))
        .await
    );

    let snapshot = wait_until(&controller, |s| s.accepts_user_turn()).await;
    assert_eq!(snapshot.run_id, Some(RunId::new("r1")));
    assert_eq!(snapshot.progress, vec!["plan".to_string()]);
    let ready = snapshot.messages.last().expect("agent message");
    assert_eq!(ready.role, Role::Agent);
    assert_eq!(
        ready.download_url.as_deref(),
        Some("http://localhost:5001/files/x.zip")
    );
    assert_eq!(
        snapshot.download_url.as_deref(),
        Some("http://localhost:5001/files/x.zip")
    );

    controller.send_chat(" add a recipe ").expect("send_chat");
    let request = timeout(WAIT, peer.next_request())
        .await
        .expect("chat request")
        .expect("channel open");
    assert_eq!(
        request,
        ClientRequest::Chat(ChatPayload {
            run_id: RunId::new("r1"),
            message: "add a recipe".to_string(),
        })
    );
    let snapshot = wait_until(&controller, |s| !s.awaiting_user).await;
    assert!(snapshot.progress.is_empty());

    assert!(
        peer.push_server(event("chat_response", json!({ "message": "All set" })))
            .await
    );
    let snapshot = wait_until(&controller, |s| s.awaiting_user).await;
    assert_eq!(snapshot.messages.last().map(|m| m.text.as_str()), Some("All set"));
}

#[tokio::test]
async fn chat_before_run_started_stays_local() {
    let (controller, mut peer) = spawn_controller();

    controller.send_chat("hello").expect("send_chat");
    let snapshot = wait_until(&controller, |s| !s.messages.is_empty()).await;
    assert_eq!(snapshot.messages[0].text, "hello");
    assert_eq!(snapshot.messages[0].role, Role::User);
    assert!(peer.drain_requests().is_empty());
}

#[tokio::test]
async fn blank_intents_are_ignored() {
    let (controller, mut peer) = spawn_controller();
    let before = controller.snapshot();

    controller.start_run("   ", None, None).expect("start_run");
    controller.send_chat("\t").expect("send_chat");
    assert!(peer.acknowledge_connect(None).await);
    let after = wait_until(&controller, |s| s.connected).await;

    assert_eq!(after.messages, before.messages);
    assert_eq!(after.stage, Stage::Prompt);
    assert!(peer.drain_requests().is_empty());
}

#[tokio::test]
async fn events_after_shutdown_are_ignored() {
    let (mut controller, peer) = spawn_controller();
    assert!(peer.acknowledge_connect(None).await);
    let before = wait_until(&controller, |s| s.connected).await;

    controller.shutdown().await;
    controller.shutdown().await;
    assert!(controller.is_closed());

    assert!(!peer.push_server(event("error", json!({ "message": "late" }))).await);
    assert!(peer.is_detached());
    assert_eq!(controller.snapshot(), before);
    assert!(matches!(
        controller.send_chat("too late"),
        Err(SessionError::Closed)
    ));
}

#[tokio::test]
async fn dropping_the_controller_detaches_the_channel() {
    let (controller, peer) = spawn_controller();
    drop(controller);

    timeout(WAIT, async {
        while !peer.is_detached() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("channel detached after drop");
}
