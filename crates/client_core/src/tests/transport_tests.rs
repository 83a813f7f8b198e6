use super::*;
use shared::{domain::RunId, protocol::ChatPayload};

fn chat_request() -> ClientRequest {
    ClientRequest::Chat(ChatPayload {
        run_id: RunId::new("r1"),
        message: "hi".to_string(),
    })
}

#[test]
fn reconnect_delay_doubles_up_to_cap() {
    let policy = ReconnectPolicy {
        max_attempts: Some(4),
        delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(350),
    };

    assert_eq!(policy.delay_for(1), Duration::from_millis(100));
    assert_eq!(policy.delay_for(2), Duration::from_millis(200));
    assert_eq!(policy.delay_for(3), Duration::from_millis(350));
    assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    assert!(policy.allows(4));
    assert!(!policy.allows(5));
    assert!(ReconnectPolicy::default().allows(u32::MAX));
}

#[tokio::test]
async fn memory_connection_delivers_in_both_directions() {
    let (connector, mut peer) = MemoryConnector::pair();
    let mut connection = connector.open("http://unused").expect("open");

    assert!(peer.acknowledge_connect(Some("sid-1")).await);
    assert_eq!(
        connection.recv().await,
        Some(ChannelEvent::Connected {
            sid: Some("sid-1".to_string())
        })
    );

    connection.emit(chat_request()).expect("emit");
    assert_eq!(peer.next_request().await, Some(chat_request()));
}

#[tokio::test]
async fn memory_connector_opens_once() {
    let (connector, _peer) = MemoryConnector::pair();
    let _connection = connector.open("http://unused").expect("first open");
    assert!(matches!(
        connector.open("http://unused"),
        Err(TransportError::AlreadyOpen)
    ));
}

#[tokio::test]
async fn close_is_idempotent_and_detaches_inbound() {
    let (connector, mut peer) = MemoryConnector::pair();
    let mut connection = connector.open("http://unused").expect("open");

    connection.close().await;
    connection.close().await;

    assert!(connection.is_closed());
    assert!(peer.is_detached());
    assert!(!peer.acknowledge_connect(None).await);
    assert_eq!(connection.recv().await, None);
    assert!(matches!(
        connection.emit(chat_request()),
        Err(TransportError::Closed)
    ));
    assert!(peer.drain_requests().is_empty());
}
