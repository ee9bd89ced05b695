//! `PollingTransport` against a mock Socket.IO endpoint

use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use sustainafood_chat::client::transport::Transport;
use sustainafood_chat::client::{Config, Credentials, PollingTransport};
use sustainafood_chat::shared::config::AppConfig;
use sustainafood_chat::shared::error::ChatError;
use sustainafood_chat::shared::event::{ConnectionEvent, InboundEvent, OutboundEvent};
use sustainafood_chat::shared::messaging::UserId;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{chat, ALICE, BOB};

const SOCKET_PATH: &str = "/socket.io/";
const OPEN_PACKET: &str =
    r#"0{"sid":"s1","upgrades":["websocket"],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

fn credentials() -> Credentials {
    Credentials::new(ALICE).with_token("jwt-123")
}

fn transport_for(server: &MockServer) -> PollingTransport {
    let app = AppConfig::builder().server_url(server.uri()).build().unwrap();
    PollingTransport::new(Config::new(app, credentials()))
}

/// Handshake plus a POST endpoint that accepts everything
async fn mount_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(SOCKET_PATH))
        .and(query_param("EIO", "4"))
        .and(query_param("transport", "polling"))
        .and(query_param_is_missing("sid"))
        .respond_with(ResponseTemplate::new(200).set_body_string(OPEN_PACKET))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(SOCKET_PATH))
        .and(query_param("sid", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(server)
        .await;
}

/// Queue one poll answer; earlier-mounted answers are served first
async fn mount_poll(server: &MockServer, priority: u8, body: &str) {
    Mock::given(method("GET"))
        .and(path(SOCKET_PATH))
        .and(query_param("sid", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .up_to_n_times(1)
        .with_priority(priority)
        .mount(server)
        .await;
}

/// Long poll that holds the request open
async fn mount_idle_poll(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(SOCKET_PATH))
        .and(query_param("sid", "s1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("6")
                .set_delay(Duration::from_secs(30)),
        )
        .with_priority(10)
        .mount(server)
        .await;
}

async fn wait_for_post(server: &MockServer, body: &str) -> bool {
    for _ in 0..150 {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests
            .iter()
            .any(|r| r.method.as_str() == "POST" && String::from_utf8_lossy(&r.body) == body)
        {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_connect_receives_events_and_answers_ping() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_poll(&server, 1, r#"40{"sid":"ns1"}"#).await;
    mount_poll(&server, 2, "2\u{1e}42[\"typing\",{\"userId\":\"bob\"}]").await;
    mount_idle_poll(&server).await;

    let mut connection = transport_for(&server).connect(&credentials()).await.unwrap();

    // Namespace connect carried the auth object
    assert!(wait_for_post(&server, r#"40{"token":"jwt-123","userId":"alice"}"#).await);

    let event = tokio::time::timeout(Duration::from_secs(5), connection.recv())
        .await
        .unwrap();
    assert_eq!(
        event,
        Some(ConnectionEvent::Inbound(InboundEvent::Typing {
            user_id: UserId::from(BOB)
        }))
    );
    assert!(wait_for_post(&server, "3").await, "ping was not answered");

    connection
        .emit(OutboundEvent::JoinChat {
            chat_id: chat(ALICE, BOB),
        })
        .unwrap();
    assert!(wait_for_post(&server, r#"42["joinChat","alice_bob"]"#).await);

    connection.close();
    assert!(wait_for_post(&server, "41\u{1e}1").await, "disconnect was not sent");
}

#[tokio::test]
async fn test_events_after_connect_ack_in_same_payload_are_kept() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_poll(
        &server,
        1,
        "40{\"sid\":\"ns1\"}\u{1e}42[\"stopTyping\",{\"userId\":\"bob\"}]",
    )
    .await;
    mount_idle_poll(&server).await;

    let mut connection = transport_for(&server).connect(&credentials()).await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(5), connection.recv())
        .await
        .unwrap();
    assert_eq!(
        event,
        Some(ConnectionEvent::Inbound(InboundEvent::StopTyping {
            user_id: UserId::from(BOB)
        }))
    );
}

#[tokio::test]
async fn test_server_disconnect_closes_connection() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_poll(&server, 1, r#"40{"sid":"ns1"}"#).await;
    mount_poll(&server, 2, "41").await;
    mount_idle_poll(&server).await;

    let mut connection = transport_for(&server).connect(&credentials()).await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(5), connection.recv())
        .await
        .unwrap();
    assert_matches!(event, Some(ConnectionEvent::Closed { reason: Some(_) }));
    assert_eq!(connection.recv().await, None);
}

#[tokio::test]
async fn test_refused_namespace_connect() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_poll(&server, 1, r#"44{"message":"Not authorized"}"#).await;

    let err = transport_for(&server).connect(&credentials()).await.unwrap_err();
    assert_eq!(err, ChatError::connection("Not authorized"));
}

#[tokio::test]
async fn test_failed_handshake() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SOCKET_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("Bad request"))
        .mount(&server)
        .await;

    let err = transport_for(&server).connect(&credentials()).await.unwrap_err();
    assert_matches!(err, ChatError::Connection(_));
}

#[tokio::test]
async fn test_unknown_packet_in_poll_keeps_connection_alive() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_poll(&server, 1, r#"40{"sid":"ns1"}"#).await;
    mount_poll(&server, 2, "9garbage\u{1e}42[\"typing\",{\"userId\":\"bob\"}]").await;
    mount_idle_poll(&server).await;

    let mut connection = transport_for(&server).connect(&credentials()).await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(5), connection.recv())
        .await
        .unwrap();
    assert_eq!(
        event,
        Some(ConnectionEvent::Inbound(InboundEvent::Typing {
            user_id: UserId::from(BOB)
        }))
    );
    assert!(!connection.is_closed());
}
