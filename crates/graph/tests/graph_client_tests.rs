use httpmock::prelude::*;
use serde_json::json;

use teamlink_config::GraphConfig;
use teamlink_graph::{GraphClient, GraphError};

fn client_for(server: &MockServer) -> GraphClient {
    GraphClient::new(&GraphConfig {
        base_url: server.base_url(),
        request_timeout_seconds: 5,
    })
    .expect("client")
}

#[tokio::test]
async fn create_chat_posts_group_chat_with_owner_binding() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/chats")
            .header("authorization", "Bearer token-1")
            .body_includes("\"chatType\":\"group\"")
            .body_includes("\"topic\":\"Bug 123\"")
            .body_includes("\"roles\":[\"owner\"]")
            .body_includes("https://graph.microsoft.com/v1.0/users/owner@x.com");
        then.status(201)
            .json_body(json!({ "id": "chat-1", "topic": "Bug 123" }));
    });

    let client = client_for(&server);
    let chat = client
        .create_chat("token-1", "Bug 123", "owner@x.com")
        .await
        .expect("chat");

    assert_eq!(chat.id, "chat-1");
    assert_eq!(chat.topic.as_deref(), Some("Bug 123"));
    create.assert();
}

#[tokio::test]
async fn create_chat_surfaces_status_and_body_on_rejection() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chats");
        then.status(403)
            .json_body(json!({ "error": { "code": "Forbidden" } }));
    });

    let client = client_for(&server);
    let error = client
        .create_chat("token-1", "Bug 123", "owner@x.com")
        .await
        .expect_err("rejection");

    match error {
        GraphError::Status {
            operation,
            status,
            body,
        } => {
            assert_eq!(operation, "create_chat");
            assert_eq!(status, 403);
            assert!(body.contains("Forbidden"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn add_member_accepts_200_and_sends_full_history_visibility() {
    let server = MockServer::start();
    let add = server.mock(|when, then| {
        when.method(POST)
            .path("/chats/chat-1/members")
            .body_includes("\"roles\":[\"guest\"]")
            .body_includes("\"visibleHistoryStartDateTime\":\"0001-01-01T00:00:00Z\"")
            .body_includes("https://graph.microsoft.com/beta/users/bob@x.com");
        then.status(200)
            .json_body(json!({ "id": "member-1", "email": "bob@x.com" }));
    });

    let client = client_for(&server);
    let member = client
        .add_member("token-1", "chat-1", "bob@x.com")
        .await
        .expect("member");

    assert_eq!(member.email.as_deref(), Some("bob@x.com"));
    add.assert();
}

#[tokio::test]
async fn list_chats_and_members_parse_odata_collections() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/chats");
        then.status(200).json_body(json!({
            "value": [
                { "id": "chat-1", "topic": "Bug 123" },
                { "id": "chat-2" }
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/chats/chat-1/members");
        then.status(200).json_body(json!({
            "value": [
                { "id": "m1", "displayName": "Owner", "email": "owner@x.com" }
            ]
        }));
    });

    let client = client_for(&server);
    let chats = client.list_chats("token-1").await.expect("chats");
    assert_eq!(chats.value.len(), 2);
    assert_eq!(chats.value[0].id, "chat-1");
    assert!(chats.value[1].topic.is_none());

    let members = client
        .list_members("token-1", "chat-1")
        .await
        .expect("members");
    assert_eq!(members.value.len(), 1);
    assert_eq!(members.value[0].display_name.as_deref(), Some("Owner"));
}

#[tokio::test]
async fn send_pinned_link_posts_anchor_then_pins_message() {
    let server = MockServer::start();
    let send = server.mock(|when, then| {
        when.method(POST)
            .path("/chats/chat-1/messages")
            .body_includes("<a href='http://x/123'>BUG-123</a>");
        then.status(201).json_body(json!({ "id": "msg-1" }));
    });
    let pin = server.mock(|when, then| {
        when.method(POST).path("/chats/chat-1/messages/msg-1/pin");
        then.status(204);
    });

    let client = client_for(&server);
    client
        .send_pinned_link("token-1", "chat-1", "http://x/123", "BUG-123")
        .await
        .expect("pinned");

    send.assert();
    pin.assert();
}

#[tokio::test]
async fn pin_failure_after_successful_send_is_an_error() {
    let server = MockServer::start();
    let send = server.mock(|when, then| {
        when.method(POST).path("/chats/chat-1/messages");
        then.status(201).json_body(json!({ "id": "msg-1" }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/chats/chat-1/messages/msg-1/pin");
        then.status(500).body("pin exploded");
    });

    let client = client_for(&server);
    let error = client
        .send_pinned_link("token-1", "chat-1", "http://x/123", "BUG-123")
        .await
        .expect_err("pin failure");

    assert!(matches!(
        error,
        GraphError::Status {
            operation: "pin_message",
            status: 500,
            ..
        }
    ));
    // The message itself went out; there is no rollback.
    assert_eq!(send.calls(), 1);
}

#[tokio::test]
async fn send_greeting_templates_assignee_and_title() {
    let server = MockServer::start();
    let send = server.mock(|when, then| {
        when.method(POST)
            .path("/chats/chat-1/messages")
            .body_includes("Hello Alice,")
            .body_includes("Please take a look at Bug 123.");
        then.status(201).json_body(json!({ "id": "msg-2" }));
    });

    let client = client_for(&server);
    client
        .send_greeting(
            "token-1",
            "chat-1",
            "Bug 123",
            Some("Alice"),
            Some("alice@x.com"),
        )
        .await
        .expect("greeting");

    send.assert();
}
