//! Integration tests for the chat server client
//!
//! Tests HTTP client behavior using wiremock for request/response mocking.

use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use chat_timelines::chat::{collect_sessions, ChatClient, ChatSource, ChatSummary};
use chat_timelines::config::{RequestConfig, SourceConfig};
use chat_timelines::error::FetchError;

/// Create a test client pointing to mock server
fn create_test_client(base_url: &str, group_chat: bool) -> ChatClient {
    let config = SourceConfig {
        base_url: base_url.to_string(),
        csrf_token: Some("test-token".to_string()),
        character_name: Some("Seraphina".to_string()),
        character_avatar: Some("Seraphina.png".to_string()),
        group_chat,
        chats_dir: None,
    };

    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries: 0, // No retries for testing
        retry_delay_ms: 10,
    };

    ChatClient::new(&config, request_config).expect("Failed to create client")
}

fn metadata() -> serde_json::Value {
    json!({"user_name": "You", "character_name": "Seraphina", "chat_metadata": {}})
}

#[cfg(test)]
mod list_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_chats_array() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/characters/chats"))
            .and(header("X-CSRF-Token", "test-token"))
            .and(body_json(json!({"avatar_url": "Seraphina.png"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"file_name": "Seraphina - 2024-01-01.jsonl", "file_size": "2 kb"},
                {"file_name": "Branch #1.jsonl"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), false);
        let chats = client.list_chats().await.unwrap();

        assert_eq!(chats.len(), 2);
        assert_eq!(chats[1], ChatSummary::new("Branch #1.jsonl"));
    }

    #[tokio::test]
    async fn test_list_chats_object() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/characters/chats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "0": {"file_name": "a.jsonl"}
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), false);
        let chats = client.list_chats().await.unwrap();
        assert_eq!(chats, vec![ChatSummary::new("a.jsonl")]);
    }

    #[tokio::test]
    async fn test_list_chats_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/characters/chats"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Invalid CSRF token"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), false);
        let result = client.list_chats().await;

        match result {
            Err(FetchError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert!(message.contains("CSRF"));
            }
            other => panic!("Expected API error, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod load_tests {
    use super::*;

    #[tokio::test]
    async fn test_load_individual_chat_strips_metadata() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chats/get"))
            .and(body_json(json!({
                "ch_name": "Seraphina",
                "file_name": "Branch #1",
                "avatar_url": "Seraphina.png"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                metadata(),
                {"name": "Seraphina", "mes": "Hello", "is_user": false},
                {"name": "You", "mes": "Hi", "is_user": true}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), false);
        let messages = client
            .load_chat(&ChatSummary::new("Branch #1.jsonl"))
            .await
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text(), Some("Hello"));
        assert!(messages[1].is_user);
    }

    #[tokio::test]
    async fn test_load_group_chat_keeps_all_records() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chats/group/get"))
            .and(body_json(json!({"id": "group-chat-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "Alice", "mes": "Hi all"},
                {"name": "Bob", "mes": "Hey"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), true);
        let messages = client
            .load_chat(&ChatSummary::new("group-chat-1"))
            .await
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].name, "Alice");
    }

    #[tokio::test]
    async fn test_load_chat_invalid_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chats/get"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), false);
        let result = client.load_chat(&ChatSummary::new("a.jsonl")).await;
        assert!(matches!(result, Err(FetchError::InvalidResponse { .. })));
    }
}

#[cfg(test)]
mod retry_tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_server_reports_unavailable() {
        let config = SourceConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            csrf_token: None,
            character_name: None,
            character_avatar: None,
            group_chat: false,
            chats_dir: None,
        };
        let request_config = RequestConfig {
            timeout_ms: 1000,
            max_retries: 1,
            retry_delay_ms: 10,
        };
        let client = ChatClient::new(&config, request_config).unwrap();

        let result = client.list_chats().await;
        match result {
            Err(FetchError::Unavailable { retries, .. }) => assert_eq!(retries, 2),
            other => panic!("Expected unavailable error, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod collect_tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_sessions_skips_failed_chat() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/characters/chats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"file_name": "a.jsonl"},
                {"file_name": "b.jsonl"}
            ])))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chats/get"))
            .and(body_json(json!({
                "ch_name": "Seraphina",
                "file_name": "b",
                "avatar_url": "Seraphina.png"
            })))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chats/get"))
            .and(body_json(json!({
                "ch_name": "Seraphina",
                "file_name": "a",
                "avatar_url": "Seraphina.png"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([metadata(), {"name": "Seraphina", "mes": "Hello"}])),
            )
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), false);
        let sessions = collect_sessions(&client).await.unwrap();

        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains("a.jsonl"));
        assert!(!sessions.contains("b.jsonl"));
    }
}
