use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::types::{ChatSessions, ChatSummary, Message, ViewContext};
use crate::error::FetchResult;

/// Anything that can list and load the chat sessions of one character or group.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatSource: Send + Sync {
    /// Point the source at the chats of `context`
    fn bind_context(&mut self, context: &ViewContext);

    /// List the available chat files
    async fn list_chats(&self) -> FetchResult<Vec<ChatSummary>>;

    /// Load one chat's messages, metadata header already removed
    async fn load_chat(&self, summary: &ChatSummary) -> FetchResult<Vec<Message>>;
}

/// Fetch every chat of a source into an ordered session map.
///
/// Chats are loaded one at a time, in descending file name order. A chat that
/// fails to load is logged and left out; only a failing listing is an error.
pub async fn collect_sessions<S>(source: &S) -> FetchResult<ChatSessions>
where
    S: ChatSource + ?Sized,
{
    let mut chats = source.list_chats().await?;
    chats.sort_by(|a, b| b.file_name.cmp(&a.file_name));
    debug!(chats = chats.len(), "Loading chat sessions");

    let mut sessions = ChatSessions::new();
    for summary in &chats {
        match source.load_chat(summary).await {
            Ok(messages) => {
                debug!(
                    file_name = %summary.file_name,
                    messages = messages.len(),
                    "Chat session loaded"
                );
                sessions.insert(summary.file_name.clone(), messages);
            }
            Err(e) => {
                warn!(
                    file_name = %summary.file_name,
                    error = %e,
                    "Skipping chat session that failed to load"
                );
            }
        }
    }

    info!(
        listed = chats.len(),
        loaded = sessions.len(),
        "Chat sessions collected"
    );
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use mockall::predicate::function;

    #[tokio::test]
    async fn test_collect_sessions_orders_descending_and_skips_failures() {
        let mut source = MockChatSource::new();
        source.expect_list_chats().times(1).returning(|| {
            Ok(vec![
                ChatSummary::new("a.jsonl"),
                ChatSummary::new("c.jsonl"),
                ChatSummary::new("b.jsonl"),
            ])
        });
        source
            .expect_load_chat()
            .with(function(|s: &ChatSummary| s.file_name == "b.jsonl"))
            .returning(|_| {
                Err(FetchError::Api {
                    status: 500,
                    message: "boom".to_string(),
                })
            });
        source
            .expect_load_chat()
            .returning(|s| Ok(vec![Message::new("A", s.file_name.clone())]));

        let sessions = collect_sessions(&source).await.unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["c.jsonl", "a.jsonl"]);
    }

    #[tokio::test]
    async fn test_collect_sessions_propagates_listing_failure() {
        let mut source = MockChatSource::new();
        source
            .expect_list_chats()
            .returning(|| Err(FetchError::Timeout { timeout_ms: 10 }));

        let result = collect_sessions(&source).await;
        assert!(matches!(result, Err(FetchError::Timeout { .. })));
    }
}
