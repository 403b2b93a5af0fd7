use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::source::ChatSource;
use super::types::{parse_chat_list, ChatSummary, Message, ViewContext};
use crate::config::{RequestConfig, SourceConfig};
use crate::error::{FetchError, FetchResult};

/// Client for the chat server's chat-log endpoints
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    csrf_token: Option<String>,
    character_name: String,
    character_avatar: String,
    group_chat: bool,
    request_config: RequestConfig,
}

impl ChatClient {
    /// Create a new chat client
    pub fn new(config: &SourceConfig, request_config: RequestConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(FetchError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            csrf_token: config.csrf_token.clone(),
            character_name: config.character_name.clone().unwrap_or_default(),
            character_avatar: config.character_avatar.clone().unwrap_or_default(),
            group_chat: config.group_chat,
            request_config,
        })
    }

    /// POST a JSON body with retries and exponential backoff
    async fn post_json(&self, endpoint: &str, body: &Value) -> FetchResult<Value> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = backoff_delay(self.request_config.retry_delay_ms, retries);
                warn!(
                    endpoint = %endpoint,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying chat request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, body).await {
                Ok(value) => {
                    debug!(
                        endpoint = %endpoint,
                        latency_ms = start.elapsed().as_millis(),
                        "Chat request succeeded"
                    );
                    return Ok(value);
                }
                // Server-side rejections and bad bodies are not retried
                Err(e @ FetchError::Api { .. }) | Err(e @ FetchError::InvalidResponse { .. }) => {
                    return Err(e);
                }
                Err(e) => {
                    error!(
                        endpoint = %endpoint,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Chat request failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(FetchError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    /// Execute a single request (internal)
    async fn execute_request(&self, url: &str, body: &Value) -> FetchResult<Value> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(ref token) = self.csrf_token {
            request = request.header("X-CSRF-Token", token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    timeout_ms: self.request_config.timeout_ms,
                }
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Avatar of the character whose chats are fetched
    pub fn character_avatar(&self) -> &str {
        &self.character_avatar
    }

    /// Display name sent when loading individual chats
    pub fn character_name(&self) -> &str {
        &self.character_name
    }
}

/// Delay before retry number `retry` (1-based), doubling each time
fn backoff_delay(base_ms: u64, retry: u32) -> Duration {
    let factor = 2_u64.checked_pow(retry.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Decode a chat body: an array of records, the first one being chat
/// metadata unless `has_header` is false.
fn decode_chat(value: Value, has_header: bool) -> FetchResult<Vec<Message>> {
    let Value::Array(mut records) = value else {
        return Err(FetchError::InvalidResponse {
            message: "Chat body is not an array".to_string(),
        });
    };
    if has_header && !records.is_empty() {
        records.remove(0);
    }

    Ok(records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let message = Message::from_record(record);
            if message.is_none() {
                warn!(record = index, "Skipping chat record that is not a message");
            }
            message
        })
        .collect())
}

#[async_trait]
impl ChatSource for ChatClient {
    fn bind_context(&mut self, context: &ViewContext) {
        match context {
            ViewContext::Character(avatar) => {
                if *avatar != self.character_avatar {
                    // Character avatars are named after the character
                    self.character_name = Path::new(avatar)
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                        .unwrap_or_else(|| avatar.clone());
                    self.character_avatar = avatar.clone();
                }
                self.group_chat = false;
            }
            ViewContext::Group(_) => self.group_chat = true,
        }
    }

    async fn list_chats(&self) -> FetchResult<Vec<ChatSummary>> {
        let body = json!({ "avatar_url": self.character_avatar });
        let value = self.post_json("/api/characters/chats", &body).await?;
        let chats = parse_chat_list(value)?;
        info!(
            avatar = %self.character_avatar,
            chats = chats.len(),
            "Chat list fetched"
        );
        Ok(chats)
    }

    async fn load_chat(&self, summary: &ChatSummary) -> FetchResult<Vec<Message>> {
        let (endpoint, body) = if self.group_chat {
            ("/api/chats/group/get", json!({ "id": summary.file_name }))
        } else {
            (
                "/api/chats/get",
                json!({
                    "ch_name": self.character_name,
                    "file_name": summary.chat_name(),
                    "avatar_url": self.character_avatar,
                }),
            )
        };

        let value = self.post_json(endpoint, &body).await?;
        decode_chat(value, !self.group_chat)
    }
}
