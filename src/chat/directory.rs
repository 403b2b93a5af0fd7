use async_trait::async_trait;
use std::path::{Path, PathBuf};
use serde_json::Value;
use tracing::{debug, warn};

use super::source::ChatSource;
use super::types::{ChatSummary, Message, ViewContext, CHAT_FILE_EXTENSION};
use crate::error::{FetchError, FetchResult};

/// Chat source reading `.jsonl` chat files from a local directory.
///
/// Each line is one JSON record. Individual chats start with a metadata
/// record, which is dropped; group chats do not.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    group_chat: bool,
}

impl DirectorySource {
    /// Create a source over `dir`
    pub fn new(dir: impl Into<PathBuf>, group_chat: bool) -> Self {
        Self {
            dir: dir.into(),
            group_chat,
        }
    }

    /// The directory being read
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether files are read as group chats
    pub fn is_group_chat(&self) -> bool {
        self.group_chat
    }
}

fn io_error(path: &Path, e: std::io::Error) -> FetchError {
    FetchError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Parse JSON-lines chat content.
///
/// A line that is not valid JSON fails the whole chat. A valid record that is
/// not a message object is logged and skipped.
pub fn parse_jsonl(content: &str, has_header: bool) -> FetchResult<Vec<Message>> {
    let mut records = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    if has_header {
        records.next();
    }

    let mut messages = Vec::new();
    for (line_no, line) in records {
        let record =
            serde_json::from_str::<Value>(line).map_err(|e| FetchError::InvalidResponse {
                message: format!("Line {}: {}", line_no + 1, e),
            })?;
        match Message::from_record(record) {
            Some(message) => messages.push(message),
            None => warn!(line = line_no + 1, "Skipping chat line that is not a message"),
        }
    }
    Ok(messages)
}

#[async_trait]
impl ChatSource for DirectorySource {
    fn bind_context(&mut self, context: &ViewContext) {
        // One directory holds one character's or group's chats
        self.group_chat = context.is_group();
    }

    async fn list_chats(&self) -> FetchResult<Vec<ChatSummary>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let mut chats = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.dir, e))?
        {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.ends_with(CHAT_FILE_EXTENSION) {
                chats.push(ChatSummary::new(file_name));
            }
        }

        debug!(dir = %self.dir.display(), chats = chats.len(), "Chat files listed");
        Ok(chats)
    }

    async fn load_chat(&self, summary: &ChatSummary) -> FetchResult<Vec<Message>> {
        let path = self.dir.join(&summary.file_name);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        parse_jsonl(&content, !self.group_chat)
    }
}
