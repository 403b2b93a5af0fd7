use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{FetchError, FetchResult};

/// File extension carried by chat session ids
pub const CHAT_FILE_EXTENSION: &str = ".jsonl";

/// One record of a chat log, in the field naming used by the chat files.
///
/// Deserialization is lenient: a non-string `mes` becomes `None` (the graph
/// builder skips such messages), flags follow JSON truthiness, numeric names,
/// dates and links are stringified and non-string swipe entries are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Raw message text
    #[serde(default, deserialize_with = "lenient_text")]
    pub mes: Option<String>,
    /// Sender display name
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Sent by the end user
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_user: bool,
    /// System notice rather than a chat turn
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_system: bool,
    /// Timestamp, kept as the opaque string the chat file stores
    #[serde(default, deserialize_with = "lenient_string")]
    pub send_date: String,
    /// Extra metadata, possibly carrying a checkpoint link
    #[serde(
        default,
        deserialize_with = "lenient_extra",
        skip_serializing_if = "Option::is_none"
    )]
    pub extra: Option<MessageExtra>,
    /// Alternate generations for this message
    #[serde(
        default,
        deserialize_with = "lenient_swipes",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub swipes: Vec<String>,
}

/// The subset of message metadata the timeline cares about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageExtra {
    /// Name of the chat this message branches into
    #[serde(
        default,
        deserialize_with = "lenient_link",
        skip_serializing_if = "Option::is_none"
    )]
    pub bookmark_link: Option<String>,
}

impl Message {
    /// Create a character (non-user) message
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            mes: Some(text.into()),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a user message
    pub fn user(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            is_user: true,
            ..Self::new(name, text)
        }
    }

    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            is_system: true,
            ..Self::new("System", text)
        }
    }

    /// Set the timestamp
    pub fn with_send_date(mut self, send_date: impl Into<String>) -> Self {
        self.send_date = send_date.into();
        self
    }

    /// Set the checkpoint link
    pub fn with_bookmark_link(mut self, link: impl Into<String>) -> Self {
        self.extra = Some(MessageExtra {
            bookmark_link: Some(link.into()),
        });
        self
    }

    /// Set the alternate generations
    pub fn with_swipes<I, S>(mut self, swipes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.swipes = swipes.into_iter().map(Into::into).collect();
        self
    }

    /// Decode one raw chat record. Only non-object records are rejected.
    pub fn from_record(record: Value) -> Option<Self> {
        match record {
            Value::Object(_) => serde_json::from_value(record).ok(),
            _ => None,
        }
    }

    /// Message text, if it was a string in the source record
    pub fn text(&self) -> Option<&str> {
        self.mes.as_deref()
    }

    /// Non-empty checkpoint link, if any
    pub fn bookmark_link(&self) -> Option<&str> {
        self.extra
            .as_ref()
            .and_then(|e| e.bookmark_link.as_deref())
            .filter(|link| !link.is_empty())
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn lenient_link<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_extra<'de, D>(deserializer: D) -> Result<Option<MessageExtra>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

fn lenient_swipes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Identifies whose chats a source loads
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewContext {
    /// An individual character, by avatar
    Character(String),
    /// A group chat, by group id
    Group(String),
}

impl ViewContext {
    /// Whether the context is a group chat
    pub fn is_group(&self) -> bool {
        matches!(self, ViewContext::Group(_))
    }
}

/// A chat file listed by the chat source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    /// Chat file name, used as the session id
    pub file_name: String,
}

impl ChatSummary {
    /// Create a summary for the given file name
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Chat name without the file extension
    pub fn chat_name(&self) -> &str {
        strip_chat_extension(&self.file_name)
    }
}

/// Parse a chat listing, which servers return either as an array or as an
/// object keyed by index.
pub fn parse_chat_list(value: Value) -> FetchResult<Vec<ChatSummary>> {
    let entries = match value {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        Value::Null => Vec::new(),
        other => {
            return Err(FetchError::InvalidResponse {
                message: format!("Chat list is neither an array nor an object: {}", other),
            })
        }
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<ChatSummary>(entry).ok())
        .collect())
}

/// Remove the chat file extension from a session id, for display and navigation
pub fn strip_chat_extension(name: &str) -> &str {
    name.strip_suffix(CHAT_FILE_EXTENSION).unwrap_or(name)
}

/// One loaded chat session
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    /// Session id (chat file name)
    pub id: String,
    /// Messages in chat order, metadata header already removed
    pub messages: Vec<Message>,
}

/// Ordered collection of chat sessions, keyed by session id.
///
/// Insertion order is kept: it decides which session is seen first at every
/// position and therefore the display tie-break order of the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSessions {
    sessions: Vec<ChatSession>,
}

impl ChatSessions {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session, replacing the messages of an existing session with the same id
    pub fn insert(&mut self, id: impl Into<String>, messages: Vec<Message>) {
        let id = id.into();
        match self.sessions.iter_mut().find(|s| s.id == id) {
            Some(existing) => existing.messages = messages,
            None => self.sessions.push(ChatSession { id, messages }),
        }
    }

    /// Look up a session by id
    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Whether a session with exactly this id exists
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Whether a chat name (with or without extension) refers to a known session
    pub fn has_chat(&self, name: &str) -> bool {
        self.contains(name) || self.contains(&format!("{}{}", name, CHAT_FILE_EXTENSION))
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether there are no sessions
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Iterate over sessions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ChatSession> {
        self.sessions.iter()
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<Message>)> for ChatSessions {
    fn from_iter<I: IntoIterator<Item = (S, Vec<Message>)>>(iter: I) -> Self {
        let mut sessions = ChatSessions::new();
        for (id, messages) in iter {
            sessions.insert(id, messages);
        }
        sessions
    }
}
