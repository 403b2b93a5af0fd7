//! Chat log input: message types and the sources that load them.
//!
//! - [`ChatClient`]: fetches chats from the chat server over HTTP
//! - [`DirectorySource`]: reads `.jsonl` chat files from disk
//! - [`collect_sessions`]: loads every chat of a source, one at a time

mod client;
mod directory;
mod source;
mod types;

pub use client::ChatClient;
pub use directory::{parse_jsonl, DirectorySource};
pub use source::{collect_sessions, ChatSource};
pub use types::*;

#[cfg(test)]
pub(crate) use source::MockChatSource;
