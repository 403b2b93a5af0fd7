//! # Chat Timelines
//!
//! Turns a collection of chat sessions with one character (or group) into a
//! single timeline graph: shared conversation prefixes merge into one path,
//! divergent continuations branch off, checkpoints that spawned other chats
//! are colored along their path back to the start, and alternate generations
//! ("swipes") can be revealed next to the message they replace.
//!
//! ## Architecture
//!
//! ```text
//! ChatSource (HTTP / directory) → ChatSessions → GraphBuilder → PathHighlighter
//!                                                      ↓
//!                                  TimelineGraph (elements, queries, swipes)
//!                                                      ↓
//!                                  TimelineView (refresh, legend, orientation)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use chat_timelines::{build_timeline, chat::{collect_sessions, DirectorySource}};
//! use chat_timelines::config::GraphConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = DirectorySource::new("./chats/Seraphina", false);
//!     let sessions = collect_sessions(&source).await?;
//!     let graph = build_timeline(&sessions, &GraphConfig::default())?;
//!     println!("{}", serde_json::to_string_pretty(graph.elements())?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Chat log types and the sources they are loaded from.
pub mod chat;
/// CLI commands for inspecting a timeline.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Timeline graph construction and queries.
pub mod graph;
/// Interactive timeline view state.
pub mod view;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use graph::{build_timeline, TimelineGraph};
pub use view::{TimelineView, ViewContext};
