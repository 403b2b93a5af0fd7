//! Timeline graph construction and queries.
//!
//! Building runs in stages:
//! - [`transpose_sessions`]: sessions to per-position message lists
//! - [`group_by_content`]: messages at one position merged by text
//! - [`detect_checkpoint`] and [`extract_swipes`]: per-group annotations
//! - [`GraphBuilder`]: nodes, edges and stored swipes
//! - [`PathHighlighter`]: checkpoint paths styled back towards the root
//!
//! [`build_timeline`] runs all of them.

mod builder;
mod checkpoint;
mod color;
mod grouping;
mod highlight;
mod query;
mod swipes;
mod transpose;
mod types;

pub use builder::*;
pub use checkpoint::*;
pub use color::*;
pub use grouping::*;
pub use highlight::*;
pub use query::*;
pub use swipes::*;
pub use transpose::*;
pub use types::*;

use tracing::info;

use crate::chat::ChatSessions;
use crate::config::GraphConfig;
use crate::error::GraphResult;

/// Build the timeline graph of a set of sessions, checkpoint paths included
pub fn build_timeline(sessions: &ChatSessions, config: &GraphConfig) -> GraphResult<TimelineGraph> {
    let mut graph = GraphBuilder::new(sessions).build()?;
    let report = PathHighlighter::new(config.clone()).apply(&mut graph);
    info!(
        checkpoints = report.checkpoints,
        highlighted_edges = report.edges_tagged,
        "Checkpoint paths highlighted"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Message;
    use crate::error::GraphError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_timeline_highlights_paths() {
        let sessions: ChatSessions = vec![
            (
                "C.jsonl",
                vec![
                    Message::new("S", "m0"),
                    Message::new("S", "m1").with_bookmark_link("D"),
                ],
            ),
            ("D.jsonl", vec![Message::new("S", "m0")]),
        ]
        .into_iter()
        .collect();

        let graph = build_timeline(&sessions, &GraphConfig::default()).unwrap();
        assert_eq!(graph.edges().filter(|e| e.is_highlighted()).count(), 2);
        assert_eq!(graph.checkpoint_nodes().count(), 1);
    }

    #[test]
    fn test_build_timeline_empty() {
        let result = build_timeline(&ChatSessions::new(), &GraphConfig::default());
        assert!(matches!(result, Err(GraphError::MissingRootAnchor)));
    }
}
