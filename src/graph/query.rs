//! Read-only queries over a built timeline graph: depth, text search,
//! legend and selection, navigation targets.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::types::{GraphNode, NodeKind, TimelineGraph};
use crate::chat::strip_chat_extension;
use crate::error::{GraphError, GraphResult};

/// How a search query is matched against node text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Every whitespace-separated fragment must occur, case-insensitively
    #[default]
    Fragments,
    /// The whole query must occur as one piece, case-insensitively
    Substring,
}

impl SearchMode {
    /// Get the mode name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Fragments => "fragments",
            SearchMode::Substring => "substring",
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fragments" => Ok(SearchMode::Fragments),
            "substring" => Ok(SearchMode::Substring),
            _ => Err(format!("Unknown search mode: {}", s)),
        }
    }
}

/// Split a query into distinct whitespace-separated fragments
pub fn query_fragments(query: &str, lowercase: bool) -> Vec<String> {
    let mut fragments: Vec<String> = Vec::new();
    for word in query.split_whitespace() {
        let word = if lowercase {
            word.to_lowercase()
        } else {
            word.to_string()
        };
        if !fragments.contains(&word) {
            fragments.push(word);
        }
    }
    fragments
}

/// A legend entry for one highlighted checkpoint path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathLegendEntry {
    pub color: String,
    pub checkpoint_name: Option<String>,
}

/// Distinct speakers and checkpoint paths of a graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Legend {
    pub speakers: Vec<String>,
    pub paths: Vec<PathLegendEntry>,
}

/// What a legend entry selects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LegendSelector {
    /// Nodes sent by this speaker
    Speaker(String),
    /// Edges and nodes of the path drawn in this color
    Path(String),
}

/// Element ids picked out by a legend selector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub node_ids: Vec<String>,
    pub edge_ids: Vec<String>,
}

impl Selection {
    /// Whether nothing was selected
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty() && self.edge_ids.is_empty()
    }
}

/// Where activating a node leads in the chat application
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationTarget {
    pub session_id: String,
    /// Session id without the chat file extension
    pub chat_name: String,
    /// Message index inside the session
    pub message_id: usize,
    /// Alternate generation to select, for swipe nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swipe_index: Option<usize>,
    pub is_last_message: bool,
}

impl NavigationTarget {
    /// A swipe can only be selected in place on the session's final message
    pub fn swipe_in_place(&self) -> bool {
        self.swipe_index.is_some() && self.is_last_message
    }
}

impl TimelineGraph {
    /// Number of first-incoming-edge steps from `node_id` back to the root
    pub fn node_depth(&self, node_id: &str) -> GraphResult<usize> {
        let mut current = self.require_node(node_id)?.id();
        let mut depth = 0;
        let mut seen = HashSet::new();
        while let Some(edge) = self.first_incoming_edge(current) {
            if !seen.insert(current) {
                break;
            }
            depth += 1;
            current = edge.source_id.as_str();
        }
        Ok(depth)
    }

    /// Nodes whose text matches the query, in element order.
    ///
    /// A blank query matches nothing.
    pub fn search(&self, query: &str, mode: SearchMode) -> Vec<&GraphNode> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        match mode {
            SearchMode::Fragments => {
                let fragments = query_fragments(query, true);
                self.nodes()
                    .filter(|node| {
                        let text = node.fields.text.to_lowercase();
                        fragments.iter().all(|f| text.contains(f.as_str()))
                    })
                    .collect()
            }
            SearchMode::Substring => {
                let query = query.to_lowercase();
                self.nodes()
                    .filter(|node| node.fields.text.to_lowercase().contains(&query))
                    .collect()
            }
        }
    }

    /// Distinct message senders and highlighted path colors, in element order
    pub fn legend(&self) -> Legend {
        let mut legend = Legend::default();
        for node in self.nodes() {
            if !matches!(node.kind, NodeKind::Message { .. }) || node.fields.sender_name.is_empty()
            {
                continue;
            }
            if !legend.speakers.contains(&node.fields.sender_name) {
                legend.speakers.push(node.fields.sender_name.clone());
            }
        }
        for highlight in self.edges().filter_map(|e| e.highlight.as_ref()) {
            if !legend.paths.iter().any(|p| p.color == highlight.color) {
                legend.paths.push(PathLegendEntry {
                    color: highlight.color.clone(),
                    checkpoint_name: highlight.checkpoint_name.clone(),
                });
            }
        }
        legend
    }

    /// Element ids selected by a legend entry
    pub fn select(&self, selector: &LegendSelector) -> Selection {
        match selector {
            LegendSelector::Speaker(name) => Selection {
                node_ids: self
                    .nodes()
                    .filter(|n| !n.is_root() && n.fields.sender_name == *name)
                    .map(|n| n.fields.id.clone())
                    .collect(),
                edge_ids: Vec::new(),
            },
            LegendSelector::Path(color) => Selection {
                node_ids: self
                    .nodes()
                    .filter(|n| n.fields.border_color.as_deref() == Some(color.as_str()))
                    .map(|n| n.fields.id.clone())
                    .collect(),
                edge_ids: self
                    .edges()
                    .filter(|e| e.highlight.as_ref().is_some_and(|h| h.color == *color))
                    .map(|e| e.id.clone())
                    .collect(),
            },
        }
    }

    /// Sessions passing through a node, for choosing which one to open
    pub fn sessions_through(&self, node_id: &str) -> GraphResult<Vec<&str>> {
        let node = self.require_node(node_id)?;
        Ok(node
            .fields
            .sessions
            .iter()
            .map(|m| m.session_id.as_str())
            .collect())
    }

    /// Where activating `node_id` leads.
    ///
    /// Without an explicit session the node's primary session is used. For
    /// swipe nodes the swipe index is that session's own.
    pub fn navigation_target(
        &self,
        node_id: &str,
        session_id: Option<&str>,
    ) -> GraphResult<NavigationTarget> {
        let node = self.require_node(node_id)?;
        let session = session_id
            .or(node.fields.primary_session.as_deref())
            .or_else(|| node.fields.sessions.first().map(|m| m.session_id.as_str()))
            .ok_or_else(|| GraphError::NoSessions {
                node_id: node_id.to_string(),
            })?;

        let not_on_node = || GraphError::SessionNotOnNode {
            node_id: node_id.to_string(),
            session_id: session.to_string(),
        };

        let membership = node.membership(session);
        if session_id.is_some() && membership.is_none() {
            return Err(not_on_node());
        }

        let swipe_index = match &node.kind {
            NodeKind::Swipe { occurrences, .. } => Some(
                occurrences
                    .iter()
                    .find(|o| o.session_id == session)
                    .map(|o| o.index)
                    .ok_or_else(not_on_node)?,
            ),
            _ => None,
        };

        let message_id = membership
            .map(|m| m.position)
            .or(node.fields.position)
            .ok_or_else(not_on_node)?;

        Ok(NavigationTarget {
            session_id: session.to_string(),
            chat_name: strip_chat_extension(session).to_string(),
            message_id,
            swipe_index,
            is_last_message: membership.is_some_and(|m| m.is_last_message()),
        })
    }
}
