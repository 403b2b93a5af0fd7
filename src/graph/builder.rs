use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use super::checkpoint::{detect_checkpoint, CheckpointInfo};
use super::color::seeded_color;
use super::grouping::{group_by_content, ContentGroup};
use super::swipes::{extract_swipes, SwipeCandidate};
use super::transpose::transpose_sessions;
use super::types::{
    GraphEdge, GraphNode, NodeFields, NodeKind, SessionMembership, StoredSwipe, TimelineGraph,
    ROOT_ID, ROOT_TEXT,
};
use crate::chat::ChatSessions;
use crate::error::{GraphError, GraphResult};

/// Builds the timeline graph from a set of chat sessions.
///
/// Sessions are walked position by position. At every position, sessions
/// whose messages share the same text become one node, linked from each
/// distinct node the member sessions were last at.
pub struct GraphBuilder<'a> {
    sessions: &'a ChatSessions,
    key_counter: usize,
    /// Most recent node of each session
    frontier: HashMap<&'a str, String>,
    graph: TimelineGraph,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder over the given sessions
    pub fn new(sessions: &'a ChatSessions) -> Self {
        Self {
            sessions,
            key_counter: 0,
            frontier: HashMap::new(),
            graph: TimelineGraph::default(),
        }
    }

    /// Build the graph. Checkpoint paths are not highlighted yet.
    pub fn build(mut self) -> GraphResult<TimelineGraph> {
        let positions = transpose_sessions(self.sessions);
        let Some(first) = positions.first().filter(|entries| !entries.is_empty()) else {
            return Err(GraphError::MissingRootAnchor);
        };

        self.graph = TimelineGraph::with_root(self.root_node());
        for entry in first {
            self.frontier.insert(entry.session_id, ROOT_ID.to_string());
        }

        for (position, entries) in positions.iter().enumerate() {
            let groups = group_by_content(entries);
            debug!(
                position = position,
                messages = entries.len(),
                groups = groups.len(),
                "Grouped position"
            );
            for group in &groups {
                self.add_group(position, group);
            }
        }

        info!(
            sessions = self.sessions.len(),
            positions = positions.len(),
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "Timeline graph built"
        );
        Ok(self.graph)
    }

    fn next_key(&mut self) -> usize {
        self.key_counter += 1;
        self.key_counter
    }

    /// Root node labelled with the distinct non-user, non-system senders
    fn root_node(&self) -> GraphNode {
        let names: BTreeSet<&str> = self
            .sessions
            .iter()
            .flat_map(|s| s.messages.iter())
            .filter(|m| !m.is_user && !m.is_system && !m.name.is_empty())
            .map(|m| m.name.as_str())
            .collect();

        GraphNode {
            fields: NodeFields {
                id: ROOT_ID.to_string(),
                position: None,
                text: ROOT_TEXT.to_string(),
                sender_name: names.into_iter().collect::<Vec<_>>().join(", "),
                is_user: false,
                is_system: false,
                timestamp: String::new(),
                is_checkpoint: false,
                checkpoint_target: None,
                primary_session: None,
                color: None,
                border_color: None,
                sessions: Vec::new(),
            },
            kind: NodeKind::root(),
        }
    }

    fn add_group(&mut self, position: usize, group: &ContentGroup<'a>) {
        let checkpoint = detect_checkpoint(group, self.sessions);
        let swipes = extract_swipes(position, group);

        let mut predecessors: Vec<String> = Vec::new();
        for session_id in group.session_ids() {
            match self.frontier.get(session_id) {
                Some(previous) => {
                    if !predecessors.contains(previous) {
                        predecessors.push(previous.clone());
                    }
                }
                None => warn!(
                    session_id = %session_id,
                    position = position,
                    "Session has no previous node, message left unlinked"
                ),
            }
        }

        let node_key = self.next_key();
        let node_id = format!("message{}", node_key);
        let fields = message_fields(node_id.clone(), position, group, checkpoint);

        if !swipes.is_empty() {
            for (parent_ordinal, parent_id) in predecessors.iter().enumerate() {
                let stored: Vec<StoredSwipe> = swipes
                    .iter()
                    .enumerate()
                    .map(|(ordinal, swipe)| {
                        let key = format!("{}-{}-{}", node_key, parent_ordinal, ordinal);
                        swipe_record(&key, parent_id, &fields, swipe)
                    })
                    .collect();
                self.store_swipes(parent_id, stored);
            }
        }

        self.graph.push_node(GraphNode {
            fields,
            kind: NodeKind::message(),
        });

        for parent_id in &predecessors {
            let edge_id = format!("edge{}", self.next_key());
            self.graph
                .push_edge(GraphEdge::new(edge_id, parent_id.clone(), node_id.clone()));
        }

        for session_id in group.session_ids() {
            self.frontier.insert(session_id, node_id.clone());
        }
    }

    fn store_swipes(&mut self, parent_id: &str, records: Vec<StoredSwipe>) {
        let Some(parent) = self.graph.node_mut(parent_id) else {
            warn!(parent = %parent_id, swipes = records.len(), "Swipe parent missing");
            return;
        };
        let count = records.len();
        if !parent.kind.store_swipes(records) {
            warn!(parent = %parent_id, swipes = count, "Swipe parent cannot hold swipes");
        }
    }
}

fn message_fields(
    id: String,
    position: usize,
    group: &ContentGroup<'_>,
    checkpoint: CheckpointInfo,
) -> NodeFields {
    let representative = group.representative();
    let message = representative.message;
    let color = checkpoint
        .is_checkpoint
        .then(|| seeded_color(&group.text));

    NodeFields {
        id,
        position: Some(position),
        text: group.text.clone(),
        sender_name: message.name.clone(),
        is_user: message.is_user,
        is_system: message.is_system,
        timestamp: message.send_date.clone(),
        is_checkpoint: checkpoint.is_checkpoint,
        checkpoint_target: checkpoint.target_name,
        primary_session: checkpoint.source_session,
        color,
        border_color: None,
        sessions: group
            .members
            .iter()
            .map(|m| SessionMembership {
                session_id: m.session_id.to_string(),
                position: m.position,
                index_in_group: m.index_in_group,
                length: m.session_length,
            })
            .collect(),
    }
}

/// A swipe node copying the message's display fields, plus its edge
fn swipe_record(
    key: &str,
    parent_id: &str,
    message: &NodeFields,
    swipe: &SwipeCandidate,
) -> StoredSwipe {
    let node_id = format!("swipe{}", key);
    let sessions = message
        .sessions
        .iter()
        .filter(|m| swipe.occurrences.iter().any(|o| o.session_id == m.session_id))
        .cloned()
        .collect();

    let node = GraphNode {
        fields: NodeFields {
            id: node_id.clone(),
            text: swipe.text.clone(),
            is_checkpoint: false,
            checkpoint_target: None,
            primary_session: Some(swipe.source_session().to_string()),
            color: None,
            border_color: None,
            sessions,
            ..message.clone()
        },
        kind: NodeKind::Swipe {
            parent_id: parent_id.to_string(),
            swipe_index: swipe.original_index(),
            source_session: swipe.source_session().to_string(),
            occurrences: swipe.occurrences.clone(),
        },
    };
    let edge = GraphEdge::swipe(format!("edge-swipe{}", key), parent_id, node_id);

    StoredSwipe { node, edge }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Message;
    use crate::graph::types::GraphElement;
    use pretty_assertions::assert_eq;

    fn sessions(list: Vec<(&str, Vec<Message>)>) -> ChatSessions {
        list.into_iter().collect()
    }

    fn edge_pairs(graph: &TimelineGraph) -> Vec<(String, String)> {
        graph
            .edges()
            .map(|e| (e.source_id.clone(), e.target_id.clone()))
            .collect()
    }

    fn node_by_text<'g>(graph: &'g TimelineGraph, text: &str) -> &'g GraphNode {
        graph
            .nodes()
            .find(|n| n.fields.text == text)
            .unwrap_or_else(|| panic!("no node with text {:?}", text))
    }

    #[test]
    fn test_empty_sessions_fail() {
        let result = GraphBuilder::new(&ChatSessions::new()).build();
        assert!(matches!(result, Err(GraphError::MissingRootAnchor)));

        let only_empty = sessions(vec![("A.jsonl", vec![])]);
        let result = GraphBuilder::new(&only_empty).build();
        assert!(matches!(result, Err(GraphError::MissingRootAnchor)));
    }

    #[test]
    fn test_single_session_chain() {
        let s = sessions(vec![(
            "A.jsonl",
            vec![
                Message::new("Seraphina", "Hello"),
                Message::user("You", "Hi"),
                Message::new("Seraphina", "How are you?"),
            ],
        )]);
        let graph = GraphBuilder::new(&s).build().unwrap();

        assert_eq!(graph.node_count(), 4);
        assert_eq!(
            edge_pairs(&graph),
            vec![
                ("root".to_string(), "message1".to_string()),
                ("message1".to_string(), "message3".to_string()),
                ("message3".to_string(), "message5".to_string()),
            ]
        );
        let root = graph.node(ROOT_ID).unwrap();
        assert_eq!(root.fields.text, ROOT_TEXT);
        assert_eq!(root.fields.sender_name, "Seraphina");
        assert!(node_by_text(&graph, "Hi").fields.is_user);
    }

    #[test]
    fn test_divergence_creates_sibling_nodes() {
        let s = sessions(vec![
            ("A.jsonl", vec![Message::new("C", "hi"), Message::user("U", "x")]),
            ("B.jsonl", vec![Message::new("C", "hi"), Message::user("U", "y")]),
        ]);
        let graph = GraphBuilder::new(&s).build().unwrap();

        assert_eq!(graph.node_count(), 4);
        let hi = node_by_text(&graph, "hi");
        assert_eq!(hi.fields.sessions.len(), 2);
        assert_eq!(hi.fields.sessions[1].index_in_group, 1);

        let x = node_by_text(&graph, "x");
        let y = node_by_text(&graph, "y");
        assert_eq!(graph.first_incoming_edge(x.id()).unwrap().source_id, hi.id());
        assert_eq!(graph.first_incoming_edge(y.id()).unwrap().source_id, hi.id());
        assert_eq!(x.fields.sessions[0].session_id, "A.jsonl");
        assert_eq!(y.fields.primary_session.as_deref(), Some("B.jsonl"));
    }

    #[test]
    fn test_reconvergence_links_each_distinct_predecessor() {
        let s = sessions(vec![
            (
                "A.jsonl",
                vec![Message::new("C", "hi"), Message::user("U", "x"), Message::new("C", "same")],
            ),
            (
                "B.jsonl",
                vec![Message::new("C", "hi"), Message::user("U", "y"), Message::new("C", "same")],
            ),
        ]);
        let graph = GraphBuilder::new(&s).build().unwrap();

        let same = node_by_text(&graph, "same");
        let sources: Vec<&str> = graph
            .edges()
            .filter(|e| e.target_id == same.id())
            .map(|e| e.source_id.as_str())
            .collect();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0], node_by_text(&graph, "x").id());
        assert_eq!(sources[1], node_by_text(&graph, "y").id());
    }

    #[test]
    fn test_shared_predecessor_gets_single_edge() {
        let s = sessions(vec![
            ("A.jsonl", vec![Message::new("C", "hi"), Message::user("U", "x")]),
            ("B.jsonl", vec![Message::new("C", "hi"), Message::user("U", "x")]),
        ]);
        let graph = GraphBuilder::new(&s).build().unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_checkpoint_with_known_target() {
        let s = sessions(vec![
            (
                "C.jsonl",
                vec![
                    Message::new("Seraphina", "m0"),
                    Message::user("You", "m1"),
                    Message::new("Seraphina", "m2").with_bookmark_link("D"),
                ],
            ),
            ("D.jsonl", vec![Message::new("Seraphina", "m0")]),
        ]);
        let graph = GraphBuilder::new(&s).build().unwrap();

        let m2 = node_by_text(&graph, "m2");
        assert!(m2.fields.is_checkpoint);
        assert_eq!(m2.fields.checkpoint_target.as_deref(), Some("D"));
        assert_eq!(m2.fields.primary_session.as_deref(), Some("C.jsonl"));
        assert_eq!(m2.fields.color.as_deref(), Some(seeded_color("m2").as_str()));
    }

    #[test]
    fn test_checkpoint_without_target_is_plain() {
        let s = sessions(vec![(
            "C.jsonl",
            vec![
                Message::new("Seraphina", "m0"),
                Message::new("Seraphina", "m2").with_bookmark_link("D"),
            ],
        )]);
        let graph = GraphBuilder::new(&s).build().unwrap();

        let m2 = node_by_text(&graph, "m2");
        assert!(!m2.fields.is_checkpoint);
        assert_eq!(m2.fields.color, None);
        assert_eq!(m2.fields.checkpoint_target, None);
    }

    #[test]
    fn test_swipes_are_stored_on_predecessor() {
        let s = sessions(vec![(
            "E.jsonl",
            vec![
                Message::new("C", "m0"),
                Message::user("U", "m1"),
                Message::new("C", "canonical").with_swipes(["canonical", "foo", "bar"]),
            ],
        )]);
        let graph = GraphBuilder::new(&s).build().unwrap();

        let m1 = node_by_text(&graph, "m1");
        assert_eq!(m1.total_swipe_count(), 2);
        let stored = m1.stored_swipes();
        assert_eq!(stored[0].node.fields.text, "foo");
        assert_eq!(stored[1].node.fields.text, "bar");
        assert_eq!(stored[0].edge.source_id, m1.id());
        assert!(stored[0].edge.is_swipe);
        match &stored[1].node.kind {
            NodeKind::Swipe {
                parent_id,
                swipe_index,
                source_session,
                ..
            } => {
                assert_eq!(parent_id, m1.id());
                assert_eq!(*swipe_index, 2);
                assert_eq!(source_session, "E.jsonl");
            }
            other => panic!("expected swipe node, got {:?}", other),
        }

        // Not displayed until shown
        assert!(graph.nodes().all(|n| !n.is_swipe()));
        assert_eq!(node_by_text(&graph, "canonical").total_swipe_count(), 0);
    }

    #[test]
    fn test_swipe_ids_are_unique_across_predecessors() {
        let s = sessions(vec![
            (
                "A.jsonl",
                vec![
                    Message::new("C", "hi"),
                    Message::user("U", "x"),
                    Message::new("C", "same").with_swipes(["alt"]),
                ],
            ),
            (
                "B.jsonl",
                vec![
                    Message::new("C", "hi"),
                    Message::user("U", "y"),
                    Message::new("C", "same").with_swipes(["alt"]),
                ],
            ),
        ]);
        let graph = GraphBuilder::new(&s).build().unwrap();

        let x = node_by_text(&graph, "x");
        let y = node_by_text(&graph, "y");
        assert_eq!(x.total_swipe_count(), 1);
        assert_eq!(y.total_swipe_count(), 1);
        assert_ne!(x.stored_swipes()[0].node.id(), y.stored_swipes()[0].node.id());
        assert_ne!(x.stored_swipes()[0].edge.id, y.stored_swipes()[0].edge.id);
    }

    #[test]
    fn test_first_message_swipes_ignored() {
        let s = sessions(vec![(
            "A.jsonl",
            vec![Message::new("C", "greeting").with_swipes(["greeting", "other greeting"])],
        )]);
        let graph = GraphBuilder::new(&s).build().unwrap();

        assert_eq!(graph.node(ROOT_ID).unwrap().total_swipe_count(), 0);
        assert!(graph.node(ROOT_ID).unwrap().stored_swipes().is_empty());
    }

    #[test]
    fn test_line_endings_merge_into_one_node() {
        let s = sessions(vec![
            ("A.jsonl", vec![Message::new("C", "a\r\nb")]),
            ("B.jsonl", vec![Message::new("C", "a\nb")]),
        ]);
        let graph = GraphBuilder::new(&s).build().unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(node_by_text(&graph, "a\nb").fields.sessions.len(), 2);
    }

    #[test]
    fn test_unlinked_session_is_skipped_for_edges() {
        let broken = Message {
            mes: None,
            ..Message::new("C", "")
        };
        let s = sessions(vec![
            ("A.jsonl", vec![Message::new("C", "hi"), Message::user("U", "x")]),
            ("B.jsonl", vec![broken, Message::user("U", "x")]),
        ]);
        let graph = GraphBuilder::new(&s).build().unwrap();

        // B's first message is skipped but B still anchors at the root
        let x = node_by_text(&graph, "x");
        let sources: Vec<&str> = graph
            .edges()
            .filter(|e| e.target_id == x.id())
            .map(|e| e.source_id.as_str())
            .collect();
        assert_eq!(sources, vec![node_by_text(&graph, "hi").id(), ROOT_ID]);
    }

    #[test]
    fn test_swipes_after_skipped_first_message_are_stored_on_root() {
        let broken = Message {
            mes: None,
            ..Message::new("C", "")
        };
        let s = sessions(vec![(
            "A.jsonl",
            vec![broken, Message::new("C", "x").with_swipes(["x", "alt"])],
        )]);
        let mut graph = GraphBuilder::new(&s).build().unwrap();

        let root = graph.node(ROOT_ID).unwrap();
        assert_eq!(root.total_swipe_count(), 1);
        assert_eq!(root.stored_swipes()[0].node.fields.text, "alt");

        assert_eq!(graph.show_swipes(ROOT_ID).unwrap(), 1);
        let alt = node_by_text(&graph, "alt");
        assert!(alt.is_swipe());
        assert_eq!(graph.first_incoming_edge(alt.id()).unwrap().source_id, ROOT_ID);
    }

    #[test]
    fn test_element_order_node_then_edges() {
        let s = sessions(vec![("A.jsonl", vec![Message::new("C", "hi")])]);
        let graph = GraphBuilder::new(&s).build().unwrap();

        assert!(matches!(graph.elements()[0], GraphElement::Node(_)));
        assert!(matches!(graph.elements()[1], GraphElement::Node(_)));
        assert!(matches!(graph.elements()[2], GraphElement::Edge(_)));
    }
}
