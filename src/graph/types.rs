use serde::Serialize;
use std::collections::HashMap;

use crate::error::{GraphError, GraphResult};

/// Id of the single root node
pub const ROOT_ID: &str = "root";

/// Text shown on the root node
pub const ROOT_TEXT: &str = "Start of Conversation";

/// Where one session passes through a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionMembership {
    /// Session id (chat file name)
    pub session_id: String,
    /// Message index inside the session
    pub position: usize,
    /// Index of the message among all messages at this position
    pub index_in_group: usize,
    /// Number of messages in the session
    pub length: usize,
}

impl SessionMembership {
    /// Whether the node is the session's final message
    pub fn is_last_message(&self) -> bool {
        self.position + 1 == self.length
    }
}

/// Fields shared by every node kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeFields {
    pub id: String,
    /// Message index, `None` for the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    pub text: String,
    pub sender_name: String,
    pub is_user: bool,
    pub is_system: bool,
    pub timestamp: String,
    pub is_checkpoint: bool,
    /// Chat a checkpoint branches into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_target: Option<String>,
    /// Session opened when the node is activated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_session: Option<String>,
    /// Checkpoint color
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Set on nodes lying on a highlighted checkpoint path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    pub sessions: Vec<SessionMembership>,
}

/// A session's copy of an alternate generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwipeOccurrence {
    pub session_id: String,
    /// Index inside that session's swipe list
    pub index: usize,
}

/// A prepared swipe node with its connecting edge, stored on the
/// predecessor node until swipes are shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSwipe {
    pub node: GraphNode,
    pub edge: GraphEdge,
}

/// Kind-specific node data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node_kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Start of every conversation. It can hold swipes of a session whose
    /// first message was unusable.
    Root {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        stored_swipes: Vec<StoredSwipe>,
        total_swipe_count: usize,
    },
    /// One distinct message text at one position
    Message {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        stored_swipes: Vec<StoredSwipe>,
        total_swipe_count: usize,
    },
    /// An alternate generation of the message following `parent_id`
    Swipe {
        parent_id: String,
        /// Index in the source session's swipe list
        swipe_index: usize,
        source_session: String,
        occurrences: Vec<SwipeOccurrence>,
    },
}

/// A node of the timeline graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    #[serde(flatten)]
    pub fields: NodeFields,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl NodeKind {
    /// Root kind with no stored swipes
    pub fn root() -> Self {
        NodeKind::Root {
            stored_swipes: Vec::new(),
            total_swipe_count: 0,
        }
    }

    /// Message kind with no stored swipes
    pub fn message() -> Self {
        NodeKind::Message {
            stored_swipes: Vec::new(),
            total_swipe_count: 0,
        }
    }

    /// Record prepared swipes; only root and message kinds hold them
    pub(crate) fn store_swipes(&mut self, records: Vec<StoredSwipe>) -> bool {
        match self {
            NodeKind::Root {
                stored_swipes,
                total_swipe_count,
            }
            | NodeKind::Message {
                stored_swipes,
                total_swipe_count,
            } => {
                *total_swipe_count += records.len();
                stored_swipes.extend(records);
                true
            }
            NodeKind::Swipe { .. } => false,
        }
    }
}

impl GraphNode {
    /// Node id
    pub fn id(&self) -> &str {
        &self.fields.id
    }

    /// Whether this is the root node
    pub fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root { .. })
    }

    /// Whether this is a swipe node
    pub fn is_swipe(&self) -> bool {
        matches!(self.kind, NodeKind::Swipe { .. })
    }

    /// Swipes prepared for display after this node
    pub fn stored_swipes(&self) -> &[StoredSwipe] {
        match &self.kind {
            NodeKind::Root { stored_swipes, .. } | NodeKind::Message { stored_swipes, .. } => {
                stored_swipes
            }
            NodeKind::Swipe { .. } => &[],
        }
    }

    /// Number of swipes stored on this node
    pub fn total_swipe_count(&self) -> usize {
        match &self.kind {
            NodeKind::Root {
                total_swipe_count, ..
            }
            | NodeKind::Message {
                total_swipe_count, ..
            } => *total_swipe_count,
            NodeKind::Swipe { .. } => 0,
        }
    }

    /// Membership record of a session, if it passes through this node
    pub fn membership(&self, session_id: &str) -> Option<&SessionMembership> {
        self.fields
            .sessions
            .iter()
            .find(|m| m.session_id == session_id)
    }
}

/// Styling applied to an edge on a checkpoint path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeHighlight {
    pub color: String,
    /// Target chat of the checkpoint that owns the path
    pub checkpoint_name: Option<String>,
    pub thickness: f64,
    pub z_index: u32,
}

/// A directed edge of the timeline graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_swipe: bool,
    #[serde(flatten)]
    pub highlight: Option<EdgeHighlight>,
}

impl GraphEdge {
    /// Create a plain edge
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            is_swipe: false,
            highlight: None,
        }
    }

    /// Create an edge to a swipe node
    pub fn swipe(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            is_swipe: true,
            ..Self::new(id, source_id, target_id)
        }
    }

    /// Whether the edge lies on a checkpoint path
    pub fn is_highlighted(&self) -> bool {
        self.highlight.is_some()
    }
}

/// One element of the rendered graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphElement {
    Node(GraphNode),
    Edge(GraphEdge),
}

/// The timeline graph: an ordered element list plus a node lookup.
///
/// Element order is node, then its incoming edges, in build order. Swipe
/// nodes are appended when shown and removed when hidden.
#[derive(Debug, Clone, Default)]
pub struct TimelineGraph {
    elements: Vec<GraphElement>,
    node_index: HashMap<String, usize>,
}

impl TimelineGraph {
    /// Create a graph holding only the given root node
    pub(crate) fn with_root(root: GraphNode) -> Self {
        let mut graph = Self::default();
        graph.push_node(root);
        graph
    }

    pub(crate) fn push_node(&mut self, node: GraphNode) {
        self.node_index
            .insert(node.fields.id.clone(), self.elements.len());
        self.elements.push(GraphElement::Node(node));
    }

    pub(crate) fn push_edge(&mut self, edge: GraphEdge) {
        self.elements.push(GraphElement::Edge(edge));
    }

    pub(crate) fn edge_at_mut(&mut self, index: usize) -> Option<&mut GraphEdge> {
        match self.elements.get_mut(index) {
            Some(GraphElement::Edge(edge)) => Some(edge),
            _ => None,
        }
    }

    fn reindex(&mut self) {
        self.node_index = self
            .elements
            .iter()
            .enumerate()
            .filter_map(|(i, element)| match element {
                GraphElement::Node(node) => Some((node.fields.id.clone(), i)),
                GraphElement::Edge(_) => None,
            })
            .collect();
    }

    /// All elements in display order
    pub fn elements(&self) -> &[GraphElement] {
        &self.elements
    }

    /// Consume the graph into its element list
    pub fn into_elements(self) -> Vec<GraphElement> {
        self.elements
    }

    /// Iterate over nodes in element order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.elements.iter().filter_map(|element| match element {
            GraphElement::Node(node) => Some(node),
            GraphElement::Edge(_) => None,
        })
    }

    /// Iterate over edges in element order
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.elements.iter().filter_map(|element| match element {
            GraphElement::Edge(edge) => Some(edge),
            GraphElement::Node(_) => None,
        })
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        match self.node_index.get(id).and_then(|&i| self.elements.get(i)) {
            Some(GraphElement::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// Look up a node by id, mutably
    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        let index = *self.node_index.get(id)?;
        match self.elements.get_mut(index) {
            Some(GraphElement::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// Look up a node, failing with [`GraphError::NodeNotFound`]
    pub fn require_node(&self, id: &str) -> GraphResult<&GraphNode> {
        self.node(id).ok_or_else(|| GraphError::NodeNotFound {
            node_id: id.to_string(),
        })
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.elements.len() - self.node_index.len()
    }

    /// The first edge, in element order, that points at `id`
    pub fn first_incoming_edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges().find(|edge| edge.target_id == id)
    }

    /// Nodes marked as checkpoints, in element order
    pub fn checkpoint_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes().filter(|node| node.fields.is_checkpoint)
    }

    /// Whether the swipes stored on `parent_id` are currently displayed
    pub fn swipes_shown(&self, parent_id: &str) -> bool {
        self.node(parent_id)
            .and_then(|parent| parent.stored_swipes().first())
            .is_some_and(|swipe| self.node(swipe.node.id()).is_some())
    }

    /// Add the swipe nodes and edges stored on `parent_id` to the graph.
    ///
    /// Already displayed swipes are not added twice. Returns the number of
    /// swipe nodes added.
    pub fn show_swipes(&mut self, parent_id: &str) -> GraphResult<usize> {
        let stored = self.swipe_parent(parent_id)?.stored_swipes().to_vec();

        let mut added = 0;
        for swipe in stored {
            if self.node(swipe.node.id()).is_some() {
                continue;
            }
            self.push_node(swipe.node);
            self.push_edge(swipe.edge);
            added += 1;
        }
        Ok(added)
    }

    /// Remove the displayed swipe nodes and edges of `parent_id`.
    ///
    /// Returns the number of swipe nodes removed.
    pub fn hide_swipes(&mut self, parent_id: &str) -> GraphResult<usize> {
        let parent = self.swipe_parent(parent_id)?;
        let node_ids: Vec<String> = parent
            .stored_swipes()
            .iter()
            .map(|s| s.node.fields.id.clone())
            .collect();
        let edge_ids: Vec<String> = parent
            .stored_swipes()
            .iter()
            .map(|s| s.edge.id.clone())
            .collect();

        let before = self.node_count();
        self.elements.retain(|element| match element {
            GraphElement::Node(node) => !node_ids.contains(&node.fields.id),
            GraphElement::Edge(edge) => !edge_ids.contains(&edge.id),
        });
        self.reindex();
        Ok(before - self.node_count())
    }

    fn swipe_parent(&self, parent_id: &str) -> GraphResult<&GraphNode> {
        let parent = self.require_node(parent_id)?;
        match parent.kind {
            NodeKind::Root { .. } | NodeKind::Message { .. } => Ok(parent),
            NodeKind::Swipe { .. } => Err(GraphError::NotASwipeParent {
                node_id: parent_id.to_string(),
            }),
        }
    }
}
