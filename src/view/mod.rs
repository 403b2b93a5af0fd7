//! Timeline view state: when to rebuild the graph, which swipes are shown,
//! the locked legend entry and the layout orientation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

pub use crate::chat::ViewContext;

use crate::chat::{collect_sessions, ChatSource};
use crate::config::GraphConfig;
use crate::error::{AppResult, GraphError, GraphResult};
use crate::graph::{
    build_timeline, LegendSelector, NavigationTarget, SearchMode, Selection, TimelineGraph,
};

/// Layout direction of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Conversation flows downward
    #[default]
    TopToBottom,
    /// Conversation flows rightward
    LeftToRight,
}

impl Orientation {
    /// The other orientation
    pub fn toggled(self) -> Self {
        match self {
            Orientation::TopToBottom => Orientation::LeftToRight,
            Orientation::LeftToRight => Orientation::TopToBottom,
        }
    }

    /// Orientation suited to a viewport: wide viewports lay out left to right
    pub fn for_viewport(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::LeftToRight
        } else {
            Orientation::TopToBottom
        }
    }

    /// Layout rank direction
    pub fn rank_dir(&self) -> &'static str {
        match self {
            Orientation::TopToBottom => "TB",
            Orientation::LeftToRight => "LR",
        }
    }
}

/// A built graph and when it was built
#[derive(Debug, Clone)]
struct Snapshot {
    context: ViewContext,
    graph: TimelineGraph,
    build_id: Uuid,
    built_at: DateTime<Utc>,
}

/// Holds the timeline graph of the current context and the interactive
/// state around it.
pub struct TimelineView<S> {
    source: S,
    config: GraphConfig,
    snapshot: Option<Snapshot>,
    stale: bool,
    orientation: Orientation,
    locked_selector: Option<LegendSelector>,
}

impl<S: ChatSource> TimelineView<S> {
    /// Create a view over a chat source
    pub fn new(source: S, config: GraphConfig) -> Self {
        Self {
            source,
            config,
            snapshot: None,
            stale: false,
            orientation: Orientation::default(),
            locked_selector: None,
        }
    }

    /// Start with the given orientation
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Rebuild the graph if the context changed or the view was invalidated.
    ///
    /// Returns whether a rebuild happened. A failed rebuild keeps the
    /// previous graph and leaves the view due for another attempt.
    pub async fn refresh(&mut self, context: &ViewContext) -> AppResult<bool> {
        let current = self
            .snapshot
            .as_ref()
            .is_some_and(|s| &s.context == context);
        if current && !self.stale {
            debug!(context = ?context, "Timeline up to date");
            return Ok(false);
        }

        let build_id = Uuid::new_v4();
        info!(build_id = %build_id, context = ?context, "Rebuilding timeline");
        self.source.bind_context(context);

        let graph = match self.build().await {
            Ok(graph) => graph,
            Err(e) => {
                error!(build_id = %build_id, error = %e, "Timeline rebuild failed");
                self.stale = true;
                return Err(e);
            }
        };

        info!(
            build_id = %build_id,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Timeline ready"
        );
        self.snapshot = Some(Snapshot {
            context: context.clone(),
            graph,
            build_id,
            built_at: Utc::now(),
        });
        self.stale = false;
        self.locked_selector = None;
        Ok(true)
    }

    async fn build(&self) -> AppResult<TimelineGraph> {
        let sessions = collect_sessions(&self.source).await?;
        Ok(build_timeline(&sessions, &self.config)?)
    }

    /// The chat source the graph is built from
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Force the next refresh to rebuild, e.g. after a settings change
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Replace the graph styling; takes effect on the next rebuild
    pub fn set_graph_config(&mut self, config: GraphConfig) {
        self.config = config;
        self.invalidate();
    }

    /// The current graph, if one was built
    pub fn graph(&self) -> Option<&TimelineGraph> {
        self.snapshot.as_ref().map(|s| &s.graph)
    }

    /// Context of the current graph
    pub fn context(&self) -> Option<&ViewContext> {
        self.snapshot.as_ref().map(|s| &s.context)
    }

    /// Id and time of the last successful build
    pub fn last_build(&self) -> Option<(Uuid, DateTime<Utc>)> {
        self.snapshot.as_ref().map(|s| (s.build_id, s.built_at))
    }

    /// The current graph, failing with [`GraphError::NotBuilt`] before the first build
    pub fn require_graph(&self) -> GraphResult<&TimelineGraph> {
        self.graph().ok_or(GraphError::NotBuilt)
    }

    fn graph_mut(&mut self) -> GraphResult<&mut TimelineGraph> {
        self.snapshot
            .as_mut()
            .map(|s| &mut s.graph)
            .ok_or(GraphError::NotBuilt)
    }

    /// Current orientation
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Switch orientation, returning the new one
    pub fn toggle_orientation(&mut self) -> Orientation {
        self.orientation = self.orientation.toggled();
        self.orientation
    }

    /// Pick the orientation that suits the viewport, returning it
    pub fn fit_to_viewport(&mut self, width: u32, height: u32) -> Orientation {
        self.orientation = Orientation::for_viewport(width, height);
        self.orientation
    }

    /// Display the swipes stored on a node
    pub fn show_swipes(&mut self, node_id: &str) -> GraphResult<usize> {
        let added = self.graph_mut()?.show_swipes(node_id)?;
        debug!(node_id = %node_id, added = added, "Swipes shown");
        Ok(added)
    }

    /// Remove the displayed swipes of a node
    pub fn hide_swipes(&mut self, node_id: &str) -> GraphResult<usize> {
        let removed = self.graph_mut()?.hide_swipes(node_id)?;
        debug!(node_id = %node_id, removed = removed, "Swipes hidden");
        Ok(removed)
    }

    /// Show or hide a node's swipes depending on their current state.
    ///
    /// Returns whether they are shown afterwards.
    pub fn toggle_swipes(&mut self, node_id: &str) -> GraphResult<bool> {
        if self.require_graph()?.swipes_shown(node_id) {
            self.hide_swipes(node_id)?;
            Ok(false)
        } else {
            self.show_swipes(node_id)?;
            Ok(true)
        }
    }

    /// Currently locked legend entry
    pub fn locked_selector(&self) -> Option<&LegendSelector> {
        self.locked_selector.as_ref()
    }

    /// Selection to emphasize while hovering a legend entry.
    ///
    /// While an entry is locked, hovering does not change the emphasis and
    /// the locked selection is returned instead.
    pub fn preview_legend(&self, selector: &LegendSelector) -> GraphResult<Selection> {
        let graph = self.require_graph()?;
        Ok(graph.select(self.locked_selector.as_ref().unwrap_or(selector)))
    }

    /// Lock a legend entry, or unlock it if it is already locked.
    ///
    /// Returns the selection now emphasized, empty after unlocking.
    pub fn toggle_legend(&mut self, selector: &LegendSelector) -> GraphResult<Selection> {
        let graph = self.require_graph()?;
        if self.locked_selector.as_ref() == Some(selector) {
            self.locked_selector = None;
            return Ok(Selection::default());
        }
        let selection = graph.select(selector);
        self.locked_selector = Some(selector.clone());
        Ok(selection)
    }

    /// Ids of nodes matching a search query
    pub fn search(&self, query: &str, mode: SearchMode) -> GraphResult<Vec<String>> {
        Ok(self
            .require_graph()?
            .search(query, mode)
            .into_iter()
            .map(|n| n.fields.id.clone())
            .collect())
    }

    /// Where activating a node leads
    pub fn navigation_target(
        &self,
        node_id: &str,
        session_id: Option<&str>,
    ) -> GraphResult<NavigationTarget> {
        self.require_graph()?.navigation_target(node_id, session_id)
    }
}
