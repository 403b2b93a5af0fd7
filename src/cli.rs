//! CLI commands for inspecting a timeline.
//!
//! Every command prints JSON so the output can be fed to a graph renderer.

use clap::Subcommand;
use serde::Serialize;

use crate::chat::ChatSource;
use crate::error::GraphResult;
use crate::graph::SearchMode;
use crate::view::TimelineView;

/// Timeline CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum TimelineCommands {
    /// Print every graph element
    Elements {
        /// Also show the swipes stored on these nodes
        #[arg(long = "show-swipes")]
        show_swipes: Vec<String>,
    },

    /// Find nodes whose text matches a query
    Search {
        /// Text to look for
        query: String,

        /// Matching mode: fragments, substring
        #[arg(long, default_value = "fragments")]
        mode: String,
    },

    /// Print speakers and highlighted checkpoint paths
    Legend,

    /// Show where activating a node leads
    Navigate {
        /// Node id
        node_id: String,

        /// Session to open instead of the node's primary one
        #[arg(long)]
        session: Option<String>,
    },

    /// List the sessions passing through a node
    Sessions {
        /// Node id
        node_id: String,
    },

    /// Distance of a node from the root
    Depth {
        /// Node id
        node_id: String,
    },
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }

    fn json<T: Serialize>(value: GraphResult<T>) -> Self {
        match value {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(json) => Self::success(json),
                Err(e) => Self::error(format!("Failed to serialize output: {}", e)),
            },
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// Execute a timeline CLI command against a refreshed view.
pub fn execute_command<S: ChatSource>(
    command: TimelineCommands,
    view: &mut TimelineView<S>,
) -> CliResult {
    match command {
        TimelineCommands::Elements { show_swipes } => {
            for node_id in &show_swipes {
                if let Err(e) = view.show_swipes(node_id) {
                    return CliResult::error(e.to_string());
                }
            }
            CliResult::json(view.require_graph().map(|g| g.elements()))
        }
        TimelineCommands::Search { query, mode } => {
            let mode: SearchMode = match mode.parse() {
                Ok(mode) => mode,
                Err(e) => return CliResult::error(e),
            };
            CliResult::json(view.search(&query, mode))
        }
        TimelineCommands::Legend => CliResult::json(view.require_graph().map(|g| g.legend())),
        TimelineCommands::Navigate { node_id, session } => {
            CliResult::json(view.navigation_target(&node_id, session.as_deref()))
        }
        TimelineCommands::Sessions { node_id } => {
            CliResult::json(view.require_graph().and_then(|g| g.sessions_through(&node_id)))
        }
        TimelineCommands::Depth { node_id } => {
            CliResult::json(view.require_graph().and_then(|g| g.node_depth(&node_id)))
        }
    }
}
