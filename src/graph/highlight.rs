use std::collections::HashMap;
use tracing::debug;

use super::types::{EdgeHighlight, GraphElement, TimelineGraph};
use crate::config::GraphConfig;

/// Outcome of a highlighting pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightReport {
    /// Checkpoints whose path was traced
    pub checkpoints: usize,
    /// Edge highlights written, counting overwrites
    pub edges_tagged: usize,
}

/// Marks the path from every checkpoint back towards the root.
///
/// Each step follows the first incoming edge of the current node. The walk
/// stops at the root or at another checkpoint, so nested checkpoints each
/// own only the segment up to their nearest checkpoint ancestor. When paths
/// overlap, the checkpoint later in element order wins.
#[derive(Debug, Clone)]
pub struct PathHighlighter {
    config: GraphConfig,
}

impl PathHighlighter {
    /// Create a highlighter with the given styling
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    /// Highlight every checkpoint path of `graph`
    pub fn apply(&self, graph: &mut TimelineGraph) -> HighlightReport {
        let first_incoming = first_incoming_edges(graph);
        let checkpoints: Vec<(String, String, Option<String>)> = graph
            .checkpoint_nodes()
            .filter_map(|node| {
                let color = node.fields.color.clone()?;
                Some((
                    node.fields.id.clone(),
                    color,
                    node.fields.checkpoint_target.clone(),
                ))
            })
            .collect();

        let mut report = HighlightReport::default();
        for (checkpoint_id, color, target) in checkpoints {
            let steps = self.trace(graph, &first_incoming, &checkpoint_id, &color, target);
            debug!(
                checkpoint = %checkpoint_id,
                color = %color,
                steps = steps,
                "Checkpoint path highlighted"
            );
            report.checkpoints += 1;
            report.edges_tagged += steps;
        }
        report
    }

    fn trace(
        &self,
        graph: &mut TimelineGraph,
        first_incoming: &HashMap<String, usize>,
        checkpoint_id: &str,
        color: &str,
        target: Option<String>,
    ) -> usize {
        let mut current = checkpoint_id.to_string();
        let mut thickness = self.config.highlight_thickness;
        let mut z_index = self.config.highlight_z_index;
        let mut steps = 0;

        loop {
            if current != checkpoint_id
                && graph.node(&current).is_some_and(|n| n.fields.is_checkpoint)
            {
                break;
            }
            let Some(&edge_index) = first_incoming.get(&current) else {
                break;
            };
            let Some(edge) = graph.edge_at_mut(edge_index) else {
                break;
            };

            edge.highlight = Some(EdgeHighlight {
                color: color.to_string(),
                checkpoint_name: target.clone(),
                thickness,
                z_index,
            });
            let source = edge.source_id.clone();

            if let Some(node) = graph.node_mut(&current) {
                node.fields.border_color = Some(color.to_string());
            }

            steps += 1;
            z_index = z_index.saturating_add(1);
            thickness = (thickness + self.config.highlight_thickness_step)
                .min(self.config.highlight_max_thickness);
            current = source;
        }

        steps
    }
}

/// Element index of the first incoming edge of each node
fn first_incoming_edges(graph: &TimelineGraph) -> HashMap<String, usize> {
    let mut first = HashMap::new();
    for (index, element) in graph.elements().iter().enumerate() {
        if let GraphElement::Edge(edge) = element {
            first.entry(edge.target_id.clone()).or_insert(index);
        }
    }
    first
}
