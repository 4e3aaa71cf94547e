//! Structural checks over a flow's relationship set.

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, TaskflowError};
use crate::runtime::flow::Edge;

/// Topologically sort the tasks of a flow.
///
/// Fails when an edge points at a task outside `task_ids`, or when the edges
/// form a cycle. A self-loop counts as a cycle.
pub(crate) fn topological_ids(
    flow_id: &str,
    task_ids: &[String],
    edges: &[Edge],
) -> Result<Vec<String>> {
    let known: HashSet<&str> = task_ids.iter().map(String::as_str).collect();

    for edge in edges {
        for endpoint in [&edge.before, &edge.after] {
            if !known.contains(endpoint.as_str()) {
                return Err(TaskflowError::Config(format!(
                    "relationship '{edge}' references task '{endpoint}' which is not part of flow '{flow_id}'"
                )));
            }
        }
    }

    // Edge direction: before -> after.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for id in task_ids {
        graph.add_node(id.as_str());
    }
    for edge in edges {
        graph.add_edge(edge.before.as_str(), edge.after.as_str(), ());
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(TaskflowError::Cycle {
            flow: flow_id.to_string(),
            task: cycle.node_id().to_string(),
        }),
    }
}
