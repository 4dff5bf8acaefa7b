//! Dependency-ordered execution for graphs without a Router or a
//! Prompt+Model pair.
//!
//! Each terminal node (no outgoing edges) is resolved by first resolving its
//! dependencies concurrently. A per-node `OnceCell` makes every node run at
//! most once, even when several dependents ask for it at the same time.

use crate::executor::{RunContext, WorkflowExecutor};
use adaptcore::{FlowError, NodeId, Workflow, WorkflowError};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub(crate) type Memo = HashMap<NodeId, Arc<OnceCell<Value>>>;

/// Reject dangling edges and cycles before anything runs
pub fn validate_dag(workflow: &Workflow) -> Result<(), WorkflowError> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut node_to_index = HashMap::new();

    for node in &workflow.nodes {
        let idx = graph.add_node(node.id.as_str());
        node_to_index.insert(node.id.as_str(), idx);
    }

    for edge in &workflow.edges {
        let from = node_to_index
            .get(edge.source.as_str())
            .ok_or_else(|| WorkflowError::NodeNotFound(edge.source.clone()))?;
        let to = node_to_index
            .get(edge.target.as_str())
            .ok_or_else(|| WorkflowError::NodeNotFound(edge.target.clone()))?;
        graph.add_edge(*from, *to, ());
    }

    if toposort(&graph, None).is_err() {
        return Err(WorkflowError::CyclicDependency);
    }
    Ok(())
}

impl WorkflowExecutor {
    pub(crate) async fn execute_dag(&self, run: &RunContext<'_>) -> Result<Value, FlowError> {
        let workflow = run.workflow;
        validate_dag(workflow)?;

        let terminals: Vec<&str> = workflow
            .nodes
            .iter()
            .filter(|n| workflow.outgoing(&n.id).next().is_none())
            .map(|n| n.id.as_str())
            .collect();
        if terminals.is_empty() {
            return Err(WorkflowError::NoTerminalNode.into());
        }

        let memo: Memo = workflow
            .nodes
            .iter()
            .map(|n| (n.id.clone(), Arc::new(OnceCell::new())))
            .collect();

        let mut values =
            try_join_all(terminals.iter().map(|id| self.resolve(run, &memo, *id))).await?;

        Ok(if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        })
    }

    /// Value of `id`, running it and its dependencies if needed
    fn resolve<'a>(
        &'a self,
        run: &'a RunContext<'a>,
        memo: &'a Memo,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Value, FlowError>> {
        async move {
            let cell = memo
                .get(id)
                .ok_or_else(|| WorkflowError::NodeNotFound(id.to_string()))?;

            let value = cell
                .get_or_try_init(|| async {
                    let workflow = run.workflow;
                    let node = workflow
                        .find_node(id)
                        .ok_or_else(|| WorkflowError::NodeNotFound(id.to_string()))?;

                    let dependencies: Vec<&str> =
                        workflow.incoming(id).map(|e| e.source.as_str()).collect();
                    let mut inputs =
                        try_join_all(dependencies.into_iter().map(|dep| self.resolve(run, memo, dep)))
                            .await?;

                    let input = match inputs.len() {
                        0 => run.input().clone(),
                        1 => inputs.remove(0),
                        _ => Value::Array(inputs),
                    };
                    Ok::<_, FlowError>(self.run_node(run, node, input, memo).await)
                })
                .await?;

            Ok::<Value, FlowError>(value.clone())
        }
        .boxed()
    }
}
