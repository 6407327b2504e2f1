use std::collections::{HashMap, HashSet, VecDeque};

use crate::foundation::core::NodeId;
use crate::foundation::error::GraphError;
use crate::graph::kind::OperatorKind;
use crate::graph::model::GraphCollaborator;
use crate::graph::param::{ParamError, ParamSet, bind_params};

/// One declared input of a planned node and the producer currently wired into it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedInput {
    /// Declared input port.
    pub port: &'static str,
    /// Whether the port must be connected.
    pub required: bool,
    /// Producer wired into the port, if any.
    pub producer: Option<NodeId>,
}

/// Snapshot of a node taken while building an [`EvaluationPlan`].
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedNode {
    /// Host identifier.
    pub id: NodeId,
    /// Operator kind.
    pub kind: OperatorKind,
    /// Raw host parameters; see [`PlannedNode::bound_params`].
    pub params: ParamSet,
    /// Declared inputs in resolution order (merge `A` before `B`).
    pub inputs: Vec<PlannedInput>,
}

impl PlannedNode {
    /// Parameters bound against the kind schema, defaults filled in.
    pub fn bound_params(&self) -> Result<ParamSet, ParamError> {
        bind_params(self.kind, &self.params)
    }

    /// Producers that are actually connected, in input order.
    pub fn producers(&self) -> impl Iterator<Item = (&'static str, &NodeId)> {
        self.inputs
            .iter()
            .filter_map(|i| i.producer.as_ref().map(|p| (i.port, p)))
    }
}

/// Ordered evaluation plan: every node appears after all of its producers.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationPlan {
    roots: Vec<NodeId>,
    nodes: Vec<PlannedNode>,
}

impl EvaluationPlan {
    /// Resolve the producer closure of `request_ids` and order it topologically.
    ///
    /// Duplicate request ids are collapsed, keeping the first occurrence.
    #[tracing::instrument(skip_all, fields(requested = request_ids.len()))]
    pub fn build(
        graph: &dyn GraphCollaborator,
        request_ids: &[NodeId],
    ) -> Result<Self, GraphError> {
        let mut seen = HashSet::new();
        let roots: Vec<NodeId> = request_ids
            .iter()
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect();

        let resolved = resolve(graph, &roots)?;
        let nodes = topological_order(resolved)?;
        tracing::debug!(nodes = nodes.len(), "evaluation plan built");
        Ok(Self { roots, nodes })
    }

    /// Requested terminal nodes, deduplicated, in request order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Nodes in evaluation order.
    pub fn nodes(&self) -> &[PlannedNode] {
        &self.nodes
    }

    /// Number of planned nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return `true` when the plan has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Planned node with `id`, if it is part of the plan.
    pub fn node(&self, id: &NodeId) -> Option<&PlannedNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}

/// Resolve the transitive closure of producers reachable from `request_ids`.
///
/// The result lists the requested nodes first (in request order), then producers breadth-first
/// in input-port order. It is *not* yet topologically ordered.
pub fn resolve(
    graph: &dyn GraphCollaborator,
    request_ids: &[NodeId],
) -> Result<Vec<PlannedNode>, GraphError> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    for id in request_ids {
        if visited.insert(id.clone()) {
            queue.push_back(id.clone());
        }
    }

    let mut out = Vec::new();
    while let Some(id) = queue.pop_front() {
        if id.is_blank() || !graph.node_exists(&id) {
            return Err(GraphError::UnknownNode(id));
        }
        let node = graph
            .node(&id)
            .ok_or_else(|| GraphError::UnknownNode(id.clone()))?;

        let connections = graph.resolve_connections(&id);
        let inputs: Vec<PlannedInput> = node
            .kind
            .inputs()
            .iter()
            .map(|port| PlannedInput {
                port: port.name,
                required: port.required,
                producer: connections
                    .iter()
                    .find(|(p, _)| p == port.name)
                    .map(|(_, producer)| producer.clone()),
            })
            .collect();

        for producer in inputs.iter().filter_map(|i| i.producer.as_ref()) {
            if visited.insert(producer.clone()) {
                queue.push_back(producer.clone());
            }
        }

        out.push(PlannedNode {
            id: node.id,
            kind: node.kind,
            params: node.params,
            inputs,
        });
    }
    Ok(out)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Order `nodes` so that every node follows all of its producers.
///
/// Depth-first from each node in the given order, visiting inputs in declared port order, so a
/// merge's `A` branch is placed before its `B` branch. Edges to producers outside `nodes` are
/// ignored. Fails with [`GraphError::Cycle`] on any cycle, including a self-referencing edge.
pub fn topological_order(nodes: Vec<PlannedNode>) -> Result<Vec<PlannedNode>, GraphError> {
    let index: HashMap<&NodeId, usize> = nodes.iter().enumerate().map(|(i, n)| (&n.id, i)).collect();
    let deps: Vec<Vec<usize>> = nodes
        .iter()
        .map(|n| n.producers().filter_map(|(_, p)| index.get(p).copied()).collect())
        .collect();

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());
    // (node, position of the next producer to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..nodes.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        marks[start] = Mark::Visiting;
        stack.push((start, 0));

        while let Some(top) = stack.last_mut() {
            let (idx, cursor) = *top;
            let Some(&p) = deps[idx].get(cursor) else {
                marks[idx] = Mark::Done;
                order.push(idx);
                stack.pop();
                continue;
            };
            top.1 += 1;
            match marks[p] {
                Mark::Done => {}
                Mark::Visiting => {
                    return Err(GraphError::Cycle {
                        node_id: nodes[p].id.clone(),
                    });
                }
                Mark::Unvisited => {
                    marks[p] = Mark::Visiting;
                    stack.push((p, 0));
                }
            }
        }
    }

    let mut slots: Vec<Option<PlannedNode>> = nodes.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

#[cfg(test)]
#[path = "../../tests/unit/graph/plan.rs"]
mod tests;
