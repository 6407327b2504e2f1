use std::collections::{BTreeMap, HashMap};

use crate::foundation::core::NodeId;
use crate::foundation::error::{ConnectError, GraphError};
use crate::graph::kind::OperatorKind;
use crate::graph::param::{ParamSet, ParamValue};

/// A compositing operator instance as held by the host graph.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    /// Host identifier.
    pub id: NodeId,
    /// Operator kind.
    pub kind: OperatorKind,
    /// Raw parameter values, unbound.
    #[serde(default)]
    pub params: ParamSet,
}

/// Directed stream connection `src.src_port -> dst.dst_port`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StreamEdge {
    /// Producer node.
    pub src: NodeId,
    /// Producer output port.
    pub src_port: String,
    /// Consumer node.
    pub dst: NodeId,
    /// Consumer input port.
    pub dst_port: String,
}

/// Narrow interface onto the host-owned scene graph.
///
/// The controller only uses the read half (`node_exists`, `node`, `resolve_connections`) and
/// reads a fresh snapshot on every call; it never assumes two calls observe the same graph.
pub trait GraphCollaborator {
    /// Create a node of `kind` with a host-chosen identifier.
    fn create_node(&mut self, kind: OperatorKind) -> NodeId;

    /// Wire `src.src_port` into `dst.dst_port`.
    fn connect(
        &mut self,
        src: &NodeId,
        src_port: &str,
        dst: &NodeId,
        dst_port: &str,
    ) -> Result<(), ConnectError>;

    /// Store a raw parameter value. Values are bound against the kind schema at validation time.
    fn set_parameter(
        &mut self,
        node: &NodeId,
        name: &str,
        value: ParamValue,
    ) -> Result<(), GraphError>;

    /// Return `true` when `id` names a live node.
    fn node_exists(&self, id: &NodeId) -> bool;

    /// Snapshot of a node (kind + raw parameters).
    fn node(&self, id: &NodeId) -> Option<Node>;

    /// Producers feeding `node`, as `(input port, producer)` in the kind's input order.
    fn resolve_connections(&self, node: &NodeId) -> Vec<(String, NodeId)>;
}

/// In-memory host graph.
#[derive(Clone, Debug, Default)]
pub struct MemoryGraph {
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<StreamEdge>,
    /// `dst -> dst_port -> src`, mirrors `edges`.
    feeds: HashMap<NodeId, HashMap<String, NodeId>>,
    name_counters: HashMap<OperatorKind, u32>,
}

impl MemoryGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under its own id, returning any node it replaced.
    ///
    /// Replacing a node keeps its edges; call [`MemoryGraph::remove_node`] first to drop them.
    pub fn insert_node(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id.clone(), node)
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let removed = self.nodes.remove(id)?;
        self.edges.retain(|e| &e.src != id && &e.dst != id);
        self.feeds.remove(id);
        for ports in self.feeds.values_mut() {
            ports.retain(|_, src| src != id);
        }
        Some(removed)
    }

    /// Remove the edge feeding `dst.dst_port`, if any.
    pub fn disconnect(&mut self, dst: &NodeId, dst_port: &str) -> Option<StreamEdge> {
        self.feeds.get_mut(dst)?.remove(dst_port)?;
        let idx = self
            .edges
            .iter()
            .position(|e| &e.dst == dst && e.dst_port == dst_port)?;
        Some(self.edges.remove(idx))
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Edges in connection order.
    pub fn edges(&self) -> &[StreamEdge] {
        &self.edges
    }

    fn producer(&self, dst: &NodeId, dst_port: &str) -> Option<&NodeId> {
        self.feeds.get(dst).and_then(|ports| ports.get(dst_port))
    }

    fn kind_of(&self, id: &NodeId) -> Result<OperatorKind, ConnectError> {
        self.nodes
            .get(id)
            .map(|n| n.kind)
            .ok_or_else(|| ConnectError::UnknownNode(id.clone()))
    }

    fn next_name(&mut self, kind: OperatorKind) -> NodeId {
        loop {
            let counter = self.name_counters.entry(kind).or_insert(0);
            *counter += 1;
            let candidate = NodeId(format!("{}{}", kind.as_str().replace('-', "_"), counter));
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

impl GraphCollaborator for MemoryGraph {
    fn create_node(&mut self, kind: OperatorKind) -> NodeId {
        let id = self.next_name(kind);
        self.nodes.insert(
            id.clone(),
            Node {
                id: id.clone(),
                kind,
                params: ParamSet::new(),
            },
        );
        id
    }

    fn connect(
        &mut self,
        src: &NodeId,
        src_port: &str,
        dst: &NodeId,
        dst_port: &str,
    ) -> Result<(), ConnectError> {
        let src_kind = self.kind_of(src)?;
        let dst_kind = self.kind_of(dst)?;

        if !src_kind.has_output(src_port) {
            return Err(ConnectError::UnknownPort {
                node_id: src.clone(),
                port: src_port.to_string(),
                direction: "output",
            });
        }
        if dst_kind.input(dst_port).is_none() {
            return Err(ConnectError::UnknownPort {
                node_id: dst.clone(),
                port: dst_port.to_string(),
                direction: "input",
            });
        }
        if let Some(existing) = self.producer(dst, dst_port) {
            return Err(ConnectError::InputOccupied {
                node_id: dst.clone(),
                port: dst_port.to_string(),
                producer: existing.clone(),
            });
        }

        self.feeds
            .entry(dst.clone())
            .or_default()
            .insert(dst_port.to_string(), src.clone());

        self.edges.push(StreamEdge {
            src: src.clone(),
            src_port: src_port.to_string(),
            dst: dst.clone(),
            dst_port: dst_port.to_string(),
        });
        Ok(())
    }

    fn set_parameter(
        &mut self,
        node: &NodeId,
        name: &str,
        value: ParamValue,
    ) -> Result<(), GraphError> {
        let n = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| GraphError::UnknownNode(node.clone()))?;
        n.params.set(name, value);
        Ok(())
    }

    fn node_exists(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    fn node(&self, id: &NodeId) -> Option<Node> {
        self.nodes.get(id).cloned()
    }

    fn resolve_connections(&self, node: &NodeId) -> Vec<(String, NodeId)> {
        let Some(kind) = self.nodes.get(node).map(|n| n.kind) else {
            return Vec::new();
        };
        kind.inputs()
            .iter()
            .filter_map(|port| {
                self.producer(node, port.name)
                    .map(|src| (port.name.to_string(), src.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/model.rs"]
mod tests;
