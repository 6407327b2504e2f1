//! JSON scene description used to populate a [`MemoryGraph`].
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "plate", "kind": "read", "params": { "file_path": "plate.####.png" } },
//!     { "id": "view", "kind": "image-plane" }
//!   ],
//!   "connections": [ { "from": "plate", "to": "view", "port": "in" } ]
//! }
//! ```

use crate::foundation::core::NodeId;
use crate::foundation::error::SceneError;
use crate::graph::kind::{INPUT_PORT, OUTPUT_PORT, OperatorKind};
use crate::graph::model::{GraphCollaborator, MemoryGraph, Node};
use crate::graph::param::ParamSet;

/// Nodes and connections of a scene file.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDoc {
    /// Nodes, created in order.
    #[serde(default)]
    pub nodes: Vec<SceneNode>,
    /// Connections, made after every node exists.
    #[serde(default)]
    pub connections: Vec<SceneConnection>,
}

/// One node entry.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneNode {
    /// Node identifier, unique in the scene.
    pub id: NodeId,
    /// Operator kind.
    pub kind: OperatorKind,
    /// Raw parameter values.
    #[serde(default)]
    pub params: ParamSet,
}

/// `from.from_port -> to.port`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneConnection {
    /// Producer node.
    pub from: NodeId,
    /// Producer output port, `out` by default.
    #[serde(default = "default_output")]
    pub from_port: String,
    /// Consumer node.
    pub to: NodeId,
    /// Consumer input port, `in` by default.
    #[serde(default = "default_input")]
    pub port: String,
}

fn default_output() -> String {
    OUTPUT_PORT.to_string()
}

fn default_input() -> String {
    INPUT_PORT.to_string()
}

impl SceneDoc {
    /// Build an in-memory graph through the collaborator API.
    ///
    /// Parameters are stored as given; they are checked against the kind schema only when the
    /// graph is validated.
    pub fn build(&self) -> Result<MemoryGraph, SceneError> {
        let mut graph = MemoryGraph::new();
        for (index, n) in self.nodes.iter().enumerate() {
            if n.id.is_blank() {
                return Err(SceneError::BlankId { index });
            }
            let replaced = graph.insert_node(Node {
                id: n.id.clone(),
                kind: n.kind,
                params: n.params.clone(),
            });
            if replaced.is_some() {
                return Err(SceneError::DuplicateNode(n.id.clone()));
            }
        }
        for c in &self.connections {
            graph.connect(&c.from, &c.from_port, &c.to, &c.port)?;
        }
        tracing::debug!(
            nodes = self.nodes.len(),
            connections = self.connections.len(),
            "scene graph built"
        );
        Ok(graph)
    }
}

#[cfg(test)]
#[path = "../tests/unit/scene.rs"]
mod tests;
