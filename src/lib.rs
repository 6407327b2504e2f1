#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Validate-then-execute controller for compositing operator graphs.
//!
//! The host owns the scene graph and exposes it through [`GraphCollaborator`]; an [`Engine`]
//! performs the per-node work. [`ExecutionController`] resolves the requested nodes into an
//! [`EvaluationPlan`], dry-runs it over the whole frame range, and only then evaluates frames in
//! increasing order.
//!
//! ```no_run
//! use compgraph::{
//!     ExecutionController, ExecutionRequest, GraphCollaborator, MemoryGraph, OperatorKind,
//!     ProbeEngine,
//! };
//!
//! let mut graph = MemoryGraph::new();
//! let read = graph.create_node(OperatorKind::Read);
//! graph.set_parameter(&read, "file_path", "plate.####.png".into())?;
//! let plane = graph.create_node(OperatorKind::ImagePlane);
//! graph.connect(&read, "out", &plane, "in")?;
//!
//! let mut ctl = ExecutionController::new(&graph, ProbeEngine::new());
//! let report = ctl.run(&ExecutionRequest::new([plane], 1, 24))?;
//! println!("{} frames", report.frames_evaluated);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub(crate) mod engine;
pub(crate) mod exec;
pub(crate) mod foundation;
pub(crate) mod graph;
pub mod scene;

pub use engine::fingerprint::StreamFingerprint;
pub use engine::probe::{CommittedWrite, ProbeEngine, ProbeStream, Viewport, ViewportEntry};
pub use engine::sequence::{OutOfRangeMode, Sequence, SourceFrame, frame_path};
pub use engine::{Engine, NodeContext, StreamInput};
pub use exec::controller::ExecutionController;
pub use exec::request::{
    CancelToken, ExecutionRequest, NoopObserver, Report, RunObserver, RunOptions, RunPhase,
};
pub use exec::validate::validate;
pub use foundation::core::{Frame, FrameRange, NodeId};
pub use foundation::error::{
    ConnectError, EngineError, ExecutionError, GraphError, SceneError, ValidationError,
    ValidationErrorKind,
};
pub use graph::kind::{
    INPUT_PORT, InputPort, MERGE_INPUT_A, MERGE_INPUT_B, OUTPUT_PORT, OperatorKind,
};
pub use graph::model::{GraphCollaborator, MemoryGraph, Node, StreamEdge};
pub use graph::param::{
    Domain, Fallback, ParamError, ParamSet, ParamSpec, ParamType, ParamValue, bind_params,
};
pub use graph::plan::{EvaluationPlan, PlannedInput, PlannedNode, resolve, topological_order};
pub use scene::{SceneConnection, SceneDoc, SceneNode};
