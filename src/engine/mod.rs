pub(crate) mod fingerprint;
pub(crate) mod probe;
pub(crate) mod sequence;

use crate::foundation::core::{Frame, NodeId};
use crate::foundation::error::EngineError;
use crate::graph::kind::OperatorKind;
use crate::graph::param::ParamSet;

/// What the engine is asked to evaluate: one node with its bound parameters.
#[derive(Clone, Copy, Debug)]
pub struct NodeContext<'a> {
    /// Node being evaluated.
    pub id: &'a NodeId,
    /// Operator kind of the node.
    pub kind: OperatorKind,
    /// Parameters bound against the kind schema (defaults filled in).
    pub params: &'a ParamSet,
}

/// A producer's output for the current frame, as fed into one input port.
#[derive(Debug)]
pub struct StreamInput<'a, O> {
    /// Input port the value arrives on.
    pub port: &'static str,
    /// `None` only for optional inputs that are not connected.
    pub value: Option<&'a O>,
}

impl<O> Clone for StreamInput<'_, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for StreamInput<'_, O> {}

/// External execution engine that performs the per-node work.
///
/// Contract:
/// - `dry_run == true` performs every check the real evaluation would perform but must not cause
///   any externally observable side effect (no file writes, no display updates). Repeated dry runs
///   over an unchanged graph return identical results.
/// - `inputs` follow the kind's declared input order (merge `A` before `B`).
pub trait Engine {
    /// Per-node, per-frame stream payload handed to consumers.
    type Output;

    /// Evaluate `node` at `frame`, or only check that it could be when `dry_run` is set.
    fn evaluate(
        &mut self,
        node: &NodeContext<'_>,
        frame: Frame,
        inputs: &[StreamInput<'_, Self::Output>],
        dry_run: bool,
    ) -> Result<Self::Output, EngineError>;
}

impl<E: Engine + ?Sized> Engine for &mut E {
    type Output = E::Output;

    fn evaluate(
        &mut self,
        node: &NodeContext<'_>,
        frame: Frame,
        inputs: &[StreamInput<'_, Self::Output>],
        dry_run: bool,
    ) -> Result<Self::Output, EngineError> {
        (**self).evaluate(node, frame, inputs, dry_run)
    }
}
