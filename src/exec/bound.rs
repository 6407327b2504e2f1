use std::collections::HashMap;

use crate::engine::{Engine, NodeContext, StreamInput};
use crate::foundation::core::{Frame, NodeId};
use crate::foundation::error::{EngineError, ValidationError, ValidationErrorKind};
use crate::graph::param::ParamSet;
use crate::graph::plan::{EvaluationPlan, PlannedNode};

/// A planned node whose inputs are all resolved and whose parameters are bound.
#[derive(Debug)]
pub(crate) struct BoundNode<'p> {
    pub(crate) node: &'p PlannedNode,
    pub(crate) params: ParamSet,
    /// `(port, index of the producer in plan order)`, in declared port order.
    inputs: Vec<(&'static str, Option<usize>)>,
}

pub(crate) fn plan_index(plan: &EvaluationPlan) -> HashMap<&NodeId, usize> {
    plan.nodes()
        .iter()
        .enumerate()
        .map(|(i, n)| (&n.id, i))
        .collect()
}

/// Static checks for one node: input connectivity, then parameter binding.
///
/// Failures are attributed to `frame`.
pub(crate) fn bind_node<'p>(
    node: &'p PlannedNode,
    index: &HashMap<&NodeId, usize>,
    frame: Frame,
) -> Result<BoundNode<'p>, ValidationError> {
    if let Some(missing) = node
        .inputs
        .iter()
        .find(|i| i.required && i.producer.is_none())
    {
        return Err(ValidationError::at(
            ValidationErrorKind::UnresolvedInput {
                port: missing.port.to_string(),
            },
            node.id.clone(),
            frame,
        ));
    }

    let params = node.bound_params().map_err(|e| {
        ValidationError::at(
            ValidationErrorKind::BadParameter {
                param: e.param().to_string(),
                reason: e.to_string(),
            },
            node.id.clone(),
            frame,
        )
    })?;

    let inputs = node
        .inputs
        .iter()
        .map(|i| (i.port, i.producer.as_ref().and_then(|p| index.get(p).copied())))
        .collect();

    Ok(BoundNode {
        node,
        params,
        inputs,
    })
}

/// Feed `node` its producers' outputs for `frame` and hand it to the engine.
pub(crate) fn evaluate_node<E: Engine>(
    engine: &mut E,
    node: &BoundNode<'_>,
    outputs: &[Option<E::Output>],
    frame: Frame,
    dry_run: bool,
) -> Result<E::Output, EngineError> {
    let inputs: Vec<StreamInput<'_, E::Output>> = node
        .inputs
        .iter()
        .map(|&(port, idx)| StreamInput {
            port,
            value: idx.and_then(|i| outputs.get(i)).and_then(Option::as_ref),
        })
        .collect();

    let ctx = NodeContext {
        id: &node.node.id,
        kind: node.node.kind,
        params: &node.params,
    };
    engine.evaluate(&ctx, frame, &inputs, dry_run)
}

/// Fresh per-frame output slots, one per plan node.
pub(crate) fn frame_slots<O>(len: usize) -> Vec<Option<O>> {
    std::iter::repeat_with(|| None).take(len).collect()
}
