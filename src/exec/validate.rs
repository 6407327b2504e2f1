use crate::engine::Engine;
use crate::exec::bound::{BoundNode, bind_node, evaluate_node, frame_slots, plan_index};
use crate::exec::request::ExecutionRequest;
use crate::foundation::core::FrameRange;
use crate::foundation::error::{ValidationError, ValidationErrorKind};
use crate::graph::model::GraphCollaborator;
use crate::graph::plan::EvaluationPlan;

/// Dry-run `request` against the current state of `graph`.
///
/// Every frame of the range is visited; within a frame, nodes are checked in evaluation order and
/// the first failing `(frame, node)` is returned. Input connectivity and parameter binding are
/// checked once, attributed to the first frame. The engine only ever sees `dry_run == true`, so
/// repeated calls over an unchanged graph return the same result and commit nothing.
#[tracing::instrument(
    skip_all,
    fields(nodes = request.node_ids.len(), start = request.start.0, end = request.end.0)
)]
pub fn validate<E: Engine>(
    graph: &dyn GraphCollaborator,
    engine: &mut E,
    request: &ExecutionRequest,
) -> Result<(), ValidationError> {
    if request.node_ids.is_empty() {
        return Err(ValidationError::new(ValidationErrorKind::EmptyRequest));
    }
    let range = request
        .frame_range()
        .map_err(|_| ValidationError::new(ValidationErrorKind::EmptyRange))?;
    let plan = EvaluationPlan::build(graph, &request.node_ids)?;
    dry_run(&plan, range, engine).map(|_| ())
}

/// Dry-run a resolved plan over `range`, returning the bound nodes on success.
pub(crate) fn dry_run<'p, E: Engine>(
    plan: &'p EvaluationPlan,
    range: FrameRange,
    engine: &mut E,
) -> Result<Vec<BoundNode<'p>>, ValidationError> {
    let index = plan_index(plan);
    let mut bound: Vec<BoundNode<'p>> = Vec::with_capacity(plan.len());

    for frame in range.frames() {
        let mut outputs = frame_slots::<E::Output>(plan.len());
        for (i, node) in plan.nodes().iter().enumerate() {
            if frame == range.start {
                bound.push(bind_node(node, &index, frame)?);
            }
            let out = evaluate_node(engine, &bound[i], &outputs, frame, true).map_err(|e| {
                tracing::debug!(node = %node.id, %frame, error = %e, "dry run rejected");
                ValidationError::from_engine(e, node.id.clone(), frame)
            })?;
            outputs[i] = Some(out);
        }
    }

    tracing::debug!(nodes = plan.len(), frames = range.len_frames(), "dry run passed");
    Ok(bound)
}

#[cfg(test)]
#[path = "../../tests/unit/exec/validate.rs"]
mod tests;
