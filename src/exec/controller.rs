use crate::engine::Engine;
use crate::exec::bound::{evaluate_node, frame_slots};
use crate::exec::request::{ExecutionRequest, NoopObserver, Report, RunObserver, RunOptions, RunPhase};
use crate::exec::validate::{dry_run, validate};
use crate::foundation::core::FrameRange;
use crate::foundation::error::{ExecutionError, ValidationError};
use crate::graph::model::GraphCollaborator;
use crate::graph::plan::EvaluationPlan;

/// Two-phase "validate then evaluate" driver over an injected host graph and engine.
///
/// The controller holds no state between calls: every `validate`/`run` reads a fresh snapshot of
/// the graph, so edits made by the host between calls are always observed.
pub struct ExecutionController<'g, E> {
    graph: &'g dyn GraphCollaborator,
    engine: E,
}

impl<'g, E: Engine> ExecutionController<'g, E> {
    /// Drive `engine` over nodes of `graph`.
    pub fn new(graph: &'g dyn GraphCollaborator, engine: E) -> Self {
        Self { graph, engine }
    }

    /// The engine, e.g. to inspect what a run committed.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the engine between runs.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Consume the controller, returning the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Dry-run `request` over its full frame range. Never commits side effects.
    pub fn validate(&mut self, request: &ExecutionRequest) -> Result<(), ValidationError> {
        let res = validate(self.graph, &mut self.engine, request);
        if let Err(e) = &res {
            tracing::warn!(error = %e, "validation failed");
        }
        res
    }

    /// Validate, then evaluate every frame of `request` with default options.
    pub fn run(&mut self, request: &ExecutionRequest) -> Result<Report, ExecutionError> {
        self.run_with(request, &RunOptions::default(), &mut NoopObserver)
    }

    /// Validate, then evaluate frames `start..=end` in increasing order.
    ///
    /// The observer sees `Validating` first; every rejection (empty request or range, unknown
    /// node, cycle, failed dry run) ends in `Rejected` before any real engine call.
    ///
    /// Within a frame nodes run in evaluation order, each fed its producers' outputs for that
    /// frame. The first engine failure stops the run; frames completed before it stay committed.
    /// Cancellation is observed between frames only.
    #[tracing::instrument(
        skip_all,
        fields(nodes = request.node_ids.len(), start = request.start.0, end = request.end.0)
    )]
    pub fn run_with(
        &mut self,
        request: &ExecutionRequest,
        opts: &RunOptions,
        observer: &mut dyn RunObserver,
    ) -> Result<Report, ExecutionError> {
        enter(observer, RunPhase::Validating);
        let (plan, range) = match self.check(request) {
            Ok(checked) => checked,
            Err(e) => {
                tracing::warn!(error = %e, "run rejected");
                enter(observer, RunPhase::Rejected);
                return Err(e);
            }
        };
        let bound = match dry_run(&plan, range, &mut self.engine) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "run rejected by validation");
                enter(observer, RunPhase::Rejected);
                return Err(ExecutionError::ValidationFailed(e));
            }
        };

        enter(observer, RunPhase::Evaluating);
        observer.begin(range.len_frames(), plan.len());

        let mut engine_calls = 0u64;
        let mut frames_evaluated = 0u64;
        for frame in range.frames() {
            if opts.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                tracing::warn!(%frame, frames_evaluated, "run cancelled");
                enter(observer, RunPhase::Failed);
                return Err(ExecutionError::Cancelled {
                    frame,
                    frames_completed: frames_evaluated,
                });
            }

            let mut outputs = frame_slots::<E::Output>(bound.len());
            for (i, node) in bound.iter().enumerate() {
                tracing::debug!(node = %node.node.id, kind = %node.node.kind, %frame, "evaluate");
                let out = evaluate_node(&mut self.engine, node, &outputs, frame, false);
                engine_calls += 1;
                match out {
                    Ok(out) => outputs[i] = Some(out),
                    Err(cause) => {
                        tracing::warn!(node = %node.node.id, %frame, error = %cause, "runtime failure");
                        enter(observer, RunPhase::Failed);
                        return Err(ExecutionError::runtime(node.node.id.clone(), frame, cause));
                    }
                }
            }

            frames_evaluated += 1;
            observer.frame_committed(frame);
        }

        enter(observer, RunPhase::Succeeded);
        let report = Report {
            frames_evaluated,
            node_count: plan.len(),
            first_frame: range.start,
            last_frame: range.end,
            engine_calls,
        };
        tracing::info!(
            frames = report.frames_evaluated,
            nodes = report.node_count,
            calls = report.engine_calls,
            "run succeeded"
        );
        Ok(report)
    }

    /// Request-level checks that precede the dry run.
    fn check(
        &self,
        request: &ExecutionRequest,
    ) -> Result<(EvaluationPlan, FrameRange), ExecutionError> {
        if request.node_ids.is_empty() {
            return Err(ExecutionError::EmptyRequest);
        }
        let range = request.frame_range()?;
        let plan = EvaluationPlan::build(self.graph, &request.node_ids)?;
        Ok((plan, range))
    }
}

fn enter(observer: &mut dyn RunObserver, phase: RunPhase) {
    tracing::info!(%phase, "run phase");
    observer.phase_changed(phase);
}

#[cfg(test)]
#[path = "../../tests/unit/exec/controller.rs"]
mod tests;
