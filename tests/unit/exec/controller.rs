use super::*;

use crate::engine::{NodeContext, StreamInput};
use crate::exec::request::CancelToken;
use crate::foundation::core::{Frame, NodeId};
use crate::foundation::error::EngineError;
use crate::graph::kind::{INPUT_PORT, OUTPUT_PORT, OperatorKind};
use crate::graph::model::MemoryGraph;
use crate::graph::param::ParamValue;

#[derive(Default)]
struct Counter {
    dry: u64,
    real: Vec<(String, i64)>,
    fail_real_at: Option<i64>,
    fail_dry_at: Option<i64>,
}

impl Engine for Counter {
    type Output = ();

    fn evaluate(
        &mut self,
        node: &NodeContext<'_>,
        frame: Frame,
        _inputs: &[StreamInput<'_, ()>],
        dry_run: bool,
    ) -> Result<(), EngineError> {
        if dry_run {
            self.dry += 1;
            if self.fail_dry_at == Some(frame.0) {
                return Err(EngineError::failed("plate missing"));
            }
            return Ok(());
        }
        self.real.push((node.id.to_string(), frame.0));
        if self.fail_real_at == Some(frame.0) {
            return Err(EngineError::failed("device lost"));
        }
        Ok(())
    }
}

#[derive(Default)]
struct Phases {
    seen: Vec<RunPhase>,
    begun: Option<(u64, usize)>,
    committed: Vec<Frame>,
    cancel_after: Option<(Frame, CancelToken)>,
}

impl RunObserver for Phases {
    fn begin(&mut self, total_frames: u64, node_count: usize) {
        self.begun = Some((total_frames, node_count));
    }

    fn frame_committed(&mut self, frame: Frame) {
        self.committed.push(frame);
        if let Some((at, token)) = &self.cancel_after {
            if *at == frame {
                token.cancel();
            }
        }
    }

    fn phase_changed(&mut self, phase: RunPhase) {
        self.seen.push(phase);
    }
}

fn two_node_graph() -> (MemoryGraph, NodeId) {
    let mut g = MemoryGraph::new();
    let r = g.create_node(OperatorKind::Read);
    g.set_parameter(&r, "file_path", ParamValue::from("a.png")).unwrap();
    let p = g.create_node(OperatorKind::ImagePlane);
    g.connect(&r, OUTPUT_PORT, &p, INPUT_PORT).unwrap();
    (g, p)
}

#[test]
fn successful_run_walks_the_phase_machine() {
    let (g, p) = two_node_graph();
    let mut ctl = ExecutionController::new(&g, Counter::default());
    let mut obs = Phases::default();

    let report = ctl
        .run_with(&ExecutionRequest::new([p], 1, 3), &RunOptions::default(), &mut obs)
        .unwrap();

    assert_eq!(
        obs.seen,
        vec![RunPhase::Validating, RunPhase::Evaluating, RunPhase::Succeeded]
    );
    assert_eq!(obs.begun, Some((3, 2)));
    assert_eq!(obs.committed, vec![Frame(1), Frame(2), Frame(3)]);
    assert_eq!(report.engine_calls, 6);
    assert_eq!(ctl.engine().dry, 6);
}

#[test]
fn rejected_run_never_begins() {
    let mut g = MemoryGraph::new();
    let p = g.create_node(OperatorKind::ImagePlane);
    let mut ctl = ExecutionController::new(&g, Counter::default());
    let mut obs = Phases::default();

    let err = ctl
        .run_with(&ExecutionRequest::new([p], 1, 3), &RunOptions::default(), &mut obs)
        .unwrap_err();

    assert!(matches!(err, ExecutionError::ValidationFailed(_)));
    assert_eq!(obs.seen, vec![RunPhase::Validating, RunPhase::Rejected]);
    assert!(obs.begun.is_none());
    assert!(ctl.engine().real.is_empty());
}

#[test]
fn late_dry_run_failure_blocks_every_frame() {
    let (g, p) = two_node_graph();
    let engine = Counter {
        fail_dry_at: Some(3),
        ..Counter::default()
    };
    let mut ctl = ExecutionController::new(&g, engine);
    let mut obs = Phases::default();

    let err = ctl
        .run_with(&ExecutionRequest::new([p], 1, 4), &RunOptions::default(), &mut obs)
        .unwrap_err();

    assert!(matches!(err, ExecutionError::ValidationFailed(ref v) if v.frame == Some(Frame(3))));
    assert!(err.is_side_effect_free());
    assert!(ctl.engine().real.is_empty());
    assert!(obs.committed.is_empty());
    assert_eq!(obs.seen, vec![RunPhase::Validating, RunPhase::Rejected]);
}

#[test]
fn request_level_rejections_still_end_in_rejected() {
    let (mut g, p) = two_node_graph();
    let grade = g.create_node(OperatorKind::ColorGrade);
    g.connect(&grade, OUTPUT_PORT, &grade, INPUT_PORT).unwrap();

    let cases = [
        (ExecutionRequest::new(Vec::<NodeId>::new(), 1, 2), "empty request"),
        (ExecutionRequest::new([p.clone()], 3, 1), "empty range"),
        (ExecutionRequest::new(["ghost"], 1, 2), "unknown node"),
        (ExecutionRequest::new([grade.clone()], 1, 2), "cycle"),
    ];
    for (req, label) in cases {
        let mut ctl = ExecutionController::new(&g, Counter::default());
        let mut obs = Phases::default();
        let err = ctl
            .run_with(&req, &RunOptions::default(), &mut obs)
            .unwrap_err();
        assert!(err.is_side_effect_free(), "{label}: {err:?}");
        assert_eq!(
            obs.seen,
            vec![RunPhase::Validating, RunPhase::Rejected],
            "{label}"
        );
        assert_eq!(ctl.engine().dry, 0, "{label}");
        assert!(obs.begun.is_none(), "{label}");
    }
}

#[test]
fn cancellation_is_observed_between_frames() {
    let (g, p) = two_node_graph();
    let mut ctl = ExecutionController::new(&g, Counter::default());
    let token = CancelToken::new();
    let mut obs = Phases {
        cancel_after: Some((Frame(2), token.clone())),
        ..Phases::default()
    };
    let opts = RunOptions {
        cancel: Some(token),
        ..RunOptions::default()
    };

    let err = ctl
        .run_with(&ExecutionRequest::new([p], 1, 5), &opts, &mut obs)
        .unwrap_err();

    assert_eq!(
        err,
        ExecutionError::Cancelled {
            frame: Frame(3),
            frames_completed: 2
        }
    );
    assert_eq!(obs.committed, vec![Frame(1), Frame(2)]);
    assert_eq!(obs.seen.last(), Some(&RunPhase::Failed));
    assert_eq!(ctl.engine().real.len(), 4);
}

#[test]
fn runtime_failure_reports_node_and_frame() {
    let (g, p) = two_node_graph();
    let engine = Counter {
        fail_real_at: Some(2),
        ..Counter::default()
    };
    let mut ctl = ExecutionController::new(&g, engine);

    let err = ctl.run(&ExecutionRequest::new([p], 1, 4)).unwrap_err();
    assert_eq!(
        err,
        ExecutionError::runtime(NodeId::from("read1"), Frame(2), EngineError::failed("device lost"))
    );
    let engine = ctl.into_engine();
    assert_eq!(
        engine.real,
        vec![
            ("read1".to_string(), 1),
            ("image_plane1".to_string(), 1),
            ("read1".to_string(), 2)
        ]
    );
}

#[test]
fn controller_accepts_a_borrowed_engine() {
    let (g, p) = two_node_graph();
    let mut engine = Counter::default();
    {
        let mut ctl = ExecutionController::new(&g, &mut engine);
        ctl.validate(&ExecutionRequest::new([p], 1, 1)).unwrap();
    }
    assert_eq!(engine.dry, 2);
    assert!(engine.real.is_empty());
}
