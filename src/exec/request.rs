use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::core::{Frame, FrameRange, NodeId};
use crate::foundation::error::ExecutionError;

/// One "evaluate these nodes over these frames" call. Built per invocation, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionRequest {
    /// Terminal nodes to evaluate, in request order.
    pub node_ids: Vec<NodeId>,
    /// First frame (inclusive).
    pub start: Frame,
    /// Last frame (inclusive).
    pub end: Frame,
}

impl ExecutionRequest {
    /// Request `node_ids` over `start..=end`.
    pub fn new<I, S>(node_ids: I, start: i64, end: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        Self {
            node_ids: node_ids.into_iter().map(Into::into).collect(),
            start: Frame(start),
            end: Frame(end),
        }
    }

    /// Validated frame range, or [`ExecutionError::EmptyRange`] when `start > end`.
    pub fn frame_range(&self) -> Result<FrameRange, ExecutionError> {
        FrameRange::new(self.start, self.end)
    }
}

/// Cooperative cancellation flag, checked by the controller between frames.
///
/// Clones share the same flag, so a host can keep one half and hand the other to
/// [`RunOptions::cancel`].
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop before its next frame.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Return `true` once [`CancelToken::cancel`] was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Options for [`ExecutionController::run`](crate::ExecutionController::run).
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Checked before each frame of the real run.
    pub cancel: Option<CancelToken>,
}

/// Lifecycle of a single `run()` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// No run in progress. A run starts here, so it is never reported as a transition.
    Idle,
    /// Request checks and the dry run over every frame.
    Validating,
    /// The request or its dry run failed; nothing was evaluated.
    Rejected,
    /// Real evaluation, frame by frame.
    Evaluating,
    /// Every frame was evaluated.
    Succeeded,
    /// A runtime failure or cancellation stopped evaluation.
    Failed,
}

impl RunPhase {
    /// Lower-case phase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Rejected => "rejected",
            Self::Evaluating => "evaluating",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Return `true` for phases a run ends in.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress hooks for hosts that display run progress.
///
/// Ordering contract: `begin` once after validation succeeds, then `frame_committed` in strictly
/// increasing frame order. `phase_changed` is called on every state transition.
pub trait RunObserver {
    /// Evaluation is about to start.
    fn begin(&mut self, _total_frames: u64, _node_count: usize) {}
    /// Every node of `frame` was evaluated.
    fn frame_committed(&mut self, _frame: Frame) {}
    /// The run entered `phase`.
    fn phase_changed(&mut self, _phase: RunPhase) {}
}

/// Observer that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Summary of a successful run.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Report {
    /// Frames fully evaluated.
    pub frames_evaluated: u64,
    /// Nodes in the evaluation plan.
    pub node_count: usize,
    /// First frame of the range.
    pub first_frame: Frame,
    /// Last frame of the range.
    pub last_frame: Frame,
    /// Real (non dry-run) engine calls made.
    pub engine_calls: u64,
}

#[cfg(test)]
#[path = "../../tests/unit/exec/request.rs"]
mod tests;
