use std::fmt;

use crate::foundation::error::ExecutionError;

/// Host-assigned node identifier.
///
/// Identifiers are opaque strings; the only structural requirement is that they are non-empty.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Wrap any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return `true` when the identifier is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Absolute frame number in host timeline space. May be negative.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Frame(pub i64);

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive frame range `[start, end]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// First frame (inclusive).
    pub start: Frame,
    /// Last frame (inclusive).
    pub end: Frame,
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: Frame, end: Frame) -> Result<Self, ExecutionError> {
        if start.0 > end.0 {
            return Err(ExecutionError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range covering exactly one frame.
    pub fn single(frame: Frame) -> Self {
        Self {
            start: frame,
            end: frame,
        }
    }

    /// Number of frames contained in the range (always >= 1).
    pub fn len_frames(self) -> u64 {
        self.end.0.abs_diff(self.start.0).saturating_add(1)
    }

    /// Return `true` when `f` lies inside `[start, end]`.
    pub fn contains(self, f: Frame) -> bool {
        self.start.0 <= f.0 && f.0 <= self.end.0
    }

    /// Iterate frames in strictly increasing order.
    pub fn frames(self) -> impl Iterator<Item = Frame> {
        (self.start.0..=self.end.0).map(Frame)
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
