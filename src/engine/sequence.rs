//! Frame-sequence path handling for read and write nodes.
//!
//! A file path may contain runs of `#`; each run is replaced by the frame number zero-padded to
//! the run length (`plate.####.png` at frame 7 is `plate.0007.png`). Numbers longer than the run
//! are written in full.

use crate::foundation::error::EngineError;

/// Behaviour of a read node for frames outside its `[start_frame, end_frame]` sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutOfRangeMode {
    /// Repeat the nearest sequence end.
    Hold,
    /// Wrap around to the other end.
    Loop,
    /// Ping-pong back and forth over the sequence.
    Bounce,
    /// Produce an empty (black) frame.
    Black,
    /// Refuse the frame.
    Error,
}

impl OutOfRangeMode {
    /// Decode the integer stored in `param` (0 hold, 1 loop, 2 bounce, 3 black, 4 error).
    pub fn from_param(param: &str, v: i64) -> Result<Self, EngineError> {
        match v {
            0 => Ok(Self::Hold),
            1 => Ok(Self::Loop),
            2 => Ok(Self::Bounce),
            3 => Ok(Self::Black),
            4 => Ok(Self::Error),
            other => Err(EngineError::bad_parameter(
                param,
                format!("unknown out-of-range mode {other}"),
            )),
        }
    }
}

/// Which file (if any) a read node shows for a timeline frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFrame {
    /// Frame number of the sequence file to read.
    File(i64),
    /// No file; the stream is black.
    Black,
}

/// Source sequence of a read node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sequence {
    /// First file frame.
    pub start: i64,
    /// Last file frame.
    pub end: i64,
    /// Mode for frames before `start`.
    pub before: OutOfRangeMode,
    /// Mode for frames after `end`.
    pub after: OutOfRangeMode,
}

impl Sequence {
    /// Map a timeline frame onto the sequence.
    pub fn map(&self, frame: i64) -> Result<SourceFrame, EngineError> {
        if self.start > self.end {
            return Err(EngineError::bad_parameter(
                "start_frame",
                format!(
                    "start_frame {} is after end_frame {}",
                    self.start, self.end
                ),
            ));
        }
        if frame < self.start {
            self.apply(self.before, frame, "before_frame")
        } else if frame > self.end {
            self.apply(self.after, frame, "after_frame")
        } else {
            Ok(SourceFrame::File(frame))
        }
    }

    fn apply(
        &self,
        mode: OutOfRangeMode,
        frame: i64,
        param: &str,
    ) -> Result<SourceFrame, EngineError> {
        // i128 so sequences spanning most of the i64 range cannot overflow.
        let (start, end) = (i128::from(self.start), i128::from(self.end));
        let len = end - start + 1;
        let offset = i128::from(frame) - start;
        let mapped = match mode {
            OutOfRangeMode::Hold => frame.clamp(self.start, self.end),
            OutOfRangeMode::Loop => self.in_sequence(start + offset.rem_euclid(len))?,
            OutOfRangeMode::Bounce if len == 1 => self.start,
            OutOfRangeMode::Bounce => {
                let period = 2 * (len - 1);
                let o = offset.rem_euclid(period);
                self.in_sequence(start + if o < len { o } else { period - o })?
            }
            OutOfRangeMode::Black => return Ok(SourceFrame::Black),
            OutOfRangeMode::Error => {
                return Err(EngineError::bad_parameter(
                    param,
                    format!(
                        "frame {frame} is outside the sequence [{}, {}]",
                        self.start, self.end
                    ),
                ));
            }
        };
        Ok(SourceFrame::File(mapped))
    }

    fn in_sequence(&self, v: i128) -> Result<i64, EngineError> {
        i64::try_from(v).map_err(|_| {
            EngineError::bad_parameter(
                "end_frame",
                format!(
                    "sequence [{}, {}] is too long to map frames onto",
                    self.start, self.end
                ),
            )
        })
    }
}

/// Substitute every `#` run in `pattern` with `frame`.
pub fn frame_path(pattern: &str, frame: i64) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '#' {
            out.push(c);
            continue;
        }
        let mut width: usize = 1;
        while chars.next_if_eq(&'#').is_some() {
            width += 1;
        }
        if frame < 0 {
            out.push('-');
        }
        out.push_str(&format!("{:0width$}", frame.unsigned_abs()));
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/engine/sequence.rs"]
mod tests;
