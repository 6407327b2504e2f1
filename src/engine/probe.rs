use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::engine::fingerprint::{StableHasher, StreamFingerprint};
use crate::engine::sequence::{OutOfRangeMode, Sequence, SourceFrame, frame_path};
use crate::engine::{Engine, NodeContext, StreamInput};
use crate::foundation::core::{Frame, NodeId};
use crate::foundation::error::EngineError;
use crate::graph::kind::OperatorKind;
use crate::graph::param::ParamSet;

/// Stream payload produced by [`ProbeEngine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeStream {
    /// Identity of the stream content.
    pub fingerprint: StreamFingerprint,
    /// Pixel size, `None` for an empty (black) stream.
    pub size: Option<(u32, u32)>,
    /// Camera attached upstream by a camera-reference node.
    pub camera: Option<String>,
}

impl ProbeStream {
    fn empty(fingerprint: StreamFingerprint) -> Self {
        Self {
            fingerprint,
            size: None,
            camera: None,
        }
    }
}

/// A frame written to disk by a write node during a real run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedWrite {
    /// Write node that produced the file.
    pub node_id: NodeId,
    /// Timeline frame written.
    pub frame: Frame,
    /// Resolved target path.
    pub path: PathBuf,
    /// Identity of the written stream.
    pub fingerprint: StreamFingerprint,
}

/// What an image plane currently displays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportEntry {
    /// Frame last shown.
    pub frame: Frame,
    /// Identity of the stream shown.
    pub fingerprint: StreamFingerprint,
}

/// Display state touched by image-plane nodes in real runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    shown: BTreeMap<NodeId, ViewportEntry>,
    updates: u64,
}

impl Viewport {
    /// Latest entry shown by `plane`, if it has displayed anything.
    pub fn get(&self, plane: &NodeId) -> Option<&ViewportEntry> {
        self.shown.get(plane)
    }

    /// Number of display updates since the engine was created.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    fn show(&mut self, plane: &NodeId, entry: ViewportEntry) {
        self.shown.insert(plane.clone(), entry);
        self.updates += 1;
    }
}

/// Reference engine that checks every resource a real compositor would touch, without
/// processing pixels.
///
/// Reads probe the image header of the resolved frame file; writes check that their target
/// directory can be created. Each node yields a [`ProbeStream`] whose fingerprint folds in the
/// node parameters and its inputs, so identical graphs give identical fingerprints.
///
/// Only a real run (`dry_run == false`) has effects: write directories are created and recorded,
/// and image planes update the [`Viewport`].
#[derive(Debug, Default)]
pub struct ProbeEngine {
    base_dir: Option<PathBuf>,
    viewport: Viewport,
    writes: Vec<CommittedWrite>,
}

impl ProbeEngine {
    /// Engine resolving relative paths against the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative file paths against `dir` instead of the working directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Display state after the real runs so far.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Writes committed by real runs, in evaluation order.
    pub fn committed_writes(&self) -> &[CommittedWrite] {
        &self.writes
    }

    fn resolve_path(&self, p: String) -> PathBuf {
        let p = PathBuf::from(p);
        match &self.base_dir {
            Some(base) if p.is_relative() => base.join(p),
            _ => p,
        }
    }

    fn read(&self, params: &ParamSet, frame: Frame) -> Result<ProbeStream, EngineError> {
        let pattern = str_param(params, "file_path")?;
        let seq = Sequence {
            start: int_param(params, "start_frame")?,
            end: int_param(params, "end_frame")?,
            before: OutOfRangeMode::from_param("before_frame", int_param(params, "before_frame")?)?,
            after: OutOfRangeMode::from_param("after_frame", int_param(params, "after_frame")?)?,
        };

        let source = match seq.map(frame.0)? {
            SourceFrame::Black => {
                let mut h = StableHasher::new();
                h.write_str("read/black");
                return Ok(ProbeStream::empty(h.finish()));
            }
            SourceFrame::File(f) => f,
        };

        let path = self.resolve_path(frame_path(pattern, source));
        let (w, h) = image::image_dimensions(&path).map_err(|e| {
            EngineError::missing_resource("file_path", path.display().to_string(), e.to_string())
        })?;
        tracing::trace!(path = %path.display(), w, h, "probed read source");

        let mut hasher = StableHasher::new();
        hasher.write_str("read");
        hasher.write_str(&path.to_string_lossy());
        hasher.write_u32(w);
        hasher.write_u32(h);
        Ok(ProbeStream {
            fingerprint: hasher.finish(),
            size: Some((w, h)),
            camera: None,
        })
    }

    fn write_target(&self, params: &ParamSet, frame: Frame) -> Result<PathBuf, EngineError> {
        let pattern = str_param(params, "file_path")?;
        let path = self.resolve_path(frame_path(pattern, frame.0));

        if image::ImageFormat::from_path(&path).is_err() {
            return Err(EngineError::bad_parameter(
                "file_path",
                format!("'{}' has no supported image extension", path.display()),
            ));
        }
        if path.is_dir() {
            return Err(EngineError::bad_parameter(
                "file_path",
                format!("'{}' is a directory", path.display()),
            ));
        }
        if let Some(blocker) = blocking_ancestor(&path) {
            return Err(EngineError::missing_resource(
                "file_path",
                path.display().to_string(),
                format!("'{}' exists and is not a directory", blocker.display()),
            ));
        }
        Ok(path)
    }
}

impl Engine for ProbeEngine {
    type Output = ProbeStream;

    fn evaluate(
        &mut self,
        node: &NodeContext<'_>,
        frame: Frame,
        inputs: &[StreamInput<'_, ProbeStream>],
        dry_run: bool,
    ) -> Result<ProbeStream, EngineError> {
        let params = node.params;
        let primary = inputs.first().and_then(|i| i.value);
        let enabled = int_param(params, "enable")? != 0;

        if !enabled {
            return Ok(match primary {
                Some(s) => s.clone(),
                None => {
                    let mut h = StableHasher::new();
                    h.write_str("disabled");
                    h.write_str(node.kind.as_str());
                    ProbeStream::empty(h.finish())
                }
            });
        }

        match node.kind {
            OperatorKind::Read => self.read(params, frame),
            OperatorKind::Write => {
                let path = self.write_target(params, frame)?;
                let stream = required(primary)?.clone();
                if !dry_run {
                    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                        std::fs::create_dir_all(dir).map_err(|e| {
                            EngineError::failed(format!("create dir {}: {e}", dir.display()))
                        })?;
                    }
                    self.writes.push(CommittedWrite {
                        node_id: node.id.clone(),
                        frame,
                        path,
                        fingerprint: stream.fingerprint,
                    });
                }
                Ok(stream)
            }
            OperatorKind::ImagePlane => {
                let stream = required(primary)?.clone();
                if !dry_run {
                    self.viewport.show(
                        node.id,
                        ViewportEntry {
                            frame,
                            fingerprint: stream.fingerprint,
                        },
                    );
                }
                Ok(stream)
            }
            OperatorKind::CameraReference => {
                let camera = str_param(params, "camera")?;
                let mut h = StableHasher::new();
                h.write_str("camera");
                h.write_str(camera);
                match primary {
                    Some(s) => {
                        h.write_fingerprint(s.fingerprint);
                        Ok(ProbeStream {
                            fingerprint: h.finish(),
                            size: s.size,
                            camera: Some(camera.to_string()),
                        })
                    }
                    None => Ok(ProbeStream {
                        fingerprint: h.finish(),
                        size: None,
                        camera: Some(camera.to_string()),
                    }),
                }
            }
            OperatorKind::Merge => {
                let a = required(inputs.first().and_then(|i| i.value))?;
                let b = required(inputs.get(1).and_then(|i| i.value))?;
                let mut h = StableHasher::new();
                h.write_str("merge");
                h.write_params(params);
                h.write_fingerprint(a.fingerprint);
                h.write_fingerprint(b.fingerprint);
                let size = match (a.size, b.size) {
                    (Some((aw, ah)), Some((bw, bh))) => Some((aw.max(bw), ah.max(bh))),
                    (s, None) | (None, s) => s,
                };
                Ok(ProbeStream {
                    fingerprint: h.finish(),
                    size,
                    camera: a.camera.clone().or_else(|| b.camera.clone()),
                })
            }
            kind @ (OperatorKind::ColorGrade
            | OperatorKind::LensDistort
            | OperatorKind::Transform
            | OperatorKind::Crop
            | OperatorKind::Resample) => {
                let src = required(primary)?;
                let size = filtered_size(kind, params, src.size)?;
                let mut h = StableHasher::new();
                h.write_str(kind.as_str());
                h.write_params(params);
                h.write_fingerprint(src.fingerprint);
                Ok(ProbeStream {
                    fingerprint: h.finish(),
                    size,
                    camera: src.camera.clone(),
                })
            }
        }
    }
}

fn filtered_size(
    kind: OperatorKind,
    params: &ParamSet,
    size: Option<(u32, u32)>,
) -> Result<Option<(u32, u32)>, EngineError> {
    match kind {
        OperatorKind::Crop => {
            let (min_x, min_y) = (
                int_param(params, "window_min_x")?,
                int_param(params, "window_min_y")?,
            );
            let (max_x, max_y) = (
                int_param(params, "window_max_x")?,
                int_param(params, "window_max_y")?,
            );
            if max_x <= min_x || max_y <= min_y {
                return Err(EngineError::bad_parameter(
                    "window_max_x",
                    format!("crop window ({min_x}, {min_y})-({max_x}, {max_y}) is empty"),
                ));
            }
            if int_param(params, "reformat")? == 0 {
                return Ok(size);
            }
            let w = u32::try_from(max_x - min_x)
                .map_err(|_| EngineError::bad_parameter("window_max_x", "crop window too wide"))?;
            let h = u32::try_from(max_y - min_y)
                .map_err(|_| EngineError::bad_parameter("window_max_y", "crop window too tall"))?;
            Ok(Some((w, h)))
        }
        OperatorKind::Resample => {
            let factor = int_param(params, "factor")?;
            Ok(size.map(|(w, h)| {
                let scale = |v: u32| {
                    if factor >= 0 {
                        v.saturating_mul(1 << factor)
                    } else {
                        (v >> factor.unsigned_abs()).max(1)
                    }
                };
                (scale(w), scale(h))
            }))
        }
        _ => Ok(size),
    }
}

/// First existing ancestor of `path` that is not a directory, if any.
fn blocking_ancestor(path: &Path) -> Option<&Path> {
    path.ancestors()
        .skip(1)
        .filter(|a| !a.as_os_str().is_empty())
        .find(|a| a.exists())
        .filter(|a| !a.is_dir())
}

fn required(value: Option<&ProbeStream>) -> Result<&ProbeStream, EngineError> {
    value.ok_or_else(|| EngineError::failed("required input stream is missing"))
}

fn int_param(params: &ParamSet, name: &str) -> Result<i64, EngineError> {
    params
        .get_i64(name)
        .ok_or_else(|| EngineError::bad_parameter(name, "expected an int"))
}

fn str_param<'a>(params: &'a ParamSet, name: &str) -> Result<&'a str, EngineError> {
    params
        .get_str(name)
        .ok_or_else(|| EngineError::bad_parameter(name, "expected a string"))
}

#[cfg(test)]
#[path = "../../tests/unit/engine/probe.rs"]
mod tests;
