use std::fmt;
use std::str::FromStr;

use crate::graph::param::{Domain, ParamSpec};

/// Name of the single stream output every operator exposes.
pub const OUTPUT_PORT: &str = "out";
/// Name of the single stream input of one-input operators.
pub const INPUT_PORT: &str = "in";
/// Merge foreground input. Always resolved before [`MERGE_INPUT_B`].
pub const MERGE_INPUT_A: &str = "A";
/// Merge background input.
pub const MERGE_INPUT_B: &str = "B";

/// Closed set of compositing operator kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatorKind {
    /// Image (sequence) source.
    Read,
    /// Per-channel color grade.
    ColorGrade,
    /// Lens distortion / undistortion.
    LensDistort,
    /// 2D geometric transform.
    Transform,
    /// Two-input merge (`A` over/add/multiply `B`).
    Merge,
    /// Display card in the host viewport.
    ImagePlane,
    /// Binds a host camera to the stream.
    CameraReference,
    /// Image (sequence) writer.
    Write,
    /// Window crop.
    Crop,
    /// Power-of-two resample.
    Resample,
}

/// Declared stream input of an operator kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputPort {
    /// Port name.
    pub name: &'static str,
    /// Whether validation requires an incoming edge.
    pub required: bool,
}

const NO_INPUTS: &[InputPort] = &[];
const ONE_INPUT: &[InputPort] = &[InputPort {
    name: INPUT_PORT,
    required: true,
}];
const OPTIONAL_INPUT: &[InputPort] = &[InputPort {
    name: INPUT_PORT,
    required: false,
}];
const MERGE_INPUTS: &[InputPort] = &[
    InputPort {
        name: MERGE_INPUT_A,
        required: true,
    },
    InputPort {
        name: MERGE_INPUT_B,
        required: true,
    },
];
const ONE_OUTPUT: &[&str] = &[OUTPUT_PORT];

const ENABLE: ParamSpec = ParamSpec::toggle("enable", 1);

const READ_PARAMS: &[ParamSpec] = &[
    ENABLE,
    ParamSpec::required_str("file_path"),
    ParamSpec::int("start_frame", 1, i64::MIN, i64::MAX),
    ParamSpec::int("end_frame", 1, i64::MIN, i64::MAX),
    ParamSpec::int("before_frame", 0, 0, 4),
    ParamSpec::int("after_frame", 0, 0, 4),
];

const GRADE_PARAMS: &[ParamSpec] = &[
    ENABLE,
    ParamSpec::float("multiply_r", 1.0, Domain::FloatRange { min: 0.0, max: f64::MAX }),
    ParamSpec::float("multiply_g", 1.0, Domain::FloatRange { min: 0.0, max: f64::MAX }),
    ParamSpec::float("multiply_b", 1.0, Domain::FloatRange { min: 0.0, max: f64::MAX }),
    ParamSpec::float("multiply_a", 1.0, Domain::FloatRange { min: 0.0, max: f64::MAX }),
    ParamSpec::float("offset_r", 0.0, Domain::Any),
    ParamSpec::float("offset_g", 0.0, Domain::Any),
    ParamSpec::float("offset_b", 0.0, Domain::Any),
    ParamSpec::float("offset_a", 0.0, Domain::Any),
    ParamSpec::float("mix", 1.0, Domain::FloatRange { min: 0.0, max: 1.0 }),
];

const LENS_PARAMS: &[ParamSpec] = &[
    ENABLE,
    ParamSpec::int("direction", 0, 0, 1),
    ParamSpec::float("distortion", 0.0, Domain::Any),
    ParamSpec::float("quartic_distortion", 0.0, Domain::Any),
    ParamSpec::float("anamorphic_squeeze", 1.0, Domain::FloatAbove(0.0)),
    ParamSpec::float("lens_center_offset_x", 0.0, Domain::Any),
    ParamSpec::float("lens_center_offset_y", 0.0, Domain::Any),
];

const TRANSFORM_PARAMS: &[ParamSpec] = &[
    ENABLE,
    ParamSpec::float("translate_x", 0.0, Domain::Any),
    ParamSpec::float("translate_y", 0.0, Domain::Any),
    ParamSpec::float("rotate", 0.0, Domain::Any),
    ParamSpec::float("rotate_center_x", 0.0, Domain::Any),
    ParamSpec::float("rotate_center_y", 0.0, Domain::Any),
    ParamSpec::float("scale_x", 1.0, Domain::NonZero),
    ParamSpec::float("scale_y", 1.0, Domain::NonZero),
];

const MERGE_PARAMS: &[ParamSpec] = &[
    ENABLE,
    ParamSpec::int("mode", 1, 0, 2),
    ParamSpec::float("mix", 1.0, Domain::FloatRange { min: 0.0, max: 1.0 }),
];

const IMAGE_PLANE_PARAMS: &[ParamSpec] = &[
    ENABLE,
    ParamSpec::float("card_depth", 1.0, Domain::FloatAbove(0.0)),
    ParamSpec::float("card_size_x", 1.0, Domain::FloatAbove(0.0)),
    ParamSpec::float("card_size_y", 1.0, Domain::FloatAbove(0.0)),
    ParamSpec::int("card_resolution_x", 16, 1, 1024),
    ParamSpec::int("card_resolution_y", 16, 1, 1024),
];

const CAMERA_PARAMS: &[ParamSpec] = &[ENABLE, ParamSpec::required_str("camera")];

const WRITE_PARAMS: &[ParamSpec] = &[ENABLE, ParamSpec::required_str("file_path")];

const CROP_PARAMS: &[ParamSpec] = &[
    ENABLE,
    ParamSpec::int("window_min_x", 0, i64::MIN, i64::MAX),
    ParamSpec::int("window_min_y", 0, i64::MIN, i64::MAX),
    ParamSpec::int("window_max_x", 1920, i64::MIN, i64::MAX),
    ParamSpec::int("window_max_y", 1080, i64::MIN, i64::MAX),
    ParamSpec::toggle("reformat", 0),
    ParamSpec::toggle("black_outside", 0),
    ParamSpec::toggle("intersect", 0),
];

const RESAMPLE_PARAMS: &[ParamSpec] = &[
    ENABLE,
    ParamSpec::int("factor", 0, -4, 4),
    ParamSpec::toggle("interpolate", 0),
];

impl OperatorKind {
    /// Every kind, in declaration order.
    pub const ALL: [OperatorKind; 10] = [
        Self::Read,
        Self::ColorGrade,
        Self::LensDistort,
        Self::Transform,
        Self::Merge,
        Self::ImagePlane,
        Self::CameraReference,
        Self::Write,
        Self::Crop,
        Self::Resample,
    ];

    /// Stream inputs in resolution order.
    pub fn inputs(self) -> &'static [InputPort] {
        match self {
            Self::Read => NO_INPUTS,
            Self::Merge => MERGE_INPUTS,
            Self::CameraReference => OPTIONAL_INPUT,
            Self::ColorGrade
            | Self::LensDistort
            | Self::Transform
            | Self::ImagePlane
            | Self::Write
            | Self::Crop
            | Self::Resample => ONE_INPUT,
        }
    }

    /// Stream outputs.
    pub fn outputs(self) -> &'static [&'static str] {
        ONE_OUTPUT
    }

    /// Fixed parameter schema.
    pub fn param_schema(self) -> &'static [ParamSpec] {
        match self {
            Self::Read => READ_PARAMS,
            Self::ColorGrade => GRADE_PARAMS,
            Self::LensDistort => LENS_PARAMS,
            Self::Transform => TRANSFORM_PARAMS,
            Self::Merge => MERGE_PARAMS,
            Self::ImagePlane => IMAGE_PLANE_PARAMS,
            Self::CameraReference => CAMERA_PARAMS,
            Self::Write => WRITE_PARAMS,
            Self::Crop => CROP_PARAMS,
            Self::Resample => RESAMPLE_PARAMS,
        }
    }

    /// Look up a declared input port.
    pub fn input(self, name: &str) -> Option<InputPort> {
        self.inputs().iter().copied().find(|p| p.name == name)
    }

    /// Return `true` when `name` is a declared output port.
    pub fn has_output(self, name: &str) -> bool {
        self.outputs().contains(&name)
    }

    /// Return `true` for kinds that have no stream input.
    pub fn is_source(self) -> bool {
        self.inputs().is_empty()
    }

    /// Stable kebab-case name (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::ColorGrade => "color-grade",
            Self::LensDistort => "lens-distort",
            Self::Transform => "transform",
            Self::Merge => "merge",
            Self::ImagePlane => "image-plane",
            Self::CameraReference => "camera-reference",
            Self::Write => "write",
            Self::Crop => "crop",
            Self::Resample => "resample",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown operator kind '{s}'"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/kind.rs"]
mod tests;
