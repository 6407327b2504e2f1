use std::collections::BTreeMap;
use std::fmt;

use crate::graph::kind::OperatorKind;

/// A single parameter value as stored by the host graph.
///
/// JSON integers deserialize as [`ParamValue::Int`], other numbers as [`ParamValue::Float`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer / enum / toggle value.
    Int(i64),
    /// Scalar value.
    Float(f64),
    /// String value (file paths, names).
    Str(String),
}

impl ParamValue {
    /// Type tag of this value.
    pub fn ty(&self) -> ParamType {
        match self {
            Self::Int(_) => ParamType::Int,
            Self::Float(_) => ParamType::Float,
            Self::Str(_) => ParamType::Str,
        }
    }

    /// Numeric view; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v),
            Self::Int(v) => Some(v as f64),
            Self::Str(_) => None,
        }
    }

    /// Integer view.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    /// String view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Type tag of a [`ParamValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Scalar.
    Float,
    /// Integer.
    Int,
    /// String.
    Str,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Str => "string",
        })
    }
}

/// Accepted value domain of a parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Domain {
    /// Any value of the declared type (floats must still be finite).
    Any,
    /// Inclusive float range.
    FloatRange {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// Float strictly greater than the bound.
    FloatAbove(f64),
    /// Float different from zero.
    NonZero,
    /// Inclusive integer range (also used for enums and 0/1 toggles).
    IntRange {
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },
    /// Non-blank string.
    NonEmpty,
}

/// Fallback used when the host graph carries no value for a parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Fallback {
    /// The parameter must be set explicitly.
    Required,
    /// Float default.
    Float(f64),
    /// Integer default.
    Int(i64),
}

/// Schema entry for one parameter of an operator kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamSpec {
    /// Parameter name, fixed per kind.
    pub name: &'static str,
    /// Declared type.
    pub ty: ParamType,
    /// Default.
    pub fallback: Fallback,
    /// Accepted values.
    pub domain: Domain,
}

impl ParamSpec {
    pub(crate) const fn float(name: &'static str, default: f64, domain: Domain) -> Self {
        Self {
            name,
            ty: ParamType::Float,
            fallback: Fallback::Float(default),
            domain,
        }
    }

    pub(crate) const fn int(name: &'static str, default: i64, min: i64, max: i64) -> Self {
        Self {
            name,
            ty: ParamType::Int,
            fallback: Fallback::Int(default),
            domain: Domain::IntRange { min, max },
        }
    }

    pub(crate) const fn toggle(name: &'static str, default: i64) -> Self {
        Self::int(name, default, 0, 1)
    }

    pub(crate) const fn required_str(name: &'static str) -> Self {
        Self {
            name,
            ty: ParamType::Str,
            fallback: Fallback::Required,
            domain: Domain::NonEmpty,
        }
    }

    fn default_value(&self) -> Option<ParamValue> {
        match self.fallback {
            Fallback::Required => None,
            Fallback::Float(v) => Some(ParamValue::Float(v)),
            Fallback::Int(v) => Some(ParamValue::Int(v)),
        }
    }

    fn coerce(&self, value: &ParamValue) -> Result<ParamValue, ParamError> {
        match (self.ty, value) {
            (ParamType::Float, ParamValue::Int(v)) => Ok(ParamValue::Float(*v as f64)),
            (ty, v) if ty == v.ty() => Ok(v.clone()),
            (expected, v) => Err(ParamError::WrongType {
                param: self.name.to_string(),
                expected,
                found: v.ty(),
            }),
        }
    }

    fn check_domain(&self, value: &ParamValue) -> Result<(), ParamError> {
        let out_of_domain = |reason: String| ParamError::OutOfDomain {
            param: self.name.to_string(),
            reason,
        };

        if let ParamValue::Float(v) = value {
            if !v.is_finite() {
                return Err(out_of_domain(format!("{v} is not finite")));
            }
        }

        match (self.domain, value) {
            (Domain::Any, _) => Ok(()),
            (Domain::FloatRange { min, max }, ParamValue::Float(v)) => {
                if *v < min || *v > max {
                    return Err(out_of_domain(format!("{v} is outside [{min}, {max}]")));
                }
                Ok(())
            }
            (Domain::FloatAbove(bound), ParamValue::Float(v)) => {
                if *v <= bound {
                    return Err(out_of_domain(format!("{v} must be > {bound}")));
                }
                Ok(())
            }
            (Domain::NonZero, ParamValue::Float(v)) => {
                if *v == 0.0 {
                    return Err(out_of_domain("must be non-zero".to_string()));
                }
                Ok(())
            }
            (Domain::IntRange { min, max }, ParamValue::Int(v)) => {
                if *v < min || *v > max {
                    return Err(out_of_domain(format!("{v} is outside [{min}, {max}]")));
                }
                Ok(())
            }
            (Domain::NonEmpty, ParamValue::Str(s)) => {
                if s.trim().is_empty() {
                    return Err(out_of_domain("must be a non-empty string".to_string()));
                }
                Ok(())
            }
            // Type already checked by `coerce`; a domain for another type is a schema bug.
            _ => Err(out_of_domain(format!(
                "domain {:?} does not apply to a {} value",
                self.domain,
                value.ty()
            ))),
        }
    }
}

/// Parameter binding failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// The kind declares no parameter with this name.
    #[error("parameter '{param}' is not declared by this operator")]
    Unknown {
        /// Offending name.
        param: String,
    },

    /// A required parameter has no value.
    #[error("parameter '{param}' is required")]
    Missing {
        /// Missing name.
        param: String,
    },

    /// The value has the wrong type.
    #[error("parameter '{param}' expects {expected}, got {found}")]
    WrongType {
        /// Offending name.
        param: String,
        /// Declared type.
        expected: ParamType,
        /// Provided type.
        found: ParamType,
    },

    /// The value is outside the accepted domain.
    #[error("parameter '{param}' is out of range: {reason}")]
    OutOfDomain {
        /// Offending name.
        param: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ParamError {
    /// Name of the offending parameter.
    pub fn param(&self) -> &str {
        match self {
            Self::Unknown { param }
            | Self::Missing { param }
            | Self::WrongType { param, .. }
            | Self::OutOfDomain { param, .. } => param,
        }
    }
}

/// Name-to-value parameter map of a node.
///
/// Ordered by name so iteration (and therefore the first reported error) is deterministic.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style [`ParamSet::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Look up a value.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Float value (integers widen).
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_f64)
    }

    /// Integer value.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_i64)
    }

    /// String value.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ParamValue)> for ParamSet {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Bind raw host parameters against the schema of `kind`.
///
/// Returns a complete set (defaults filled in, integers widened where floats are declared) or the
/// first problem found: undeclared names first (in name order), then declared parameters in schema
/// order.
pub fn bind_params(kind: OperatorKind, raw: &ParamSet) -> Result<ParamSet, ParamError> {
    let schema = kind.param_schema();

    for (name, _) in raw.iter() {
        if !schema.iter().any(|spec| spec.name == name) {
            return Err(ParamError::Unknown {
                param: name.to_string(),
            });
        }
    }

    let mut bound = ParamSet::new();
    for spec in schema {
        let value = match raw.get(spec.name) {
            Some(v) => spec.coerce(v)?,
            None => spec.default_value().ok_or_else(|| ParamError::Missing {
                param: spec.name.to_string(),
            })?,
        };
        spec.check_domain(&value)?;
        bound.set(spec.name, value);
    }
    Ok(bound)
}

#[cfg(test)]
#[path = "../../tests/unit/graph/param.rs"]
mod tests;
