use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Comparison applied between a sample value and a threshold value.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "String", rename_all = "lowercase")]
pub enum Operator {
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Equal.
    Eq,
    /// Not equal.
    Neq,
    /// Greater than or equal.
    Gte,
    /// Greater than.
    Gt,
}

impl Operator {
    /// All operators, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Lt,
        Self::Lte,
        Self::Eq,
        Self::Neq,
        Self::Gte,
        Self::Gt,
    ];

    /// Returns whether `value <op> threshold` holds.
    ///
    /// Any NaN operand yields `false` for every operator, including `Neq`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn matches(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Lt => value < threshold,
            Self::Lte => value <= threshold,
            Self::Eq => value == threshold,
            Self::Neq => value < threshold || value > threshold,
            Self::Gte => value >= threshold,
            Self::Gt => value > threshold,
        }
    }

    /// Lowercase wire name of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gte => "gte",
            Self::Gt => "gt",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an operator name is not one of the six known operators.
#[derive(Debug, thiserror::Error)]
#[error("invalid threshold operator: {0}")]
pub struct InvalidOperator(pub String);

impl FromStr for Operator {
    type Err = InvalidOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InvalidOperator(s.to_string()))
    }
}

impl TryFrom<String> for Operator {
    type Error = InvalidOperator;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A severity level attached to a comparison against a fixed value.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Threshold {
    /// Free-form severity, e.g. `critical` or `warning`.
    pub level: String,

    /// The comparison to apply.
    pub operator: Operator,

    /// The value samples are compared against. Always finite.
    #[serde(deserialize_with = "deserialize_finite")]
    pub value: f64,
}

impl Threshold {
    /// Creates a threshold.
    pub fn new(level: impl Into<String>, operator: Operator, value: f64) -> Self {
        Self {
            level: level.into(),
            operator,
            value,
        }
    }

    /// Returns whether a sample value satisfies this threshold.
    #[must_use]
    pub fn is_satisfied_by(&self, value: f64) -> bool {
        self.operator.matches(value, self.value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

fn deserialize_finite<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n,
        NumberOrString::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| de::Error::custom(format!("invalid threshold value {s:?}: {e}")))?,
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(de::Error::custom(format!(
            "threshold value must be finite, got {value}"
        )))
    }
}
