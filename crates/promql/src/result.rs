use crate::error::{Error, Result};

use std::collections::BTreeMap;

use indicator_domain::{Point, Sample, Series};
use serde::Deserialize;

/// A decoded query result. Only one of the four shapes is ever returned for a
/// given query.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    /// A set of series sampled at one instant.
    Vector(Vec<Sample>),

    /// A set of series over a time range.
    Matrix(Vec<Series>),

    /// A single number.
    Scalar(Point),

    /// A single string.
    String {
        /// Unix timestamp in nanoseconds.
        timestamp_ns: i64,

        /// The string value.
        value: String,
    },
}

impl QueryResult {
    /// Returns the samples if this is a vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotVector`] for any other shape.
    pub fn as_vector(self) -> Result<Vec<Sample>> {
        match self {
            Self::Vector(samples) => Ok(samples),
            _ => Err(Error::NotVector),
        }
    }

    /// Returns the series if this is a matrix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotMatrix`] for any other shape.
    pub fn as_matrix(self) -> Result<Vec<Series>> {
        match self {
            Self::Matrix(series) => Ok(series),
            _ => Err(Error::NotMatrix),
        }
    }

    /// Name of the shape as it appears in `resultType`.
    #[must_use]
    pub const fn result_type(&self) -> &'static str {
        match self {
            Self::Vector(_) => "vector",
            Self::Matrix(_) => "matrix",
            Self::Scalar(_) => "scalar",
            Self::String { .. } => "string",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<RawResult>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiResponse {
    pub(crate) fn into_result(self) -> Result<QueryResult> {
        if self.status != "success" {
            return Err(Error::Api {
                error_type: self.error_type.unwrap_or_else(|| "unknown".to_string()),
                error: self.error.unwrap_or_default(),
            });
        }

        let data = self.data.ok_or_else(|| Error::Api {
            error_type: "bad_response".to_string(),
            error: "success response carried no data".to_string(),
        })?;

        data.try_into()
    }
}

/// `[<unix seconds>, "<value>"]`
type RawPoint = (f64, String);

#[derive(Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub(crate) enum RawResult {
    Vector(Vec<RawSample>),
    Matrix(Vec<RawSeries>),
    Scalar(RawPoint),
    String(RawPoint),
}

#[derive(Deserialize)]
pub(crate) struct RawSample {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    value: RawPoint,
}

#[derive(Deserialize)]
pub(crate) struct RawSeries {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<RawPoint>,
}

impl TryFrom<RawResult> for QueryResult {
    type Error = Error;

    fn try_from(raw: RawResult) -> Result<Self> {
        Ok(match raw {
            RawResult::Vector(samples) => Self::Vector(
                samples
                    .into_iter()
                    .map(|s| {
                        Ok(Sample {
                            tags: s.metric,
                            point: point(&s.value)?,
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            RawResult::Matrix(series) => Self::Matrix(
                series
                    .into_iter()
                    .map(|s| {
                        Ok(Series {
                            tags: s.metric,
                            points: s.values.iter().map(point).collect::<Result<_>>()?,
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            RawResult::Scalar(raw) => Self::Scalar(point(&raw)?),
            RawResult::String((t, value)) => Self::String {
                timestamp_ns: seconds_to_nanos(t),
                value,
            },
        })
    }
}

fn point((t, v): &RawPoint) -> Result<Point> {
    // Rust's float parser accepts Prometheus' `NaN`, `+Inf` and `-Inf`.
    let value = v.parse::<f64>().map_err(|e| Error::Api {
        error_type: "bad_response".to_string(),
        error: format!("invalid sample value {v:?}: {e}"),
    })?;

    Ok(Point {
        timestamp_ns: seconds_to_nanos(*t),
        value,
    })
}

// The API reports millisecond resolution; rounding there avoids float noise.
#[allow(clippy::cast_possible_truncation)]
fn seconds_to_nanos(seconds: f64) -> i64 {
    (seconds * 1e3).round() as i64 * 1_000_000
}

/// Formats a nanosecond timestamp as the fractional Unix seconds the query API
/// accepts, without trailing zeros.
#[must_use]
pub fn format_timestamp(timestamp_ns: i64) -> String {
    let seconds = timestamp_ns.div_euclid(1_000_000_000);
    let nanos = timestamp_ns.rem_euclid(1_000_000_000);

    if nanos == 0 {
        seconds.to_string()
    } else {
        let fraction = format!("{nanos:09}");
        format!("{seconds}.{}", fraction.trim_end_matches('0'))
    }
}
