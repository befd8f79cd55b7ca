use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single timestamped value.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Point {
    /// Unix timestamp in nanoseconds.
    pub timestamp_ns: i64,

    /// Sample value. May be NaN or infinite as reported by the store.
    pub value: f64,
}

/// One element of an instant vector: a label set and its current point.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Sample {
    /// Label names to values.
    pub tags: BTreeMap<String, String>,

    /// The sampled point.
    pub point: Point,
}

impl Sample {
    /// Creates a sample from tag pairs.
    pub fn new<K, V>(tags: impl IntoIterator<Item = (K, V)>, timestamp_ns: i64, value: f64) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            point: Point {
                timestamp_ns,
                value,
            },
        }
    }
}

/// One element of a range matrix: a label set and its points over time.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Series {
    /// Label names to values.
    pub tags: BTreeMap<String, String>,

    /// Points in ascending time order.
    pub points: Vec<Point>,
}
