//! Matches instant-vector samples against indicator thresholds.
//!
//! Evaluation is a pure function of its inputs: thresholds are visited in
//! order and, for each, every sample in vector order. A sample that satisfies
//! several thresholds yields one event per threshold; callers deduplicate if
//! they need to.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::collections::BTreeMap;

use indicator_domain::{Sample, Threshold};
use serde::{Deserialize, Serialize};

/// Prefix applied to every sample tag name on emitted events.
pub const EVENT_TAG_PREFIX: &str = "event_";

/// A record that one sample satisfied one threshold.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Sample tags, each name prefixed with [`EVENT_TAG_PREFIX`].
    pub tags: BTreeMap<String, String>,

    /// The sample value that matched.
    pub value: f64,

    /// Level of the matched threshold.
    pub threshold_level: String,

    /// Value of the matched threshold.
    pub threshold_value: f64,
}

impl Event {
    fn new(sample: &Sample, threshold: &Threshold) -> Self {
        Self {
            tags: prefix_tags(&sample.tags),
            value: sample.point.value,
            threshold_level: threshold.level.clone(),
            threshold_value: threshold.value,
        }
    }
}

/// Lazily yields events in `(threshold index, sample index)` order.
///
/// The sample source is re-iterated once per threshold, so it must be
/// cloneable (slices and vector iterators are).
pub fn events<'a, I>(samples: I, thresholds: &'a [Threshold]) -> impl Iterator<Item = Event> + 'a
where
    I: IntoIterator<Item = &'a Sample>,
    I::IntoIter: Clone + 'a,
{
    let samples = samples.into_iter();

    thresholds.iter().flat_map(move |threshold| {
        samples
            .clone()
            .filter(move |sample| threshold.is_satisfied_by(sample.point.value))
            .map(move |sample| Event::new(sample, threshold))
    })
}

/// Returns every event produced by matching `vector` against `thresholds`.
#[must_use]
pub fn satisfied_events(vector: &[Sample], thresholds: &[Threshold]) -> Vec<Event> {
    events(vector, thresholds).collect()
}

fn prefix_tags(tags: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    tags.iter()
        .map(|(k, v)| (format!("{EVENT_TAG_PREFIX}{k}"), v.clone()))
        .collect()
}
