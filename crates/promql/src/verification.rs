use crate::client::PromqlClient;
use crate::error::Result;

use std::collections::BTreeMap;
use std::time::Duration;

use indicator_domain::Indicator;
use tracing::info;

/// Point count for one returned series.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeriesReport {
    /// Labels identifying the series.
    pub tags: BTreeMap<String, String>,

    /// Number of points returned for the series.
    pub points: usize,
}

/// Outcome of checking that an indicator's expression returns data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationReport {
    /// Indicator name.
    pub indicator: String,

    /// The expression that was run.
    pub promql: String,

    /// One entry per series in the matrix.
    pub series: Vec<SeriesReport>,
}

impl VerificationReport {
    /// Largest point count across all series, or zero if none came back.
    #[must_use]
    pub fn max_points(&self) -> usize {
        self.series.iter().map(|s| s.points).max().unwrap_or(0)
    }

    /// An indicator verifies when at least one series has data.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.max_points() > 0
    }
}

/// Runs `indicator`'s expression over `[end - lookback, end]` and reports how
/// many points each series returned.
///
/// # Errors
///
/// Returns an error if the range query fails or does not yield a matrix.
pub async fn verify_indicator(
    client: &PromqlClient,
    indicator: &Indicator,
    end_ns: i64,
    lookback: Duration,
    step: Duration,
) -> Result<VerificationReport> {
    let lookback_ns = i64::try_from(lookback.as_nanos()).unwrap_or(i64::MAX);
    let start_ns = end_ns.saturating_sub(lookback_ns);

    let matrix = client
        .query_matrix(&indicator.promql, start_ns, end_ns, step)
        .await?;

    let report = VerificationReport {
        indicator: indicator.name.clone(),
        promql: indicator.promql.clone(),
        series: matrix
            .into_iter()
            .map(|series| SeriesReport {
                points: series.points.len(),
                tags: series.tags,
            })
            .collect(),
    };

    info!(
        indicator = %report.indicator,
        series = report.series.len(),
        max_points = report.max_points(),
        "verified indicator"
    );

    Ok(report)
}
