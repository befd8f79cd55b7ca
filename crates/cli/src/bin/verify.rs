//! Checks that every indicator in a document returns data.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use indicator_cli::{Error, PromqlArgs, init_tracing, load_document};
use indicator_promql::verify_indicator;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Indicator document to verify
    #[arg(long, env = "INDICATOR_VERIFY_DOCUMENT")]
    document: PathBuf,

    /// Verify only the indicator with this name
    #[arg(long)]
    indicator: Option<String>,

    /// Seconds of history to query
    #[arg(long, default_value_t = 300, env = "INDICATOR_VERIFY_LOOKBACK_SECS")]
    lookback_secs: u64,

    /// Seconds between points in the queried range
    #[arg(long, default_value_t = 15, env = "INDICATOR_VERIFY_STEP_SECS")]
    step_secs: u64,

    #[command(flatten)]
    promql: PromqlArgs,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let args = Args::parse();
    let document = load_document(&args.document)?;
    let client = args.promql.client()?;

    let indicators = match &args.indicator {
        Some(name) => vec![
            document
                .indicator(name)
                .ok_or_else(|| Error::Config(format!("no indicator named {name}")))?,
        ],
        None => document.spec.indicators.iter().collect(),
    };

    let end_ns = Utc::now()
        .timestamp_nanos_opt()
        .ok_or_else(|| Error::Config("system clock out of range".to_string()))?;

    let mut failed = 0;
    for indicator in indicators {
        let report = verify_indicator(
            &client,
            indicator,
            end_ns,
            Duration::from_secs(args.lookback_secs),
            Duration::from_secs(args.step_secs),
        )
        .await?;

        println!(
            "{}: {} series, max {} points  [{}]",
            report.indicator,
            report.series.len(),
            report.max_points(),
            report.promql
        );
        for series in &report.series {
            println!("  {:?}: {} points", series.tags, series.points);
        }

        if !report.is_ok() {
            println!("  no data returned");
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(Error::Verification(failed));
    }

    Ok(())
}
