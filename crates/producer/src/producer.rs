use crate::emitter::EventEmitter;
use crate::error::Error;
use crate::source::VectorSource;

use std::sync::Arc;
use std::time::Duration;

use indicator_domain::Indicator;
use indicator_evaluator::events;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Options for [`Producer::start`].
pub struct ProducerOptions<S, E> {
    /// Receives every satisfied threshold.
    pub emitter: E,

    /// Indicators evaluated on every tick, in order.
    pub indicators: Vec<Indicator>,

    /// Time between ticks.
    pub interval: Duration,

    /// Evaluates each indicator's expression.
    pub source: S,
}

/// Drives the query-evaluate-emit loop.
pub struct Producer<S, E> {
    emitter: E,
    indicators: Vec<Indicator>,
    source: S,
}

/// Handle to a running producer loop.
#[derive(Debug)]
pub struct ProducerHandle {
    shutdown_token: CancellationToken,
    task_tracker: TaskTracker,
}

impl ProducerHandle {
    /// Signals the loop and waits for the in-flight tick to observe it.
    pub async fn stop(self) {
        info!("producer shutting down...");

        self.shutdown_token.cancel();
        self.task_tracker.wait().await;

        info!("producer shutdown");
    }
}

impl<S, E> Producer<S, E>
where
    S: VectorSource,
    E: EventEmitter,
{
    /// Spawns the loop. The first evaluation happens one interval from now;
    /// the loop only exits when stopped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroInterval`] if `interval` is zero.
    pub fn start(
        ProducerOptions {
            emitter,
            indicators,
            interval,
            source,
        }: ProducerOptions<S, E>,
    ) -> Result<ProducerHandle, Error> {
        if interval.is_zero() {
            return Err(Error::ZeroInterval);
        }

        let shutdown_token = CancellationToken::new();
        let task_tracker = TaskTracker::new();

        let producer = Arc::new(Self {
            emitter,
            indicators,
            source,
        });

        let token = shutdown_token.clone();
        task_tracker.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                producer.tick(&token).await;
            }
        });
        task_tracker.close();

        Ok(ProducerHandle {
            shutdown_token,
            task_tracker,
        })
    }

    async fn tick(&self, token: &CancellationToken) {
        for indicator in &self.indicators {
            let result = tokio::select! {
                biased;
                () = token.cancelled() => return,
                result = self.source.query_vector(&indicator.promql) => result,
            };

            match result {
                Ok(vector) => {
                    let mut emitted = 0usize;
                    for event in events(&vector, &indicator.thresholds) {
                        self.emitter.emit(event);
                        emitted += 1;
                    }
                    debug!(indicator = %indicator.name, samples = vector.len(), emitted, "evaluated indicator");
                }
                Err(e) => {
                    warn!(indicator = %indicator.name, error = %e, "indicator query failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use indicator_domain::{Operator, Sample, Threshold};
    use indicator_evaluator::Event;
    use parking_lot::Mutex;

    struct StubSource;

    #[async_trait]
    impl VectorSource for StubSource {
        async fn query_vector(&self, expr: &str) -> Result<Vec<Sample>, indicator_promql::Error> {
            match expr {
                "broken" => Err(indicator_promql::Error::NotVector),
                _ => Ok(vec![
                    Sample::new([("ip", "10.0.0.1")], 0, 999.0),
                    Sample::new([("ip", "10.0.0.2")], 0, 1001.0),
                ]),
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingEmitter(Arc<Mutex<Vec<Event>>>);

    impl EventEmitter for RecordingEmitter {
        fn emit(&self, event: Event) {
            self.0.lock().push(event);
        }
    }

    fn indicator(name: &str, promql: &str) -> Indicator {
        Indicator {
            name: name.to_string(),
            promql: promql.to_string(),
            thresholds: vec![Threshold::new("critical", Operator::Lt, 1000.0)],
            documentation: Default::default(),
            presentation: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_on_each_tick_despite_failing_indicator() {
        let emitter = RecordingEmitter::default();
        let handle = Producer::start(ProducerOptions {
            emitter: emitter.clone(),
            indicators: vec![indicator("broken", "broken"), indicator("latency", "latency")],
            interval: Duration::from_secs(60),
            source: StubSource,
        })
        .unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(emitter.0.lock().is_empty(), "no tick before first interval");

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(emitter.0.lock().len(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(emitter.0.lock().len(), 2);

        handle.stop().await;

        let events = emitter.0.lock().clone();
        assert!(events.iter().all(|e| e.tags["event_ip"] == "10.0.0.1"));
        assert!(events.iter().all(|e| e.threshold_level == "critical"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_loop() {
        let emitter = RecordingEmitter::default();
        let handle = Producer::start(ProducerOptions {
            emitter: emitter.clone(),
            indicators: vec![indicator("latency", "latency")],
            interval: Duration::from_secs(1),
            source: StubSource,
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.stop().await;
        let after_stop = emitter.0.lock().len();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(emitter.0.lock().len(), after_stop);
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let result = Producer::start(ProducerOptions {
            emitter: RecordingEmitter::default(),
            indicators: vec![indicator("latency", "latency")],
            interval: Duration::ZERO,
            source: StubSource,
        });

        assert!(matches!(result, Err(Error::ZeroInterval)));
    }
}
