use crate::error::Error;

use indicator_evaluator::Event;
use prometheus::{IntCounterVec, Opts, Registry};
use tracing::info;

/// Sink for threshold events.
pub trait EventEmitter: Send + Sync + 'static {
    /// Delivers one event.
    fn emit(&self, event: Event);
}

/// Writes each event as a structured log record.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogEmitter;

impl EventEmitter for LogEmitter {
    fn emit(&self, event: Event) {
        info!(
            level = %event.threshold_level,
            value = event.value,
            threshold = event.threshold_value,
            tags = ?event.tags,
            "threshold satisfied"
        );
    }
}

/// Counts events per threshold level.
#[derive(Clone, Debug)]
pub struct CounterEmitter {
    events: IntCounterVec,
}

impl CounterEmitter {
    /// Registers `indicator_threshold_events{level}` with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric with the same name is already registered.
    pub fn new(registry: &Registry) -> Result<Self, Error> {
        let events = IntCounterVec::new(
            Opts::new(
                "indicator_threshold_events",
                "Samples that satisfied an indicator threshold",
            ),
            &["level"],
        )?;
        registry.register(Box::new(events.clone()))?;

        Ok(Self { events })
    }

    /// Current count for `level`.
    #[must_use]
    pub fn count(&self, level: &str) -> u64 {
        self.events.with_label_values(&[level]).get()
    }
}

impl EventEmitter for CounterEmitter {
    fn emit(&self, event: Event) {
        self.events
            .with_label_values(&[event.threshold_level.as_str()])
            .inc();
    }
}

impl<A: EventEmitter, B: EventEmitter> EventEmitter for (A, B) {
    fn emit(&self, event: Event) {
        self.0.emit(event.clone());
        self.1.emit(event);
    }
}
