use crate::Error;
use prometheus::{histogram_opts, opts, Histogram, IntCounter, IntCounterVec, Registry};
use tokio::time::Instant;

#[derive(Clone)]
pub struct Metrics {
    pub reconciliations: IntCounter,
    pub failures: IntCounterVec,
    pub updates: IntCounter,
    pub reconcile_duration: Histogram,
}

impl Default for Metrics {
    fn default() -> Self {
        let reconcile_duration = Histogram::with_opts(
            histogram_opts!(
                "externalsecret_updater_reconcile_duration_seconds",
                "The duration of reconcile to complete in seconds"
            )
            .buckets(vec![0.01, 0.1, 0.25, 0.5, 1., 2.5, 5., 15., 60.]),
        )
        .unwrap();
        let failures = IntCounterVec::new(
            opts!(
                "externalsecret_updater_reconciliation_errors_total",
                "reconciliation errors",
            ),
            &["error"],
        )
        .unwrap();
        let reconciliations = IntCounter::new(
            "externalsecret_updater_reconciliations_total",
            "reconciliations",
        )
        .unwrap();
        let updates = IntCounter::new(
            "externalsecret_updater_updates_total",
            "ExternalSecret annotation updates issued",
        )
        .unwrap();
        Metrics {
            reconciliations,
            failures,
            updates,
            reconcile_duration,
        }
    }
}

impl Metrics {
    /// Register API metrics to start tracking them.
    pub fn register(self, registry: &Registry) -> Result<Self, prometheus::Error> {
        registry.register(Box::new(self.reconcile_duration.clone()))?;
        registry.register(Box::new(self.failures.clone()))?;
        registry.register(Box::new(self.reconciliations.clone()))?;
        registry.register(Box::new(self.updates.clone()))?;
        Ok(self)
    }

    pub fn reconcile_failure(&self, e: &Error) {
        self.failures.with_label_values(&[e.metric_label()]).inc()
    }

    pub fn count_and_measure(&self) -> ReconcileMeasurer {
        self.reconciliations.inc();
        ReconcileMeasurer {
            start: Instant::now(),
            metric: self.reconcile_duration.clone(),
        }
    }
}

/// Smart function duration measurer
///
/// Relies on Drop to calculate duration and register the observation in the histogram
pub struct ReconcileMeasurer {
    start: Instant,
    metric: Histogram,
}

impl Drop for ReconcileMeasurer {
    fn drop(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        let duration = self.start.elapsed().as_millis() as f64 / 1000.0;
        self.metric.observe(duration);
    }
}
