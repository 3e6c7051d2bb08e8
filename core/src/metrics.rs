use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

/// Process-wide counters. Library code reports here unless a caller passes its own `Metrics`.
pub static METRICS: Lazy<Metrics> =
    Lazy::new(|| Metrics::new().expect("static metric names are valid"));

#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    estimator_remote_total: IntCounter,
    estimator_fallback_total: IntCounter,
    estimator_cache_hit_total: IntCounter,
    estimator_cache_miss_total: IntCounter,
    calibration_fit_total: IntCounter,
    fetch_retry_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        Ok(Self {
            estimator_remote_total: counter(
                "estimator_remote_total",
                "Quality predictions served by the remote model",
            )?,
            estimator_fallback_total: counter(
                "estimator_fallback_total",
                "Quality predictions served by the rule-based fallback",
            )?,
            estimator_cache_hit_total: counter(
                "estimator_cache_hit_total",
                "Prediction cache hits",
            )?,
            estimator_cache_miss_total: counter(
                "estimator_cache_miss_total",
                "Prediction cache misses",
            )?,
            calibration_fit_total: counter(
                "calibration_fit_total",
                "Successful sensor calibration fits",
            )?,
            fetch_retry_total: counter(
                "fetch_retry_total",
                "Retried fetch attempts",
            )?,
            registry,
        })
    }

    /// Prometheus text exposition of every counter.
    pub fn gather_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            log::warn!("metrics encode failed: {e}");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

pub fn estimator_remote_total(m: &Metrics) -> &IntCounter {
    &m.estimator_remote_total
}

pub fn estimator_fallback_total(m: &Metrics) -> &IntCounter {
    &m.estimator_fallback_total
}

pub fn estimator_cache_hit_total(m: &Metrics) -> &IntCounter {
    &m.estimator_cache_hit_total
}

pub fn estimator_cache_miss_total(m: &Metrics) -> &IntCounter {
    &m.estimator_cache_miss_total
}

pub fn calibration_fit_total(m: &Metrics) -> &IntCounter {
    &m.calibration_fit_total
}

pub fn fetch_retry_total(m: &Metrics) -> &IntCounter {
    &m.fetch_retry_total
}
