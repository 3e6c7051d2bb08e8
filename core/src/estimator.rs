use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::metrics::{
    estimator_cache_hit_total, estimator_cache_miss_total, estimator_fallback_total,
    estimator_remote_total, Metrics, METRICS,
};
use crate::models::{PredictionSource, QualityPrediction, WaterQualitySample};
use crate::scoring::fallback_score;

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("inference service returned HTTP {0}")]
    Status(u16),
    #[error("could not decode inference response: {0}")]
    Decode(String),
    #[error("no percentage found in model response")]
    NoScore { raw: String },
    #[error("estimator unavailable")]
    Unavailable,
}

/// Anything that can turn a sample into a quality prediction.
pub trait QualityEstimator {
    fn estimate(&self, sample: &WaterQualitySample) -> Result<QualityPrediction, EstimatorError>;

    fn name(&self) -> &'static str;
}

impl<E: QualityEstimator + ?Sized> QualityEstimator for Box<E> {
    fn estimate(&self, sample: &WaterQualitySample) -> Result<QualityPrediction, EstimatorError> {
        (**self).estimate(sample)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Deterministic scorer; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedEstimator;

impl QualityEstimator for RuleBasedEstimator {
    fn estimate(&self, sample: &WaterQualitySample) -> Result<QualityPrediction, EstimatorError> {
        Ok(QualityPrediction::new(
            fallback_score(sample),
            PredictionSource::RuleBased,
            None,
        ))
    }

    fn name(&self) -> &'static str {
        "rule_based"
    }
}

/// Tries `primary`; any error is logged and `fallback` answers instead.
pub struct TryRemoteThenFallback<P, F> {
    primary: P,
    fallback: F,
    metrics: &'static Metrics,
}

impl<P, F> TryRemoteThenFallback<P, F>
where
    P: QualityEstimator,
    F: QualityEstimator,
{
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback, metrics: &METRICS }
    }

    pub fn with_metrics(primary: P, fallback: F, metrics: &'static Metrics) -> Self {
        Self { primary, fallback, metrics }
    }
}

impl<P, F> QualityEstimator for TryRemoteThenFallback<P, F>
where
    P: QualityEstimator,
    F: QualityEstimator,
{
    fn estimate(&self, sample: &WaterQualitySample) -> Result<QualityPrediction, EstimatorError> {
        match self.primary.estimate(sample) {
            Ok(p) => {
                estimator_remote_total(self.metrics).inc();
                Ok(p)
            }
            Err(e) => {
                warn!(
                    "{} failed ({}), using {}",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                estimator_fallback_total(self.metrics).inc();
                let mut p = self.fallback.estimate(sample)?;
                // keep the unparsable text around for the operator
                if let EstimatorError::NoScore { raw } = e {
                    p.raw_response.get_or_insert(raw);
                }
                Ok(p)
            }
        }
    }

    fn name(&self) -> &'static str {
        "try_remote_then_fallback"
    }
}

type SampleKey = [OrderedFloat<f64>; 8];

fn sample_key(s: &WaterQualitySample) -> SampleKey {
    s.named_values().map(|(_, v)| OrderedFloat(v))
}

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<SampleKey, QualityPrediction>,
    // insertion order, oldest first
    order: VecDeque<SampleKey>,
}

/// Memoises model predictions per identical sample, oldest entries evicted first.
/// Rule-based answers are never stored, so a recovered remote is asked again.
pub struct CachedEstimator<E> {
    inner: E,
    cache: Arc<Mutex<CacheState>>,
    capacity: usize,
    metrics: &'static Metrics,
}

impl<E: QualityEstimator> CachedEstimator<E> {
    pub fn new(inner: E) -> Self {
        Self::with_metrics(inner, &METRICS)
    }

    pub fn with_metrics(inner: E, metrics: &'static Metrics) -> Self {
        Self {
            inner,
            cache: Arc::new(Mutex::new(CacheState::default())),
            capacity: DEFAULT_CACHE_CAPACITY,
            metrics,
        }
    }

    /// Caps the number of stored predictions (at least 1).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut c) = self.cache.lock() {
            c.entries.clear();
            c.order.clear();
        }
    }
}

impl<E: QualityEstimator> QualityEstimator for CachedEstimator<E> {
    fn estimate(&self, sample: &WaterQualitySample) -> Result<QualityPrediction, EstimatorError> {
        let key = sample_key(sample);
        {
            let cache = self.cache.lock().map_err(|_| EstimatorError::Unavailable)?;
            if let Some(hit) = cache.entries.get(&key) {
                estimator_cache_hit_total(self.metrics).inc();
                debug!("prediction cache hit");
                return Ok(hit.clone());
            }
        }

        // lock is not held across the (possibly remote) call
        let fresh = self.inner.estimate(sample)?;
        estimator_cache_miss_total(self.metrics).inc();
        if fresh.source == PredictionSource::RuleBased {
            return Ok(fresh);
        }
        if let Ok(mut cache) = self.cache.lock() {
            if cache.entries.insert(key, fresh.clone()).is_none() {
                cache.order.push_back(key);
            }
            while cache.entries.len() > self.capacity {
                match cache.order.pop_front() {
                    Some(old) => {
                        cache.entries.remove(&old);
                    }
                    None => break,
                }
            }
        }
        Ok(fresh)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
