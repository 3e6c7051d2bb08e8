//! Headless core of the plant monitoring dashboard: sensor calibration,
//! water-quality scoring with a remote model and rule-based fallback,
//! IoT feed polling, change notifications, validation, reports and settings.

pub mod calibration;
pub mod cli;
pub mod config;
pub mod estimator;
pub mod events;
pub mod feed;
pub mod inference_api;
pub mod metrics;
pub mod models;
pub mod py;
pub mod report;
pub mod retry;
pub mod scoring;
pub mod storage;
pub mod validation;

pub use calibration::{fit_linear, CalibrationEngine, CalibrationError, LinearFit};
pub use config::PlantConfig;
pub use estimator::{
    CachedEstimator, EstimatorError, QualityEstimator, RuleBasedEstimator, TryRemoteThenFallback,
};
pub use events::{ChangeEvent, ChangeKind, EventBus, Subscription};
pub use inference_api::{extract_percentage, InferenceClient, RemoteEstimator};
pub use models::{
    CalibrationPoint, CalibrationStatus, QualityPrediction, QualityStatus, SensorCalibration,
    WaterQualitySample, WaterReading,
};
pub use scoring::fallback_score;
pub use storage::{load_settings, save_settings, AppSettings, SettingsStore, Theme};

/// Remote model first, rule-based scorer when it fails.
pub fn default_estimator(cfg: &PlantConfig) -> TryRemoteThenFallback<RemoteEstimator, RuleBasedEstimator> {
    TryRemoteThenFallback::new(RemoteEstimator::from_config(&cfg.inference), RuleBasedEstimator)
}
