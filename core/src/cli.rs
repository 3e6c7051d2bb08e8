use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::calibration::CalibrationEngine;
use crate::estimator::QualityEstimator;
use crate::models::{CalibrationStatus, WaterQualitySample};
use crate::report::{render, ReportData, ReportKind};
use crate::scoring::parameter_findings;

fn status_label(s: CalibrationStatus) -> &'static str {
    match s {
        CalibrationStatus::Calibrated => "calibrated",
        CalibrationStatus::NeedsCalibration => "needs calibration",
        CalibrationStatus::Calibrating => "calibrating",
    }
}

/// One line per sensor: status, correction, age of the last fit.
pub fn calibration_summary(engine: &CalibrationEngine, now: DateTime<Utc>) -> String {
    let mut out = String::from("--- Calibration ---\n");
    for s in engine.sensors() {
        let age = match s.last_calibrated_at {
            None => "never".to_string(),
            Some(t) => match (now - t).num_days() {
                0 => "today".to_string(),
                d => format!("{d}d"),
            },
        };
        let _ = writeln!(
            out,
            "{:<12} {:<18} slope={:.4} offset={:.4} points={} last={}",
            s.sensor_id,
            status_label(s.status),
            s.slope,
            s.offset,
            s.points.len(),
            age
        );
    }
    out
}

pub fn print_calibration_summary(engine: &CalibrationEngine) {
    print!("{}", calibration_summary(engine, Utc::now()));
}

/// Prediction plus the rule findings behind it.
pub fn quality_summary(
    estimator: &dyn QualityEstimator,
    sample: &WaterQualitySample,
) -> anyhow::Result<String> {
    let p = estimator.estimate(sample)?;
    let mut out = String::from("--- Water Quality ---\n");
    let _ = writeln!(out, "Score: {:.1}% ({:?}, {:?})", p.score, p.status, p.source);
    for f in parameter_findings(sample) {
        let _ = writeln!(out, "  {}={} {} (-{})", f.parameter, f.value, f.note, f.penalty);
    }
    Ok(out)
}

pub fn print_quality_summary(
    estimator: &dyn QualityEstimator,
    sample: &WaterQualitySample,
) -> anyhow::Result<()> {
    print!("{}", quality_summary(estimator, sample)?);
    Ok(())
}

pub fn print_report(kind: ReportKind, data: &ReportData) {
    println!("{}", render(kind, data));
}
