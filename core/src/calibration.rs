// core/src/calibration.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{debug, info};
use thiserror::Error;

use crate::metrics::{calibration_fit_total, Metrics, METRICS};
use crate::models::{CalibrationPoint, CalibrationStatus, SensorCalibration};

#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("unknown sensor '{0}'")]
    UnknownSensor(String),
    #[error("need at least 2 calibration points, got {got}")]
    InsufficientPoints { got: usize },
    #[error("measured values are all identical; slope is undefined")]
    DegenerateMeasurements,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

/// Linear correction: `corrected = slope * measured + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub offset: f64,
}

impl LinearFit {
    pub const IDENTITY: Self = Self { slope: 1.0, offset: 0.0 };

    #[inline]
    pub fn apply(&self, measured: f64) -> f64 {
        self.slope * measured + self.offset
    }
}

/// Ordinary least squares with `measured` as x and `standard` as y.
pub fn fit_linear(points: &[CalibrationPoint]) -> Result<LinearFit, CalibrationError> {
    let n = points.len();
    if n < 2 {
        return Err(CalibrationError::InsufficientPoints { got: n });
    }

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for p in points {
        sum_x += p.measured;
        sum_y += p.standard;
        sum_xy += p.measured * p.standard;
        sum_x2 += p.measured * p.measured;
    }
    let nf = n as f64;

    let denom = nf * sum_x2 - sum_x * sum_x;
    if denom == 0.0 || !denom.is_finite() {
        return Err(CalibrationError::DegenerateMeasurements);
    }

    let slope = (nf * sum_xy - sum_x * sum_y) / denom;
    let offset = (sum_y - slope * sum_x) / nf;
    if !slope.is_finite() || !offset.is_finite() {
        return Err(CalibrationError::DegenerateMeasurements);
    }

    Ok(LinearFit { slope, offset })
}

/// Per-sensor calibration sessions.
#[derive(Debug, Clone, Default)]
pub struct CalibrationEngine {
    sensors: BTreeMap<String, SensorCalibration>,
}

impl CalibrationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five probes installed on the plant.
    pub fn with_default_sensors() -> Self {
        let mut engine = Self::new();
        for (id, name, unit) in [
            ("ph", "pH Sensor", "pH"),
            ("turbidity", "Turbidity", "NTU"),
            ("temperature", "Temperature", "°C"),
            ("dissolved_oxygen", "DO Sensor", "mg/L"),
            ("tds", "TDS Sensor", "ppm"),
        ] {
            engine.register(SensorCalibration::new(id, name, unit));
        }
        engine
    }

    /// Adds or replaces a sensor.
    pub fn register(&mut self, sensor: SensorCalibration) {
        self.sensors.insert(sensor.sensor_id.clone(), sensor);
    }

    pub fn sensor(&self, sensor_id: &str) -> Option<&SensorCalibration> {
        self.sensors.get(sensor_id)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &SensorCalibration> {
        self.sensors.values()
    }

    fn sensor_mut(&mut self, sensor_id: &str) -> Result<&mut SensorCalibration, CalibrationError> {
        self.sensors
            .get_mut(sensor_id)
            .ok_or_else(|| CalibrationError::UnknownSensor(sensor_id.to_string()))
    }

    pub fn start(&mut self, sensor_id: &str) -> Result<(), CalibrationError> {
        let sensor = self.sensor_mut(sensor_id)?;
        sensor.status = CalibrationStatus::Calibrating;
        info!("calibration started for {}", sensor.name);
        Ok(())
    }

    pub fn add_point(
        &mut self,
        sensor_id: &str,
        standard: f64,
        measured: f64,
    ) -> Result<usize, CalibrationError> {
        let sensor = self.sensor_mut(sensor_id)?;
        sensor.points.push(CalibrationPoint { standard, measured });
        debug!(
            "{}: point std={} meas={} ({} total)",
            sensor_id,
            standard,
            measured,
            sensor.points.len()
        );
        Ok(sensor.points.len())
    }

    /// Form-input variant: both fields must parse as numbers, nothing else is checked.
    pub fn add_point_str(
        &mut self,
        sensor_id: &str,
        standard: &str,
        measured: &str,
    ) -> Result<usize, CalibrationError> {
        let parse = |s: &str| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| CalibrationError::InvalidNumber(s.to_string()))
        };
        let standard = parse(standard)?;
        let measured = parse(measured)?;
        self.add_point(sensor_id, standard, measured)
    }

    /// Fits the sensor's points and marks it calibrated.
    /// On error the sensor keeps its previous slope/offset and stays in its current status.
    pub fn finish(&mut self, sensor_id: &str, now: DateTime<Utc>) -> Result<LinearFit, CalibrationError> {
        self.finish_with_metrics(sensor_id, now, &METRICS)
    }

    pub fn finish_with_metrics(
        &mut self,
        sensor_id: &str,
        now: DateTime<Utc>,
        metrics: &Metrics,
    ) -> Result<LinearFit, CalibrationError> {
        let sensor = self.sensor_mut(sensor_id)?;
        let fit = fit_linear(&sensor.points)?;

        sensor.slope = fit.slope;
        sensor.offset = fit.offset;
        sensor.status = CalibrationStatus::Calibrated;
        sensor.last_calibrated_at = Some(now);
        calibration_fit_total(metrics).inc();

        info!(
            "{} calibrated: slope={:.4} offset={:.4} ({} points)",
            sensor.name,
            fit.slope,
            fit.offset,
            sensor.points.len()
        );
        Ok(fit)
    }

    pub fn reset(&mut self, sensor_id: &str) -> Result<(), CalibrationError> {
        let sensor = self.sensor_mut(sensor_id)?;
        sensor.points.clear();
        sensor.slope = 1.0;
        sensor.offset = 0.0;
        sensor.status = CalibrationStatus::NeedsCalibration;
        info!("calibration reset for {}", sensor.name);
        Ok(())
    }

    /// Applies the sensor's current correction to a raw reading.
    pub fn apply(&self, sensor_id: &str, raw: f64) -> Result<f64, CalibrationError> {
        let sensor = self
            .sensors
            .get(sensor_id)
            .ok_or_else(|| CalibrationError::UnknownSensor(sensor_id.to_string()))?;
        Ok(sensor.slope * raw + sensor.offset)
    }

    /// Whole days since the last successful fit; None if never calibrated.
    pub fn days_since_calibration(
        &self,
        sensor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, CalibrationError> {
        let sensor = self
            .sensors
            .get(sensor_id)
            .ok_or_else(|| CalibrationError::UnknownSensor(sensor_id.to_string()))?;
        Ok(sensor.last_calibrated_at.map(|t| (now - t).num_days()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_point_fit_is_exact() {
        let pts = [
            CalibrationPoint { standard: 0.0, measured: 1.0 },
            CalibrationPoint { standard: 10.0, measured: 6.0 },
        ];
        let fit = fit_linear(&pts).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.offset + 2.0).abs() < 1e-12);
        assert!((fit.apply(3.5) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn single_point_is_rejected() {
        let pts = [CalibrationPoint { standard: 7.0, measured: 7.1 }];
        assert_eq!(fit_linear(&pts), Err(CalibrationError::InsufficientPoints { got: 1 }));
    }
}
