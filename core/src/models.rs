use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One set of the eight water-quality parameters the plant measures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterQualitySample {
    #[serde(alias = "pH")]
    pub ph: f64,
    pub turbidity: f64,   // NTU
    pub temperature: f64, // °C
    #[serde(alias = "dissolvedOxygen")]
    pub dissolved_oxygen: f64, // mg/L
    pub tds: f64,          // ppm
    pub conductivity: f64, // µS/cm
    pub chlorine: f64,     // mg/L
    pub hardness: f64,     // mg/L
}

impl WaterQualitySample {
    /// Field name / value pairs in the order the sensor feeds use (field1..field8).
    pub fn named_values(&self) -> [(&'static str, f64); 8] {
        [
            ("ph", self.ph),
            ("turbidity", self.turbidity),
            ("temperature", self.temperature),
            ("dissolved_oxygen", self.dissolved_oxygen),
            ("tds", self.tds),
            ("conductivity", self.conductivity),
            ("chlorine", self.chlorine),
            ("hardness", self.hardness),
        ]
    }
}

/// A stored reading row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterReading {
    pub id: String,
    #[serde(flatten)]
    pub sample: WaterQualitySample,
    #[serde(default)]
    pub quality_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub standard: f64,
    pub measured: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    Calibrated,
    NeedsCalibration,
    Calibrating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorCalibration {
    pub sensor_id: String,
    pub name: String,
    pub unit: String,
    pub offset: f64,
    pub slope: f64,
    pub points: Vec<CalibrationPoint>,
    pub last_calibrated_at: Option<DateTime<Utc>>,
    pub status: CalibrationStatus,
}

impl SensorCalibration {
    pub fn new(sensor_id: &str, name: &str, unit: &str) -> Self {
        Self {
            sensor_id: sensor_id.to_string(),
            name: name.to_string(),
            unit: unit.to_string(),
            offset: 0.0,
            slope: 1.0,
            points: Vec::new(),
            last_calibrated_at: None,
            status: CalibrationStatus::NeedsCalibration,
        }
    }
}

/// Quality band shown next to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            QualityStatus::Excellent
        } else if score >= 70.0 {
            QualityStatus::Good
        } else if score >= 50.0 {
            QualityStatus::Fair
        } else {
            QualityStatus::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Remote,
    RuleBased,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityPrediction {
    pub score: f64,
    pub status: QualityStatus,
    pub source: PredictionSource,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl QualityPrediction {
    pub fn new(score: f64, source: PredictionSource, raw_response: Option<String>) -> Self {
        Self {
            score,
            status: QualityStatus::from_score(score),
            source,
            timestamp: Utc::now(),
            raw_response,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentStatus {
    pub equipment_name: String,
    pub status: String,
    pub health_score: f64,
    #[serde(default)]
    pub next_maintenance: Option<DateTime<Utc>>,
}
