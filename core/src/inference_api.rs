// core/src/inference_api.rs
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use ureq::Agent;

use crate::config::InferenceConfig;
use crate::estimator::{EstimatorError, QualityEstimator};
use crate::models::{PredictionSource, QualityPrediction, WaterQualitySample};

fn digits_end(b: &[u8], from: usize) -> usize {
    b[from..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map_or(b.len(), |n| from + n)
}

// `%` after optional (unicode) whitespace at byte offset `at`
fn percent_follows(text: &str, at: usize) -> bool {
    text[at..].chars().find(|c| !c.is_whitespace()) == Some('%')
}

/// First `NN%` / `NN.N %` in a model's free-text answer.
pub fn extract_percentage(text: &str) -> Option<f64> {
    let b = text.as_bytes();
    for start in 0..b.len() {
        if !b[start].is_ascii_digit() {
            continue;
        }
        let int_end = digits_end(b, start);
        if b.get(int_end) == Some(&b'.') && b.get(int_end + 1).map_or(false, u8::is_ascii_digit) {
            let frac_end = digits_end(b, int_end + 1);
            if percent_follows(text, frac_end) {
                return text[start..frac_end].parse().ok();
            }
        }
        if percent_follows(text, int_end) {
            return text[start..int_end].parse().ok();
        }
    }
    None
}

#[derive(Debug, Clone, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPrediction {
    pub result: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChemicalDosingInput {
    pub ph: f64,
    pub turbidity: f64,
    pub temperature: f64,
    pub dissolved_oxygen: f64,
    pub tds: f64,
    pub alkalinity: f64,
    pub volume_m3: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EquipmentFailureInput {
    pub vibration: f64,
    pub temperature: f64,
    pub pressure: f64,
    pub current: f64,
    pub runtime_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterSource {
    River,
    Ground,
    Industrial,
}

impl WaterSource {
    fn code(self) -> u8 {
        match self {
            WaterSource::River => 0,
            WaterSource::Ground => 1,
            WaterSource::Industrial => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TreatmentProcessInput {
    pub sample: WaterQualitySample,
    pub flow_rate: f64,
    pub tank1_level: f64,
    pub tank2_level: f64,
    pub tank3_level: f64,
    pub hour_of_day: u8,
    pub prev_stage: u8,
    pub water_source: WaterSource,
}

fn water_quality_params(s: &WaterQualitySample) -> Value {
    json!({
        "pH": s.ph,
        "turbidity": s.turbidity,
        "temperature": s.temperature,
        "dissolved_oxygen": s.dissolved_oxygen,
        "tds": s.tds,
        "conductivity": s.conductivity,
        "chlorine": s.chlorine,
        "hardness": s.hardness,
    })
}

/// Blocking client for the hosted models.
pub struct InferenceClient {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

impl InferenceClient {
    pub fn new(cfg: &InferenceConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build();
        Self {
            agent,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
        }
    }

    /// POSTs named parameters to `endpoint` and returns the first text item of `data`.
    pub fn predict_raw(&self, endpoint: &str, params: &Value) -> Result<String, EstimatorError> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let mut req = self.agent.post(&url);
        if let Some(token) = &self.token {
            req = req.set("Authorization", &format!("Bearer {token}"));
        }

        let resp = match req.send_json(params) {
            Ok(r) => r,
            Err(ureq::Error::Status(code, _)) => return Err(EstimatorError::Status(code)),
            Err(e) => return Err(EstimatorError::Transport(e.to_string())),
        };
        let body: InferenceResponse = resp
            .into_json()
            .map_err(|e| EstimatorError::Decode(e.to_string()))?;

        let first = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EstimatorError::Decode("empty data array".into()))?;
        let text = match first {
            Value::String(s) => s,
            other => other.to_string(),
        };
        debug!("[inference] {endpoint} -> {} chars", text.len());
        Ok(text)
    }

    pub fn predict_water_quality(&self, sample: &WaterQualitySample) -> Result<String, EstimatorError> {
        self.predict_raw("predict_water_quality", &water_quality_params(sample))
    }

    pub fn predict_chemical_dosing(
        &self,
        input: &ChemicalDosingInput,
    ) -> Result<TextPrediction, EstimatorError> {
        let params = json!({
            "pH": input.ph,
            "turbidity": input.turbidity,
            "temperature": input.temperature,
            "dissolved_oxygen": input.dissolved_oxygen,
            "tds": input.tds,
            "alkalinity": input.alkalinity,
            "volume_m3": input.volume_m3,
        });
        self.text_prediction("predict_chemical_dosing", &params)
    }

    pub fn predict_equipment_failure(
        &self,
        input: &EquipmentFailureInput,
    ) -> Result<TextPrediction, EstimatorError> {
        let params = json!({
            "vibration": input.vibration,
            "temperature": input.temperature,
            "pressure": input.pressure,
            "current": input.current,
            "runtime_hours": input.runtime_hours,
        });
        self.text_prediction("predict_equipment_failure", &params)
    }

    pub fn predict_treatment_process(
        &self,
        input: &TreatmentProcessInput,
    ) -> Result<TextPrediction, EstimatorError> {
        let mut params = water_quality_params(&input.sample);
        if let Value::Object(map) = &mut params {
            map.insert("flow_rate".into(), json!(input.flow_rate));
            map.insert("tank1_level".into(), json!(input.tank1_level));
            map.insert("tank2_level".into(), json!(input.tank2_level));
            map.insert("tank3_level".into(), json!(input.tank3_level));
            map.insert("hour_of_day".into(), json!(input.hour_of_day));
            map.insert("prev_stage".into(), json!(input.prev_stage));
            map.insert("water_source".into(), json!(input.water_source.code()));
        }
        self.text_prediction("predict_treatment_process", &params)
    }

    fn text_prediction(&self, endpoint: &str, params: &Value) -> Result<TextPrediction, EstimatorError> {
        let result = self.predict_raw(endpoint, params)?;
        Ok(TextPrediction { result, timestamp: Utc::now() })
    }
}

/// Water-quality model behind the `QualityEstimator` seam.
pub struct RemoteEstimator {
    client: InferenceClient,
}

impl RemoteEstimator {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }

    pub fn from_config(cfg: &InferenceConfig) -> Self {
        Self::new(InferenceClient::new(cfg))
    }
}

impl QualityEstimator for RemoteEstimator {
    fn estimate(&self, sample: &WaterQualitySample) -> Result<QualityPrediction, EstimatorError> {
        let raw = self.client.predict_water_quality(sample)?;
        let Some(score) = extract_percentage(&raw) else {
            return Err(EstimatorError::NoScore { raw });
        };
        let score = score.clamp(0.0, 100.0);
        info!("[inference] water quality {:.1}%", score);
        Ok(QualityPrediction::new(score, PredictionSource::Remote, Some(raw)))
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
