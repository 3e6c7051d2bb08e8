// JSON-in / JSON-out entry points for the Python dashboard backend.
// The plain `*_from_json` helpers are always built (and tested); the PyO3
// wrappers only exist with the `python` feature.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{self as json, json as json_value};
use serde_path_to_error as spte;

use crate::calibration::fit_linear;
use crate::estimator::{QualityEstimator, RuleBasedEstimator};
use crate::models::{CalibrationPoint, WaterQualitySample};
use crate::scoring::parameter_findings;
use crate::validation::sample_violations;

fn parse<'de, T: Deserialize<'de>>(what: &str, s: &'de str) -> Result<T, String> {
    let mut de = json::Deserializer::from_str(s);
    spte::deserialize(&mut de).map_err(|e| {
        let path = e.path().to_string();
        format!("parse error ({what}) at {path}: {}", e.inner())
    })
}

/// `{"ph":..,...}` -> `{"score":..,"status":..,"source":"rule_based","findings":[..]}`
pub fn score_water_quality_from_json(json_in: &str) -> Result<String, String> {
    let sample: WaterQualitySample = parse("WaterQualitySample", json_in)?;
    let p = RuleBasedEstimator
        .estimate(&sample)
        .map_err(|e| e.to_string())?;
    let out = json_value!({
        "score": p.score,
        "status": p.status,
        "source": p.source,
        "timestamp": p.timestamp,
        "findings": parameter_findings(&sample),
    });
    Ok(out.to_string())
}

#[derive(Debug, Deserialize)]
struct FitIn {
    points: Vec<CalibrationPoint>,
}

#[derive(Debug, Serialize)]
struct FitOut {
    ok: bool,
    slope: f64,
    offset: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// `{"points":[{"standard":..,"measured":..}]}` -> `{"ok":..,"slope":..,"offset":..}`.
/// A rejected fit still answers with the identity correction and `ok:false`.
pub fn fit_calibration_from_json(json_in: &str) -> Result<String, String> {
    let input: FitIn = parse("FitIn", json_in)?;
    let out = match fit_linear(&input.points) {
        Ok(fit) => FitOut { ok: true, slope: fit.slope, offset: fit.offset, reason: None },
        Err(e) => FitOut { ok: false, slope: 1.0, offset: 0.0, reason: Some(e.to_string()) },
    };
    json::to_string(&out).map_err(|e| e.to_string())
}

/// Sample -> `{"valid":bool,"errors":[..]}`
pub fn validate_sample_from_json(json_in: &str) -> Result<String, String> {
    let sample: WaterQualitySample = parse("WaterQualitySample", json_in)?;
    let errors: Vec<String> = sample_violations(&sample).iter().map(|e| e.to_string()).collect();
    let out = json_value!({
        "valid": errors.is_empty(),
        "errors": errors,
        "checked_at": Utc::now(),
    });
    Ok(out.to_string())
}

#[cfg(feature = "python")]
mod bindings {
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;
    use pyo3::wrap_pyfunction;

    // Accept either a JSON string or any json.dumps-able Python object.
    fn payload_to_json(py: Python<'_>, payload: &PyAny) -> PyResult<String> {
        if let Ok(s) = payload.extract::<&str>() {
            return Ok(s.to_owned());
        }
        let json_mod = py
            .import("json")
            .map_err(|e| PyValueError::new_err(format!("failed to import json: {e}")))?;
        json_mod
            .call_method1("dumps", (payload,))
            .and_then(|o| o.extract::<String>())
            .map_err(|e| PyValueError::new_err(format!("json.dumps failed: {e}")))
    }

    #[pyfunction]
    fn score_water_quality_json(py: Python<'_>, payload: &PyAny) -> PyResult<String> {
        let json_in = payload_to_json(py, payload)?;
        super::score_water_quality_from_json(&json_in).map_err(PyValueError::new_err)
    }

    #[pyfunction]
    fn fit_calibration_json(py: Python<'_>, payload: &PyAny) -> PyResult<String> {
        let json_in = payload_to_json(py, payload)?;
        super::fit_calibration_from_json(&json_in).map_err(PyValueError::new_err)
    }

    #[pyfunction]
    fn validate_sample_json(py: Python<'_>, payload: &PyAny) -> PyResult<String> {
        let json_in = payload_to_json(py, payload)?;
        super::validate_sample_from_json(&json_in).map_err(PyValueError::new_err)
    }

    #[pymodule]
    fn plantwatch_core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(score_water_quality_json, m)?)?;
        m.add_function(wrap_pyfunction!(fit_calibration_json, m)?)?;
        m.add_function(wrap_pyfunction!(validate_sample_json, m)?)?;
        Ok(())
    }
}
