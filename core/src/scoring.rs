use serde::Serialize;

use crate::models::WaterQualitySample;

/// One penalised parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub parameter: &'static str,
    pub value: f64,
    pub penalty: f64,
    pub note: &'static str,
}

/// Every out-of-range parameter with its penalty, in scoring order.
pub fn parameter_findings(s: &WaterQualitySample) -> Vec<Finding> {
    let mut out = Vec::new();
    let mut push = |parameter, value, penalty, note| {
        out.push(Finding { parameter, value, penalty, note })
    };

    // pH: optimal 7.0-8.0, acceptable 6.5-8.5
    if s.ph < 6.5 || s.ph > 8.5 {
        push("ph", s.ph, 15.0, "outside 6.5-8.5");
    } else if s.ph < 7.0 || s.ph > 8.0 {
        push("ph", s.ph, 5.0, "outside 7.0-8.0");
    }

    // Turbidity: target < 30 NTU
    if s.turbidity > 50.0 {
        push("turbidity", s.turbidity, 20.0, "above 50 NTU");
    } else if s.turbidity > 30.0 {
        push("turbidity", s.turbidity, 10.0, "above 30 NTU");
    }

    if s.temperature < 10.0 || s.temperature > 45.0 {
        push("temperature", s.temperature, 10.0, "outside 10-45 °C");
    }

    // DO: target > 5 mg/L
    if s.dissolved_oxygen < 3.0 {
        push("dissolved_oxygen", s.dissolved_oxygen, 20.0, "below 3 mg/L");
    } else if s.dissolved_oxygen < 5.0 {
        push("dissolved_oxygen", s.dissolved_oxygen, 10.0, "below 5 mg/L");
    }

    // TDS: target < 500 ppm
    if s.tds > 800.0 {
        push("tds", s.tds, 15.0, "above 800 ppm");
    } else if s.tds > 500.0 {
        push("tds", s.tds, 8.0, "above 500 ppm");
    }

    if s.chlorine < 0.2 || s.chlorine > 2.0 {
        push("chlorine", s.chlorine, 10.0, "outside 0.2-2.0 mg/L");
    }

    out
}

/// Rule-based quality score, 0 to 100. Used when no model prediction is available.
pub fn fallback_score(s: &WaterQualitySample) -> f64 {
    let penalty: f64 = parameter_findings(s).iter().map(|f| f.penalty).sum();
    (100.0 - penalty).clamp(0.0, 100.0)
}
