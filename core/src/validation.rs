use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AlertSeverity, WaterQualitySample};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be a valid number")]
    NotANumber { field: &'static str },
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Accepted physical range per sensor parameter.
pub const SENSOR_RANGES: [(&str, f64, f64); 8] = [
    ("ph", 0.0, 14.0),
    ("turbidity", 0.0, 1000.0),
    ("temperature", -20.0, 100.0),
    ("dissolved_oxygen", 0.0, 20.0),
    ("tds", 0.0, 50000.0),
    ("conductivity", 0.0, 10000.0),
    ("chlorine", 0.0, 20.0),
    ("hardness", 0.0, 5000.0),
];

/// Every range violation in the sample (empty = valid).
pub fn sample_violations(sample: &WaterQualitySample) -> Vec<ValidationError> {
    sample
        .named_values()
        .iter()
        .zip(SENSOR_RANGES.iter())
        .filter_map(|(&(_, value), &(field, min, max))| {
            if !value.is_finite() {
                Some(ValidationError::NotANumber { field })
            } else if value < min || value > max {
                Some(ValidationError::OutOfRange { field, min, max })
            } else {
                None
            }
        })
        .collect()
}

pub fn validate_sample(sample: &WaterQualitySample) -> Result<(), Vec<ValidationError>> {
    let errors = sample_violations(sample);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineAction {
    Start,
    Stop,
    SetSpeed,
    SetMode,
}

impl std::str::FromStr for MachineAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(MachineAction::Start),
            "stop" => Ok(MachineAction::Stop),
            "set_speed" => Ok(MachineAction::SetSpeed),
            "set_mode" => Ok(MachineAction::SetMode),
            _ => Err(ValidationError::Invalid(
                "Invalid action. Must be start, stop, set_speed, or set_mode".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineCommand {
    pub machine_id: String,
    pub action: MachineAction,
    #[serde(default)]
    pub value: Option<f64>,
}

impl MachineCommand {
    pub fn parse(machine_id: &str, action: &str, value: Option<f64>) -> Result<Self, ValidationError> {
        let cmd = Self {
            machine_id: machine_id.to_string(),
            action: action.parse()?,
            value,
        };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let len = self.machine_id.chars().count();
        if len == 0 {
            return Err(ValidationError::Invalid("Machine ID is required".into()));
        }
        if len > 50 {
            return Err(ValidationError::Invalid("Machine ID is too long".into()));
        }
        if let Some(v) = self.value {
            if !v.is_finite() {
                return Err(ValidationError::NotANumber { field: "value" });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecipient {
    pub email: String,
    pub name: String,
    pub alert_types: Vec<AlertSeverity>,
}

fn local_part_ok(local: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '\'' | '+' | '-' | '.');
    !local.is_empty()
        && local.chars().all(allowed)
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
}

// labels: alphanumeric start, then alphanumerics or '-'; tld: 2+ letters
fn domain_ok(domain: &str) -> bool {
    let Some((hosts, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let label_ok = |l: &str| {
        l.chars().next().map_or(false, |c| c.is_ascii_alphanumeric())
            && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()) && hosts.split('.').all(label_ok)
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => local_part_ok(local) && domain_ok(domain),
        None => false,
    }
}

impl AlertRecipient {
    /// Trims name and email, then checks them. Returns the normalised recipient.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let email = self.email.trim().to_string();
        let name = self.name.trim().to_string();

        if !looks_like_email(&email) {
            return Err(ValidationError::Invalid("Invalid email address".into()));
        }
        if email.chars().count() > 255 {
            return Err(ValidationError::Invalid("Email is too long".into()));
        }
        if name.is_empty() {
            return Err(ValidationError::Invalid("Name is required".into()));
        }
        if name.chars().count() > 100 {
            return Err(ValidationError::Invalid("Name is too long".into()));
        }
        if self.alert_types.is_empty() {
            return Err(ValidationError::Invalid(
                "At least one alert type is required".into(),
            ));
        }

        Ok(Self { email, name, alert_types: self.alert_types })
    }
}
