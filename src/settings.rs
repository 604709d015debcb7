use crate::approach::EstimationApproach;
use crate::calculations::capacity::CapacityParams;
use crate::roles::RoleDefaultPolicy;
use serde::{Deserialize, Serialize};

/// Planner-wide inputs that every capacity computation reads explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningSettings {
    /// Working days per sprint.
    pub sprint_duration: f64,
    /// Hours of work per story point.
    pub sp_conversion: f64,
    pub pi_buffer: f64,
    pub num_sprints: usize,
    pub default_fte: f64,
    pub default_hours: f64,
    /// Sprints averaged for the velocity baseline.
    pub velocity_window: usize,
    pub role_default: RoleDefaultPolicy,
}

impl Default for PlanningSettings {
    fn default() -> Self {
        Self {
            sprint_duration: 10.0,
            sp_conversion: 8.0,
            pi_buffer: 0.1,
            num_sprints: 5,
            default_fte: 1.0,
            default_hours: 8.0,
            velocity_window: 6,
            role_default: RoleDefaultPolicy::NotRelevant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("{field} must be a finite number >= 0 (got {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be between 0 and 1 (got {value})")]
    OutOfUnitRange { field: &'static str, value: f64 },
    #[error("velocity_window must cover at least one sprint")]
    EmptyVelocityWindow,
    #[error("unknown setting '{0}'")]
    UnknownKey(String),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

fn non_negative(field: &'static str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::Negative { field, value })
    }
}

fn unit_range(field: &'static str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::OutOfUnitRange { field, value })
    }
}

impl PlanningSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        non_negative("sprint_duration", self.sprint_duration)?;
        non_negative("sp_conversion", self.sp_conversion)?;
        non_negative("default_hours", self.default_hours)?;
        unit_range("pi_buffer", self.pi_buffer)?;
        unit_range("default_fte", self.default_fte)?;
        if self.velocity_window == 0 {
            return Err(SettingsError::EmptyVelocityWindow);
        }
        Ok(())
    }

    pub fn capacity_params(&self, approach: EstimationApproach) -> CapacityParams {
        CapacityParams {
            approach,
            sp_conversion: self.sp_conversion,
            sprint_duration: self.sprint_duration,
            num_sprints: self.num_sprints,
            pi_buffer: self.pi_buffer,
        }
    }

    /// Set one field from its textual form, validating the result.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let mut next = self.clone();
        match key {
            "sprint_duration" => next.sprint_duration = value.parse().map_err(|_| invalid())?,
            "sp_conversion" => next.sp_conversion = value.parse().map_err(|_| invalid())?,
            "pi_buffer" => next.pi_buffer = value.parse().map_err(|_| invalid())?,
            "num_sprints" => next.num_sprints = value.parse().map_err(|_| invalid())?,
            "default_fte" => next.default_fte = value.parse().map_err(|_| invalid())?,
            "default_hours" => next.default_hours = value.parse().map_err(|_| invalid())?,
            "velocity_window" => next.velocity_window = value.parse().map_err(|_| invalid())?,
            "role_default" => {
                next.role_default = match value {
                    "not_relevant" => RoleDefaultPolicy::NotRelevant,
                    "legacy_developer_tester" => RoleDefaultPolicy::LegacyDeveloperTester,
                    _ => return Err(invalid()),
                }
            }
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}
