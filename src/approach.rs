use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a member's available days are turned into story points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EstimationApproach {
    /// Available days scaled by the team's historical SP focus factor.
    #[default]
    Velocity,
    /// Available hours converted to SP through an hours-per-SP ratio.
    Percentages,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown estimation approach '{0}' (expected Velocity or Percentages)")]
pub struct UnknownApproach(pub String);

impl EstimationApproach {
    pub const ALL: [EstimationApproach; 2] =
        [EstimationApproach::Velocity, EstimationApproach::Percentages];

    pub fn as_str(&self) -> &'static str {
        match self {
            EstimationApproach::Velocity => "Velocity",
            EstimationApproach::Percentages => "Percentages",
        }
    }
}

impl fmt::Display for EstimationApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EstimationApproach {
    type Err = UnknownApproach;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "velocity" => Ok(EstimationApproach::Velocity),
            "percentages" | "percentage" => Ok(EstimationApproach::Percentages),
            _ => Err(UnknownApproach(s.to_string())),
        }
    }
}
