use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a member within a PI. Only used to seed the multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MemberStatus {
    Onboarding,
    Offboarding,
    #[default]
    Active,
}

impl MemberStatus {
    pub const ALL: [MemberStatus; 3] = [
        MemberStatus::Onboarding,
        MemberStatus::Offboarding,
        MemberStatus::Active,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Onboarding => "Onboarding",
            MemberStatus::Offboarding => "Offboarding",
            MemberStatus::Active => "Active",
        }
    }

    /// Multiplier a new member starts with for this status.
    pub fn default_multiplier(&self) -> f64 {
        match self {
            MemberStatus::Onboarding => 0.25,
            MemberStatus::Offboarding => -0.75,
            MemberStatus::Active => 1.0,
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onboarding" => Ok(MemberStatus::Onboarding),
            "offboarding" => Ok(MemberStatus::Offboarding),
            "active" | "" => Ok(MemberStatus::Active),
            other => Err(format!("unknown member status '{other}'")),
        }
    }
}

/// One roster row: a person's attendance and focus attributes for a PI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub role: String,
    /// Contracted business hours per day.
    pub hours: f64,
    /// Full-time-equivalent fraction in `0.0..=1.0`.
    pub fte: f64,
    /// Days off, one entry per sprint of the PI.
    pub days_off: Vec<f64>,
    pub sp_focus_factor: f64,
    pub multiplier: f64,
    #[serde(default)]
    pub status: MemberStatus,
}

impl TeamMember {
    pub fn new(name: impl Into<String>, role: impl Into<String>, num_sprints: usize) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            hours: 8.0,
            fte: 1.0,
            days_off: vec![0.0; num_sprints],
            sp_focus_factor: 0.0,
            multiplier: 1.0,
            status: MemberStatus::Active,
        }
    }

    pub fn with_status(mut self, status: MemberStatus) -> Self {
        self.status = status;
        self.multiplier = status.default_multiplier();
        self
    }

    pub fn total_days_off(&self) -> f64 {
        self.days_off.iter().sum()
    }
}
