use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One closed sprint of a team's velocity history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintVelocity {
    pub team: String,
    pub year: i32,
    /// PI label as it appears in the history, e.g. `PI 24-01`.
    pub pi: String,
    pub sprint: String,
    pub velocity: f64,
}

impl SprintVelocity {
    pub fn new(
        team: impl Into<String>,
        year: i32,
        pi: impl Into<String>,
        sprint: impl Into<String>,
        velocity: f64,
    ) -> Self {
        Self {
            team: team.into(),
            year,
            pi: pi.into(),
            sprint: sprint.into(),
            velocity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageVelocity {
    pub average: f64,
    pub first_sprint: String,
    pub last_sprint: String,
    pub sprint_count: usize,
}

impl AverageVelocity {
    pub fn summary(&self) -> String {
        format!(
            "Average velocity calculated from {} to {} over {} sprints.",
            self.first_sprint, self.last_sprint, self.sprint_count
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VelocityError {
    #[error("no velocity data available for team '{0}'")]
    NoData(String),
    #[error("insufficient sprint data available for team '{team}' before {pi}")]
    InsufficientSprints { team: String, pi: String },
}

/// History label of a PI id; `24-01` becomes `PI 24-01`, labels pass through.
pub fn pi_history_label(pi: &str) -> String {
    let trimmed = pi.trim();
    if trimmed.starts_with("PI ") {
        trimmed.to_string()
    } else {
        format!("PI {trimmed}")
    }
}

fn history_order(a: &SprintVelocity, b: &SprintVelocity) -> Ordering {
    a.year
        .cmp(&b.year)
        .then_with(|| a.pi.cmp(&b.pi))
        .then_with(|| a.sprint.cmp(&b.sprint))
}

/// Mean velocity of the `window` sprints that precede the anchor sprint.
///
/// The anchor is the last recorded sprint of `pi`, or of the team's latest PI
/// when `pi` has no history yet. The anchor itself is not averaged.
pub fn average_velocity(
    history: &[SprintVelocity],
    team: &str,
    pi: &str,
    window: usize,
) -> Result<AverageVelocity, VelocityError> {
    let mut rows: Vec<&SprintVelocity> = history.iter().filter(|row| row.team == team).collect();
    if rows.is_empty() {
        return Err(VelocityError::NoData(team.to_string()));
    }
    rows.sort_by(|a, b| history_order(a, b));

    let label = pi_history_label(pi);
    let anchor = match rows.iter().rposition(|row| row.pi == label) {
        Some(idx) => idx,
        None => {
            let latest_pi = &rows[rows.len() - 1].pi;
            rows.iter()
                .rposition(|row| &row.pi == latest_pi)
                .unwrap_or(rows.len() - 1)
        }
    };

    let start = anchor.saturating_sub(window);
    let relevant = &rows[start..anchor];
    let (Some(first), Some(last)) = (relevant.first(), relevant.last()) else {
        return Err(VelocityError::InsufficientSprints {
            team: team.to_string(),
            pi: label,
        });
    };

    let total: f64 = relevant.iter().map(|row| row.velocity).sum();
    Ok(AverageVelocity {
        average: total / relevant.len() as f64,
        first_sprint: first.sprint.clone(),
        last_sprint: last.sprint.clone(),
        sprint_count: relevant.len(),
    })
}

/// Daily share of a member's time that historically turned into story points.
pub fn sp_focus_factor(avg_velocity: f64, avg_duration: f64, avg_team_members: f64) -> f64 {
    if avg_duration > 0.0 && avg_team_members > 0.0 {
        avg_velocity / avg_duration / avg_team_members
    } else {
        0.0
    }
}
