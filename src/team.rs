use crate::approach::EstimationApproach;
use crate::calculations::velocity::{AverageVelocity, sp_focus_factor};
use serde::{Deserialize, Serialize};

/// Planning parameters a team settled on for one PI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPiRecord {
    pub team: String,
    pub pi: String,
    pub average_velocity: f64,
    /// Average sprint length in working days the velocity was measured over.
    pub average_duration: f64,
    pub average_team_members: u32,
    pub sp_focus_factor: f64,
    pub approach: EstimationApproach,
    pub sp_conversion: f64,
}

impl TeamPiRecord {
    pub fn new(team: impl Into<String>, pi: impl Into<String>, approach: EstimationApproach) -> Self {
        Self {
            team: team.into(),
            pi: pi.into(),
            average_velocity: 0.0,
            average_duration: 0.0,
            average_team_members: 0,
            sp_focus_factor: 0.0,
            approach,
            sp_conversion: 8.0,
        }
    }

    /// Velocity-approach record whose focus factor is derived from the baseline.
    pub fn from_velocity(
        team: impl Into<String>,
        pi: impl Into<String>,
        velocity: &AverageVelocity,
        average_duration: f64,
        average_team_members: u32,
        sp_conversion: f64,
    ) -> Self {
        let mut record = Self::new(team, pi, EstimationApproach::Velocity);
        record.average_velocity = velocity.average;
        record.average_duration = average_duration;
        record.average_team_members = average_team_members;
        record.sp_conversion = sp_conversion;
        record.recompute_focus_factor();
        record
    }

    pub fn recompute_focus_factor(&mut self) {
        self.sp_focus_factor = sp_focus_factor(
            self.average_velocity,
            self.average_duration,
            f64::from(self.average_team_members),
        );
    }

    pub fn matches(&self, team: &str, pi: &str) -> bool {
        self.team == team && self.pi == pi
    }
}

/// Upsert keyed by team and PI. Returns `true` when an existing record was replaced.
pub fn upsert_team_record(records: &mut Vec<TeamPiRecord>, record: TeamPiRecord) -> bool {
    match records
        .iter_mut()
        .find(|existing| existing.matches(&record.team, &record.pi))
    {
        Some(existing) => {
            *existing = record;
            true
        }
        None => {
            records.push(record);
            false
        }
    }
}

pub fn find_team_record<'a>(
    records: &'a [TeamPiRecord],
    team: &str,
    pi: &str,
) -> Option<&'a TeamPiRecord> {
    records.iter().find(|record| record.matches(team, pi))
}

/// Record of `team` with the greatest PI label.
pub fn latest_team_record<'a>(records: &'a [TeamPiRecord], team: &str) -> Option<&'a TeamPiRecord> {
    records
        .iter()
        .filter(|record| record.team == team)
        .max_by(|a, b| a.pi.cmp(&b.pi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_record_derives_focus_factor() {
        let velocity = AverageVelocity {
            average: 40.0,
            first_sprint: "S1".into(),
            last_sprint: "S6".into(),
            sprint_count: 6,
        };
        let record = TeamPiRecord::from_velocity("Falcon", "24-02", &velocity, 10.0, 8, 8.0);
        assert_eq!(record.sp_focus_factor, 0.5);
        assert_eq!(record.approach, EstimationApproach::Velocity);
    }

    #[test]
    fn upsert_replaces_by_team_and_pi() {
        let mut records = Vec::new();
        assert!(!upsert_team_record(
            &mut records,
            TeamPiRecord::new("Falcon", "24-01", EstimationApproach::Velocity)
        ));
        assert!(upsert_team_record(
            &mut records,
            TeamPiRecord::new("Falcon", "24-01", EstimationApproach::Percentages)
        ));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].approach, EstimationApproach::Percentages);
    }

    #[test]
    fn latest_record_uses_greatest_pi() {
        let records = vec![
            TeamPiRecord::new("Falcon", "24-02", EstimationApproach::Velocity),
            TeamPiRecord::new("Falcon", "24-03", EstimationApproach::Percentages),
            TeamPiRecord::new("Otter", "25-01", EstimationApproach::Velocity),
        ];
        let latest = latest_team_record(&records, "Falcon").unwrap();
        assert_eq!(latest.pi, "24-03");
        assert!(latest_team_record(&records, "Heron").is_none());
    }
}
