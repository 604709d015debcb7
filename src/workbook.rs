use crate::approach::EstimationApproach;
use crate::calendar::{CalendarError, SprintCalendar};
use crate::calculations::capacity::{
    CapacityError, CapacityParams, CapacityResult, aggregate_team_capacity,
};
use crate::calculations::velocity::{
    AverageVelocity, SprintVelocity, VelocityError, average_velocity,
};
use crate::member::TeamMember;
use crate::portfolio::{self, AlignmentReview, Capability, PortfolioError};
use crate::report::CapacityReport;
use crate::roles::RoleRelevanceMap;
use crate::roster::{Roster, RosterEntry, RosterError};
use crate::settings::{PlanningSettings, SettingsError};
use crate::team::{self, TeamPiRecord};
use polars::prelude::PolarsError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Velocity(#[from] VelocityError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),
    #[error("team '{team}' has no members in PI {pi}")]
    NoMembers { team: String, pi: String },
}

/// Role relevance chosen for one team in one PI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub team: String,
    pub pi: String,
    pub roles: RoleRelevanceMap,
}

/// One line of the PI overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamCapacitySummary {
    pub team: String,
    pub approach: EstimationApproach,
    pub members: usize,
    pub pi_total: f64,
    pub pi_total_buffered: f64,
    pub sprint_totals_buffered: Vec<f64>,
}

/// Everything a planner edits: settings, roster, team records, role relevance,
/// velocity history and the capability portfolio.
#[derive(Debug, Clone, Default)]
pub struct PlanningWorkbook {
    settings: PlanningSettings,
    roster: Roster,
    team_records: Vec<TeamPiRecord>,
    role_assignments: Vec<RoleAssignment>,
    velocity_history: Vec<SprintVelocity>,
    capabilities: Vec<Capability>,
}

impl PlanningWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: PlanningSettings) -> Result<Self, WorkbookError> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::default()
        })
    }

    pub fn settings(&self) -> &PlanningSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: PlanningSettings) -> Result<(), WorkbookError> {
        settings.validate()?;
        info!(
            sprint_duration = settings.sprint_duration,
            num_sprints = settings.num_sprints,
            pi_buffer = settings.pi_buffer,
            "updated planning settings"
        );
        self.settings = settings;
        Ok(())
    }

    pub fn update_setting(&mut self, key: &str, value: &str) -> Result<(), WorkbookError> {
        self.settings.set(key, value)?;
        info!(key, value, "updated planning setting");
        Ok(())
    }

    /// Take sprint count and sprint duration from a PI calendar.
    pub fn apply_sprint_calendar(&mut self, calendar: &SprintCalendar) -> Result<(), WorkbookError> {
        let mut settings = self.settings.clone();
        settings.num_sprints = calendar.num_sprints;
        settings.sprint_duration = calendar.average_sprint_duration()?;
        self.set_settings(settings)
    }

    // Roster

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn replace_roster(&mut self, roster: Roster) {
        self.roster = roster;
    }

    /// Fresh member seeded with the configured hours, FTE and sprint count.
    pub fn new_member(&self, name: impl Into<String>, role: impl Into<String>) -> TeamMember {
        let mut member = TeamMember::new(name, role, self.settings.num_sprints);
        member.hours = self.settings.default_hours;
        member.fte = self.settings.default_fte;
        member
    }

    /// Like [`Self::new_member`], but a member joining a team whose record
    /// uses the velocity approach starts with that record's focus factor.
    pub fn new_team_member(
        &self,
        team: &str,
        pi: &str,
        name: impl Into<String>,
        role: impl Into<String>,
    ) -> TeamMember {
        let mut member = self.new_member(name, role);
        if let Some(factor) = self.velocity_focus_factor(team, pi) {
            member.sp_focus_factor = factor;
        }
        member
    }

    fn velocity_focus_factor(&self, team: &str, pi: &str) -> Option<f64> {
        self.team_record(team, pi)
            .filter(|record| record.approach == EstimationApproach::Velocity)
            .map(|record| record.sp_focus_factor)
    }

    pub fn upsert_member(&mut self, team: &str, pi: &str, member: TeamMember) -> Result<(), WorkbookError> {
        debug!(team, pi, member = %member.name, "upserting member");
        self.roster.upsert(RosterEntry::new(team, pi, member))?;
        Ok(())
    }

    pub fn delete_member(&mut self, team: &str, pi: &str, name: &str) -> Result<(), WorkbookError> {
        self.roster.delete(team, pi, name)?;
        info!(team, pi, member = name, "deleted member");
        Ok(())
    }

    pub fn members(&self, team: &str, pi: &str) -> Result<Vec<TeamMember>, WorkbookError> {
        Ok(self.roster.members(team, pi)?)
    }

    pub fn copy_pi(
        &mut self,
        team: &str,
        source_pi: &str,
        target_pi: &str,
        overwrite: bool,
    ) -> Result<usize, WorkbookError> {
        let copied = self.roster.copy_pi(team, source_pi, target_pi, overwrite)?;
        if let Some(factor) = self.velocity_focus_factor(team, target_pi) {
            self.roster.set_focus_factor(team, target_pi, factor)?;
        }
        info!(team, source_pi, target_pi, copied, "copied roster to new PI");
        Ok(copied)
    }

    // Team records

    pub fn team_records(&self) -> &[TeamPiRecord] {
        &self.team_records
    }

    pub fn team_record(&self, team: &str, pi: &str) -> Option<&TeamPiRecord> {
        team::find_team_record(&self.team_records, team, pi)
    }

    pub fn latest_team_record(&self, team: &str) -> Option<&TeamPiRecord> {
        team::latest_team_record(&self.team_records, team)
    }

    /// Velocity unless a record for the team and PI says otherwise.
    pub fn approach_for(&self, team: &str, pi: &str) -> EstimationApproach {
        self.team_record(team, pi)
            .map(|record| record.approach)
            .unwrap_or_default()
    }

    /// Save a team record. A velocity record pushes its focus factor into every
    /// roster member of the same team and PI; returns how many were updated.
    pub fn upsert_team_record(&mut self, record: TeamPiRecord) -> Result<usize, WorkbookError> {
        let mut propagated = 0;
        if record.approach == EstimationApproach::Velocity {
            propagated =
                self.roster
                    .set_focus_factor(&record.team, &record.pi, record.sp_focus_factor)?;
        }
        info!(
            team = %record.team,
            pi = %record.pi,
            approach = %record.approach,
            sp_focus_factor = record.sp_focus_factor,
            propagated,
            "saved team record"
        );
        team::upsert_team_record(&mut self.team_records, record);
        Ok(propagated)
    }

    pub fn replace_team_records(&mut self, records: Vec<TeamPiRecord>) {
        self.team_records.clear();
        for record in records {
            team::upsert_team_record(&mut self.team_records, record);
        }
    }

    // Role relevance

    pub fn role_assignments(&self) -> &[RoleAssignment] {
        &self.role_assignments
    }

    /// Stored relevance for the team and PI, or an empty map carrying the
    /// configured default policy.
    pub fn roles(&self, team: &str, pi: &str) -> RoleRelevanceMap {
        self.role_assignments
            .iter()
            .find(|assignment| assignment.team == team && assignment.pi == pi)
            .map(|assignment| assignment.roles.clone())
            .unwrap_or_else(|| RoleRelevanceMap::new().with_default_policy(self.settings.role_default))
    }

    pub fn replace_roles(&mut self, team: &str, pi: &str, roles: RoleRelevanceMap) {
        debug!(team, pi, roles = roles.len(), "replacing role relevance");
        match self
            .role_assignments
            .iter_mut()
            .find(|assignment| assignment.team == team && assignment.pi == pi)
        {
            Some(existing) => existing.roles = roles,
            None => self.role_assignments.push(RoleAssignment {
                team: team.to_string(),
                pi: pi.to_string(),
                roles,
            }),
        }
    }

    pub fn replace_role_assignments(&mut self, assignments: Vec<RoleAssignment>) {
        self.role_assignments.clear();
        for assignment in assignments {
            self.replace_roles(&assignment.team, &assignment.pi, assignment.roles);
        }
    }

    // Velocity history

    pub fn velocity_history(&self) -> &[SprintVelocity] {
        &self.velocity_history
    }

    pub fn replace_velocity_history(&mut self, history: Vec<SprintVelocity>) {
        info!(rows = history.len(), "loaded velocity history");
        self.velocity_history = history;
    }

    pub fn record_velocity(&mut self, row: SprintVelocity) {
        self.velocity_history.push(row);
    }

    /// Velocity record proposed from history. Team size falls back to the
    /// number of roster members of the team in `pi`.
    pub fn suggest_velocity_record(
        &self,
        team: &str,
        pi: &str,
        average_team_members: Option<u32>,
    ) -> Result<(TeamPiRecord, AverageVelocity), WorkbookError> {
        let baseline = average_velocity(
            &self.velocity_history,
            team,
            pi,
            self.settings.velocity_window,
        )?;
        let members = match average_team_members {
            Some(count) => count,
            None => u32::try_from(self.roster.members(team, pi)?.len()).unwrap_or(u32::MAX),
        };
        if members == 0 {
            warn!(team, pi, "no team size available, focus factor will be zero");
        }
        let record = TeamPiRecord::from_velocity(
            team,
            pi,
            &baseline,
            self.settings.sprint_duration,
            members,
            self.settings.sp_conversion,
        );
        debug!(team, pi, summary = %baseline.summary(), "suggested velocity record");
        Ok((record, baseline))
    }

    // Capacity

    pub fn capacity_params(&self, team: &str, pi: &str) -> CapacityParams {
        self.settings.capacity_params(self.approach_for(team, pi))
    }

    pub fn team_capacity(&self, team: &str, pi: &str) -> Result<CapacityResult, WorkbookError> {
        let members = self.roster.members(team, pi)?;
        self.capacity_of(team, pi, &members)
    }

    fn capacity_of(
        &self,
        team: &str,
        pi: &str,
        members: &[TeamMember],
    ) -> Result<CapacityResult, WorkbookError> {
        if members.is_empty() {
            return Err(WorkbookError::NoMembers {
                team: team.to_string(),
                pi: pi.to_string(),
            });
        }
        let roles = self.roles(team, pi);
        let params = self.capacity_params(team, pi);
        Ok(aggregate_team_capacity(members, &roles, &params)?)
    }

    pub fn capacity_report(&self, team: &str, pi: &str) -> Result<CapacityReport, WorkbookError> {
        let members = self.roster.members(team, pi)?;
        let result = self.capacity_of(team, pi, &members)?;
        Ok(CapacityReport::new(team, pi, result, &members))
    }

    /// Capacity of every team with members in `pi`, sorted by team name.
    pub fn pi_overview(&self, pi: &str) -> Result<Vec<TeamCapacitySummary>, WorkbookError> {
        let teams = self.roster.teams_in_pi(pi)?;
        let rosters: Vec<(String, Vec<TeamMember>)> = teams
            .into_iter()
            .map(|team| -> Result<(String, Vec<TeamMember>), RosterError> {
                let members = self.roster.members(&team, pi)?;
                Ok((team, members))
            })
            .collect::<Result<_, _>>()?;

        let summaries = rosters
            .par_iter()
            .map(|(team, members)| -> Result<TeamCapacitySummary, WorkbookError> {
                let result = self.capacity_of(team, pi, members)?;
                Ok(TeamCapacitySummary {
                    team: team.clone(),
                    approach: result.params.approach,
                    members: members.len(),
                    pi_total: result.pi_total,
                    pi_total_buffered: result.pi_total_buffered,
                    sprint_totals_buffered: result.sprint_totals_buffered,
                })
            })
            .collect::<Result<Vec<_>, WorkbookError>>()?;
        debug!(pi, teams = summaries.len(), "computed PI overview");
        Ok(summaries)
    }

    // Portfolio

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn replace_capabilities(&mut self, capabilities: Vec<Capability>) -> Result<(), WorkbookError> {
        for capability in &capabilities {
            capability.validate()?;
        }
        info!(count = capabilities.len(), "loaded capabilities");
        self.capabilities = capabilities;
        Ok(())
    }

    pub fn set_allocation(&mut self, id: &str, pi: &str, sp: f64) -> Result<(), WorkbookError> {
        let capability = self
            .capabilities
            .iter_mut()
            .find(|capability| capability.id == id)
            .ok_or_else(|| PortfolioError::NotFound(id.to_string()))?;
        capability.set_allocation(pi, sp)?;
        Ok(())
    }

    pub fn capabilities_for(&self, pi: &str, area: &str) -> Vec<&Capability> {
        portfolio::filter_capabilities(&self.capabilities, pi, area)
    }

    pub fn review_alignment(&self, pi: &str, area: &str) -> AlignmentReview {
        portfolio::review_alignment(&self.capabilities_for(pi, area))
    }
}
