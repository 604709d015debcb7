use crate::calculations::velocity::SprintVelocity;
use crate::member::TeamMember;
use crate::portfolio::Capability;
use crate::roster::{Roster, RosterEntry, RosterError};
use crate::settings::PlanningSettings;
use crate::team::TeamPiRecord;
use crate::workbook::{PlanningWorkbook, RoleAssignment, WorkbookError};
use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("dataframe conversion error: {0}")]
    DataFrame(#[from] PolarsError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Workbook(#[from] WorkbookError),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("no workbook stored")]
    NotFound,
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub trait PlanningStore {
    fn save_workbook(&self, workbook: &PlanningWorkbook) -> PersistenceResult<()>;
    fn load_workbook(&self) -> PersistenceResult<Option<PlanningWorkbook>>;
}

/// A roster row in its serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub team: String,
    pub pi: String,
    #[serde(flatten)]
    pub member: TeamMember,
}

impl From<RosterEntry> for MemberRecord {
    fn from(entry: RosterEntry) -> Self {
        Self {
            team: entry.team,
            pi: entry.pi,
            member: entry.member,
        }
    }
}

impl From<MemberRecord> for RosterEntry {
    fn from(record: MemberRecord) -> Self {
        RosterEntry::new(record.team, record.pi, record.member)
    }
}

/// Plain-data image of a workbook shared by the JSON and SQLite stores.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookSnapshot {
    pub settings: PlanningSettings,
    pub members: Vec<MemberRecord>,
    pub team_records: Vec<TeamPiRecord>,
    pub role_assignments: Vec<RoleAssignment>,
    pub velocity_history: Vec<SprintVelocity>,
    pub capabilities: Vec<Capability>,
}

impl WorkbookSnapshot {
    pub fn from_workbook(workbook: &PlanningWorkbook) -> PersistenceResult<Self> {
        let members = workbook
            .roster()
            .entries()?
            .into_iter()
            .map(MemberRecord::from)
            .collect();
        Ok(Self {
            settings: workbook.settings().clone(),
            members,
            team_records: workbook.team_records().to_vec(),
            role_assignments: workbook.role_assignments().to_vec(),
            velocity_history: workbook.velocity_history().to_vec(),
            capabilities: workbook.capabilities().to_vec(),
        })
    }

    /// Rebuild a workbook, validating settings, members and capabilities.
    pub fn into_workbook(self) -> PersistenceResult<PlanningWorkbook> {
        let entries: Vec<RosterEntry> = self.members.into_iter().map(RosterEntry::from).collect();
        let roster = Roster::from_entries(&entries)?;

        let mut workbook = PlanningWorkbook::with_settings(self.settings)?;
        workbook.replace_roster(roster);
        workbook.replace_team_records(self.team_records);
        workbook.replace_role_assignments(self.role_assignments);
        workbook.replace_velocity_history(self.velocity_history);
        workbook.replace_capabilities(self.capabilities)?;
        Ok(workbook)
    }
}

#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod file;

pub use file::{
    JsonPlanningStore, load_capabilities_from_csv, load_roster_from_csv,
    load_settings_from_json, load_velocity_from_csv, load_workbook_from_json,
    save_capabilities_to_csv, save_roster_to_csv, save_settings_to_json, save_velocity_to_csv,
    save_workbook_to_json,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePlanningStore;
