use crate::member::{MemberStatus, TeamMember};
use crate::member_validation::{self, MemberValidationError};
use polars::prelude::PlSmallStr;
use polars::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    InvalidMember(#[from] MemberValidationError),
    #[error("member '{name}' not found in team '{team}' for PI {pi}")]
    MemberNotFound { team: String, pi: String, name: String },
    #[error("team '{team}' has no members in PI {pi}")]
    EmptySource { team: String, pi: String },
    #[error("team '{team}' already has members in PI {pi}; pass overwrite to replace them")]
    TargetNotEmpty { team: String, pi: String },
    #[error("roster row {row} is malformed: {reason}")]
    MalformedRow { row: usize, reason: String },
}

/// A member together with the team and PI the row belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub team: String,
    pub pi: String,
    pub member: TeamMember,
}

impl RosterEntry {
    pub fn new(team: impl Into<String>, pi: impl Into<String>, member: TeamMember) -> Self {
        Self {
            team: team.into(),
            pi: pi.into(),
            member,
        }
    }

    pub fn to_dataframe_row(&self) -> PolarsResult<DataFrame> {
        let member = &self.member;
        let mut columns: Vec<Column> = Vec::with_capacity(10);

        let team: [&str; 1] = [self.team.as_str()];
        columns.push(Series::new(PlSmallStr::from_static("team"), team).into_column());
        let pi: [&str; 1] = [self.pi.as_str()];
        columns.push(Series::new(PlSmallStr::from_static("pi"), pi).into_column());
        let name: [&str; 1] = [member.name.as_str()];
        columns.push(Series::new(PlSmallStr::from_static("name"), name).into_column());
        let role: [&str; 1] = [member.role.as_str()];
        columns.push(Series::new(PlSmallStr::from_static("role"), role).into_column());

        let hours: [f64; 1] = [member.hours];
        columns.push(Series::new(PlSmallStr::from_static("hours"), hours).into_column());
        let fte: [f64; 1] = [member.fte];
        columns.push(Series::new(PlSmallStr::from_static("fte"), fte).into_column());

        let days_off = Series::new(PlSmallStr::from_static(""), member.days_off.clone());
        columns.push(Series::new(PlSmallStr::from_static("days_off"), &[days_off]).into_column());

        let focus: [f64; 1] = [member.sp_focus_factor];
        columns.push(Series::new(PlSmallStr::from_static("sp_focus_factor"), focus).into_column());
        let multiplier: [f64; 1] = [member.multiplier];
        columns.push(Series::new(PlSmallStr::from_static("multiplier"), multiplier).into_column());
        let status: [&str; 1] = [member.status.as_str()];
        columns.push(Series::new(PlSmallStr::from_static("status"), status).into_column());

        DataFrame::new(columns)
    }

    pub fn from_dataframe_row(df: &DataFrame, row: usize) -> Result<Self, RosterError> {
        let text = |column: &str| -> Result<String, RosterError> {
            df.column(column)?
                .str()?
                .get(row)
                .map(ToOwned::to_owned)
                .ok_or_else(|| RosterError::MalformedRow {
                    row,
                    reason: format!("missing {column}"),
                })
        };
        let number = |column: &str| -> Result<f64, RosterError> {
            df.column(column)?
                .f64()?
                .get(row)
                .ok_or_else(|| RosterError::MalformedRow {
                    row,
                    reason: format!("missing {column}"),
                })
        };

        let days_off = match df.column("days_off")?.list()?.get_as_series(row) {
            Some(series) => series
                .f64()?
                .into_iter()
                .map(|days| {
                    days.ok_or_else(|| RosterError::MalformedRow {
                        row,
                        reason: "null entry in days_off".to_string(),
                    })
                })
                .collect::<Result<Vec<f64>, RosterError>>()?,
            None => Vec::new(),
        };
        let status = text("status")?
            .parse::<MemberStatus>()
            .map_err(|reason| RosterError::MalformedRow { row, reason })?;

        let member = TeamMember {
            name: text("name")?,
            role: text("role")?,
            hours: number("hours")?,
            fte: number("fte")?,
            days_off,
            sp_focus_factor: number("sp_focus_factor")?,
            multiplier: number("multiplier")?,
            status,
        };
        Ok(Self {
            team: text("team")?,
            pi: text("pi")?,
            member,
        })
    }
}

/// Flat member table keyed by team, PI and member name.
#[derive(Debug, Clone)]
pub struct Roster {
    df: DataFrame,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

impl Roster {
    pub fn new() -> Self {
        Self {
            df: DataFrame::empty_with_schema(&Self::default_schema()),
        }
    }

    pub fn from_entries(entries: &[RosterEntry]) -> Result<Self, RosterError> {
        let mut roster = Self::new();
        for entry in entries {
            roster.upsert(entry.clone())?;
        }
        Ok(roster)
    }

    pub(crate) fn default_schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("team".into(), DataType::String),
            Field::new("pi".into(), DataType::String),
            Field::new("name".into(), DataType::String),
            Field::new("role".into(), DataType::String),
            Field::new("hours".into(), DataType::Float64),
            Field::new("fte".into(), DataType::Float64),
            Field::new("days_off".into(), DataType::List(Box::new(DataType::Float64))),
            Field::new("sp_focus_factor".into(), DataType::Float64),
            Field::new("multiplier".into(), DataType::Float64),
            Field::new("status".into(), DataType::String),
        ])
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn entries(&self) -> Result<Vec<RosterEntry>, RosterError> {
        Self::entries_of(&self.df)
    }

    fn entries_of(df: &DataFrame) -> Result<Vec<RosterEntry>, RosterError> {
        (0..df.height())
            .map(|row| RosterEntry::from_dataframe_row(df, row))
            .collect()
    }

    fn team_pi_mask(team: &str, pi: &str) -> Expr {
        col("team").eq(lit(team)).and(col("pi").eq(lit(pi)))
    }

    /// Row index of the member keyed by team, PI and name.
    fn position(&self, team: &str, pi: &str, name: &str) -> Result<Option<usize>, RosterError> {
        let teams = self.df.column("team")?.str()?;
        let pis = self.df.column("pi")?.str()?;
        let names = self.df.column("name")?.str()?;
        Ok(teams
            .into_iter()
            .zip(pis)
            .zip(names)
            .position(|((t, p), n)| t == Some(team) && p == Some(pi) && n == Some(name)))
    }

    /// Insert a member, replacing an existing row with the same key in place.
    pub fn upsert(&mut self, entry: RosterEntry) -> Result<(), RosterError> {
        member_validation::validate_member(&entry.member)?;

        let new_row = entry.to_dataframe_row()?;
        match self.position(&entry.team, &entry.pi, &entry.member.name)? {
            Some(idx) => {
                let head = self.df.slice(0, idx);
                let tail = self.df.slice((idx + 1) as i64, self.df.height());
                self.df = head.vstack(&new_row)?.vstack(&tail)?;
            }
            None => {
                self.df = self.df.vstack(&new_row)?;
            }
        }
        Ok(())
    }

    pub fn delete(&mut self, team: &str, pi: &str, name: &str) -> Result<(), RosterError> {
        if self.member(team, pi, name)?.is_none() {
            return Err(RosterError::MemberNotFound {
                team: team.to_string(),
                pi: pi.to_string(),
                name: name.to_string(),
            });
        }
        self.df = self
            .df
            .clone()
            .lazy()
            .filter(Self::team_pi_mask(team, pi).and(col("name").eq(lit(name))).not())
            .collect()?;
        Ok(())
    }

    pub fn member(&self, team: &str, pi: &str, name: &str) -> Result<Option<TeamMember>, RosterError> {
        Ok(self
            .members(team, pi)?
            .into_iter()
            .find(|member| member.name == name))
    }

    /// Rows of one team in one PI.
    pub fn frame_for(&self, team: &str, pi: &str) -> PolarsResult<DataFrame> {
        self.df
            .clone()
            .lazy()
            .filter(Self::team_pi_mask(team, pi))
            .collect()
    }

    /// Members of one team in one PI, in insertion order.
    pub fn members(&self, team: &str, pi: &str) -> Result<Vec<TeamMember>, RosterError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let subset = self.frame_for(team, pi)?;
        Ok(Self::entries_of(&subset)?
            .into_iter()
            .map(|entry| entry.member)
            .collect())
    }

    pub fn teams(&self) -> Result<Vec<String>, RosterError> {
        let teams: BTreeSet<String> = self
            .df
            .column("team")?
            .str()?
            .into_iter()
            .flatten()
            .map(ToOwned::to_owned)
            .collect();
        Ok(teams.into_iter().collect())
    }

    /// Teams with at least one member in `pi`.
    pub fn teams_in_pi(&self, pi: &str) -> Result<Vec<String>, RosterError> {
        let teams: BTreeSet<String> = self
            .entries()?
            .into_iter()
            .filter(|entry| entry.pi == pi)
            .map(|entry| entry.team)
            .collect();
        Ok(teams.into_iter().collect())
    }

    pub fn pis(&self, team: &str) -> Result<Vec<String>, RosterError> {
        let pis: BTreeSet<String> = self
            .entries()?
            .into_iter()
            .filter(|entry| entry.team == team)
            .map(|entry| entry.pi)
            .collect();
        Ok(pis.into_iter().collect())
    }

    /// Overwrite the focus factor of every member of a team in a PI.
    /// Returns the number of rows touched.
    pub fn set_focus_factor(&mut self, team: &str, pi: &str, factor: f64) -> Result<usize, RosterError> {
        let touched = self.members(team, pi)?.len();
        if touched == 0 {
            return Ok(0);
        }
        self.df = self
            .df
            .clone()
            .lazy()
            .with_column(
                when(Self::team_pi_mask(team, pi))
                    .then(lit(factor))
                    .otherwise(col("sp_focus_factor"))
                    .alias("sp_focus_factor"),
            )
            .collect()?;
        Ok(touched)
    }

    /// Copy a team's members from one PI to another with all days off reset.
    pub fn copy_pi(
        &mut self,
        team: &str,
        source_pi: &str,
        target_pi: &str,
        overwrite: bool,
    ) -> Result<usize, RosterError> {
        let source = self.members(team, source_pi)?;
        if source.is_empty() {
            return Err(RosterError::EmptySource {
                team: team.to_string(),
                pi: source_pi.to_string(),
            });
        }

        if !self.members(team, target_pi)?.is_empty() {
            if !overwrite {
                return Err(RosterError::TargetNotEmpty {
                    team: team.to_string(),
                    pi: target_pi.to_string(),
                });
            }
            self.df = self
                .df
                .clone()
                .lazy()
                .filter(Self::team_pi_mask(team, target_pi).not())
                .collect()?;
        }

        let copied = source.len();
        for mut member in source {
            member.days_off.iter_mut().for_each(|days| *days = 0.0);
            let row = RosterEntry::new(team, target_pi, member).to_dataframe_row()?;
            self.df = self.df.vstack(&row)?;
        }
        Ok(copied)
    }
}
