use crate::calculations::capacity::CapacityResult;
use crate::member::TeamMember;
use polars::prelude::PlSmallStr;
use polars::prelude::*;

pub const TOTAL_LABEL: &str = "Total";

/// Tabular views over one team's capacity for one PI.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityReport {
    pub team: String,
    pub pi: String,
    pub result: CapacityResult,
    /// Days off per member, aligned with `result.members`.
    days_off: Vec<Vec<f64>>,
}

fn sprint_label(idx: usize) -> String {
    format!("Sprint {}", idx + 1)
}

impl CapacityReport {
    pub fn new(
        team: impl Into<String>,
        pi: impl Into<String>,
        result: CapacityResult,
        members: &[TeamMember],
    ) -> Self {
        let days_off = result
            .members
            .iter()
            .map(|row| {
                members
                    .iter()
                    .find(|member| member.name == row.name)
                    .map(|member| member.days_off.clone())
                    .unwrap_or_default()
            })
            .collect();
        Self {
            team: team.into(),
            pi: pi.into(),
            result,
            days_off,
        }
    }

    /// One row per member plus a trailing `Total` row.
    pub fn member_table(&self) -> PolarsResult<DataFrame> {
        let num_sprints = self.result.num_sprints();
        let rows = &self.result.members;

        let mut names: Vec<&str> = rows.iter().map(|row| row.name.as_str()).collect();
        names.push(TOTAL_LABEL);
        let mut roles: Vec<&str> = rows.iter().map(|row| row.role.as_str()).collect();
        roles.push("");

        let mut days_off_totals = vec![0.0; num_sprints];
        for days in &self.days_off {
            for (total, value) in days_off_totals.iter_mut().zip(days) {
                *total += value;
            }
        }
        let mut days_off: Vec<Series> = self
            .days_off
            .iter()
            .map(|days| Series::new(PlSmallStr::from_static(""), days.clone()))
            .collect();
        days_off.push(Series::new(PlSmallStr::from_static(""), days_off_totals));

        let mut columns: Vec<Column> = Vec::with_capacity(num_sprints + 4);
        columns.push(Series::new(PlSmallStr::from_static("Team Member"), names).into_column());
        columns.push(Series::new(PlSmallStr::from_static("Role"), roles).into_column());
        columns.push(
            Series::new(PlSmallStr::from_static("Days Off per Sprint"), days_off).into_column(),
        );

        for sprint in 0..num_sprints {
            let mut values: Vec<f64> = rows.iter().map(|row| row.sprints[sprint]).collect();
            values.push(self.result.sprint_totals[sprint]);
            let name = format!("{} Capacity (SP)", sprint_label(sprint));
            columns.push(Series::new(name.into(), values).into_column());
        }

        let mut pi_totals: Vec<f64> = rows.iter().map(|row| row.pi_total()).collect();
        pi_totals.push(self.result.pi_total);
        columns.push(Series::new(PlSmallStr::from_static("PI Total (SP)"), pi_totals).into_column());

        DataFrame::new(columns)
    }

    pub fn sprint_breakdown(&self) -> PolarsResult<DataFrame> {
        let labels: Vec<String> = (0..self.result.num_sprints()).map(sprint_label).collect();
        DataFrame::new(vec![
            Series::new(PlSmallStr::from_static("Sprint"), labels).into_column(),
            Series::new(
                PlSmallStr::from_static("Capacity (SP)"),
                self.result.sprint_totals.clone(),
            )
            .into_column(),
            Series::new(
                PlSmallStr::from_static("Capacity with Buffer (SP)"),
                self.result.sprint_totals_buffered.clone(),
            )
            .into_column(),
            Series::new(
                PlSmallStr::from_static("Buffer (SP)"),
                self.result.buffer_per_sprint(),
            )
            .into_column(),
        ])
    }

    pub fn role_breakdown(&self) -> PolarsResult<DataFrame> {
        let totals = self.result.role_totals();
        let roles: Vec<&str> = totals.keys().map(String::as_str).collect();
        let sp: Vec<f64> = totals.values().copied().collect();
        DataFrame::new(vec![
            Series::new(PlSmallStr::from_static("Role"), roles).into_column(),
            Series::new(PlSmallStr::from_static("Total SP"), sp).into_column(),
        ])
    }

    pub fn headline(&self) -> String {
        format!(
            "{} / PI {}: {:.1} SP without buffer, {:.1} SP with {:.0}% buffer",
            self.team,
            self.pi,
            self.result.pi_total,
            self.result.pi_total_buffered,
            self.result.params.pi_buffer * 100.0
        )
    }
}
