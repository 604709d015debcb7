//! Story-point capacity of a team over the sprints of one PI.
//!
//! Everything here is a pure function of its arguments: no I/O, no logging and
//! no shared state, so results can be cached by their inputs.

use crate::approach::EstimationApproach;
use crate::member::TeamMember;
use crate::member_validation::{self, MemberValidationError};
use crate::roles::RoleRelevanceMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CapacityError {
    #[error("sprint duration must be a finite, non-negative number of days (got {0})")]
    InvalidSprintDuration(f64),
    #[error("PI buffer must be between 0 and 1 (got {0})")]
    InvalidBuffer(f64),
    #[error("hours per story point must be a finite number greater than zero (got {0})")]
    InvalidConversion(f64),
    #[error("member '{member}' has {actual} days-off entries but {expected} sprints were requested")]
    MissingAttendance {
        member: String,
        expected: usize,
        actual: usize,
    },
    #[error("member '{member}' has {actual} days-off entries but the PI has {expected} sprints")]
    DaysOffMismatch {
        member: String,
        expected: usize,
        actual: usize,
    },
    #[error("invalid member record: {0}")]
    InvalidMember(#[from] MemberValidationError),
}

/// Scalar inputs of one capacity computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityParams {
    pub approach: EstimationApproach,
    /// Hours of work per story point. Only read by [`EstimationApproach::Percentages`].
    pub sp_conversion: f64,
    /// Working days in one sprint.
    pub sprint_duration: f64,
    pub num_sprints: usize,
    /// Fraction of capacity held back as a planning margin.
    pub pi_buffer: f64,
}

impl Default for CapacityParams {
    fn default() -> Self {
        Self {
            approach: EstimationApproach::Velocity,
            sp_conversion: 8.0,
            sprint_duration: 10.0,
            num_sprints: 5,
            pi_buffer: 0.1,
        }
    }
}

impl CapacityParams {
    pub fn new(approach: EstimationApproach) -> Self {
        Self {
            approach,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CapacityError> {
        check_sprint_duration(self.sprint_duration)?;
        if !self.pi_buffer.is_finite() || !(0.0..=1.0).contains(&self.pi_buffer) {
            return Err(CapacityError::InvalidBuffer(self.pi_buffer));
        }
        if self.approach == EstimationApproach::Percentages {
            check_conversion(self.sp_conversion)?;
        }
        Ok(())
    }
}

fn check_sprint_duration(sprint_duration: f64) -> Result<(), CapacityError> {
    if sprint_duration.is_finite() && sprint_duration >= 0.0 {
        Ok(())
    } else {
        Err(CapacityError::InvalidSprintDuration(sprint_duration))
    }
}

fn check_conversion(sp_conversion: f64) -> Result<(), CapacityError> {
    if sp_conversion.is_finite() && sp_conversion > 0.0 {
        Ok(())
    } else {
        Err(CapacityError::InvalidConversion(sp_conversion))
    }
}

/// Capacity of a single member, one value per sprint.
///
/// A non-relevant role yields zeros before any other input is looked at.
/// Available days are `sprint_duration - days_off[i]` and are not clamped, so
/// more days off than sprint days produce negative capacity.
pub fn estimate_member_sprint_capacity(
    member: &TeamMember,
    params: &CapacityParams,
    role_relevant: bool,
) -> Result<Vec<f64>, CapacityError> {
    let num_sprints = params.num_sprints;
    if !role_relevant {
        return Ok(vec![0.0; num_sprints]);
    }

    check_sprint_duration(params.sprint_duration)?;
    if member.days_off.len() < num_sprints {
        return Err(CapacityError::MissingAttendance {
            member: member.name.clone(),
            expected: num_sprints,
            actual: member.days_off.len(),
        });
    }

    let sprint_duration = params.sprint_duration;
    let attendance = &member.days_off[..num_sprints];
    let capacities = match params.approach {
        EstimationApproach::Velocity => attendance
            .iter()
            .map(|days_off| {
                let available_days = sprint_duration - days_off;
                available_days * member.fte * member.sp_focus_factor * member.multiplier
            })
            .collect(),
        EstimationApproach::Percentages => {
            check_conversion(params.sp_conversion)?;
            attendance
                .iter()
                .map(|days_off| {
                    let available_days = sprint_duration - days_off;
                    let hours_capacity = available_days * member.hours * member.fte;
                    (hours_capacity / params.sp_conversion)
                        * member.sp_focus_factor
                        * member.multiplier
                })
                .collect()
        }
    };
    Ok(capacities)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberCapacity {
    pub name: String,
    pub role: String,
    pub relevant: bool,
    pub sprints: Vec<f64>,
}

impl MemberCapacity {
    pub fn pi_total(&self) -> f64 {
        self.sprints.iter().sum()
    }
}

/// Team capacity for one PI under one approach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityResult {
    pub params: CapacityParams,
    /// One row per member, in input order.
    pub members: Vec<MemberCapacity>,
    pub sprint_totals: Vec<f64>,
    pub sprint_totals_buffered: Vec<f64>,
    pub pi_total: f64,
    pub pi_total_buffered: f64,
}

impl CapacityResult {
    pub fn num_sprints(&self) -> usize {
        self.sprint_totals.len()
    }

    pub fn member(&self, name: &str) -> Option<&MemberCapacity> {
        self.members.iter().find(|row| row.name == name)
    }

    /// SP held back by the buffer in each sprint.
    pub fn buffer_per_sprint(&self) -> Vec<f64> {
        self.sprint_totals
            .iter()
            .zip(&self.sprint_totals_buffered)
            .map(|(total, buffered)| total - buffered)
            .collect()
    }

    /// PI capacity (without buffer) summed per role.
    pub fn role_totals(&self) -> BTreeMap<String, f64> {
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for row in &self.members {
            *totals.entry(row.role.clone()).or_default() += row.pi_total();
        }
        totals
    }
}

/// Aggregate member capacities into sprint and PI totals, before and after buffer.
///
/// Every member record is validated first; one malformed record fails the whole
/// aggregation rather than being counted as zero.
pub fn aggregate_team_capacity(
    members: &[TeamMember],
    roles: &RoleRelevanceMap,
    params: &CapacityParams,
) -> Result<CapacityResult, CapacityError> {
    params.validate()?;
    member_validation::validate_member_collection(members)?;

    let num_sprints = params.num_sprints;
    for member in members {
        if member.days_off.len() != num_sprints {
            return Err(CapacityError::DaysOffMismatch {
                member: member.name.clone(),
                expected: num_sprints,
                actual: member.days_off.len(),
            });
        }
    }

    let mut rows = Vec::with_capacity(members.len());
    for member in members {
        let relevant = roles.is_relevant(&member.role);
        let sprints = estimate_member_sprint_capacity(member, params, relevant)?;
        rows.push(MemberCapacity {
            name: member.name.clone(),
            role: member.role.clone(),
            relevant,
            sprints,
        });
    }

    let mut sprint_totals = vec![0.0; num_sprints];
    for row in &rows {
        for (total, capacity) in sprint_totals.iter_mut().zip(&row.sprints) {
            *total += capacity;
        }
    }

    // The buffer is a single factor for the whole PI, so buffering each sprint
    // and then summing equals buffering the PI total.
    let keep = 1.0 - params.pi_buffer;
    let sprint_totals_buffered: Vec<f64> = sprint_totals.iter().map(|total| total * keep).collect();
    let pi_total = sprint_totals.iter().sum();
    let pi_total_buffered = sprint_totals_buffered.iter().sum();

    Ok(CapacityResult {
        params: *params,
        members: rows,
        sprint_totals,
        sprint_totals_buffered,
        pi_total,
        pi_total_buffered,
    })
}
