use crate::member::TeamMember;
use std::collections::HashSet;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct MemberValidationError {
    message: String,
}

impl MemberValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn require_finite(member: &TeamMember, field: &str, value: f64) -> Result<(), MemberValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(MemberValidationError::new(format!(
            "member '{}' has non-numeric {field} ({value})",
            member.name
        )))
    }
}

pub fn validate_member(member: &TeamMember) -> Result<(), MemberValidationError> {
    if member.name.trim().is_empty() {
        return Err(MemberValidationError::new("member requires a non-empty name"));
    }

    require_finite(member, "hours", member.hours)?;
    require_finite(member, "fte", member.fte)?;
    require_finite(member, "sp_focus_factor", member.sp_focus_factor)?;
    require_finite(member, "multiplier", member.multiplier)?;

    if member.hours < 0.0 {
        return Err(MemberValidationError::new(format!(
            "member '{}' has negative hours {}",
            member.name, member.hours
        )));
    }

    if member.fte < -EPSILON || member.fte > 1.0 + EPSILON {
        return Err(MemberValidationError::new(format!(
            "member '{}' has invalid fte {} (must be between 0 and 1)",
            member.name, member.fte
        )));
    }

    if member.sp_focus_factor < 0.0 {
        return Err(MemberValidationError::new(format!(
            "member '{}' has negative sp_focus_factor {}",
            member.name, member.sp_focus_factor
        )));
    }

    for (sprint, days) in member.days_off.iter().enumerate() {
        if !days.is_finite() {
            return Err(MemberValidationError::new(format!(
                "member '{}' has non-numeric days off for sprint {} ({days})",
                member.name,
                sprint + 1
            )));
        }
        if *days < 0.0 {
            return Err(MemberValidationError::new(format!(
                "member '{}' has negative days off for sprint {} ({days})",
                member.name,
                sprint + 1
            )));
        }
    }

    Ok(())
}

pub fn validate_member_collection(members: &[TeamMember]) -> Result<(), MemberValidationError> {
    let mut seen_names = HashSet::with_capacity(members.len());
    for member in members {
        if !seen_names.insert(member.name.as_str()) {
            return Err(MemberValidationError::new(format!(
                "duplicate member name '{}'",
                member.name
            )));
        }
        validate_member(member)?;
    }
    Ok(())
}
