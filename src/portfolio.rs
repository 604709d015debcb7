//! Capabilities planned across PIs and the budget checks run over them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortfolioError {
    #[error("'{0}' is not a PI column label (expected PI YY-0N)")]
    InvalidPiLabel(String),
    #[error("capability {id} has invalid allocation {value} for {pi}")]
    InvalidAllocation { id: String, pi: String, value: f64 },
    #[error("capability {id} has invalid budget {value}")]
    InvalidBudget { id: String, value: f64 },
    #[error("capability {0} not found")]
    NotFound(String),
}

/// A planned capability and its story-point distribution over PIs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Capability {
    pub id: String,
    pub title: String,
    pub state: String,
    pub area_path: String,
    pub tags: Vec<String>,
    pub wsjf: Option<f64>,
    pub time_criticality: Option<f64>,
    pub risk_reduction: Option<f64>,
    pub business_value: Option<f64>,
    pub effort: Option<f64>,
    pub priority: Option<f64>,
    pub business_priority: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub assigned_to: Option<String>,
    pub budget_sp: f64,
    /// Story points per PI column, keyed by `PI YY-0N`.
    pub pi_allocations: BTreeMap<String, f64>,
    pub discovery_pi: Option<String>,
    pub fit_scope_pi: Option<String>,
    pub to_be_aligned: bool,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetStatus {
    WithinBudget,
    OverBudget,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::WithinBudget => "Within Budget",
            BudgetStatus::OverBudget => "Over Budget",
        }
    }
}

/// Verdict over a selection of capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "ids", rename_all = "snake_case")]
pub enum AlignmentReview {
    OverBudget(Vec<String>),
    NothingDistributed,
    WithinBudget,
}

/// `PI 24-01` style labels: two year digits, a dash, `0` and one digit.
pub fn is_pi_column(label: &str) -> bool {
    let Some(rest) = label.strip_prefix("PI ") else {
        return false;
    };
    let bytes = rest.as_bytes();
    bytes.len() == 5
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[2] == b'-'
        && bytes[3] == b'0'
        && bytes[4].is_ascii_digit()
}

/// Spreadsheet ids arrive as floats; `123.0` becomes `123`.
pub fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .split_once('.')
        .map_or(trimmed, |(head, _)| head)
        .to_string()
}

/// Drop the ordinal prefix of a workflow state, `3 - Refinement` becomes `Refinement`.
pub fn state_label(state: &str) -> &str {
    let digits = state.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return state;
    }
    state[digits..].strip_prefix(" - ").unwrap_or(state)
}

pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

impl Capability {
    pub fn new(id: impl Into<String>, title: impl Into<String>, budget_sp: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            budget_sp,
            ..Self::default()
        }
    }

    pub fn total_pi_sp(&self) -> f64 {
        self.pi_allocations.values().sum()
    }

    pub fn budget_status(&self) -> BudgetStatus {
        if self.total_pi_sp() > self.budget_sp {
            BudgetStatus::OverBudget
        } else {
            BudgetStatus::WithinBudget
        }
    }

    pub fn state_label(&self) -> &str {
        state_label(&self.state)
    }

    pub fn has_tag_containing(&self, needle: &str) -> bool {
        self.tags.iter().any(|tag| tag.contains(needle))
    }

    pub fn set_allocation(&mut self, pi: &str, sp: f64) -> Result<(), PortfolioError> {
        if !is_pi_column(pi) {
            return Err(PortfolioError::InvalidPiLabel(pi.to_string()));
        }
        if !sp.is_finite() || sp < 0.0 {
            return Err(PortfolioError::InvalidAllocation {
                id: self.id.clone(),
                pi: pi.to_string(),
                value: sp,
            });
        }
        self.pi_allocations.insert(pi.to_string(), sp);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), PortfolioError> {
        if !self.budget_sp.is_finite() || self.budget_sp < 0.0 {
            return Err(PortfolioError::InvalidBudget {
                id: self.id.clone(),
                value: self.budget_sp,
            });
        }
        for (pi, sp) in &self.pi_allocations {
            if !is_pi_column(pi) {
                return Err(PortfolioError::InvalidPiLabel(pi.clone()));
            }
            if !sp.is_finite() || *sp < 0.0 {
                return Err(PortfolioError::InvalidAllocation {
                    id: self.id.clone(),
                    pi: pi.clone(),
                    value: *sp,
                });
            }
        }
        Ok(())
    }
}

/// Capabilities tagged with `pi` whose area path contains `area`.
pub fn filter_capabilities<'a>(
    capabilities: &'a [Capability],
    pi: &str,
    area: &str,
) -> Vec<&'a Capability> {
    capabilities
        .iter()
        .filter(|cap| cap.has_tag_containing(pi) && cap.area_path.contains(area))
        .collect()
}

pub fn review_alignment(selection: &[&Capability]) -> AlignmentReview {
    let over: Vec<String> = selection
        .iter()
        .filter(|cap| cap.budget_status() == BudgetStatus::OverBudget)
        .map(|cap| cap.id.clone())
        .collect();
    if !over.is_empty() {
        return AlignmentReview::OverBudget(over);
    }
    let distributed: f64 = selection.iter().map(|cap| cap.total_pi_sp()).sum();
    if distributed == 0.0 {
        AlignmentReview::NothingDistributed
    } else {
        AlignmentReview::WithinBudget
    }
}
