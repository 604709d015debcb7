pub mod approach;
pub mod calculations;
pub mod calendar;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod member;
pub mod member_validation;
pub mod persistence;
pub mod portfolio;
pub mod report;
pub mod roles;
pub mod roster;
pub mod settings;
pub mod team;
pub mod workbook;

pub use approach::{EstimationApproach, UnknownApproach};
pub use calculations::{
    AverageVelocity, CapacityError, CapacityParams, CapacityResult, MemberCapacity,
    SprintVelocity, VelocityError, aggregate_team_capacity, average_velocity,
    estimate_member_sprint_capacity, sp_focus_factor,
};
pub use calendar::{CalendarError, SprintCalendar, SprintWindow, WorkCalendar, WorkCalendarConfig};
pub use member::{MemberStatus, TeamMember};
pub use member_validation::MemberValidationError;
pub use portfolio::{AlignmentReview, BudgetStatus, Capability, PortfolioError};
pub use report::CapacityReport;
pub use roles::{RoleDefaultPolicy, RoleRelevanceMap};
pub use roster::{Roster, RosterEntry, RosterError};
pub use settings::{PlanningSettings, SettingsError};
pub use team::TeamPiRecord;
pub use workbook::{PlanningWorkbook, RoleAssignment, TeamCapacitySummary, WorkbookError};

pub use persistence::{JsonPlanningStore, PersistenceError, PlanningStore, WorkbookSnapshot};
#[cfg(feature = "sqlite")]
pub use persistence::SqlitePlanningStore;
