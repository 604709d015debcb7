pub mod capacity;
pub mod velocity;

pub use capacity::{
    CapacityError, CapacityParams, CapacityResult, MemberCapacity, aggregate_team_capacity,
    estimate_member_sprint_capacity,
};
pub use velocity::{
    AverageVelocity, SprintVelocity, VelocityError, average_velocity, pi_history_label,
    sp_focus_factor,
};
