use capacity_planner::{
    CapacityError, CapacityParams, EstimationApproach, RoleDefaultPolicy, RoleRelevanceMap,
    TeamMember, aggregate_team_capacity, estimate_member_sprint_capacity,
};
use proptest::prelude::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn member(name: &str, role: &str, fte: f64, days_off: Vec<f64>, focus: f64) -> TeamMember {
    let mut member = TeamMember::new(name, role, days_off.len());
    member.fte = fte;
    member.days_off = days_off;
    member.sp_focus_factor = focus;
    member
}

fn params(approach: EstimationApproach, num_sprints: usize, pi_buffer: f64) -> CapacityParams {
    CapacityParams {
        approach,
        sp_conversion: 8.0,
        sprint_duration: 10.0,
        num_sprints,
        pi_buffer,
    }
}

#[test]
fn velocity_reference_value() {
    let m = member("Ana", "Developer", 1.0, vec![2.0], 0.5);
    let capacity =
        estimate_member_sprint_capacity(&m, &params(EstimationApproach::Velocity, 1, 0.0), true)
            .unwrap();
    assert_eq!(capacity, vec![4.0]);
}

#[test]
fn percentages_reference_value() {
    let m = member("Ana", "Developer", 1.0, vec![0.0], 0.5);
    let capacity = estimate_member_sprint_capacity(
        &m,
        &params(EstimationApproach::Percentages, 1, 0.0),
        true,
    )
    .unwrap();
    assert_eq!(capacity, vec![5.0]);
}

#[test]
fn two_member_team_scenario() {
    let a = member("A", "Developer", 1.0, vec![0.0], 0.5);
    let b = member("B", "Tester", 0.5, vec![5.0], 0.4);
    let roles = RoleRelevanceMap::from_entries([("Developer", true), ("Tester", true)]);

    let result = aggregate_team_capacity(
        &[a, b],
        &roles,
        &params(EstimationApproach::Velocity, 1, 0.1),
    )
    .unwrap();

    assert!(approx(result.member("A").unwrap().sprints[0], 5.0));
    assert!(approx(result.member("B").unwrap().sprints[0], 1.0));
    assert!(approx(result.pi_total, 6.0));
    assert!(approx(result.pi_total_buffered, 5.4));
    assert!(approx(result.sprint_totals_buffered[0], 5.4));
}

#[test]
fn more_days_off_than_sprint_days_is_negative() {
    let m = member("Ana", "Developer", 1.0, vec![12.0], 0.5);
    let capacity =
        estimate_member_sprint_capacity(&m, &params(EstimationApproach::Velocity, 1, 0.0), true)
            .unwrap();
    assert_eq!(capacity, vec![-1.0]);
}

#[test]
fn full_buffer_drives_totals_to_zero() {
    let m = member("Ana", "Developer", 1.0, vec![0.0, 1.0], 0.5);
    let roles = RoleRelevanceMap::from_entries([("Developer", true)]);
    let result =
        aggregate_team_capacity(&[m], &roles, &params(EstimationApproach::Velocity, 2, 1.0))
            .unwrap();
    assert!(result.pi_total > 0.0);
    assert_eq!(result.pi_total_buffered, 0.0);
    assert!(result.sprint_totals_buffered.iter().all(|v| *v == 0.0));
}

#[test]
fn zero_conversion_is_rejected_for_percentages_only() {
    let m = member("Ana", "Developer", 1.0, vec![0.0], 0.5);
    let mut p = params(EstimationApproach::Percentages, 1, 0.0);
    p.sp_conversion = 0.0;
    assert_eq!(
        estimate_member_sprint_capacity(&m, &p, true),
        Err(CapacityError::InvalidConversion(0.0))
    );

    p.approach = EstimationApproach::Velocity;
    assert_eq!(estimate_member_sprint_capacity(&m, &p, true).unwrap(), vec![5.0]);
}

#[test]
fn precondition_violations_fail_fast() {
    let m = member("Ana", "Developer", 1.0, vec![0.0, 0.0], 0.5);
    let roles = RoleRelevanceMap::from_entries([("Developer", true)]);

    let mut p = params(EstimationApproach::Velocity, 2, 1.5);
    assert_eq!(
        aggregate_team_capacity(&[m.clone()], &roles, &p),
        Err(CapacityError::InvalidBuffer(1.5))
    );

    p.pi_buffer = 0.1;
    p.sprint_duration = -1.0;
    assert_eq!(
        aggregate_team_capacity(&[m.clone()], &roles, &p),
        Err(CapacityError::InvalidSprintDuration(-1.0))
    );

    p.sprint_duration = 10.0;
    p.num_sprints = 3;
    assert!(matches!(
        aggregate_team_capacity(&[m], &roles, &p),
        Err(CapacityError::DaysOffMismatch { expected: 3, actual: 2, .. })
    ));
}

#[test]
fn legacy_policy_counts_unlisted_developers() {
    let dev = member("Ana", "Developer", 1.0, vec![0.0], 0.5);
    let po = member("Ben", "Product Owner", 1.0, vec![0.0], 0.5);
    let p = params(EstimationApproach::Velocity, 1, 0.0);

    let strict = RoleRelevanceMap::new();
    let result = aggregate_team_capacity(&[dev.clone(), po.clone()], &strict, &p).unwrap();
    assert_eq!(result.pi_total, 0.0);

    let legacy = RoleRelevanceMap::new().with_default_policy(RoleDefaultPolicy::LegacyDeveloperTester);
    let result = aggregate_team_capacity(&[dev, po], &legacy, &p).unwrap();
    assert_eq!(result.member("Ana").unwrap().sprints, vec![5.0]);
    assert_eq!(result.member("Ben").unwrap().sprints, vec![0.0]);
}

fn approach_strategy() -> impl Strategy<Value = EstimationApproach> {
    prop_oneof![
        Just(EstimationApproach::Velocity),
        Just(EstimationApproach::Percentages)
    ]
}

fn team_strategy(num_sprints: usize) -> impl Strategy<Value = Vec<TeamMember>> {
    prop::collection::vec(
        (
            0.0f64..=1.0,
            0.0f64..=12.0,
            prop::collection::vec(0.0f64..=10.0, num_sprints),
            0.0f64..=1.5,
            -1.0f64..=1.0,
            prop::bool::ANY,
        ),
        1..6,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(idx, (fte, hours, days_off, focus, multiplier, dev))| {
                let role = if dev { "Developer" } else { "Scrum Master" };
                let mut m = member(&format!("M{idx}"), role, fte, days_off, focus);
                m.hours = hours;
                m.multiplier = multiplier;
                m
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn buffered_totals_scale_sprint_totals(
        approach in approach_strategy(),
        team in team_strategy(4),
        buffer in 0.0f64..=1.0,
    ) {
        let roles = RoleRelevanceMap::from_entries([("Developer", true)]);
        let result = aggregate_team_capacity(&team, &roles, &params(approach, 4, buffer)).unwrap();

        for (total, buffered) in result.sprint_totals.iter().zip(&result.sprint_totals_buffered) {
            prop_assert_eq!(*buffered, total * (1.0 - buffer));
        }
        let summed: f64 = result.sprint_totals_buffered.iter().sum();
        prop_assert_eq!(summed, result.pi_total_buffered);
    }

    #[test]
    fn aggregation_is_bit_identical_across_calls(
        approach in approach_strategy(),
        team in team_strategy(3),
        buffer in 0.0f64..=1.0,
    ) {
        let roles = RoleRelevanceMap::from_entries([("Developer", true)]);
        let p = params(approach, 3, buffer);
        let first = aggregate_team_capacity(&team, &roles, &p).unwrap();
        let second = aggregate_team_capacity(&team, &roles, &p).unwrap();
        prop_assert_eq!(first.pi_total.to_bits(), second.pi_total.to_bits());
        prop_assert_eq!(first.pi_total_buffered.to_bits(), second.pi_total_buffered.to_bits());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn irrelevant_roles_contribute_nothing(
        approach in approach_strategy(),
        team in team_strategy(5),
    ) {
        let roles = RoleRelevanceMap::from_entries([("Developer", true), ("Scrum Master", false)]);
        let result = aggregate_team_capacity(&team, &roles, &params(approach, 5, 0.1)).unwrap();
        for row in result.members.iter().filter(|row| row.role == "Scrum Master") {
            prop_assert!(!row.relevant);
            prop_assert!(row.sprints.iter().all(|v| *v == 0.0));
        }
    }
}
