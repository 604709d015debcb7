use capacity_planner::{
    AlignmentReview, Capability, EstimationApproach, MemberStatus, PlanningSettings,
    PlanningWorkbook, RoleRelevanceMap, RosterError, SprintVelocity, TeamPiRecord, VelocityError,
    WorkbookError,
};

fn workbook() -> PlanningWorkbook {
    let mut settings = PlanningSettings::default();
    settings.num_sprints = 3;
    let mut wb = PlanningWorkbook::with_settings(settings).unwrap();
    for (name, role) in [("Ana", "Developer"), ("Ben", "Tester"), ("Cleo", "Product Owner")] {
        let member = wb.new_member(name, role);
        wb.upsert_member("Falcon", "24-01", member).unwrap();
    }
    wb.replace_roles(
        "Falcon",
        "24-01",
        RoleRelevanceMap::from_entries([("Developer", true), ("Tester", true)]),
    );
    wb
}

#[test]
fn upsert_replaces_member_in_place() {
    let mut wb = workbook();
    let mut ben = wb.roster().member("Falcon", "24-01", "Ben").unwrap().unwrap();
    ben.days_off = vec![1.0, 2.0, 0.0];
    wb.upsert_member("Falcon", "24-01", ben).unwrap();

    let members = wb.members("Falcon", "24-01").unwrap();
    let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Ana", "Ben", "Cleo"]);
    assert_eq!(members[1].days_off, vec![1.0, 2.0, 0.0]);
}

#[test]
fn invalid_member_is_rejected() {
    let mut wb = workbook();
    let mut bad = wb.new_member("Dev", "Developer");
    bad.fte = 1.5;
    assert!(matches!(
        wb.upsert_member("Falcon", "24-01", bad),
        Err(WorkbookError::Roster(RosterError::InvalidMember(_)))
    ));
    assert_eq!(wb.members("Falcon", "24-01").unwrap().len(), 3);
}

#[test]
fn deleting_unknown_member_fails() {
    let mut wb = workbook();
    wb.delete_member("Falcon", "24-01", "Cleo").unwrap();
    assert!(matches!(
        wb.delete_member("Falcon", "24-01", "Cleo"),
        Err(WorkbookError::Roster(RosterError::MemberNotFound { .. }))
    ));
}

#[test]
fn velocity_record_drives_capacity() {
    let mut wb = workbook();
    let mut record = TeamPiRecord::new("Falcon", "24-01", EstimationApproach::Velocity);
    record.average_velocity = 30.0;
    record.average_duration = 10.0;
    record.average_team_members = 2;
    record.recompute_focus_factor();
    assert_eq!(record.sp_focus_factor, 1.5);
    assert_eq!(wb.upsert_team_record(record).unwrap(), 3);

    let result = wb.team_capacity("Falcon", "24-01").unwrap();
    assert_eq!(result.member("Ana").unwrap().sprints, vec![15.0, 15.0, 15.0]);
    assert_eq!(result.member("Cleo").unwrap().sprints, vec![0.0, 0.0, 0.0]);
    assert_eq!(result.pi_total, 90.0);
}

#[test]
fn onboarding_member_counts_a_quarter() {
    let mut wb = workbook();
    let dan = wb
        .new_member("Dan", "Developer")
        .with_status(MemberStatus::Onboarding);
    wb.upsert_member("Falcon", "24-01", dan).unwrap();
    let mut record = TeamPiRecord::new("Falcon", "24-01", EstimationApproach::Velocity);
    record.sp_focus_factor = 1.0;
    wb.upsert_team_record(record).unwrap();

    let result = wb.team_capacity("Falcon", "24-01").unwrap();
    assert_eq!(result.member("Dan").unwrap().sprints, vec![2.5, 2.5, 2.5]);
}

#[test]
fn copy_pi_resets_days_off_and_guards_target() {
    let mut wb = workbook();
    let mut ana = wb.roster().member("Falcon", "24-01", "Ana").unwrap().unwrap();
    ana.days_off = vec![3.0, 0.0, 1.0];
    wb.upsert_member("Falcon", "24-01", ana).unwrap();

    assert_eq!(wb.copy_pi("Falcon", "24-01", "24-02", false).unwrap(), 3);
    let copied = wb.members("Falcon", "24-02").unwrap();
    assert!(copied.iter().all(|m| m.days_off == vec![0.0, 0.0, 0.0]));
    assert_eq!(
        wb.members("Falcon", "24-01").unwrap()[0].days_off,
        vec![3.0, 0.0, 1.0]
    );

    assert!(matches!(
        wb.copy_pi("Falcon", "24-01", "24-02", false),
        Err(WorkbookError::Roster(RosterError::TargetNotEmpty { .. }))
    ));
    assert_eq!(wb.copy_pi("Falcon", "24-01", "24-02", true).unwrap(), 3);
    assert_eq!(wb.members("Falcon", "24-02").unwrap().len(), 3);

    assert!(matches!(
        wb.copy_pi("Falcon", "23-04", "24-03", false),
        Err(WorkbookError::Roster(RosterError::EmptySource { .. }))
    ));
}

#[test]
fn new_member_joins_with_velocity_focus_factor() {
    let mut settings = PlanningSettings::default();
    settings.num_sprints = 1;
    settings.pi_buffer = 0.0;
    let mut wb = PlanningWorkbook::with_settings(settings).unwrap();
    wb.replace_roles(
        "Falcon",
        "24-01",
        RoleRelevanceMap::from_entries([("Developer", true)]),
    );
    let mut record = TeamPiRecord::new("Falcon", "24-01", EstimationApproach::Velocity);
    record.sp_focus_factor = 0.5;
    assert_eq!(wb.upsert_team_record(record).unwrap(), 0);

    let ana = wb.new_team_member("Falcon", "24-01", "Ana", "Developer");
    assert_eq!(ana.sp_focus_factor, 0.5);
    wb.upsert_member("Falcon", "24-01", ana).unwrap();
    let result = wb.team_capacity("Falcon", "24-01").unwrap();
    assert_eq!(result.sprint_totals, vec![5.0]);

    // other team or PI has no record to inherit
    assert_eq!(
        wb.new_team_member("Falcon", "24-02", "Ben", "Developer").sp_focus_factor,
        0.0
    );
    assert_eq!(
        wb.new_team_member("Otter", "24-01", "Cy", "Developer").sp_focus_factor,
        0.0
    );
}

#[test]
fn percentages_record_does_not_seed_focus_factor() {
    let mut wb = workbook();
    let mut record = TeamPiRecord::new("Falcon", "24-01", EstimationApproach::Percentages);
    record.sp_focus_factor = 0.9;
    wb.upsert_team_record(record).unwrap();
    let dev = wb.new_team_member("Falcon", "24-01", "Dev", "Developer");
    assert_eq!(dev.sp_focus_factor, 0.0);
}

#[test]
fn copy_pi_takes_focus_factor_from_target_record() {
    let mut wb = workbook();
    let mut ana = wb.roster().member("Falcon", "24-01", "Ana").unwrap().unwrap();
    ana.sp_focus_factor = 0.2;
    wb.upsert_member("Falcon", "24-01", ana).unwrap();

    let mut record = TeamPiRecord::new("Falcon", "24-02", EstimationApproach::Velocity);
    record.sp_focus_factor = 0.5;
    wb.upsert_team_record(record).unwrap();

    assert_eq!(wb.copy_pi("Falcon", "24-01", "24-02", false).unwrap(), 3);
    let copied = wb.members("Falcon", "24-02").unwrap();
    assert!(copied.iter().all(|m| m.sp_focus_factor == 0.5));
    assert_eq!(wb.members("Falcon", "24-01").unwrap()[0].sp_focus_factor, 0.2);

    let mut percent = TeamPiRecord::new("Falcon", "24-03", EstimationApproach::Percentages);
    percent.sp_focus_factor = 0.9;
    wb.upsert_team_record(percent).unwrap();
    wb.copy_pi("Falcon", "24-01", "24-03", false).unwrap();
    assert_eq!(wb.members("Falcon", "24-03").unwrap()[0].sp_focus_factor, 0.2);
}

#[test]
fn roster_lists_teams_and_pis() {
    let mut wb = workbook();
    let eve = wb.new_member("Eve", "Developer");
    wb.upsert_member("Otter", "24-02", eve).unwrap();

    assert_eq!(wb.roster().teams().unwrap(), vec!["Falcon", "Otter"]);
    assert_eq!(wb.roster().pis("Otter").unwrap(), vec!["24-02"]);
    assert_eq!(wb.roster().teams_in_pi("24-01").unwrap(), vec!["Falcon"]);
}

#[test]
fn suggestion_needs_history() {
    let wb = workbook();
    assert!(matches!(
        wb.suggest_velocity_record("Falcon", "24-01", Some(3)),
        Err(WorkbookError::Velocity(VelocityError::NoData(_)))
    ));
}

#[test]
fn suggestion_averages_sprints_before_anchor() {
    let mut wb = workbook();
    wb.replace_velocity_history(vec![
        SprintVelocity::new("Falcon", 2023, "PI 23-04", "S1", 20.0),
        SprintVelocity::new("Falcon", 2023, "PI 23-04", "S2", 40.0),
        SprintVelocity::new("Falcon", 2024, "PI 24-01", "S3", 60.0),
    ]);
    let (record, baseline) = wb.suggest_velocity_record("Falcon", "24-01", Some(3)).unwrap();
    assert_eq!(baseline.average, 30.0);
    assert_eq!(baseline.first_sprint, "S1");
    assert_eq!(baseline.last_sprint, "S2");
    assert_eq!(record.average_duration, 10.0);
    assert_eq!(record.sp_focus_factor, 1.0);
}

#[test]
fn capacity_report_tables() {
    let mut wb = workbook();
    let mut record = TeamPiRecord::new("Falcon", "24-01", EstimationApproach::Velocity);
    record.sp_focus_factor = 0.5;
    wb.upsert_team_record(record).unwrap();

    let report = wb.capacity_report("Falcon", "24-01").unwrap();
    let members = report.member_table().unwrap();
    assert_eq!(members.height(), 4);
    assert_eq!(members.width(), 3 + 3 + 1);
    let totals = members.column("PI Total (SP)").unwrap().f64().unwrap().get(3);
    assert_eq!(totals, Some(30.0));

    let sprints = report.sprint_breakdown().unwrap();
    assert_eq!(sprints.height(), 3);
    let roles = report.role_breakdown().unwrap();
    assert_eq!(roles.height(), 3);
    assert!(report.headline().contains("30.0 SP without buffer"));
}

#[test]
fn alignment_review_over_tagged_capabilities() {
    let mut wb = workbook();
    let mut over = Capability::new("101", "Data lake", 10.0);
    over.tags = vec!["PI 24-01".into()];
    over.area_path = "Platform\\Data".into();
    let mut fine = Capability::new("102", "Dashboards", 50.0);
    fine.tags = vec!["PI 24-01".into()];
    fine.area_path = "Platform\\Data".into();
    wb.replace_capabilities(vec![over, fine]).unwrap();

    assert_eq!(
        wb.review_alignment("PI 24-01", "Data"),
        AlignmentReview::NothingDistributed
    );
    wb.set_allocation("102", "PI 24-01", 20.0).unwrap();
    assert_eq!(
        wb.review_alignment("PI 24-01", "Data"),
        AlignmentReview::WithinBudget
    );
    wb.set_allocation("101", "PI 24-02", 12.0).unwrap();
    assert_eq!(
        wb.review_alignment("PI 24-01", ""),
        AlignmentReview::OverBudget(vec!["101".into()])
    );
    assert!(wb.set_allocation("999", "PI 24-01", 1.0).is_err());
    assert!(wb.set_allocation("101", "Next PI", 1.0).is_err());
}

#[test]
fn settings_update_rejects_bad_values() {
    let mut wb = workbook();
    wb.update_setting("pi_buffer", "0.25").unwrap();
    assert_eq!(wb.settings().pi_buffer, 0.25);
    assert!(wb.update_setting("pi_buffer", "2").is_err());
    assert!(wb.update_setting("colour", "blue").is_err());
    assert_eq!(wb.settings().pi_buffer, 0.25);
}
