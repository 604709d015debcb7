#![cfg(feature = "sqlite")]

use capacity_planner::persistence::{PlanningStore, SqlitePlanningStore};
use capacity_planner::{
    Capability, EstimationApproach, PlanningSettings, PlanningWorkbook, RoleDefaultPolicy,
    RoleRelevanceMap, SprintVelocity, TeamPiRecord,
};
use tempfile::NamedTempFile;

fn sample_workbook() -> PlanningWorkbook {
    let mut settings = PlanningSettings::default();
    settings.num_sprints = 4;
    settings.role_default = RoleDefaultPolicy::LegacyDeveloperTester;
    let mut wb = PlanningWorkbook::with_settings(settings).unwrap();

    for (team, name, role) in [
        ("Falcon", "Ana", "Developer"),
        ("Falcon", "Ben", "Architect"),
        ("Otter", "Cy", "Tester"),
    ] {
        let mut member = wb.new_member(name, role);
        member.days_off = vec![0.0, 1.0, 2.0, 0.5];
        wb.upsert_member(team, "24-02", member).unwrap();
    }
    wb.replace_roles(
        "Falcon",
        "24-02",
        RoleRelevanceMap::from_entries([("Architect", true)]),
    );

    let mut record = TeamPiRecord::new("Falcon", "24-02", EstimationApproach::Velocity);
    record.average_velocity = 24.0;
    record.average_duration = 10.0;
    record.average_team_members = 2;
    record.recompute_focus_factor();
    wb.upsert_team_record(record).unwrap();

    wb.replace_velocity_history(vec![
        SprintVelocity::new("Falcon", 2024, "PI 24-01", "S1", 22.0),
        SprintVelocity::new("Falcon", 2024, "PI 24-01", "S2", 26.0),
    ]);

    let mut capability = Capability::new("7", "Reporting", 20.0);
    capability.set_allocation("PI 24-02", 5.0).unwrap();
    wb.replace_capabilities(vec![capability]).unwrap();
    wb
}

#[test]
fn sqlite_store_round_trip_workbook() {
    let file = NamedTempFile::new().unwrap();
    let store = SqlitePlanningStore::new(file.path()).unwrap();
    let wb = sample_workbook();

    store.save_workbook(&wb).expect("save workbook");
    let loaded = store
        .load_workbook()
        .expect("load workbook")
        .expect("workbook exists");

    assert_eq!(loaded.settings(), wb.settings());
    assert_eq!(loaded.roster().len(), 3);
    for team in ["Falcon", "Otter"] {
        assert_eq!(
            loaded.members(team, "24-02").unwrap(),
            wb.members(team, "24-02").unwrap()
        );
    }
    assert_eq!(loaded.team_records(), wb.team_records());
    assert_eq!(loaded.velocity_history(), wb.velocity_history());
    assert_eq!(loaded.capabilities(), wb.capabilities());

    let before = wb.team_capacity("Falcon", "24-02").unwrap();
    let after = loaded.team_capacity("Falcon", "24-02").unwrap();
    assert_eq!(before, after);
}

#[test]
fn empty_store_has_no_workbook() {
    let store = SqlitePlanningStore::in_memory().unwrap();
    assert!(store.load_workbook().unwrap().is_none());
}

#[test]
fn saving_twice_replaces_previous_contents() {
    let store = SqlitePlanningStore::in_memory().unwrap();
    let mut wb = sample_workbook();
    store.save_workbook(&wb).unwrap();

    wb.delete_member("Falcon", "24-02", "Ben").unwrap();
    wb.replace_capabilities(Vec::new()).unwrap();
    store.save_workbook(&wb).unwrap();

    let loaded = store.load_workbook().unwrap().unwrap();
    assert_eq!(loaded.roster().len(), 2);
    assert!(loaded.capabilities().is_empty());
    assert!(
        loaded
            .roster()
            .member("Falcon", "24-02", "Ben")
            .unwrap()
            .is_none()
    );
}
