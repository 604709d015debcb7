use capacity_planner::{
    CalendarError, PlanningWorkbook, SprintCalendar, WorkCalendar, WorkCalendarConfig,
    WorkbookError,
};
use chrono::{Duration, NaiveDate, Weekday};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn default_calendar_weekends_unavailable() {
    let cal = WorkCalendar::default();
    // 2025-01-04 is a Saturday, 2025-01-05 is a Sunday
    assert!(!cal.is_available(d(2025, 1, 4)));
    assert!(!cal.is_available(d(2025, 1, 5)));
    assert!(cal.is_available(d(2025, 1, 6)));
}

#[test]
fn holidays_block_days() {
    let mut cal = WorkCalendar::default();
    let holiday = d(2025, 2, 4);
    cal.add_holiday(holiday);
    assert!(!cal.is_available(holiday));
    assert_eq!(cal.count_available_days(d(2025, 2, 3), d(2025, 2, 7)), 4);
}

#[test]
fn custom_working_days_include_saturday() {
    let cal = WorkCalendar::custom(
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ],
        [],
    );
    assert!(cal.is_available(d(2025, 1, 4)));
    assert!(!cal.is_available(d(2025, 1, 5)));
}

#[test]
fn config_round_trip_keeps_days_and_holidays() {
    let config = WorkCalendarConfig::new(
        [Weekday::Fri, Weekday::Mon, Weekday::Mon],
        [d(2025, 3, 3), d(2025, 1, 1)],
    );
    assert_eq!(config.working_days(), &[Weekday::Mon, Weekday::Fri]);
    assert_eq!(config.holidays(), &[d(2025, 1, 1), d(2025, 3, 3)]);

    let cal = WorkCalendar::from_config(&config);
    assert_eq!(cal.to_config(), config);
}

#[test]
fn counting_up_to_the_last_date_stops_cleanly() {
    let cal = WorkCalendar::default();
    let days = cal.count_available_days(NaiveDate::MAX - Duration::days(6), NaiveDate::MAX);
    assert_eq!(days, 5);
}

#[test]
fn two_week_sprints_have_ten_working_days() {
    // 2025-01-06 is a Monday
    let calendar = SprintCalendar::new(d(2025, 1, 6), 2, 5);
    let sprints = calendar.sprints().unwrap();
    assert_eq!(sprints.len(), 5);
    assert_eq!(sprints[0].number, 1);
    assert_eq!(sprints[0].start, d(2025, 1, 6));
    assert_eq!(sprints[0].end, d(2025, 1, 19));
    assert_eq!(sprints[1].start, d(2025, 1, 20));
    assert!(sprints.iter().all(|sprint| sprint.working_days == 10));
    assert_eq!(calendar.pi_end().unwrap(), Some(d(2025, 3, 16)));
    assert_eq!(calendar.average_sprint_duration().unwrap(), 10.0);
}

#[test]
fn holidays_shorten_their_sprint() {
    let mut cal = WorkCalendar::default();
    cal.add_holidays(&[d(2025, 1, 7), d(2025, 1, 21)]);
    let calendar = SprintCalendar::new(d(2025, 1, 6), 2, 2).with_calendar(cal);

    let days: Vec<u32> = calendar.sprints().unwrap().iter().map(|s| s.working_days).collect();
    assert_eq!(days, vec![9, 9]);
    assert_eq!(calendar.average_sprint_duration().unwrap(), 9.0);
}

#[test]
fn sprint_lookup_by_date() {
    let calendar = SprintCalendar::new(d(2025, 1, 6), 2, 3);
    assert_eq!(calendar.sprint_for(d(2025, 1, 6)).unwrap(), Some(1));
    assert_eq!(calendar.sprint_for(d(2025, 1, 19)).unwrap(), Some(1));
    assert_eq!(calendar.sprint_for(d(2025, 1, 20)).unwrap(), Some(2));
    assert_eq!(calendar.sprint_for(d(2025, 2, 16)).unwrap(), Some(3));
    assert_eq!(calendar.sprint_for(d(2025, 2, 17)).unwrap(), None);
    assert_eq!(calendar.sprint_for(d(2025, 1, 5)).unwrap(), None);
}

#[test]
fn empty_calendar_has_no_duration() {
    let calendar = SprintCalendar::new(d(2025, 1, 6), 2, 0);
    assert!(calendar.sprints().unwrap().is_empty());
    assert_eq!(calendar.pi_end().unwrap(), None);
    assert_eq!(calendar.average_sprint_duration().unwrap(), 0.0);
}

#[test]
fn sprint_length_and_count_are_bounded() {
    let too_long = SprintCalendar::new(d(2025, 1, 6), 2_000_000, 5);
    assert_eq!(
        too_long.sprints(),
        Err(CalendarError::InvalidSprintWeeks {
            weeks: 2_000_000,
            max: SprintCalendar::MAX_SPRINT_WEEKS,
        })
    );
    assert!(matches!(
        SprintCalendar::new(d(2025, 1, 6), 0, 5).sprints(),
        Err(CalendarError::InvalidSprintWeeks { weeks: 0, .. })
    ));
    assert!(matches!(
        SprintCalendar::new(d(2025, 1, 6), 1, 1_000_000).average_sprint_duration(),
        Err(CalendarError::TooManySprints { .. })
    ));
}

#[test]
fn sprints_past_the_last_date_are_an_error() {
    let calendar = SprintCalendar::new(NaiveDate::MAX - Duration::days(20), 2, 3);
    assert_eq!(
        calendar.sprints(),
        Err(CalendarError::DateOutOfRange { number: 2 })
    );
}

#[test]
fn workbook_rejects_unbounded_calendar() {
    let mut workbook = PlanningWorkbook::new();
    let calendar = SprintCalendar::new(d(2025, 1, 6), 500, 5);
    assert!(matches!(
        workbook.apply_sprint_calendar(&calendar),
        Err(WorkbookError::Calendar(CalendarError::InvalidSprintWeeks { .. }))
    ));
    assert_eq!(workbook.settings().num_sprints, 5);
}

#[test]
fn workbook_takes_sprint_settings_from_calendar() {
    let mut cal = WorkCalendar::default();
    cal.add_holiday(d(2025, 1, 7));
    let calendar = SprintCalendar::new(d(2025, 1, 6), 2, 4).with_calendar(cal);

    let mut workbook = PlanningWorkbook::new();
    workbook.apply_sprint_calendar(&calendar).unwrap();
    assert_eq!(workbook.settings().num_sprints, 4);
    assert_eq!(workbook.settings().sprint_duration, 39.0 / 4.0);
    assert_eq!(workbook.new_member("Ana", "Developer").days_off.len(), 4);
}
