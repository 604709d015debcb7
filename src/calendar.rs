use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendar {
    holidays: HashSet<NaiveDate>,
    non_working_days: HashSet<Weekday>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    working_days: Vec<Weekday>,
    holidays: Vec<NaiveDate>,
}

impl Default for WorkCalendar {
    /// Monday to Friday, no holidays.
    fn default() -> Self {
        Self {
            holidays: HashSet::new(),
            non_working_days: HashSet::from([Weekday::Sat, Weekday::Sun]),
        }
    }
}

impl WorkCalendar {
    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn custom<I, J>(working_days: I, holidays: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let config = WorkCalendarConfig::new(working_days, holidays);
        Self::from_config(&config)
    }

    pub fn from_config(config: &WorkCalendarConfig) -> Self {
        let working_set: HashSet<Weekday> = config.working_days.iter().copied().collect();
        let non_working_days = Self::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !working_set.contains(day))
            .collect();
        Self {
            holidays: config.holidays.iter().copied().collect(),
            non_working_days,
        }
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig::from(self)
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    pub fn add_holidays(&mut self, dates: &[NaiveDate]) {
        self.holidays.extend(dates);
    }

    /// Check if a date counts as a working day
    pub fn is_available(&self, date: NaiveDate) -> bool {
        !self.holidays.contains(&date) && !self.non_working_days.contains(&date.weekday())
    }

    /// Count working days in a date range (inclusive)
    pub fn count_available_days(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        let mut count = 0;
        let mut current = Some(start);
        while let Some(day) = current.filter(|day| *day <= end) {
            if self.is_available(day) {
                count += 1;
            }
            current = day.succ_opt();
        }
        count
    }
}

impl WorkCalendarConfig {
    pub fn new<I, J>(working_days: I, holidays: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let mut working: Vec<Weekday> = working_days.into_iter().collect();
        working.sort_by_key(|wd| wd.num_days_from_monday());
        working.dedup();

        let mut holidays: Vec<NaiveDate> = holidays.into_iter().collect();
        holidays.sort();
        holidays.dedup();

        Self {
            working_days: working,
            holidays,
        }
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn holidays(&self) -> &[NaiveDate] {
        &self.holidays
    }
}

impl Default for WorkCalendarConfig {
    fn default() -> Self {
        WorkCalendarConfig::from(&WorkCalendar::default())
    }
}

impl From<&WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: &WorkCalendar) -> Self {
        let working = WorkCalendar::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !calendar.non_working_days.contains(day));
        WorkCalendarConfig::new(working, calendar.holidays.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintWindow {
    /// 1-based sprint number within the PI.
    pub number: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub working_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("sprint length must be between 1 and {max} weeks (got {weeks})")]
    InvalidSprintWeeks { weeks: u32, max: u32 },
    #[error("a PI holds at most {max} sprints (got {count})")]
    TooManySprints { count: usize, max: usize },
    #[error("sprint {number} falls outside the supported date range")]
    DateOutOfRange { number: usize },
}

/// Fixed-length sprints laid out from the first day of a PI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintCalendar {
    pub pi_start: NaiveDate,
    pub sprint_weeks: u32,
    pub num_sprints: usize,
    #[serde(default)]
    pub calendar: WorkCalendar,
}

impl SprintCalendar {
    pub fn new(pi_start: NaiveDate, sprint_weeks: u32, num_sprints: usize) -> Self {
        Self {
            pi_start,
            sprint_weeks,
            num_sprints,
            calendar: WorkCalendar::default(),
        }
    }

    pub fn with_calendar(mut self, calendar: WorkCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub const MAX_SPRINT_WEEKS: u32 = 12;
    pub const MAX_SPRINTS: usize = 52;

    fn sprint_length(&self) -> Result<Duration, CalendarError> {
        if !(1..=Self::MAX_SPRINT_WEEKS).contains(&self.sprint_weeks) {
            return Err(CalendarError::InvalidSprintWeeks {
                weeks: self.sprint_weeks,
                max: Self::MAX_SPRINT_WEEKS,
            });
        }
        if self.num_sprints > Self::MAX_SPRINTS {
            return Err(CalendarError::TooManySprints {
                count: self.num_sprints,
                max: Self::MAX_SPRINTS,
            });
        }
        Ok(Duration::weeks(i64::from(self.sprint_weeks)))
    }

    pub fn sprints(&self) -> Result<Vec<SprintWindow>, CalendarError> {
        let length = self.sprint_length()?;
        (0..self.num_sprints)
            .map(|idx| {
                let number = idx + 1;
                let out_of_range = CalendarError::DateOutOfRange { number };
                let offset = i32::try_from(idx)
                    .ok()
                    .and_then(|idx| length.checked_mul(idx))
                    .ok_or(out_of_range.clone())?;
                let start = self
                    .pi_start
                    .checked_add_signed(offset)
                    .ok_or(out_of_range.clone())?;
                let end = start
                    .checked_add_signed(length - Duration::days(1))
                    .ok_or(out_of_range)?;
                Ok(SprintWindow {
                    number,
                    start,
                    end,
                    working_days: self.calendar.count_available_days(start, end),
                })
            })
            .collect()
    }

    /// Last calendar day of the PI, if it has any sprints.
    pub fn pi_end(&self) -> Result<Option<NaiveDate>, CalendarError> {
        Ok(self.sprints()?.last().map(|sprint| sprint.end))
    }

    /// 1-based number of the sprint containing `date`.
    pub fn sprint_for(&self, date: NaiveDate) -> Result<Option<usize>, CalendarError> {
        Ok(self
            .sprints()?
            .into_iter()
            .find(|sprint| sprint.start <= date && date <= sprint.end)
            .map(|sprint| sprint.number))
    }

    /// Mean working days per sprint, suitable as a sprint duration setting.
    pub fn average_sprint_duration(&self) -> Result<f64, CalendarError> {
        let sprints = self.sprints()?;
        if sprints.is_empty() {
            return Ok(0.0);
        }
        let total: u32 = sprints.iter().map(|sprint| sprint.working_days).sum();
        Ok(f64::from(total) / sprints.len() as f64)
    }
}
