use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use briefing_common::file_config::ScheduleConfig;

/// Workday calendar: Monday-Friday, minus public holidays, plus make-up
/// workdays that fall on a weekend.
#[derive(Debug, Clone, Default)]
pub struct WorkCalendar {
    holidays: HashSet<NaiveDate>,
    workdays: HashSet<NaiveDate>,
}

impl WorkCalendar {
    pub fn new(
        holidays: impl IntoIterator<Item = NaiveDate>,
        workdays: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
            workdays: workdays.into_iter().collect(),
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(
            config.holidays.iter().copied(),
            config.workdays.iter().copied(),
        )
    }

    pub fn is_workday(&self, date: NaiveDate) -> bool {
        if self.workdays.contains(&date) {
            return true;
        }
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        !weekend && !self.holidays.contains(&date)
    }
}

/// True when `today` is a workday and no earlier day of its Monday-starting
/// week was one.
pub fn is_first_workday_of_week(today: NaiveDate, calendar: &WorkCalendar) -> bool {
    if !calendar.is_workday(today) {
        return false;
    }
    let offset = i64::from(today.weekday().num_days_from_monday());
    let monday = today - Duration::days(offset);
    monday
        .iter_days()
        .take_while(|d| *d < today)
        .all(|d| !calendar.is_workday(d))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn national_day_2026() -> WorkCalendar {
        WorkCalendar::new(
            [1, 2, 5, 6, 7].map(|d| date(2026, 10, d)),
            [date(2026, 9, 27), date(2026, 10, 10)],
        )
    }

    #[test]
    fn plain_monday_passes() {
        let cal = WorkCalendar::default();
        assert!(is_first_workday_of_week(date(2026, 10, 19), &cal));
        assert!(!is_first_workday_of_week(date(2026, 10, 20), &cal));
    }

    #[test]
    fn weekend_never_passes_without_makeup() {
        let cal = WorkCalendar::default();
        assert!(!is_first_workday_of_week(date(2026, 10, 17), &cal));
        assert!(!is_first_workday_of_week(date(2026, 10, 18), &cal));
    }

    #[test]
    fn holiday_monday_moves_gate_to_next_workday() {
        let cal = national_day_2026();
        // Mon 5th through Wed 7th are holidays.
        assert!(!is_first_workday_of_week(date(2026, 10, 5), &cal));
        assert!(!is_first_workday_of_week(date(2026, 10, 7), &cal));
        assert!(is_first_workday_of_week(date(2026, 10, 8), &cal));
        assert!(!is_first_workday_of_week(date(2026, 10, 9), &cal));
        // Sat 10th is a make-up workday but Thu 8th came first.
        assert!(!is_first_workday_of_week(date(2026, 10, 10), &cal));
    }

    #[test]
    fn makeup_sunday_is_first_of_its_week_only_if_nothing_earlier() {
        let cal = national_day_2026();
        // Week of Mon 21 Sep: Monday is a regular workday.
        assert!(!is_first_workday_of_week(date(2026, 9, 27), &cal));
        assert!(cal.is_workday(date(2026, 9, 27)));
    }

    #[test]
    fn whole_week_of_holidays_then_makeup_saturday() {
        let cal = WorkCalendar::new(
            (12..=16).map(|d| date(2026, 10, d)),
            [date(2026, 10, 17)],
        );
        assert!(is_first_workday_of_week(date(2026, 10, 17), &cal));
    }

    #[test]
    fn calendar_from_config() {
        let config = ScheduleConfig {
            holidays: vec![date(2026, 10, 19)],
            workdays: vec![],
        };
        let cal = WorkCalendar::from_config(&config);
        assert!(!is_first_workday_of_week(date(2026, 10, 19), &cal));
        assert!(is_first_workday_of_week(date(2026, 10, 20), &cal));
    }
}
