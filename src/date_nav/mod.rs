use chrono::{Days, Months, NaiveDate};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    NextDay,
    PreviousDay,
    NextWeek,
    PreviousWeek,
    NextMonth,
    PreviousMonth,
}

/// Moves `date` by one step. Month steps clamp to the end of the target month.
/// Returns `None` only when the result leaves chrono's supported range.
pub fn shift(date: NaiveDate, step: Step) -> Option<NaiveDate> {
    match step {
        Step::NextDay => date.checked_add_days(Days::new(1)),
        Step::PreviousDay => date.checked_sub_days(Days::new(1)),
        Step::NextWeek => date.checked_add_days(Days::new(7)),
        Step::PreviousWeek => date.checked_sub_days(Days::new(7)),
        Step::NextMonth => date.checked_add_months(Months::new(1)),
        Step::PreviousMonth => date.checked_sub_months(Months::new(1)),
    }
}
