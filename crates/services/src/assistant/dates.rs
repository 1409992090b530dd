//! Lexical date cues in free-text messages.

use std::sync::LazyLock;

use chrono::{Days, NaiveDate, Weekday};
use regex::Regex;

use crate::time::{next_monday, next_weekday_after, parse_weekday};

static NEXT_WEEK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnext\s+week\b").expect("valid regex"));
static NEXT_WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bnext\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b")
        .expect("valid regex")
});
static THIS_WEEK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bthis\s+week\b").expect("valid regex"));
static TOMORROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\btomorrow\b").expect("valid regex"));
static TODAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\btoday\b").expect("valid regex"));
static YESTERDAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\byesterday\b").expect("valid regex"));
static UPCOMING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bupcoming\b").expect("valid regex"));
static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})\b").expect("valid regex")
});
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("valid regex"));

/// Temporal window of a schedule question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleWindow {
    Today,
    Tomorrow,
    ThisWeek,
    NextWeek,
    NextWeekday(Weekday),
    Upcoming,
}

impl ScheduleWindow {
    /// Cue precedence: next week, next <weekday>, this week, tomorrow, today,
    /// upcoming. Without any cue the next seven days are used.
    pub fn detect(utterance: &str) -> Self {
        let text = utterance.to_lowercase();
        if NEXT_WEEK.is_match(&text) {
            return ScheduleWindow::NextWeek;
        }
        if let Some(day) = NEXT_WEEKDAY
            .captures(&text)
            .and_then(|c| parse_weekday(&c[1]))
        {
            return ScheduleWindow::NextWeekday(day);
        }
        if THIS_WEEK.is_match(&text) {
            return ScheduleWindow::ThisWeek;
        }
        if TOMORROW.is_match(&text) {
            return ScheduleWindow::Tomorrow;
        }
        if TODAY.is_match(&text) {
            return ScheduleWindow::Today;
        }
        ScheduleWindow::Upcoming
    }

    /// Local days `[from, until)` covered by the window.
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            ScheduleWindow::Today => (today, today + Days::new(1)),
            ScheduleWindow::Tomorrow => (today + Days::new(1), today + Days::new(2)),
            ScheduleWindow::ThisWeek => (today, next_monday(today)),
            ScheduleWindow::NextWeek => {
                let monday = next_monday(today);
                (monday, monday + Days::new(7))
            }
            ScheduleWindow::NextWeekday(day) => {
                let date = next_weekday_after(today, *day);
                (date, date + Days::new(1))
            }
            ScheduleWindow::Upcoming => (today, today + Days::new(7)),
        }
    }

    pub fn label(&self) -> String {
        match self {
            ScheduleWindow::Today => "today".to_string(),
            ScheduleWindow::Tomorrow => "tomorrow".to_string(),
            ScheduleWindow::ThisWeek => "this week".to_string(),
            ScheduleWindow::NextWeek => "next week".to_string(),
            ScheduleWindow::NextWeekday(day) => format!("next {}", weekday_name(*day)),
            ScheduleWindow::Upcoming => "the next 7 days".to_string(),
        }
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Target day of an admin `schedules` command. `next <weekday>` means that
/// weekday in the following week; `next week` means next Monday.
pub fn admin_target_date(utterance: &str, today: NaiveDate) -> NaiveDate {
    let text = utterance.to_lowercase();
    if let Some(day) = NEXT_WEEKDAY
        .captures(&text)
        .and_then(|c| parse_weekday(&c[1]))
    {
        return next_monday(today) + Days::new(day.num_days_from_monday() as u64);
    }
    if NEXT_WEEK.is_match(&text) {
        return next_monday(today);
    }
    if TOMORROW.is_match(&text) {
        return today + Days::new(1);
    }
    if YESTERDAY.is_match(&text) {
        return today - Days::new(1);
    }
    today
}

/// Dates in order of appearance. ISO `YYYY-MM-DD` is read as such; other
/// numeric dates are `MM/DD/YYYY` (`-` also accepted, two-digit years are
/// 20yy). Invalid calendar dates are skipped.
pub fn extract_dates(utterance: &str) -> Vec<NaiveDate> {
    let iso = ISO_DATE.captures_iter(utterance).filter_map(|c| {
        let date = NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?)?;
        Some((c.get(0)?.start(), date))
    });
    let month_first = NUMERIC_DATE.captures_iter(utterance).filter_map(|c| {
        let month: u32 = c[1].parse().ok()?;
        let day: u32 = c[2].parse().ok()?;
        let mut year: i32 = c[3].parse().ok()?;
        if c[3].len() == 2 {
            year += 2000;
        } else if c[3].len() == 3 {
            return None;
        }
        Some((c.get(0)?.start(), NaiveDate::from_ymd_opt(year, month, day)?))
    });

    let mut found: Vec<(usize, NaiveDate)> = iso.chain(month_first).collect();
    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, date)| date).collect()
}

/// Absence span from zero, one or two dates; defaults to today.
pub fn absence_span(utterance: &str, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let dates = extract_dates(utterance);
    match dates.as_slice() {
        [] => (today, today),
        [single] => (*single, *single),
        [a, b, ..] => ((*a).min(*b), (*a).max(*b)),
    }
}
