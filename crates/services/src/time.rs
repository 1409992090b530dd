use bson::DateTime;
use chrono::{Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tracing::warn;

/// Calendar arithmetic in the configured business timezone.
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    tz: Tz,
}

impl LocalClock {
    pub fn new(timezone: &str) -> Self {
        let tz = timezone.parse::<Tz>().unwrap_or_else(|_| {
            warn!(timezone, "Unknown timezone, falling back to UTC");
            Tz::UTC
        });
        Self { tz }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    pub fn local_date(&self, instant: DateTime) -> NaiveDate {
        instant.to_chrono().with_timezone(&self.tz).date_naive()
    }

    /// `YYYY-MM-DD` of `instant` in the local timezone.
    pub fn day_key(&self, instant: DateTime) -> String {
        self.local_date(instant).format("%Y-%m-%d").to_string()
    }

    /// Local midnight of `date` as a UTC instant.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime {
        let naive = date.and_time(NaiveTime::MIN);
        let local = self
            .tz
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| self.tz.from_utc_datetime(&naive));
        DateTime::from_chrono(local.with_timezone(&Utc))
    }

    /// `[start, end)` covering the local days `from..until`.
    pub fn range(&self, from: NaiveDate, until: NaiveDate) -> (DateTime, DateTime) {
        (self.start_of_day(from), self.start_of_day(until))
    }

    pub fn day_range(&self, date: NaiveDate) -> (DateTime, DateTime) {
        self.range(date, date + Days::new(1))
    }

    pub fn format_date(&self, instant: DateTime) -> String {
        instant
            .to_chrono()
            .with_timezone(&self.tz)
            .format("%a %d %b %Y")
            .to_string()
    }

    pub fn format_time(&self, instant: DateTime) -> String {
        instant
            .to_chrono()
            .with_timezone(&self.tz)
            .format("%H:%M")
            .to_string()
    }
}

/// Next occurrence of `weekday` strictly after `from`.
pub fn next_weekday_after(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() as i64
        - from.weekday().num_days_from_monday() as i64)
        % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    from + Days::new(ahead as u64)
}

/// Monday of the week following `from`.
pub fn next_monday(from: NaiveDate) -> NaiveDate {
    next_weekday_after(from, Weekday::Mon)
}

pub fn parse_weekday(word: &str) -> Option<Weekday> {
    match word {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
