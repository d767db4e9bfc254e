//! Public-holiday calendars.
//!
//! The calendar is a dependency of the calendar generator rather than a
//! global table, so callers can supply their own implementation for other
//! countries or for testing.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::{PipelineError, Result};

pub trait HolidayCalendar: Send + Sync {
    /// ISO 3166 alpha-2 code of the country this calendar describes
    fn country(&self) -> &str;

    /// Name of the public holiday on `date`, if any
    fn holiday_name(&self, date: NaiveDate) -> Option<&'static str>;

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holiday_name(date).is_some()
    }
}

/// Built-in calendar for a country code (case-insensitive)
pub fn calendar_for(country: &str) -> Result<Box<dyn HolidayCalendar>> {
    match country.to_uppercase().as_str() {
        "DK" => Ok(Box::new(DanishHolidays)),
        "SE" => Ok(Box::new(SwedishHolidays)),
        _ => Err(PipelineError::UnsupportedCountry {
            country: country.to_string(),
        }),
    }
}

/// Gregorian Easter Sunday (anonymous Gregorian algorithm)
pub fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).unwrap_or_default()
}

fn days_after_easter(date: NaiveDate) -> i64 {
    (date - easter_sunday(date.year())).num_days()
}

/// Danish public holidays
#[derive(Debug, Clone, Copy, Default)]
pub struct DanishHolidays;

impl HolidayCalendar for DanishHolidays {
    fn country(&self) -> &str {
        "DK"
    }

    fn holiday_name(&self, date: NaiveDate) -> Option<&'static str> {
        let fixed = match (date.month(), date.day()) {
            (1, 1) => Some("Nytårsdag"),
            (6, 5) => Some("Grundlovsdag"),
            (12, 25) => Some("Juledag"),
            (12, 26) => Some("Anden juledag"),
            _ => None,
        };
        fixed.or(match days_after_easter(date) {
            -3 => Some("Skærtorsdag"),
            -2 => Some("Langfredag"),
            0 => Some("Påskedag"),
            1 => Some("Anden påskedag"),
            // Abolished from 2024
            26 if date.year() < 2024 => Some("Store bededag"),
            39 => Some("Kristi himmelfartsdag"),
            49 => Some("Pinsedag"),
            50 => Some("Anden pinsedag"),
            _ => None,
        })
    }
}

/// Swedish public holidays (röda dagar, plus Midsummer Eve, Christmas Eve
/// and New Year's Eve which are de facto non-working days)
#[derive(Debug, Clone, Copy, Default)]
pub struct SwedishHolidays;

impl HolidayCalendar for SwedishHolidays {
    fn country(&self) -> &str {
        "SE"
    }

    fn holiday_name(&self, date: NaiveDate) -> Option<&'static str> {
        let fixed = match (date.month(), date.day()) {
            (1, 1) => Some("Nyårsdagen"),
            (1, 6) => Some("Trettondedag jul"),
            (5, 1) => Some("Första maj"),
            (6, 6) => Some("Sveriges nationaldag"),
            (12, 24) => Some("Julafton"),
            (12, 25) => Some("Juldagen"),
            (12, 26) => Some("Annandag jul"),
            (12, 31) => Some("Nyårsafton"),
            _ => None,
        };
        let weekday = date.weekday();
        let floating = match (date.month(), date.day()) {
            (6, 19..=25) if weekday == Weekday::Fri => Some("Midsommarafton"),
            (6, 20..=26) if weekday == Weekday::Sat => Some("Midsommardagen"),
            (10, 31) | (11, 1..=6) if weekday == Weekday::Sat => Some("Alla helgons dag"),
            _ => None,
        };
        fixed.or(floating).or(match days_after_easter(date) {
            -2 => Some("Långfredagen"),
            0 => Some("Påskdagen"),
            1 => Some("Annandag påsk"),
            39 => Some("Kristi himmelsfärdsdag"),
            49 => Some("Pingstdagen"),
            _ => None,
        })
    }
}

/// Fixed-date calendar, handy for injecting known holidays in tests
#[derive(Debug, Clone, Default)]
pub struct FixedHolidays {
    country: String,
    days: Vec<(NaiveDate, &'static str)>,
}

impl FixedHolidays {
    pub fn new(country: impl Into<String>, days: Vec<(NaiveDate, &'static str)>) -> Self {
        Self {
            country: country.into(),
            days,
        }
    }
}

impl HolidayCalendar for FixedHolidays {
    fn country(&self) -> &str {
        &self.country
    }

    fn holiday_name(&self, date: NaiveDate) -> Option<&'static str> {
        self.days
            .iter()
            .find(|(d, _)| *d == date)
            .map(|(_, name)| *name)
    }
}
