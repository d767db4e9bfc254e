//! Holiday, weekend and weekday indicator series

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::holidays::HolidayCalendar;
use crate::domain::{Frame, Frequency};

pub const HOLIDAY_COLUMN: &str = "holiday";
pub const WEEKEND_COLUMN: &str = "weekend";

/// One-hot weekday columns, Monday first
pub const WEEKDAY_COLUMNS: [&str; 7] = ["mon", "tue", "wed", "thur", "fri", "sat", "sun"];

/// Calendar classification of one point in the generated range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayRecord {
    pub timestamp: NaiveDateTime,
    pub is_holiday: bool,
    pub holiday_name: Option<String>,
    pub is_weekend: bool,
}

impl HolidayRecord {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Monday = 0 .. Sunday = 6
    pub fn day_of_week(&self) -> u32 {
        self.timestamp.weekday().num_days_from_monday()
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Points from `start 00:00` up to the end of `end`, stepping by `frequency`
pub fn calendar_range(start: NaiveDate, end: NaiveDate, frequency: Frequency) -> Vec<NaiveDateTime> {
    let step = frequency.step();
    let stop = end.and_time(NaiveTime::MIN) + Duration::days(1);
    let mut points = Vec::new();
    let mut ts = start.and_time(NaiveTime::MIN);
    while ts < stop {
        points.push(ts);
        ts += step;
    }
    points
}

/// Classify every point of the range. Pure function of its arguments.
pub fn generate_calendar(
    start: NaiveDate,
    end: NaiveDate,
    frequency: Frequency,
    calendar: &dyn HolidayCalendar,
) -> Vec<HolidayRecord> {
    let records: Vec<_> = calendar_range(start, end, frequency)
        .into_iter()
        .map(|timestamp| {
            let name = calendar.holiday_name(timestamp.date());
            HolidayRecord {
                timestamp,
                is_holiday: name.is_some(),
                holiday_name: name.map(str::to_string),
                is_weekend: is_weekend(timestamp.date()),
            }
        })
        .collect();

    let holidays = records.iter().filter(|r| r.is_holiday).count();
    info!(
        country = calendar.country(),
        %frequency,
        points = records.len(),
        holidays,
        "generated calendar"
    );
    records
}

fn flag(value: bool) -> Option<f64> {
    Some(if value { 1.0 } else { 0.0 })
}

/// `holiday` and `weekend` as 0/1 columns
pub fn holiday_frame(records: &[HolidayRecord]) -> Frame {
    let mut frame = Frame::new([HOLIDAY_COLUMN, WEEKEND_COLUMN]);
    for record in records {
        frame.insert(record.timestamp, vec![flag(record.is_holiday), flag(record.is_weekend)]);
    }
    frame
}

/// One-hot encoding of the day of week over the same points
pub fn weekday_dummies(records: &[HolidayRecord]) -> Frame {
    let mut frame = Frame::new(WEEKDAY_COLUMNS);
    for record in records {
        let day = record.day_of_week() as usize;
        let row = (0..WEEKDAY_COLUMNS.len()).map(|i| flag(i == day)).collect();
        frame.insert(record.timestamp, row);
    }
    frame
}
