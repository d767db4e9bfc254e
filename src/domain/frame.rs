//! Timestamp-indexed table with named columns.
//!
//! Cells are `Option<f64>`: `None` means the source had no value for that
//! timestamp. A NaN produced by a derivation (e.g. a ratio over zero) is kept
//! as `Some(NaN)` so it stays distinguishable from an absent reading.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use std::collections::BTreeMap;

use super::TimeSeries;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    columns: Vec<String>,
    rows: BTreeMap<NaiveDateTime, Vec<Option<f64>>>,
}

impl Frame {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: BTreeMap::new(),
        }
    }

    /// Single-column frame from a series; the series name is the column name
    pub fn from_series(series: TimeSeries<f64>) -> Self {
        let mut frame = Self::new([series.name().to_string()]);
        for (ts, value) in series.into_points() {
            frame.rows.insert(ts, vec![Some(value)]);
        }
        frame
    }

    /// Single-column frame from a series with possibly-missing values
    pub fn from_optional_series(series: TimeSeries<Option<f64>>) -> Self {
        let mut frame = Self::new([series.name().to_string()]);
        for (ts, value) in series.into_points() {
            frame.rows.insert(ts, vec![value]);
        }
        frame
    }

    /// Insert a row unless the timestamp is already present.
    ///
    /// Returns `false` when the row was ignored as a duplicate.
    pub fn insert(&mut self, ts: NaiveDateTime, values: Vec<Option<f64>>) -> bool {
        assert_eq!(
            values.len(),
            self.columns.len(),
            "row width must match column count"
        );
        match self.rows.entry(ts) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(values);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.rows.contains_key(&ts)
    }

    pub fn row(&self, ts: NaiveDateTime) -> Option<&[Option<f64>]> {
        self.rows.get(&ts).map(Vec::as_slice)
    }

    /// Cell lookup; `None` if the row or column is absent or the cell is empty
    pub fn value(&self, ts: NaiveDateTime, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(&ts)?.get(idx).copied().flatten()
    }

    /// Rows in ascending timestamp order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, &[Option<f64>])> + '_ {
        self.rows.iter().map(|(ts, row)| (*ts, row.as_slice()))
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.rows.keys().copied()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.rows.keys().next().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.rows.keys().next_back().copied()
    }

    /// Keep only rows whose clock hour equals `hour`
    pub fn at_hour(self, hour: u32) -> Self {
        let rows = self
            .rows
            .into_iter()
            .filter(|(ts, _)| ts.hour() == hour && ts.minute() == 0)
            .collect();
        Self {
            columns: self.columns,
            rows,
        }
    }

    /// Move every row to `hour:00` on its own date.
    ///
    /// Used for date-keyed sources. If two rows land on the same key the
    /// earlier one wins.
    pub fn rekey_to_hour(self, hour: u32) -> Self {
        let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
        let mut rows = BTreeMap::new();
        for (ts, row) in self.rows {
            rows.entry(ts.date().and_time(time)).or_insert(row);
        }
        Self {
            columns: self.columns,
            rows,
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, BTreeMap<NaiveDateTime, Vec<Option<f64>>>) {
        (self.columns, self.rows)
    }
}
