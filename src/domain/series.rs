//! Time-indexed series used between pipeline stages

use chrono::NaiveDateTime;

/// Readings labeled with local wall-clock time, as published by the market
/// data sources.
///
/// Ordered by timestamp (stable), so the two readings sharing the repeated
/// fall-back hour stay in publication order. Labels may be duplicated or
/// skipped around clock changes; the DST stage turns this into a
/// [`TimeSeries`].
#[derive(Debug, Clone, PartialEq)]
pub struct WallClockSeries {
    name: String,
    readings: Vec<(NaiveDateTime, f64)>,
}

impl WallClockSeries {
    /// Build from readings in publication order
    pub fn new(name: impl Into<String>, mut readings: Vec<(NaiveDateTime, f64)>) -> Self {
        readings.sort_by_key(|(ts, _)| *ts);
        Self {
            name: name.into(),
            readings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn readings(&self) -> &[(NaiveDateTime, f64)] {
        &self.readings
    }

    pub fn into_readings(self) -> Vec<(NaiveDateTime, f64)> {
        self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Ordered (timestamp, value) pairs with strictly increasing, unique
/// timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<V = f64> {
    name: String,
    points: Vec<(NaiveDateTime, V)>,
}

impl<V> TimeSeries<V> {
    /// Sorts the points and keeps the first point seen for each timestamp.
    pub fn from_points(name: impl Into<String>, mut points: Vec<(NaiveDateTime, V)>) -> Self {
        points.sort_by_key(|(ts, _)| *ts);
        points.dedup_by_key(|(ts, _)| *ts);
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[(NaiveDateTime, V)] {
        &self.points
    }

    pub fn into_points(self) -> Vec<(NaiveDateTime, V)> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.points.first().map(|(ts, _)| *ts)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.points.last().map(|(ts, _)| *ts)
    }

    pub fn get(&self, ts: NaiveDateTime) -> Option<&V> {
        self.points
            .binary_search_by_key(&ts, |(t, _)| *t)
            .ok()
            .map(|i| &self.points[i].1)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.points.iter().map(|(ts, _)| *ts)
    }
}

impl TimeSeries<Option<f64>> {
    /// Propagate the last known value forward in time.
    ///
    /// Points before the first observed value stay missing.
    pub fn forward_fill(mut self) -> Self {
        let mut last = None;
        for (_, value) in self.points.iter_mut() {
            match value {
                Some(v) => last = Some(*v),
                None => *value = last,
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_from_points_sorts_and_dedups() {
        let series = TimeSeries::from_points("x", vec![(day(3), 3.0), (day(1), 1.0), (day(3), 9.0)]);
        assert_eq!(series.points(), &[(day(1), 1.0), (day(3), 3.0)]);
        assert_eq!(series.get(day(3)), Some(&3.0));
        assert_eq!(series.get(day(2)), None);
    }

    #[test]
    fn test_wall_clock_keeps_duplicate_labels_in_order() {
        let series = WallClockSeries::new("p", vec![(day(2), 1.0), (day(1), 0.0), (day(2), 2.0)]);
        assert_eq!(series.readings(), &[(day(1), 0.0), (day(2), 1.0), (day(2), 2.0)]);
    }

    #[test]
    fn test_forward_fill() {
        let series = TimeSeries::from_points(
            "coal_price",
            vec![
                (day(1), Some(10.0)),
                (day(2), None),
                (day(3), None),
                (day(4), Some(13.0)),
            ],
        );
        let filled: Vec<_> = series.forward_fill().into_points().into_iter().map(|(_, v)| v).collect();
        assert_eq!(filled, vec![Some(10.0), Some(10.0), Some(10.0), Some(13.0)]);
    }

    #[test]
    fn test_forward_fill_leading_gap_stays_missing() {
        let series = TimeSeries::from_points("c", vec![(day(1), None), (day(2), Some(5.0)), (day(3), None)]);
        let filled: Vec<_> = series.forward_fill().into_points().into_iter().map(|(_, v)| v).collect();
        assert_eq!(filled, vec![None, Some(5.0), Some(5.0)]);
    }

    proptest! {
        #[test]
        fn prop_forward_fill_only_fills_after_first_value(
            values in proptest::collection::vec(proptest::option::of(-100.0f64..100.0), 1..28)
        ) {
            let points: Vec<_> = values.iter().enumerate().map(|(i, v)| (day(i as u32 + 1), *v)).collect();
            let filled = TimeSeries::from_points("c", points).forward_fill().into_points();
            let first = values.iter().position(|v| v.is_some());
            for (i, (_, v)) in filled.iter().enumerate() {
                match first {
                    Some(f) if i >= f => prop_assert!(v.is_some()),
                    _ => prop_assert!(v.is_none()),
                }
                if values[i].is_some() {
                    prop_assert_eq!(*v, values[i]);
                }
            }
        }
    }
}
