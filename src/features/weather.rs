//! Population-weighted national weather series

use chrono::{Duration, NaiveDateTime};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::domain::{Frame, GapFill, WeatherMetric};
use crate::sources::WeightedObservation;

type MetricRow = [Option<f64>; WeatherMetric::COUNT];

#[derive(Debug, Clone, Copy, Default)]
struct WeightedSum {
    weighted: f64,
    weight: f64,
}

impl WeightedSum {
    fn add(&mut self, value: f64, weight: f64) {
        self.weighted += value * weight;
        self.weight += weight;
    }

    /// Divides by the weight actually present, not by the total population
    fn mean(&self) -> Option<f64> {
        (self.weight > 0.0).then(|| self.weighted / self.weight)
    }
}

/// Collapses per-city observations into one hourly frame with a column per
/// [`WeatherMetric`], then fills missing hours inside the expected span.
#[derive(Debug, Clone)]
pub struct WeatherAggregator {
    span_start: NaiveDateTime,
    span_end: NaiveDateTime,
    gap_fill: GapFill,
}

impl WeatherAggregator {
    /// `span_start..=span_end` is the hourly range every output row should cover
    pub fn new(span_start: NaiveDateTime, span_end: NaiveDateTime) -> Self {
        Self {
            span_start,
            span_end,
            gap_fill: GapFill::default(),
        }
    }

    pub fn with_gap_fill(mut self, gap_fill: GapFill) -> Self {
        self.gap_fill = gap_fill;
        self
    }

    pub fn aggregate(&self, observations: &[WeightedObservation]) -> Frame {
        let mut rows = weighted_means(observations);
        let observed = rows.len();
        let (filled, unfilled) = self.fill_gaps(&mut rows);

        if unfilled > 0 {
            warn!(hours = unfilled, "weather hours left missing (no neighbour on one side)");
        }
        info!(observed, filled, gap_fill = %self.gap_fill, "aggregated weather");

        let mut frame = Frame::new(WeatherMetric::iter().map(|m| m.column()));
        for (ts, row) in rows {
            frame.insert(ts, row.to_vec());
        }
        frame
    }

    /// Fill a missing hour only when both neighbouring hours are observed;
    /// longer gaps stay missing.
    fn fill_gaps(&self, rows: &mut BTreeMap<NaiveDateTime, MetricRow>) -> (usize, usize) {
        let step = Duration::hours(1);
        let mut filled = 0usize;
        let mut unfilled = 0usize;

        let mut ts = self.span_start;
        while ts <= self.span_end {
            if !rows.contains_key(&ts) {
                let prev = rows.get(&(ts - step)).copied();
                let next = rows.get(&(ts + step)).copied();
                match (prev, next) {
                    (Some(prev), Some(next)) => {
                        let mut row: MetricRow = [None; WeatherMetric::COUNT];
                        for i in 0..WeatherMetric::COUNT {
                            row[i] = prev[i].zip(next[i]).map(|(p, n)| self.gap_fill.apply(p, n));
                        }
                        rows.insert(ts, row);
                        filled += 1;
                    }
                    _ => unfilled += 1,
                }
            }
            ts += step;
        }
        (filled, unfilled)
    }
}

/// Per-timestamp weighted mean of every metric over the cities reporting it
pub fn weighted_means(observations: &[WeightedObservation]) -> BTreeMap<NaiveDateTime, MetricRow> {
    let mut sums: BTreeMap<NaiveDateTime, [WeightedSum; WeatherMetric::COUNT]> = BTreeMap::new();
    for obs in observations {
        let entry = sums.entry(obs.timestamp).or_default();
        for metric in WeatherMetric::iter() {
            if let Some(value) = obs.value(metric) {
                entry[metric.index()].add(value, obs.weight);
            }
        }
    }
    sums.into_iter()
        .map(|(ts, acc)| (ts, acc.map(|s| s.mean())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2015, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn obs(city: &str, h: u32, weight: f64, temp: Option<f64>) -> WeightedObservation {
        WeightedObservation {
            city: city.to_string(),
            timestamp: ts(h),
            values: [temp, temp, Some(80.0), Some(50.0), Some(4.0)],
            weight,
        }
    }

    #[test]
    fn test_weighted_mean_two_cities() {
        let means = weighted_means(&[obs("A", 0, 100.0, Some(10.0)), obs("B", 0, 300.0, Some(20.0))]);
        assert_eq!(means[&ts(0)][WeatherMetric::Temp.index()], Some(17.5));
        assert_eq!(means[&ts(0)][WeatherMetric::Humidity.index()], Some(80.0));
    }

    #[test]
    fn test_weighted_mean_uses_present_weight_only() {
        let means = weighted_means(&[obs("A", 0, 100.0, Some(10.0)), obs("B", 0, 300.0, None)]);
        assert_eq!(means[&ts(0)][WeatherMetric::Temp.index()], Some(10.0));
    }

    #[test]
    fn test_aggregate_fills_single_gap_with_observed_formula() {
        let observations = [obs("A", 0, 1.0, Some(10.0)), obs("A", 2, 1.0, Some(20.0))];
        let frame = WeatherAggregator::new(ts(0), ts(2)).aggregate(&observations);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.value(ts(1), "temp"), Some(20.0));
        assert_eq!(frame.value(ts(1), "wind_speed"), Some(6.0));
    }

    #[test]
    fn test_aggregate_midpoint_fill() {
        let observations = [obs("A", 0, 1.0, Some(10.0)), obs("A", 2, 1.0, Some(20.0))];
        let frame = WeatherAggregator::new(ts(0), ts(2))
            .with_gap_fill(GapFill::Midpoint)
            .aggregate(&observations);
        assert_eq!(frame.value(ts(1), "temp"), Some(15.0));
    }

    #[test]
    fn test_aggregate_leaves_unbounded_gaps() {
        let observations = [obs("A", 0, 1.0, Some(10.0)), obs("A", 3, 1.0, Some(20.0))];
        let frame = WeatherAggregator::new(ts(0), ts(4)).aggregate(&observations);
        // 01:00 has no observed successor, 02:00 has no predecessor, 04:00 has no successor
        assert!(!frame.contains(ts(1)));
        assert!(!frame.contains(ts(2)));
        assert!(!frame.contains(ts(4)));
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_aggregate_fills_each_isolated_gap() {
        let observations = [
            obs("A", 0, 1.0, Some(10.0)),
            obs("A", 2, 1.0, Some(20.0)),
            obs("A", 4, 1.0, Some(40.0)),
        ];
        let frame = WeatherAggregator::new(ts(0), ts(4))
            .with_gap_fill(GapFill::Midpoint)
            .aggregate(&observations);
        assert_eq!(frame.len(), 5);
        assert_eq!(frame.value(ts(1), "temp"), Some(15.0));
        assert_eq!(frame.value(ts(3), "temp"), Some(30.0));
    }

    #[test]
    fn test_aggregate_output_sorted() {
        let observations = [obs("A", 2, 1.0, Some(1.0)), obs("A", 0, 1.0, Some(0.0)), obs("A", 1, 1.0, Some(0.5))];
        let frame = WeatherAggregator::new(ts(0), ts(2)).aggregate(&observations);
        let keys: Vec<_> = frame.timestamps().collect();
        assert_eq!(keys, vec![ts(0), ts(1), ts(2)]);
    }

    proptest! {
        #[test]
        fn prop_weighted_mean_within_bounds(
            readings in proptest::collection::vec((1.0f64..1e6, -30.0f64..40.0), 1..11)
        ) {
            let observations: Vec<_> = readings
                .iter()
                .enumerate()
                .map(|(i, (w, t))| obs(&format!("c{i}"), 0, *w, Some(*t)))
                .collect();
            let mean = weighted_means(&observations)[&ts(0)][WeatherMetric::Temp.index()].unwrap();
            let lo = readings.iter().map(|(_, t)| *t).fold(f64::INFINITY, f64::min);
            let hi = readings.iter().map(|(_, t)| *t).fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(mean >= lo - 1e-9 && mean <= hi + 1e-9);
        }
    }
}
