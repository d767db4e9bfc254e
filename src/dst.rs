//! Daylight-saving realignment of wall-clock market series.
//!
//! Market data is published on the local clock (CET in winter, CEST in
//! summer), which skips an hour in spring and repeats one in autumn. The
//! realignment moves every summer-time reading back one hour so the whole
//! series sits on a continuous standard-time clock.
//!
//! The clock-change instants come from a fixed table, not from time-zone
//! rules: extending the pipeline past the last tabulated year means appending
//! rows to [`DstBoundaryTable::denmark`].

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::collections::btree_map::{BTreeMap, Entry};
use tracing::{debug, info, warn};

use crate::domain::{TimeSeries, WallClockSeries};
use crate::error::{PipelineError, Result};

/// Offset from UTC of the standard-time clock every realigned series ends up on
pub const STANDARD_TIME_UTC_OFFSET_HOURS: i64 = 1;

/// Wall-clock labels of one year's clock changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DstTransition {
    spring_forward: NaiveDateTime,
    fall_back: NaiveDateTime,
}

impl DstTransition {
    /// Both labels must fall in the same year, spring before fall
    pub fn new(spring_forward: NaiveDateTime, fall_back: NaiveDateTime) -> Result<Self> {
        if spring_forward.year() != fall_back.year() || spring_forward >= fall_back {
            return Err(PipelineError::InvalidConfig(format!(
                "DST transition spring {spring_forward} / fall {fall_back} is not an ordered pair within one year"
            )));
        }
        Ok(Self {
            spring_forward,
            fall_back,
        })
    }

    /// First label that does not exist (clocks jump forward from here)
    pub fn spring_forward(&self) -> NaiveDateTime {
        self.spring_forward
    }

    /// Label that occurs twice (first in summer time, then in standard time)
    pub fn fall_back(&self) -> NaiveDateTime {
        self.fall_back
    }

    pub fn year(&self) -> i32 {
        self.spring_forward.year()
    }
}

/// One pair of clock changes per year, ordered by year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DstBoundaryTable {
    transitions: Vec<DstTransition>,
}

/// (year, spring month, spring day, fall month, fall day); changes happen at 02:00
const DENMARK_2015_2020: [(i32, u32, u32, u32, u32); 6] = [
    (2015, 3, 29, 10, 25),
    (2016, 3, 27, 10, 30),
    (2017, 3, 26, 10, 29),
    (2018, 3, 25, 10, 28),
    (2019, 3, 31, 10, 27),
    (2020, 3, 29, 10, 25),
];

impl DstBoundaryTable {
    /// At most one transition per year
    pub fn new(mut transitions: Vec<DstTransition>) -> Result<Self> {
        transitions.sort_by_key(|t| t.spring_forward);
        if let Some(pair) = transitions.windows(2).find(|w| w[0].year() == w[1].year()) {
            return Err(PipelineError::InvalidConfig(format!(
                "DST table lists year {} more than once",
                pair[0].year()
            )));
        }
        Ok(Self { transitions })
    }

    /// Danish clock changes 2015-2020
    pub fn denmark() -> Self {
        let at_two = |y: i32, m: u32, d: u32| {
            NaiveDate::from_ymd_opt(y, m, d)
                .and_then(|date| date.and_hms_opt(2, 0, 0))
                .unwrap_or_default()
        };
        // One row per year, already ordered
        Self {
            transitions: DENMARK_2015_2020
                .iter()
                .map(|&(y, sm, sd, fm, fd)| DstTransition {
                    spring_forward: at_two(y, sm, sd),
                    fall_back: at_two(y, fm, fd),
                })
                .collect(),
        }
    }

    pub fn transitions(&self) -> &[DstTransition] {
        &self.transitions
    }

    pub fn transition_for_year(&self, year: i32) -> Option<&DstTransition> {
        self.transitions
            .binary_search_by_key(&year, DstTransition::year)
            .ok()
            .map(|i| &self.transitions[i])
    }

    pub fn covers_year(&self, year: i32) -> bool {
        self.transition_for_year(year).is_some()
    }

    /// Split wall-clock readings into alternating unshifted/shifted runs.
    ///
    /// A reading is shifted when `spring_forward <= t < fall_back`, or when it
    /// is the first of the readings labeled `fall_back`.
    pub fn segments(&self, readings: &[(NaiveDateTime, f64)]) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::new();
        let mut last_fall_back_seen: Option<NaiveDateTime> = None;

        for &(ts, value) in readings {
            let shifted = match self.transition_for_year(ts.year()) {
                Some(tr) if ts >= tr.spring_forward && ts < tr.fall_back => true,
                Some(tr) if ts == tr.fall_back => {
                    let first = last_fall_back_seen != Some(ts);
                    last_fall_back_seen = Some(ts);
                    first
                }
                _ => false,
            };
            let kind = if shifted {
                SegmentKind::Shifted
            } else {
                SegmentKind::Unshifted
            };
            match segments.last_mut() {
                Some(seg) if seg.kind == kind => seg.readings.push((ts, value)),
                _ => segments.push(Segment {
                    kind,
                    readings: vec![(ts, value)],
                }),
            }
        }
        segments
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Summer time; moved back one hour
    Shifted,
    Unshifted,
}

/// Contiguous run of readings with the same DST classification
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub readings: Vec<(NaiveDateTime, f64)>,
}

/// Put a wall-clock series on a continuous standard-time clock.
///
/// Unshifted readings are placed first; a shifted reading whose new timestamp
/// is already taken has nothing left to pair with and is dropped. The same
/// routine serves every market series.
pub fn realign(series: WallClockSeries, table: &DstBoundaryTable) -> TimeSeries<f64> {
    let name = series.name().to_string();
    let readings = series.into_readings();

    let uncovered = readings
        .iter()
        .filter(|(ts, _)| !table.covers_year(ts.year()))
        .count();
    if uncovered > 0 {
        warn!(
            series = %name,
            rows = uncovered,
            "readings outside the DST boundary table are left unshifted"
        );
    }

    let segments = table.segments(&readings);
    let (shifted, unshifted): (Vec<_>, Vec<_>) = segments
        .into_iter()
        .partition(|seg| seg.kind == SegmentKind::Shifted);

    let mut clock: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
    let mut duplicates = 0usize;
    for (ts, value) in unshifted.into_iter().flat_map(|seg| seg.readings) {
        match clock.entry(ts) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(_) => duplicates += 1,
        }
    }

    let mut collisions = 0usize;
    for (ts, value) in shifted.into_iter().flat_map(|seg| seg.readings) {
        match clock.entry(ts - Duration::hours(1)) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(_) => collisions += 1,
        }
    }

    if duplicates > 0 || collisions > 0 {
        debug!(series = %name, duplicates, collisions, "dropped readings during DST realignment");
    }
    info!(series = %name, rows = clock.len(), "realigned to standard time");
    TimeSeries::from_points(name, clock.into_iter().collect())
}
