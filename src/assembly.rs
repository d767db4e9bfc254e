//! Hour-of-day alignment and outer join of all per-source frames

use chrono::NaiveDateTime;
use itertools::Itertools;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::domain::{Cadence, Frame};
use crate::error::{PipelineError, Result};

/// A stage output waiting to be joined
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub name: String,
    pub cadence: Cadence,
    pub frame: Frame,
}

impl SourceFrame {
    pub fn hourly(name: impl Into<String>, frame: Frame) -> Self {
        Self {
            name: name.into(),
            cadence: Cadence::Hourly,
            frame,
        }
    }

    pub fn daily(name: impl Into<String>, frame: Frame) -> Self {
        Self {
            name: name.into(),
            cadence: Cadence::Daily,
            frame,
        }
    }

    /// Put the frame on the `hour:00` daily clock
    fn align(self, hour: u32) -> Frame {
        match self.cadence {
            Cadence::Hourly => self.frame.at_hour(hour),
            Cadence::Daily => self.frame.rekey_to_hour(hour),
        }
    }
}

/// The joined table: one row per day at the target hour, one column per
/// feature, `None` where a source had nothing for that day.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    hour: u32,
    frame: Frame,
}

impl FeatureTable {
    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn columns(&self) -> &[String] {
        self.frame.columns()
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    pub fn value(&self, ts: NaiveDateTime, column: &str) -> Option<f64> {
        self.frame.value(ts, column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, &[Option<f64>])> + '_ {
        self.frame.iter()
    }
}

/// Align every source to `hour` and outer-join them on timestamp.
///
/// Columns appear in source order. The row set is the union of all aligned
/// sources; cells a source does not cover are `None`.
pub fn assemble(hour: u32, sources: Vec<SourceFrame>) -> Result<FeatureTable> {
    if hour > 23 {
        return Err(PipelineError::InvalidHour { hour });
    }

    if let Some(column) = sources
        .iter()
        .flat_map(|s| s.frame.columns())
        .duplicates()
        .next()
    {
        return Err(PipelineError::DuplicateColumn {
            column: column.clone(),
        });
    }

    let aligned: Vec<(String, Frame)> = sources
        .into_iter()
        .map(|source| {
            let name = source.name.clone();
            let frame = source.align(hour);
            debug!(source = %name, rows = frame.len(), "aligned source");
            (name, frame)
        })
        .collect();

    let columns: Vec<String> = aligned
        .iter()
        .flat_map(|(_, f)| f.columns().iter().cloned())
        .collect();
    let width = columns.len();

    let mut rows: BTreeMap<NaiveDateTime, Vec<Option<f64>>> = BTreeMap::new();
    let mut offset = 0;
    for (_, frame) in aligned {
        let (source_columns, source_rows) = frame.into_parts();
        for (ts, values) in source_rows {
            let row = rows.entry(ts).or_insert_with(|| vec![None; width]);
            row[offset..offset + values.len()].copy_from_slice(&values);
        }
        offset += source_columns.len();
    }

    let mut frame = Frame::new(columns);
    for (ts, row) in rows {
        frame.insert(ts, row);
    }

    info!(
        hour,
        rows = frame.len(),
        columns = frame.columns().len(),
        "assembled feature table"
    );
    Ok(FeatureTable { hour, frame })
}
