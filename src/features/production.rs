//! Aggregate wind and total production features

use tracing::info;

use crate::domain::Frame;
use crate::error::{PipelineError, Result};
use crate::sources::{
    ProductionTable, NON_WIND_COLUMNS, PARTIALLY_NULL_COLUMNS, SELF_CONSUMPTION_COLUMN, WIND_COLUMNS,
};

pub const TOTAL_PROD_COLUMN: &str = "total_prod";
pub const WIND_PROD_COLUMN: &str = "wind_prod";
pub const WIND_SHARE_COLUMN: &str = "wind_share";

/// Production totals for one hour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductionFeatures {
    pub total_prod: f64,
    pub wind_prod: f64,
    /// NaN when `total_prod` is zero
    pub wind_share: f64,
}

impl ProductionFeatures {
    pub fn new(wind_prod: f64, non_wind_prod: f64, self_consumption: f64) -> Self {
        let total_prod = wind_prod + non_wind_prod - self_consumption;
        let wind_share = if total_prod == 0.0 {
            f64::NAN
        } else {
            wind_prod / total_prod
        };
        Self {
            total_prod,
            wind_prod,
            wind_share,
        }
    }
}

struct ColumnSet<'a> {
    table: &'a ProductionTable,
}

impl<'a> ColumnSet<'a> {
    fn get(&self, name: &str) -> Result<&'a [Option<f64>]> {
        self.table
            .column(name)
            .ok_or_else(|| PipelineError::missing_column(&self.table.origin, name))
    }

    /// Cell value; empty cells count as 0 only in the partially-null columns
    fn cell(&self, name: &str, row: usize) -> Result<f64> {
        match self.get(name)?.get(row).copied().flatten() {
            Some(value) => Ok(value),
            None if PARTIALLY_NULL_COLUMNS.contains(&name) => Ok(0.0),
            None => Err(PipelineError::MissingColumn {
                origin: self.table.origin.clone(),
                column: name.to_string(),
                at: self.table.timestamps.get(row).copied(),
            }),
        }
    }

    fn sum(&self, names: &[&str], row: usize) -> Result<f64> {
        names.iter().try_fold(0.0, |acc, name| Ok(acc + self.cell(name, row)?))
    }
}

/// `total_prod`, `wind_prod` and `wind_share` for every hour of the table
pub fn derive_production_features(table: &ProductionTable) -> Result<Frame> {
    let columns = ColumnSet { table };
    let mut frame = Frame::new([TOTAL_PROD_COLUMN, WIND_PROD_COLUMN, WIND_SHARE_COLUMN]);
    let mut undefined_shares = 0usize;

    for (row, ts) in table.timestamps.iter().enumerate() {
        let features = ProductionFeatures::new(
            columns.sum(&WIND_COLUMNS, row)?,
            columns.sum(&NON_WIND_COLUMNS, row)?,
            columns.cell(SELF_CONSUMPTION_COLUMN, row)?,
        );
        if features.wind_share.is_nan() {
            undefined_shares += 1;
        }
        frame.insert(
            *ts,
            vec![
                Some(features.total_prod),
                Some(features.wind_prod),
                Some(features.wind_share),
            ],
        );
    }

    info!(rows = frame.len(), undefined_shares, "derived production features");
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::required_columns;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::BTreeMap;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 6, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    /// Table with every required column set to `fill`, then `overrides` applied
    fn table(fill: Option<f64>, overrides: &[(&str, Option<f64>)]) -> ProductionTable {
        let mut columns: BTreeMap<String, Vec<Option<f64>>> = required_columns()
            .map(|name| (name.to_string(), vec![fill]))
            .collect();
        for (name, value) in overrides {
            columns.insert(name.to_string(), vec![*value]);
        }
        ProductionTable {
            origin: "prod.csv".into(),
            timestamps: vec![ts(11)],
            columns,
        }
    }

    #[test]
    fn test_wind_share() {
        let t = table(
            Some(0.0),
            &[
                ("OffshoreWindGe100MW_MWh", Some(30.0)),
                ("OnshoreWindGe50kW_MWh", Some(10.0)),
                ("CentralPowerMWh", Some(50.0)),
                ("LocalPowerMWh", Some(15.0)),
                (SELF_CONSUMPTION_COLUMN, Some(5.0)),
            ],
        );
        let frame = derive_production_features(&t).unwrap();
        assert_eq!(frame.value(ts(11), WIND_PROD_COLUMN), Some(40.0));
        assert_eq!(frame.value(ts(11), TOTAL_PROD_COLUMN), Some(100.0));
        assert_eq!(frame.value(ts(11), WIND_SHARE_COLUMN), Some(0.4));
    }

    #[test]
    fn test_zero_total_gives_nan() {
        let frame = derive_production_features(&table(Some(0.0), &[])).unwrap();
        assert_eq!(frame.value(ts(11), TOTAL_PROD_COLUMN), Some(0.0));
        assert!(frame.value(ts(11), WIND_SHARE_COLUMN).unwrap().is_nan());
    }

    #[test]
    fn test_partially_null_columns_count_as_zero() {
        let nulls: Vec<_> = PARTIALLY_NULL_COLUMNS.iter().map(|c| (*c, None)).collect();
        let frame = derive_production_features(&table(Some(1.0), &nulls)).unwrap();
        // 4 wind + 3 non-null non-wind
        assert_eq!(frame.value(ts(11), TOTAL_PROD_COLUMN), Some(7.0));
    }

    #[test]
    fn test_null_in_required_column_is_schema_error() {
        let err = derive_production_features(&table(Some(1.0), &[("CentralPowerMWh", None)])).unwrap_err();
        match err {
            PipelineError::MissingColumn { column, at, .. } => {
                assert_eq!(column, "CentralPowerMWh");
                assert_eq!(at, Some(ts(11)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_absent_column() {
        let mut t = table(Some(1.0), &[]);
        t.columns.remove("HydroPowerMWh");
        assert!(matches!(
            derive_production_features(&t),
            Err(PipelineError::MissingColumn { at: None, .. })
        ));
    }
}
