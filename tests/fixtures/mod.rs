//! On-disk raw exports for end-to-end runs.
//!
//! Covers Fri 2019-03-29 to Sun 2019-03-31; the Sunday is the spring-forward
//! day, so its market files skip the 02:00 wall-clock label. Weather `dt`
//! is written in real UTC, one hour behind the CET market labels.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use elprice_features::config::Config;
use elprice_features::sources::required_columns;
use itertools::Itertools;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub fn ts(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2019, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// Unix seconds of a CET wall-clock hour
pub fn utc_epoch(cet: NaiveDateTime) -> i64 {
    (cet - Duration::hours(1)).and_utc().timestamp()
}

fn market_label(day: u32, hour: u32) -> String {
    format!("{:02}.03.2019 {:02}:00 - {:02}.03.2019 {:02}:00", day, hour, day, hour + 1)
}

pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_price(root);
        write_load(root);
        write_weather(root);
        write_production(root);
        write_coal(root);

        let mut config = Config::default();
        config.pipeline.start = NaiveDate::from_ymd_opt(2019, 3, 29).unwrap();
        config.pipeline.end = NaiveDate::from_ymd_opt(2019, 3, 31).unwrap();
        config.price.dir = root.join("price");
        config.load.dir = root.join("load");
        config.weather.file = root.join("weather.csv");
        config.production.file = root.join("production.csv");
        config.coal.file = root.join("coal.csv");
        config.output.path = root.join("out").join("features.csv");

        Self { dir, config }
    }

    /// Swap the CSV coal export for the equivalent `.xlsx` workbook
    pub fn with_coal_workbook(mut self) -> Self {
        let path = self.path().join("coal_price.xlsx");
        write_coal_workbook(&path);
        self.config.coal.file = path;
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn write_price(root: &Path) {
    let dir = root.join("price");
    fs::create_dir_all(&dir).unwrap();
    let mut lines = vec!["MTU (CET),Day-ahead Price [EUR/MWh]".to_string()];
    for hour in [10, 11, 12] {
        lines.push(format!("{},{}", market_label(29, hour), 30 + hour));
    }
    lines.push(format!("{},-", market_label(30, 11)));
    lines.push(format!("{},41", market_label(30, 12)));
    // Wall clock jumps from 02:00 to 03:00
    for hour in (0..24).filter(|h| *h != 2) {
        lines.push(format!("{},{}", market_label(31, hour), 100 + hour));
    }
    // Split over two files to exercise concatenation order
    let (first, second) = lines.split_at(5);
    fs::write(dir.join("2019a.csv"), first.join("\n")).unwrap();
    let second = std::iter::once(lines[0].clone())
        .chain(second.iter().cloned())
        .join("\n");
    fs::write(dir.join("2019b.csv"), second).unwrap();
}

fn write_load(root: &Path) {
    let dir = root.join("load");
    fs::create_dir_all(&dir).unwrap();
    let rows = [
        (29, 11, "4011"),
        (30, 11, "4111"),
        (31, 11, "5011"),
        (31, 12, "5012"),
    ];
    let body = std::iter::once(
        "Time (CET),Day-ahead Total Load Forecast [MW],Actual Total Load [MW]".to_string(),
    )
    .chain(
        rows.iter()
            .map(|(d, h, v)| format!("{},1,{}", market_label(*d, *h), v)),
    )
    .join("\n");
    fs::write(dir.join("load_2019.csv"), body).unwrap();
}

fn weather_temp(day: u32, hour: u32) -> f64 {
    match day {
        29 => 5.0,
        30 => hour as f64 - 6.0,
        _ => 8.0,
    }
}

fn write_weather(root: &Path) {
    let hours = [(29, 10), (29, 11), (29, 12), (30, 10), (30, 12), (31, 10), (31, 11), (31, 12)];
    let mut lines = vec![
        "dt,dt_iso,timezone,city_name,lat,lon,temp,feels_like,humidity,clouds_all,wind_speed,weather_main"
            .to_string(),
    ];
    for (day, hour) in hours {
        let at = ts(day, hour);
        let utc = at - Duration::hours(1);
        let temp = weather_temp(day, hour);
        for city in ["Aarhus", "Odense"] {
            lines.push(format!(
                "{},{} +0000 UTC,3600,{},56.1,10.2,{},{},80,40,6,Clouds",
                utc_epoch(at),
                utc.format("%Y-%m-%d %H:%M:%S"),
                city,
                temp,
                temp - 2.0,
            ));
        }
    }
    fs::write(root.join("weather.csv"), lines.join("\n")).unwrap();
}

fn write_production(root: &Path) {
    let header = ["HourUTC", "HourDK", "PriceArea"]
        .into_iter()
        .chain(required_columns())
        .join(",");
    // wind 40, non-wind 60, no self-consumption
    let values = "10,20,5,5,50,10,0,,,,0,";
    let lines = [
        header,
        format!("2019-03-29T10:00:00,2019-03-29T11:00:00,DK1,{values}"),
        format!("2019-03-29T10:00:00,2019-03-29T11:00:00,DK2,99,99,99,99,99,99,99,,,,99,"),
        format!("2019-03-30T10:00:00,2019-03-30T11:00:00,DK1,{values}"),
    ];
    fs::write(root.join("production.csv"), lines.join("\n")).unwrap();
}

fn write_coal(root: &Path) {
    let body = "Coal price history\n\
                USD per tonne\n\
                ,ROTTERDAM COAL,NEWCASTLE COAL\n\
                2019-03-31,70,90\n\
                2019-03-29,60,80\n\
                2019-03-30,,81\n\
                ,,\n";
    fs::write(root.join("coal.csv"), body).unwrap();
}

fn write_coal_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("dd-mmm-yy");
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Coal price history").unwrap();
    sheet.write_string(1, 0, "USD per tonne").unwrap();
    sheet.write_string(2, 1, "ROTTERDAM COAL").unwrap();
    sheet.write_string(2, 2, "NEWCASTLE COAL").unwrap();
    let rows = [(31, Some(70.0), 90.0), (29, Some(60.0), 80.0), (30, None, 81.0)];
    for (i, (day, rotterdam, newcastle)) in rows.into_iter().enumerate() {
        let row = 3 + i as u32;
        let date = ExcelDateTime::from_ymd(2019, 3, day).unwrap();
        sheet.write_datetime_with_format(row, 0, &date, &date_format).unwrap();
        if let Some(value) = rotterdam {
            sheet.write_number(row, 1, value).unwrap();
        }
        sheet.write_number(row, 2, newcastle).unwrap();
    }
    workbook.save(path).unwrap();
}
