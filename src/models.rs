//! Data models for the NO2 campaign.
//!
//! This module contains the core data structures shared by the geometry,
//! imagery, campaign, analysis and report modules.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised by the campaign domain.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// A caller-supplied value is outside the accepted set.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A date label is not of the form `YYYY-MM`.
    #[error("Invalid period label '{0}', expected YYYY-MM")]
    InvalidPeriod(String),

    /// A location record is missing one of the sums needed for a ratio.
    #[error("Missing {square} sum for {location} in period {period}")]
    MissingSum {
        location: String,
        period: Period,
        square: BoxSize,
    },

    /// Non-2xx response from the imagery service.
    #[error("Earth Engine API error {status}: {body}")]
    Remote { status: u16, body: String },

    /// No access token was supplied.
    #[error("No Earth Engine access token (use --token or EARTHENGINE_TOKEN)")]
    MissingCredentials,
}

/// Size class of a bounding box around a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxSize {
    /// Box around the presumed pollution source.
    Inner,
    /// Reference box, twice the area of the inner one.
    Outer,
}

impl BoxSize {
    /// Order in which a campaign visits the box sizes.
    pub const CAMPAIGN_ORDER: [BoxSize; 2] = [BoxSize::Outer, BoxSize::Inner];

    pub fn as_str(&self) -> &'static str {
        match self {
            BoxSize::Inner => "inner",
            BoxSize::Outer => "outer",
        }
    }
}

impl fmt::Display for BoxSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BoxSize {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inner" => Ok(BoxSize::Inner),
            "outer" => Ok(BoxSize::Outer),
            other => Err(CampaignError::InvalidArgument(format!(
                "box size must be 'inner' or 'outer', got '{}'",
                other
            ))),
        }
    }
}

/// Axis-aligned rectangle in longitude/latitude degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

#[cfg(test)]
impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Area in square degrees.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Center as `(lat, lon)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

/// A month boundary label such as `2019-07`.
///
/// Windows are built from two labels and cover `[start-01, end-01)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthLabel(NaiveDate);

impl MonthLabel {
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// First day of the month, as sent to the imagery service.
    pub fn first_day(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    pub fn add_months(&self, months: u32) -> Option<Self> {
        self.0.checked_add_months(Months::new(months)).map(MonthLabel)
    }
}

impl FromStr for MonthLabel {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CampaignError::InvalidPeriod(s.to_string());

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(MonthLabel)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for MonthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

/// One of the two interleaved half-year date grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grid {
    /// January–June windows.
    First,
    /// July–December windows.
    Second,
}

impl Grid {
    /// Numeric id used in column labels (`2019_1`, `2018_2`).
    pub fn id(&self) -> u8 {
        match self {
            Grid::First => 1,
            Grid::Second => 2,
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grid::First => write!(f, "first half"),
            Grid::Second => write!(f, "second half"),
        }
    }
}

/// A named half-year period for which sums are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    FirstHalf2019,
    FirstHalf2020,
    FirstHalf2021,
    FirstHalf2022,
    SecondHalf2018,
    SecondHalf2019,
    SecondHalf2020,
    SecondHalf2021,
}

impl Period {
    pub const ALL: [Period; 8] = [
        Period::FirstHalf2019,
        Period::FirstHalf2020,
        Period::FirstHalf2021,
        Period::FirstHalf2022,
        Period::SecondHalf2018,
        Period::SecondHalf2019,
        Period::SecondHalf2020,
        Period::SecondHalf2021,
    ];

    /// Periods of one grid, in column order.
    pub fn for_grid(grid: Grid) -> [Period; 4] {
        match grid {
            Grid::First => [
                Period::FirstHalf2019,
                Period::FirstHalf2020,
                Period::FirstHalf2021,
                Period::FirstHalf2022,
            ],
            Grid::Second => [
                Period::SecondHalf2018,
                Period::SecondHalf2019,
                Period::SecondHalf2020,
                Period::SecondHalf2021,
            ],
        }
    }

    pub fn grid(&self) -> Grid {
        match self {
            Period::FirstHalf2019
            | Period::FirstHalf2020
            | Period::FirstHalf2021
            | Period::FirstHalf2022 => Grid::First,
            Period::SecondHalf2018
            | Period::SecondHalf2019
            | Period::SecondHalf2020
            | Period::SecondHalf2021 => Grid::Second,
        }
    }

    /// Year in which the window starts.
    pub fn year(&self) -> i32 {
        match self {
            Period::SecondHalf2018 => 2018,
            Period::FirstHalf2019 | Period::SecondHalf2019 => 2019,
            Period::FirstHalf2020 | Period::SecondHalf2020 => 2020,
            Period::FirstHalf2021 | Period::SecondHalf2021 => 2021,
            Period::FirstHalf2022 => 2022,
        }
    }

    /// Column label in the exported table, e.g. `2019_1`.
    pub fn column_label(&self) -> String {
        format!("{}_{}", self.year(), self.grid().id())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_label())
    }
}

/// Inner and outer sums for one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SquareSums {
    pub inner: Option<f64>,
    pub outer: Option<f64>,
}

impl SquareSums {
    pub fn get(&self, size: BoxSize) -> Option<f64> {
        match size {
            BoxSize::Inner => self.inner,
            BoxSize::Outer => self.outer,
        }
    }

    pub fn set(&mut self, size: BoxSize, value: f64) {
        match size {
            BoxSize::Inner => self.inner = Some(value),
            BoxSize::Outer => self.outer = Some(value),
        }
    }
}

/// All recorded sums of a location, one named slot per period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSums {
    pub first_half_2019: SquareSums,
    pub first_half_2020: SquareSums,
    pub first_half_2021: SquareSums,
    pub first_half_2022: SquareSums,
    pub second_half_2018: SquareSums,
    pub second_half_2019: SquareSums,
    pub second_half_2020: SquareSums,
    pub second_half_2021: SquareSums,
}

impl PeriodSums {
    pub fn slot(&self, period: Period) -> &SquareSums {
        match period {
            Period::FirstHalf2019 => &self.first_half_2019,
            Period::FirstHalf2020 => &self.first_half_2020,
            Period::FirstHalf2021 => &self.first_half_2021,
            Period::FirstHalf2022 => &self.first_half_2022,
            Period::SecondHalf2018 => &self.second_half_2018,
            Period::SecondHalf2019 => &self.second_half_2019,
            Period::SecondHalf2020 => &self.second_half_2020,
            Period::SecondHalf2021 => &self.second_half_2021,
        }
    }

    pub fn slot_mut(&mut self, period: Period) -> &mut SquareSums {
        match period {
            Period::FirstHalf2019 => &mut self.first_half_2019,
            Period::FirstHalf2020 => &mut self.first_half_2020,
            Period::FirstHalf2021 => &mut self.first_half_2021,
            Period::FirstHalf2022 => &mut self.first_half_2022,
            Period::SecondHalf2018 => &mut self.second_half_2018,
            Period::SecondHalf2019 => &mut self.second_half_2019,
            Period::SecondHalf2020 => &mut self.second_half_2020,
            Period::SecondHalf2021 => &mut self.second_half_2021,
        }
    }

    /// Returns true once every slot holds both sums.
    pub fn is_complete(&self) -> bool {
        Period::ALL
            .iter()
            .all(|p| self.slot(*p).inner.is_some() && self.slot(*p).outer.is_some())
    }
}

/// A monitored location together with the sums recorded for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub sums: PeriodSums,
}

impl LocationRecord {
    /// Creates a record with no sums recorded yet.
    pub fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_string(),
            latitude,
            longitude,
            sums: PeriodSums::default(),
        }
    }

    /// Returns `(inner, outer)` for a period, or the first missing side.
    pub fn pair(&self, period: Period) -> Result<(f64, f64), CampaignError> {
        let slot = self.sums.slot(period);
        let missing = |square| CampaignError::MissingSum {
            location: self.name.clone(),
            period,
            square,
        };

        let inner = slot.inner.ok_or_else(|| missing(BoxSize::Inner))?;
        let outer = slot.outer.ok_or_else(|| missing(BoxSize::Outer))?;
        Ok((inner, outer))
    }
}

/// Result of the anomaly ratio for one location and period.
///
/// Serializes as a number, or `null` when indeterminate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "Option<f64>")]
pub enum AnomalyRatio {
    Value(f64),
    /// Inner and outer sums were equal, so the ratio has no value.
    Indeterminate,
}

impl AnomalyRatio {
    pub fn value(&self) -> Option<f64> {
        match self {
            AnomalyRatio::Value(v) => Some(*v),
            AnomalyRatio::Indeterminate => None,
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, AnomalyRatio::Indeterminate)
    }
}

impl From<AnomalyRatio> for Option<f64> {
    fn from(ratio: AnomalyRatio) -> Self {
        ratio.value()
    }
}

/// One row of an anomaly table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRow {
    pub name: String,
    pub ratios: Vec<AnomalyRatio>,
}

/// Anomaly ratios of every location for the periods of one grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyTable {
    pub grid: Grid,
    pub columns: Vec<String>,
    pub rows: Vec<AnomalyRow>,
}

impl AnomalyTable {
    /// Number of cells without a value.
    pub fn indeterminate_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| &r.ratios)
            .filter(|r| r.is_indeterminate())
            .count()
    }
}

/// Both output tables of a campaign.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyTables {
    pub first_half: AnomalyTable,
    pub second_half: AnomalyTable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_size_parsing() {
        assert_eq!("inner".parse::<BoxSize>().unwrap(), BoxSize::Inner);
        assert_eq!(" Outer ".parse::<BoxSize>().unwrap(), BoxSize::Outer);

        let err = "middle".parse::<BoxSize>().unwrap_err();
        assert!(matches!(err, CampaignError::InvalidArgument(_)));
    }

    #[test]
    fn test_campaign_order_is_outer_first() {
        assert_eq!(BoxSize::CAMPAIGN_ORDER, [BoxSize::Outer, BoxSize::Inner]);
    }

    #[test]
    fn test_month_label_parsing() {
        let label: MonthLabel = "2019-07".parse().unwrap();
        assert_eq!(label.year(), 2019);
        assert_eq!(label.first_day(), "2019-07-01");
        assert_eq!(label.to_string(), "2019-07");

        assert!("2019-13".parse::<MonthLabel>().is_err());
        assert!("2019-7".parse::<MonthLabel>().is_err());
        assert!("201907".parse::<MonthLabel>().is_err());
    }

    #[test]
    fn test_month_label_add_months_crosses_year() {
        let label: MonthLabel = "2018-07".parse().unwrap();
        assert_eq!(label.add_months(6).unwrap().to_string(), "2019-01");
    }

    #[test]
    fn test_period_labels() {
        assert_eq!(Period::FirstHalf2019.column_label(), "2019_1");
        assert_eq!(Period::SecondHalf2018.column_label(), "2018_2");
        assert_eq!(Period::SecondHalf2021.grid(), Grid::Second);

        for grid in [Grid::First, Grid::Second] {
            assert!(Period::for_grid(grid).iter().all(|p| p.grid() == grid));
        }
    }

    #[test]
    fn test_period_sums_slots_are_distinct() {
        let mut sums = PeriodSums::default();
        for (i, period) in Period::ALL.iter().enumerate() {
            sums.slot_mut(*period).set(BoxSize::Inner, i as f64);
        }
        for (i, period) in Period::ALL.iter().enumerate() {
            assert_eq!(sums.slot(*period).inner, Some(i as f64));
        }
        assert!(!sums.is_complete());
    }

    #[test]
    fn test_record_pair_reports_missing_side() {
        let mut record = LocationRecord::new("BASF", 49.5142, 8.4250);
        record
            .sums
            .slot_mut(Period::FirstHalf2020)
            .set(BoxSize::Inner, 3.0);

        let err = record.pair(Period::FirstHalf2020).unwrap_err();
        assert!(matches!(
            err,
            CampaignError::MissingSum {
                square: BoxSize::Outer,
                ..
            }
        ));

        record
            .sums
            .slot_mut(Period::FirstHalf2020)
            .set(BoxSize::Outer, 1.0);
        assert_eq!(record.pair(Period::FirstHalf2020).unwrap(), (3.0, 1.0));
    }

    #[test]
    fn test_anomaly_ratio_serializes_as_number_or_null() {
        let json = serde_json::to_string(&vec![
            AnomalyRatio::Value(-2.5),
            AnomalyRatio::Indeterminate,
        ])
        .unwrap();
        assert_eq!(json, "[-2.5,null]");
    }
}
