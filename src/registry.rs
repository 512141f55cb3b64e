//! Location registry and campaign date grids.
//!
//! Defines the canonical list of monitored industrial sites and the two
//! interleaved half-year grids. All other modules should reference sites
//! and dates from here rather than hardcoding them.

use crate::models::{CampaignError, Grid, MonthLabel, Period};

/// A monitored site.
#[derive(Debug)]
pub struct Location {
    /// Company or plant name, used as the row label in exported tables.
    pub name: &'static str,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
}

/// All sites checked by a campaign, in export row order.
pub static LOCATION_REGISTRY: &[Location] = &[
    Location {
        name: "BASF",
        latitude: 49.5142,
        longitude: 8.4250,
    },
    Location {
        name: "Thyssen",
        latitude: 51.4871,
        longitude: 6.7185,
    },
    Location {
        name: "MiRO",
        latitude: 49.0576,
        longitude: 8.3250,
    },
    Location {
        name: "Boxberg",
        latitude: 51.4213,
        longitude: 14.5802,
    },
    Location {
        name: "Belchatow",
        latitude: 51.2669,
        longitude: 19.3266,
    },
    Location {
        name: "Baymina",
        latitude: 39.7769,
        longitude: 32.4022,
    },
    Location {
        name: "Formosa",
        latitude: 23.7829,
        longitude: 120.1929,
    },
    Location {
        name: "NTPC",
        latitude: 24.0273,
        longitude: 82.7901,
    },
];

// ---------------------------------------------------------------------------
// Date grids
// ---------------------------------------------------------------------------

/// Boundaries of the January–June grid. Sentinel-5P NRTI coverage starts mid 2018.
pub const FIRST_GRID: [&str; 8] = [
    "2019-01", "2019-07", "2020-01", "2020-07", "2021-01", "2021-07", "2022-01", "2022-07",
];

/// Boundaries of the July–December grid.
pub const SECOND_GRID: [&str; 8] = [
    "2018-07", "2019-01", "2019-07", "2020-01", "2020-07", "2021-01", "2021-07", "2022-01",
];

/// Months between consecutive grid boundaries.
pub const GRID_STEP_MONTHS: u32 = 6;

/// Number of date pairs queried per grid.
pub const PAIRS_PER_GRID: usize = 4;

/// Period slot for each (date pair, grid) combination.
///
/// Row = pair index, column = grid (first, second).
static PERIOD_SLOTS: [[Period; 2]; PAIRS_PER_GRID] = [
    [Period::FirstHalf2019, Period::SecondHalf2018],
    [Period::FirstHalf2020, Period::SecondHalf2019],
    [Period::FirstHalf2021, Period::SecondHalf2020],
    [Period::FirstHalf2022, Period::SecondHalf2021],
];

/// Returns the boundaries of a grid.
pub fn date_grid(grid: Grid) -> Result<Vec<MonthLabel>, CampaignError> {
    let labels = match grid {
        Grid::First => &FIRST_GRID,
        Grid::Second => &SECOND_GRID,
    };
    parse_grid(labels)
}

/// Parses grid boundaries, which must be exactly `GRID_STEP_MONTHS` apart.
fn parse_grid(labels: &[&str]) -> Result<Vec<MonthLabel>, CampaignError> {
    let boundaries = labels
        .iter()
        .map(|l| l.parse())
        .collect::<Result<Vec<MonthLabel>, CampaignError>>()?;

    for pair in boundaries.windows(2) {
        if pair[0].add_months(GRID_STEP_MONTHS) != Some(pair[1]) {
            return Err(CampaignError::InvalidPeriod(format!(
                "{} is not {} months after {}",
                pair[1], GRID_STEP_MONTHS, pair[0]
            )));
        }
    }

    Ok(boundaries)
}

/// A query window taken from a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub pair_index: usize,
    pub grid: Grid,
    pub start: MonthLabel,
    pub end: MonthLabel,
}

/// Returns the windows of a grid: boundaries (0,1), (2,3), (4,5), (6,7).
pub fn date_windows(grid: Grid) -> Result<Vec<DateWindow>, CampaignError> {
    let labels = date_grid(grid)?;

    Ok(labels
        .chunks_exact(2)
        .enumerate()
        .map(|(pair_index, pair)| DateWindow {
            pair_index,
            grid,
            start: pair[0],
            end: pair[1],
        })
        .collect())
}

/// Looks up the period slot a (pair, grid) result is stored under.
pub fn period_slot(pair_index: usize, grid: Grid) -> Option<Period> {
    let column = match grid {
        Grid::First => 0,
        Grid::Second => 1,
    };
    PERIOD_SLOTS.get(pair_index).map(|row| row[column])
}
