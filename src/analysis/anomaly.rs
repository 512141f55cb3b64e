//! Pollution anomaly ratios.
//!
//! Compares the NO2 sum over the inner box `I` with the sum over the
//! outer box `O`. The outer ring (`O - I`) has the same area as the inner
//! box, so `(2I - O) / (O - I)` is the relative excess of the source area
//! over its surroundings.

use crate::models::{
    AnomalyRatio, AnomalyRow, AnomalyTable, AnomalyTables, CampaignError, Grid, LocationRecord,
    Period,
};
use tracing::warn;

/// `(2I - O) / (O - I)`, or `Indeterminate` when `O == I`.
pub fn anomaly_ratio(inner: f64, outer: f64) -> AnomalyRatio {
    let denominator = outer - inner;
    if denominator == 0.0 {
        return AnomalyRatio::Indeterminate;
    }
    AnomalyRatio::Value((2.0 * inner - outer) / denominator)
}

/// Build the table of one grid, one row per record.
pub fn compute_table(
    records: &[LocationRecord],
    grid: Grid,
) -> Result<AnomalyTable, CampaignError> {
    let periods = Period::for_grid(grid);

    let rows = records
        .iter()
        .map(|record| -> Result<AnomalyRow, CampaignError> {
            let ratios = periods
                .iter()
                .map(|period| -> Result<AnomalyRatio, CampaignError> {
                    let (inner, outer) = record.pair(*period)?;
                    let ratio = anomaly_ratio(inner, outer);
                    if ratio.is_indeterminate() {
                        warn!(
                            "{} {}: inner and outer sums are equal ({}), ratio is indeterminate",
                            record.name, period, inner
                        );
                    }
                    Ok(ratio)
                })
                .collect::<Result<Vec<_>, CampaignError>>()?;

            Ok(AnomalyRow {
                name: record.name.clone(),
                ratios,
            })
        })
        .collect::<Result<Vec<_>, CampaignError>>()?;

    Ok(AnomalyTable {
        grid,
        columns: periods.iter().map(Period::column_label).collect(),
        rows,
    })
}

/// Build both output tables.
pub fn compute_tables(records: &[LocationRecord]) -> Result<AnomalyTables, CampaignError> {
    Ok(AnomalyTables {
        first_half: compute_table(records, Grid::First)?,
        second_half: compute_table(records, Grid::Second)?,
    })
}

/// Mean of the determinate ratios in each column.
pub fn column_means(table: &AnomalyTable) -> Vec<Option<f64>> {
    (0..table.columns.len())
        .map(|col| {
            let values: Vec<f64> = table
                .rows
                .iter()
                .filter_map(|row| row.ratios.get(col).and_then(|r| r.value()))
                .collect();
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        })
        .collect()
}

/// Locations ordered by their mean ratio across the table, highest first.
pub fn rank_locations(table: &AnomalyTable) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = table
        .rows
        .iter()
        .filter_map(|row| {
            let values: Vec<f64> = row.ratios.iter().filter_map(|r| r.value()).collect();
            if values.is_empty() {
                None
            } else {
                Some((
                    row.name.clone(),
                    values.iter().sum::<f64>() / values.len() as f64,
                ))
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}
