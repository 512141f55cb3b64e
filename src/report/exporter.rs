//! Table export.
//!
//! Writes the two anomaly tables (and optionally the raw sums) as CSV or
//! JSON files into the output directory.

use crate::cli::OutputFormat;
use crate::models::{AnomalyRatio, AnomalyTable, AnomalyTables, BoxSize, LocationRecord, Period};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// File stem of the January–June table.
pub const FIRST_HALF_STEM: &str = "first_half_data";

/// File stem of the July–December table.
pub const SECOND_HALF_STEM: &str = "second_half_data";

/// File name of the raw sums table.
pub const RAW_SUMS_FILE: &str = "raw_sums.csv";

/// Float cell, always with a fractional part (`3.0`, not `3`).
fn format_float(value: f64) -> String {
    format!("{:?}", value)
}

/// Empty cell for indeterminate ratios.
fn format_ratio(ratio: &AnomalyRatio) -> String {
    ratio.value().map(format_float).unwrap_or_default()
}

fn format_sum(sum: Option<f64>) -> String {
    sum.map(format_float).unwrap_or_default()
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Render a table as CSV: row index, then one column per year.
///
/// Rows follow the registry order; the JSON form carries the names.
pub fn generate_csv_table(table: &AnomalyTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![String::new()];
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header)?;

    for (index, row) in table.rows.iter().enumerate() {
        let mut record = vec![index.to_string()];
        record.extend(row.ratios.iter().map(format_ratio));
        writer.write_record(&record)?;
    }

    finish_csv(writer)
}

/// Render a table as JSON.
pub fn generate_json_table(table: &AnomalyTable) -> Result<String> {
    serde_json::to_string_pretty(table).map_err(Into::into)
}

/// Column name of a raw sum, e.g. `2019_inner_1`.
fn raw_sum_column(period: Period, size: BoxSize) -> String {
    format!("{}_{}_{}", period.year(), size, period.grid().id())
}

/// Render the 16 raw sums of every record as CSV.
pub fn generate_raw_sums_csv(records: &[LocationRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "name".to_string(),
        "lat".to_string(),
        "lng".to_string(),
    ];
    for period in Period::ALL {
        for size in BoxSize::CAMPAIGN_ORDER {
            header.push(raw_sum_column(period, size));
        }
    }
    writer.write_record(&header)?;

    for record in records {
        let mut row = vec![
            record.name.clone(),
            record.latitude.to_string(),
            record.longitude.to_string(),
        ];
        for period in Period::ALL {
            for size in BoxSize::CAMPAIGN_ORDER {
                row.push(format_sum(record.sums.slot(period).get(size)));
            }
        }
        writer.write_record(&row)?;
    }

    finish_csv(writer)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))
}

/// Write both tables into `dir`. Returns the written paths.
pub fn export_tables(
    tables: &AnomalyTables,
    dir: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;

    let mut written = Vec::new();
    for (table, stem) in [
        (&tables.first_half, FIRST_HALF_STEM),
        (&tables.second_half, SECOND_HALF_STEM),
    ] {
        let (content, extension) = match format {
            OutputFormat::Csv => (generate_csv_table(table)?, "csv"),
            OutputFormat::Json => (generate_json_table(table)?, "json"),
        };

        let path = dir.join(format!("{}.{}", stem, extension));
        write_file(&path, &content)?;
        written.push(path);
    }

    Ok(written)
}

/// Write the raw sums table into `dir`.
pub fn export_raw_sums(records: &[LocationRecord], dir: &Path) -> Result<PathBuf> {
    ensure_dir(dir)?;

    let path = dir.join(RAW_SUMS_FILE);
    write_file(&path, &generate_raw_sums_csv(records)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::compute_tables;
    use crate::campaign::CampaignRunner;
    use crate::imagery::stub::StubArchive;
    use crate::imagery::{RegionAggregator, DEFAULT_BAND, DEFAULT_COLLECTION};
    use crate::models::{AnomalyRow, Grid};
    use tempfile::TempDir;

    fn create_test_table() -> AnomalyTable {
        AnomalyTable {
            grid: Grid::First,
            columns: Period::for_grid(Grid::First)
                .iter()
                .map(Period::column_label)
                .collect(),
            rows: vec![
                AnomalyRow {
                    name: "BASF".to_string(),
                    ratios: vec![
                        AnomalyRatio::Value(-2.5),
                        AnomalyRatio::Value(1.0),
                        AnomalyRatio::Indeterminate,
                        AnomalyRatio::Value(0.25),
                    ],
                },
                AnomalyRow {
                    name: "Thyssen".to_string(),
                    ratios: vec![AnomalyRatio::Value(3.0); 4],
                },
            ],
        }
    }

    #[test]
    fn test_generate_csv_table() {
        let csv = generate_csv_table(&create_test_table()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], ",2019_1,2020_1,2021_1,2022_1");
        assert_eq!(lines[1], "0,-2.5,1.0,,0.25");
        assert_eq!(lines[2], "1,3.0,3.0,3.0,3.0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_generate_json_table() {
        let json = generate_json_table(&create_test_table()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["columns"][0], "2019_1");
        assert_eq!(value["rows"][0]["name"], "BASF");
        assert_eq!(value["rows"][0]["ratios"][0], -2.5);
        assert!(value["rows"][0]["ratios"][2].is_null());
    }

    #[test]
    fn test_generate_raw_sums_csv() {
        let mut record = LocationRecord::new("Baymina", 39.7769, 32.4022);
        record
            .sums
            .slot_mut(Period::FirstHalf2019)
            .set(BoxSize::Outer, 12.5);

        let csv = generate_raw_sums_csv(&[record]).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());

        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 3 + 16);
        assert_eq!(&headers[3], "2019_outer_1");
        assert_eq!(&headers[4], "2019_inner_1");

        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "Baymina");
        assert_eq!(&row[3], "12.5");
        assert_eq!(&row[4], "");
    }

    #[test]
    fn test_export_tables_writes_both_files() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table();
        let tables = AnomalyTables {
            first_half: table.clone(),
            second_half: AnomalyTable {
                grid: Grid::Second,
                ..table
            },
        };

        let paths = export_tables(&tables, dir.path(), OutputFormat::Json).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(dir.path().join("first_half_data.json").exists());
        assert!(dir.path().join("second_half_data.json").exists());
    }

    #[test]
    fn test_export_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out").join("no2");

        let path = export_raw_sums(&[], &nested).unwrap();
        assert!(path.exists());
    }

    /// Location whose inner and outer sums are made equal by the stub.
    const FLAT_LATITUDE: f64 = 24.0273;

    fn stub_archive() -> StubArchive {
        StubArchive::new(|q| {
            let (lat, _) = q.bbox.center();
            if (lat - FLAT_LATITUDE).abs() < 1e-6 {
                return vec![2.0];
            }
            match q.box_size {
                BoxSize::Inner => vec![(q.start.year() - 2015) as f64],
                BoxSize::Outer => vec![1.0, 1.0],
            }
        })
    }

    #[test]
    fn test_end_to_end_campaign_export() {
        let runner = CampaignRunner::new(
            RegionAggregator::new(stub_archive(), DEFAULT_COLLECTION, DEFAULT_BAND),
            false,
        );
        let records = tokio_test::block_on(runner.run()).unwrap();
        let tables = compute_tables(&records).unwrap();

        let dir = TempDir::new().unwrap();
        let paths = export_tables(&tables, dir.path(), OutputFormat::Csv).unwrap();
        assert_eq!(paths[0], dir.path().join("first_half_data.csv"));
        assert_eq!(paths[1], dir.path().join("second_half_data.csv"));

        let read = |path: &Path| -> Vec<csv::StringRecord> {
            let mut reader = csv::Reader::from_path(path).unwrap();
            reader.records().map(|r| r.unwrap()).collect()
        };
        let parse = |cell: &str| cell.parse::<f64>().unwrap();

        let first = read(&paths[0]);
        let second = read(&paths[1]);
        assert_eq!(first.len(), 8);
        assert_eq!(second.len(), 8);
        assert!(first.iter().chain(&second).all(|r| r.len() == 1 + 4));
        assert_eq!(&first[0][0], "0");
        assert_eq!(&first[7][0], "7");

        // Inner = year - 2015, outer = 2: ratio = (2I - 2) / (2 - I).
        assert_eq!(&first[0][1], "-3.0");
        assert_eq!(parse(&first[0][4]), -2.4);
        assert_eq!(parse(&second[0][1]), -4.0);
        assert_eq!(parse(&second[0][4]), -2.5);

        // The last row (NTPC) has equal sums everywhere.
        assert_eq!(tables.first_half.rows[7].name, "NTPC");
        assert!((1..5).all(|i| first[7][i].is_empty()));
        assert_eq!(tables.second_half.indeterminate_count(), 4);
    }
}
