//! Sequential campaign runner.

use crate::imagery::{ImageryArchive, RegionAggregator};
use crate::models::{BoxSize, CampaignError, Grid, LocationRecord, Period};
use crate::registry::{date_windows, period_slot, DateWindow, Location, LOCATION_REGISTRY};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

/// One aggregate call of a campaign.
#[derive(Debug, Clone)]
pub struct PlannedQuery {
    /// Index of the location in the registry (and in the record list).
    pub location_index: usize,
    pub location: &'static Location,
    pub box_size: BoxSize,
    pub window: DateWindow,
    /// Slot the result is stored under.
    pub period: Period,
}

/// Every query of a campaign, in execution order:
/// box size, then location, then date pair, then grid.
pub fn campaign_plan() -> Result<Vec<PlannedQuery>, CampaignError> {
    let first = date_windows(Grid::First)?;
    let second = date_windows(Grid::Second)?;

    let mut plan = Vec::new();
    for box_size in BoxSize::CAMPAIGN_ORDER {
        for (location_index, location) in LOCATION_REGISTRY.iter().enumerate() {
            for (first_window, second_window) in first.iter().zip(&second) {
                for window in [first_window, second_window] {
                    let period = period_slot(window.pair_index, window.grid).ok_or_else(|| {
                        CampaignError::InvalidArgument(format!(
                            "no period slot for pair {} of the {} grid",
                            window.pair_index, window.grid
                        ))
                    })?;
                    if period.year() != window.start.year() {
                        return Err(CampaignError::InvalidPeriod(format!(
                            "window {}..{} does not start in {}",
                            window.start, window.end, period
                        )));
                    }

                    plan.push(PlannedQuery {
                        location_index,
                        location,
                        box_size,
                        window: *window,
                        period,
                    });
                }
            }
        }
    }

    Ok(plan)
}

/// Runs a campaign against an imagery archive.
pub struct CampaignRunner<A> {
    aggregator: RegionAggregator<A>,
    show_progress: bool,
}

impl<A: ImageryArchive> CampaignRunner<A> {
    pub fn new(aggregator: RegionAggregator<A>, show_progress: bool) -> Self {
        Self {
            aggregator,
            show_progress,
        }
    }

    /// Execute every planned query, one after another.
    ///
    /// The first failing query aborts the campaign; no partial records
    /// are returned.
    pub async fn run(&self) -> Result<Vec<LocationRecord>> {
        let plan = campaign_plan()?;
        info!("Running campaign with {} queries", plan.len());

        let mut records: Vec<LocationRecord> = LOCATION_REGISTRY
            .iter()
            .map(|l| LocationRecord::new(l.name, l.latitude, l.longitude))
            .collect();

        let progress_bar = self.progress_bar(plan.len() as u64)?;

        for query in &plan {
            let location = query.location;
            progress_bar.set_message(format!(
                "{} {} {}",
                location.name, query.box_size, query.period
            ));

            let result = self
                .aggregator
                .aggregate(
                    location.latitude,
                    location.longitude,
                    query.window.start,
                    query.window.end,
                    query.box_size,
                )
                .await;

            let total = match result {
                Ok(total) => total,
                Err(e) => {
                    progress_bar.abandon_with_message("Campaign aborted");
                    return Err(e.context(format!(
                        "Query failed for {} ({} box, {}..{})",
                        location.name, query.box_size, query.window.start, query.window.end
                    )));
                }
            };

            debug!(
                "{} {} {} = {}",
                location.name, query.box_size, query.period, total
            );
            records[query.location_index]
                .sums
                .slot_mut(query.period)
                .set(query.box_size, total);
            progress_bar.inc(1);
        }

        if let Some(record) = records.iter().find(|r| !r.sums.is_complete()) {
            progress_bar.abandon_with_message("Campaign incomplete");
            anyhow::bail!("Campaign left sums missing for {}", record.name);
        }

        progress_bar.finish_with_message("Campaign complete");
        info!(
            "Campaign finished: {} locations, {} queries",
            records.len(),
            plan.len()
        );

        Ok(records)
    }

    fn progress_bar(&self, len: u64) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }

        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        Ok(pb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagery::stub::{FailingArchive, StubArchive};
    use crate::imagery::{DEFAULT_BAND, DEFAULT_COLLECTION};

    fn runner<A: ImageryArchive>(archive: A) -> CampaignRunner<A> {
        CampaignRunner::new(
            RegionAggregator::new(archive, DEFAULT_COLLECTION, DEFAULT_BAND),
            false,
        )
    }

    #[test]
    fn test_plan_has_128_queries() {
        let plan = campaign_plan().unwrap();
        assert_eq!(plan.len(), 128);
    }

    #[test]
    fn test_plan_order() {
        let plan = campaign_plan().unwrap();

        // Outer box first for all locations, then inner.
        assert!(plan[..64].iter().all(|q| q.box_size == BoxSize::Outer));
        assert!(plan[64..].iter().all(|q| q.box_size == BoxSize::Inner));

        // Within a box size, each location gets 8 consecutive queries.
        assert!(plan[..8].iter().all(|q| q.location.name == "BASF"));
        assert!(plan[8..16].iter().all(|q| q.location.name == "Thyssen"));

        // Grids alternate inside each date pair.
        assert_eq!(plan[0].period, Period::FirstHalf2019);
        assert_eq!(plan[1].period, Period::SecondHalf2018);
        assert_eq!(plan[2].period, Period::FirstHalf2020);
        assert_eq!(plan[7].period, Period::SecondHalf2021);
    }

    #[test]
    fn test_plan_covers_every_slot_once() {
        let plan = campaign_plan().unwrap();
        for location_index in 0..LOCATION_REGISTRY.len() {
            for box_size in BoxSize::CAMPAIGN_ORDER {
                for period in Period::ALL {
                    let count = plan
                        .iter()
                        .filter(|q| {
                            q.location_index == location_index
                                && q.box_size == box_size
                                && q.period == period
                        })
                        .count();
                    assert_eq!(count, 1);
                }
            }
        }
    }

    #[test]
    fn test_run_issues_128_calls_and_fills_records() {
        let campaign = runner(StubArchive::fixed(vec![1.0, 2.0]));
        let records = tokio_test::block_on(campaign.run()).unwrap();

        assert_eq!(campaign.aggregator.archive().call_count(), 128);
        assert_eq!(records.len(), 8);
        assert!(records.iter().all(|r| r.sums.is_complete()));
        assert_eq!(records[0].sums.first_half_2019.inner, Some(3.0));
    }

    /// Encodes box size and window start (`YYYY-MM`) into a single sum.
    fn encode(size: BoxSize, start: &str) -> f64 {
        let base = match size {
            BoxSize::Inner => 1_000_000.0,
            BoxSize::Outer => 2_000_000.0,
        };
        base + start.replace('-', "").parse::<f64>().unwrap()
    }

    #[test]
    fn test_run_stores_results_in_matching_slot() {
        let archive =
            StubArchive::new(|q| vec![encode(q.box_size, &q.start.to_string())]);
        let records = tokio_test::block_on(runner(archive).run()).unwrap();

        let sums = &records[3].sums;
        assert_eq!(sums.first_half_2019.inner, Some(encode(BoxSize::Inner, "2019-01")));
        assert_eq!(sums.second_half_2018.outer, Some(encode(BoxSize::Outer, "2018-07")));
        assert_eq!(sums.second_half_2021.inner, Some(encode(BoxSize::Inner, "2021-07")));
        assert_eq!(sums.first_half_2022.outer, Some(encode(BoxSize::Outer, "2022-01")));
    }

    #[test]
    fn test_run_aborts_on_remote_error() {
        let err = tokio_test::block_on(runner(FailingArchive).run()).unwrap_err();

        assert!(err.to_string().contains("BASF"));
        assert!(matches!(
            err.downcast_ref::<CampaignError>(),
            Some(CampaignError::Remote { status: 429, .. })
        ));
    }
}
