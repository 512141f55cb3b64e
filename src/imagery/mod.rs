//! Access to the remote imagery archive.
//!
//! The archive is reached through the [`ImageryArchive`] trait so the
//! campaign can run against Earth Engine or against a stub in tests.

pub mod aggregator;
pub mod earth_engine;
pub mod expression;

#[cfg(test)]
pub mod stub;

pub use aggregator::RegionAggregator;
pub use earth_engine::{EarthEngineClient, EarthEngineConfig};

use crate::models::{BoundingBox, BoxSize, MonthLabel};
use anyhow::Result;
use futures::future::BoxFuture;

/// Sentinel-5P near-real-time level-3 NO2 product.
pub const DEFAULT_COLLECTION: &str = "COPERNICUS/S5P/NRTI/L3_NO2";

/// Tropospheric NO2 column band of [`DEFAULT_COLLECTION`].
pub const DEFAULT_BAND: &str = "tropospheric_NO2_column_number_density";

/// One spatial/temporal reduction request.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionQuery {
    pub collection: String,
    pub band: String,
    pub box_size: BoxSize,
    pub bbox: BoundingBox,
    /// Inclusive start of the acquisition window.
    pub start: MonthLabel,
    /// Exclusive end of the acquisition window.
    pub end: MonthLabel,
}

/// A source of per-image region sums.
pub trait ImageryArchive {
    /// Returns the region sum of every image matching `query`.
    fn per_image_sums<'a>(&'a self, query: &'a RegionQuery) -> BoxFuture<'a, Result<Vec<f64>>>;
}
