//! Region aggregation over an image collection.

use crate::geometry::bounding_box;
use crate::imagery::{ImageryArchive, RegionQuery};
use crate::models::{BoxSize, MonthLabel};
use anyhow::Result;
use tracing::debug;

/// Sums a band over a box and a date window across all matching images.
pub struct RegionAggregator<A> {
    archive: A,
    collection: String,
    band: String,
}

impl<A: ImageryArchive> RegionAggregator<A> {
    pub fn new(archive: A, collection: impl Into<String>, band: impl Into<String>) -> Self {
        Self {
            archive,
            collection: collection.into(),
            band: band.into(),
        }
    }

    /// Build the query for one location, window and box size.
    pub fn query(
        &self,
        lat: f64,
        lng: f64,
        start: MonthLabel,
        end: MonthLabel,
        size: BoxSize,
    ) -> RegionQuery {
        RegionQuery {
            collection: self.collection.clone(),
            band: self.band.clone(),
            box_size: size,
            bbox: bounding_box(lat, lng, size),
            start,
            end,
        }
    }

    /// Sum of the per-image region sums. Zero when no image matches.
    pub async fn aggregate(
        &self,
        lat: f64,
        lng: f64,
        start: MonthLabel,
        end: MonthLabel,
        size: BoxSize,
    ) -> Result<f64> {
        let query = self.query(lat, lng, start, end, size);
        let sums = self.archive.per_image_sums(&query).await?;

        let total: f64 = sums.iter().sum();
        debug!(
            "{} images in {}..{} ({}), total {}",
            sums.len(),
            start,
            end,
            size,
            total
        );
        Ok(total)
    }

    #[cfg(test)]
    pub fn archive(&self) -> &A {
        &self.archive
    }
}
