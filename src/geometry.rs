//! Bounding boxes around monitored locations.

use crate::models::{BoundingBox, BoxSize};
use std::f64::consts::SQRT_2;

/// Half-width of the inner box, in degrees longitude.
pub const INNER_HALF_WIDTH_LON: f64 = 0.15;

/// Half-height of the inner box, in degrees latitude.
pub const INNER_HALF_HEIGHT_LAT: f64 = 0.10;

/// Factor applied to both half-widths of the outer box. Doubles the area.
pub const OUTER_SCALE: f64 = SQRT_2;

/// Build the box of the given size centered on `(lat, lng)`.
pub fn bounding_box(lat: f64, lng: f64, size: BoxSize) -> BoundingBox {
    let scale = match size {
        BoxSize::Inner => 1.0,
        BoxSize::Outer => OUTER_SCALE,
    };

    let half_lon = INNER_HALF_WIDTH_LON * scale;
    let half_lat = INNER_HALF_HEIGHT_LAT * scale;

    BoundingBox {
        min_lon: lng - half_lon,
        min_lat: lat - half_lat,
        max_lon: lng + half_lon,
        max_lat: lat + half_lat,
    }
}
