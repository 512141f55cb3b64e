//! Output file generation.

pub mod exporter;

pub use exporter::*;
