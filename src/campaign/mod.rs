//! Campaign planning and execution.
//!
//! A campaign visits every (box size, location, date window) combination
//! once and records each aggregate on the location's record.

pub mod runner;

pub use runner::{campaign_plan, CampaignRunner};
