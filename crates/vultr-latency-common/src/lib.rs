//! vultr-latency-common - Shared types and utilities
//!
//! This crate provides the types shared by the probe program and the
//! coordinator, without any HTTP or process dependencies to keep it lightweight.
//!
//! ## Modules
//!
//! - [`catalog`]: Region to exchange endpoint table
//! - [`defaults`]: Default configuration values
//! - [`report`]: Probe output contract (`name -> {min, avg, max}`)
//! - [`session`]: Session identifier used for instance labels
//! - [`stats`]: Latency statistics (min/avg/max)

pub mod catalog;
pub mod defaults;
pub mod report;
pub mod session;
pub mod stats;

// Re-export commonly used types
pub use catalog::{Catalog, Category, Endpoint, RegionEntry};
pub use report::{ProbeReport, ProbeStats};
pub use session::SessionId;
pub use stats::LatencyStats;
