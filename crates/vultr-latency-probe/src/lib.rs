//! vultr-latency-probe - Latency probe for measurement instances
//!
//! This crate provides the probe binary that the coordinator uploads to each
//! instance. It reads an endpoint mapping, samples every endpoint over HTTP
//! and prints a `name -> {min, avg, max}` JSON report on stdout.

pub mod config;
pub mod error;
pub mod probe;
