//! vultr-latency-coordinator - multi-region exchange latency measurement
//!
//! This crate provides the operator CLI that provisions Vultr instances,
//! runs the latency probe on each of them over ssh and reports the results.

pub mod config;
pub mod orchestrator;
pub mod vultr;
pub mod wait;
