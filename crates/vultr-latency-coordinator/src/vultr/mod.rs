//! Vultr API client
//!
//! This module wraps the parts of the Vultr v2 API the tool needs:
//! - Instances: create, inspect, delete
//! - Regions: list (for the `regions` subcommand)

pub mod client;
pub mod error;
pub mod operations;
pub mod types;

pub use client::VultrClient;
pub use error::{classify_status, VultrError};
pub use operations::InstanceOperations;
pub use types::{InstanceInfo, LaunchInstanceConfig, ProviderRegion};
