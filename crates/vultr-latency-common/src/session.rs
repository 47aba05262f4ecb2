//! Session identifier

use std::fmt;

use uuid::Uuid;

/// Unique identifier for one measurement session (UUIDv7)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form used in instance labels
    pub fn short(&self) -> &str {
        &self.0[self.0.len().saturating_sub(8)..]
    }

    /// Label (and hostname) for the instance deployed to `region`
    pub fn instance_label(&self, region: &str) -> String {
        format!("latency-{}-{}", region, self.short())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
