//! Default configuration values shared between probe and coordinator
//!
//! These constants ensure consistent defaults across all vultr-latency components.

/// Remote path of the endpoint mapping consumed by the probe
pub const REMOTE_ENDPOINTS_PATH: &str = "/root/endpoints.json";

/// Remote path of the probe program
pub const REMOTE_PROBE_PATH: &str = "/usr/local/bin/vultr-latency-probe";

/// Samples taken per endpoint in one probe run
pub const DEFAULT_SAMPLES: u32 = 10;

/// Spacing between sample rounds in milliseconds
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 100;

/// Per-request timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Vultr API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.vultr.com/v2";

/// Instance plan ($12/month, 1 vCPU / 2 GB)
pub const DEFAULT_PLAN: &str = "vc2-1c-2gb";

/// Ubuntu 22.04 LTS
pub const DEFAULT_OS_ID: u32 = 1743;

/// Maximum time to wait for all instances to become ready (seconds)
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 300;

/// Interval between instance status polls (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Attempts made before giving up on a host's SSH daemon
pub const DEFAULT_SHELL_RETRIES: u32 = 10;

/// Delay between SSH readiness attempts (seconds)
pub const DEFAULT_SHELL_RETRY_DELAY_SECS: u64 = 6;

/// SSH `ConnectTimeout` (seconds)
pub const DEFAULT_SSH_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Hard limit for one remote probe invocation (seconds)
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 300;

/// Pause between measurement passes in timed mode (seconds)
pub const DEFAULT_PASS_INTERVAL_SECS: u64 = 30;

/// How long the teardown prompt waits before destroying instances (seconds)
pub const DEFAULT_TEARDOWN_PROMPT_SECS: u64 = 30;

/// Test duration used when the operator gives no or an unknown answer (minutes)
pub const DEFAULT_TEST_MINUTES: u64 = 5;

/// Rows shown in the fastest-latency ranking
pub const DEFAULT_TOP_N: usize = 10;

/// Approximate hourly price of one instance (USD)
pub const INSTANCE_HOURLY_COST_USD: f64 = 0.018;

/// Approximate monthly price of one instance (USD)
pub const INSTANCE_MONTHLY_COST_USD: f64 = 12.0;
