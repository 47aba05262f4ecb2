//! Operator prompts
//!
//! The duration choice and the teardown confirmation. Input is read from any
//! `AsyncBufRead` so sessions can be driven from tests.

use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use vultr_latency_common::defaults::DEFAULT_TEST_MINUTES;

/// How long measurement runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMode {
    /// One pass, then immediate teardown
    SinglePass,
    /// Repeat passes until the duration elapses, then ask before teardown
    Timed(Duration),
}

impl TestMode {
    /// Chosen duration in minutes (0 for a single pass)
    pub fn minutes(&self) -> u64 {
        match self {
            TestMode::SinglePass => 0,
            TestMode::Timed(duration) => duration.as_secs() / 60,
        }
    }

    pub fn from_minutes(minutes: u64) -> Self {
        if minutes == 0 {
            TestMode::SinglePass
        } else {
            TestMode::Timed(Duration::from_secs(minutes * 60))
        }
    }
}

/// Map the operator's duration answer to minutes. Unrecognized answers get the default.
pub fn parse_duration_choice(answer: &str) -> u64 {
    match answer.trim().to_lowercase().as_str() {
        "" => DEFAULT_TEST_MINUTES,
        "0" => 0,
        "1" | "1m" => 1,
        "5" => 5,
        "15" => 15,
        "60" | "1h" | "h" => 60,
        _ => DEFAULT_TEST_MINUTES,
    }
}

/// Whether a teardown answer confirms destruction
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y" | "yes")
}

/// Outcome of the teardown prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TeardownDecision {
    #[strum(serialize = "destroy")]
    Destroy,
    /// No answer before the timeout
    #[strum(serialize = "destroy (timeout)")]
    DestroyOnTimeout,
    #[strum(serialize = "keep")]
    Keep,
}

impl TeardownDecision {
    pub fn destroys(&self) -> bool {
        !matches!(self, TeardownDecision::Keep)
    }
}

fn print_prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

/// Read one line. `None` on end of input or read error.
pub async fn read_line<R: AsyncBufRead + Unpin>(input: &mut R) -> Option<String> {
    let mut line = String::new();
    match input.read_line(&mut line).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()),
    }
}

/// Ask for the test duration
pub async fn ask_duration<R: AsyncBufRead + Unpin>(input: &mut R) -> TestMode {
    println!("\nSelect the test duration: 0 (single pass), 1, 5, 15, 60 minutes (1h). Enter for 5.");
    print_prompt("Duration (min) [0/1/5/15/60/1h]: ");
    let answer = read_line(input).await.unwrap_or_default();
    TestMode::from_minutes(parse_duration_choice(&answer))
}

/// Ask whether to destroy the instances, destroying if no answer arrives in time.
///
/// End of input counts as no answer.
pub async fn ask_teardown<R: AsyncBufRead + Unpin>(
    input: &mut R,
    timeout: Duration,
) -> TeardownDecision {
    print_prompt(&format!(
        "\nDestroy the test instances? (y/n) [auto 'y' after {}s]: ",
        timeout.as_secs()
    ));

    tokio::select! {
        line = read_line(input) => match line {
            Some(answer) if is_affirmative(&answer) => TeardownDecision::Destroy,
            Some(_) => TeardownDecision::Keep,
            None => TeardownDecision::DestroyOnTimeout,
        },
        _ = tokio::time::sleep(timeout) => {
            println!();
            TeardownDecision::DestroyOnTimeout
        }
    }
}
