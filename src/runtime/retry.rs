//! Retry policy attached to a task.
//!
//! Nothing here re-runs anything; the policy is carried for an execution
//! engine to read.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::TaskflowError;

/// Delay used when a task does not set one.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5 * 60);

/// Number of permitted re-attempts.
///
/// Serialized as a plain integer where `-1` means [`Retries::Unlimited`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Retries {
    Count(u32),
    Unlimited,
}

impl Default for Retries {
    fn default() -> Self {
        Retries::Count(0)
    }
}

impl TryFrom<i64> for Retries {
    type Error = TaskflowError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Retries::Unlimited),
            n if n >= 0 => u32::try_from(n)
                .map(Retries::Count)
                .map_err(|_| TaskflowError::Type(format!("Retries out of range; received {n}"))),
            n => Err(TaskflowError::Type(format!(
                "Retries must be a non-negative int or -1; received {n}"
            ))),
        }
    }
}

impl From<Retries> for i64 {
    fn from(retries: Retries) -> Self {
        match retries {
            Retries::Count(n) => i64::from(n),
            Retries::Unlimited => -1,
        }
    }
}

impl From<u32> for Retries {
    fn from(n: u32) -> Self {
        Retries::Count(n)
    }
}

impl fmt::Display for Retries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Retries::Count(n) => write!(f, "{n}"),
            Retries::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// `(retries, retry_delay)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub retries: Retries,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: Retries::default(),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Parse a duration string like `"250ms"`, `"30s"`, `"5m"` or `"2h"`.
///
/// A bare number is rejected: the unit has to be spelled out.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    let secs = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{s}' is out of range"))
    };

    match unit_part.trim().to_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => secs(60),
        "h" => secs(60 * 60),
        unit => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}
