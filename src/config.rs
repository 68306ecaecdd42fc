//! Configuration Module
//!
//! Handles loading and managing cache limits from environment variables
//! or from a host application's own config file (via serde).

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CacheError, Result};

/// Environment variable holding the total cost limit.
pub const ENV_COST_LIMIT: &str = "CACHE_COST_LIMIT";
/// Environment variable holding the entry count limit.
pub const ENV_COUNT_LIMIT: &str = "CACHE_COUNT_LIMIT";
/// Environment variable selecting the recency policy.
pub const ENV_RECENCY_POLICY: &str = "CACHE_RECENCY_POLICY";

// == Recency Policy ==
/// Decides which operations count as "touching" an entry.
///
/// The least recently touched entry is the next eviction victim; entries
/// touched at the same point keep their insertion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecencyPolicy {
    /// Both `get` hits and `set` mark the key as most recently used.
    #[default]
    Lru,
    /// Only `set` marks the key; reads leave the eviction order alone.
    WriteOrder,
}

impl RecencyPolicy {
    /// Returns true if a successful read should refresh the key's position.
    pub fn refreshes_on_read(self) -> bool {
        matches!(self, RecencyPolicy::Lru)
    }
}

impl FromStr for RecencyPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(RecencyPolicy::Lru),
            "write-order" | "write_order" | "fifo" => Ok(RecencyPolicy::WriteOrder),
            other => Err(format!("unknown recency policy: {other}")),
        }
    }
}

impl fmt::Display for RecencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecencyPolicy::Lru => write!(f, "lru"),
            RecencyPolicy::WriteOrder => write!(f, "write-order"),
        }
    }
}

/// Cache configuration parameters.
///
/// Limits default to `None`, meaning unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum sum of entry costs
    pub cost_limit: Option<u64>,
    /// Maximum number of entries
    pub count_limit: Option<usize>,
    /// Which operations refresh an entry's eviction position
    pub recency_policy: RecencyPolicy,
}

impl CacheConfig {
    /// Creates an unbounded LRU configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total cost limit.
    pub fn with_cost_limit(mut self, limit: u64) -> Self {
        self.cost_limit = Some(limit);
        self
    }

    /// Sets the entry count limit.
    pub fn with_count_limit(mut self, limit: usize) -> Self {
        self.count_limit = Some(limit);
        self
    }

    /// Sets the recency policy.
    pub fn with_recency_policy(mut self, policy: RecencyPolicy) -> Self {
        self.recency_policy = policy;
        self
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// Values that fail to parse are logged and replaced by the default.
    ///
    /// # Environment Variables
    /// - `CACHE_COST_LIMIT` - Maximum total cost (default: unbounded)
    /// - `CACHE_COUNT_LIMIT` - Maximum entry count (default: unbounded)
    /// - `CACHE_RECENCY_POLICY` - `lru` or `write-order` (default: `lru`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`CacheConfig::from_env`], but reports unparsable values.
    pub fn try_from_env() -> Result<Self> {
        Self::try_from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source, ignoring bad values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            cost_limit: lenient(&lookup, ENV_COST_LIMIT).or(defaults.cost_limit),
            count_limit: lenient(&lookup, ENV_COUNT_LIMIT).or(defaults.count_limit),
            recency_policy: lenient(&lookup, ENV_RECENCY_POLICY)
                .unwrap_or(defaults.recency_policy),
        }
    }

    /// Builds a config from an arbitrary variable source, failing on bad values.
    pub fn try_from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            cost_limit: strict(&lookup, ENV_COST_LIMIT)?,
            count_limit: strict(&lookup, ENV_COUNT_LIMIT)?,
            recency_policy: strict(&lookup, ENV_RECENCY_POLICY)?.unwrap_or_default(),
        })
    }
}

/// Reads and parses one variable. Missing or blank values are `Ok(None)`.
fn strict<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map(Some)
                .map_err(|_| CacheError::InvalidConfig {
                    key: key.to_string(),
                    value: raw,
                })
        }
        _ => Ok(None),
    }
}

fn lenient<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    strict(lookup, key).unwrap_or_else(|err| {
        warn!("Ignoring configuration value: {}", err);
        None
    })
}
