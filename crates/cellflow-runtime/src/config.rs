#![forbid(unsafe_code)]

//! Change-queue configuration.
//!
//! The main decision a coordinator makes is what happens to changes that
//! observers issue *while* a batch is running:
//!
//! - [`DrainPolicy::Snapshot`] (default): the batch only processes the
//!   entries queued when it started. Re-entrant changes wait for the next
//!   `run_batch`, so a cascade `a → b → c` advances one hop per batch.
//! - [`DrainPolicy::Fixpoint`]: the batch keeps running rounds until the
//!   queue is empty, so the same cascade completes in one `run_batch`. Every
//!   round is still a full announce-then-commit pass. `max_rounds` bounds
//!   the work for cyclic observers.
//!
//! # Sources
//!
//! Defaults, then optional TOML (feature `policy-config`), then environment:
//!
//! | variable                | values                 |
//! |-------------------------|------------------------|
//! | `CELLFLOW_DRAIN_POLICY` | `snapshot`, `fixpoint` |
//! | `CELLFLOW_MAX_ROUNDS`   | integer >= 1           |

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RuntimeError};

/// Environment variable selecting the drain policy.
pub const ENV_DRAIN_POLICY: &str = "CELLFLOW_DRAIN_POLICY";
/// Environment variable bounding fixpoint rounds.
pub const ENV_MAX_ROUNDS: &str = "CELLFLOW_MAX_ROUNDS";

/// How a batch treats entries enqueued while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum DrainPolicy {
    /// One round per batch; re-entrant entries are deferred.
    #[default]
    Snapshot,
    /// Rounds until the queue is empty or `max_rounds` is reached.
    Fixpoint,
}

impl DrainPolicy {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Fixpoint => "fixpoint",
        }
    }
}

impl fmt::Display for DrainPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrainPolicy {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            v if v.eq_ignore_ascii_case("snapshot") => Ok(Self::Snapshot),
            v if v.eq_ignore_ascii_case("fixpoint") => Ok(Self::Fixpoint),
            other => Err(RuntimeError::unknown_policy(other)),
        }
    }
}

/// Configuration for [`ChangeQueue`](crate::ChangeQueue).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct QueueConfig {
    /// Re-entrancy policy. Default: snapshot.
    pub policy: DrainPolicy,

    /// Upper bound on rounds per batch under the fixpoint policy.
    /// Ignored by the snapshot policy. Default: 64.
    pub max_rounds: usize,

    /// Queue capacity reserved up front. Default: 16.
    pub initial_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            policy: DrainPolicy::Snapshot,
            max_rounds: 64,
            initial_capacity: 16,
        }
    }
}

impl QueueConfig {
    /// Default configuration with the snapshot policy.
    #[must_use]
    pub fn snapshot() -> Self {
        Self::default()
    }

    /// Default configuration with the fixpoint policy.
    #[must_use]
    pub fn fixpoint() -> Self {
        Self::default().with_policy(DrainPolicy::Fixpoint)
    }

    /// Set the drain policy.
    #[must_use]
    pub fn with_policy(mut self, policy: DrainPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the fixpoint round limit.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Set the reserved queue capacity.
    #[must_use]
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Check the configuration for values the queue cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(RuntimeError::InvalidMaxRounds {
                got: self.max_rounds,
            });
        }
        Ok(())
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup` (usually the environment) and validate.
    ///
    /// An unknown policy name is an error; an unparsable round limit is
    /// ignored.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(val) = lookup(ENV_DRAIN_POLICY) {
            self.policy = val.parse()?;
        }
        if let Some(val) = lookup(ENV_MAX_ROUNDS)
            && let Ok(n) = val.trim().parse()
        {
            self.max_rounds = n;
        }
        self.validate()?;
        Ok(self)
    }

    /// Parse a TOML document such as:
    ///
    /// ```toml
    /// policy = "fixpoint"
    /// max_rounds = 8
    /// ```
    ///
    /// Missing keys take their defaults.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }
}
