// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use clap::ValueEnum;
use std::time::Duration;

pub const ENV_VERBOSE: &str = "JOBMOCK_VERBOSE";
pub const ENV_POLL_INTERVAL_MS: &str = "JOBMOCK_POLL_INTERVAL_MS";
pub const ENV_MAX_CONCURRENCY: &str = "JOBMOCK_MAX_CONCURRENCY";
pub const ENV_FAILURE_POLICY: &str = "JOBMOCK_FAILURE_POLICY";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What the worker manager does once a job inside an async scope has failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
#[clap(rename_all = "kebab-case")]
pub enum FailurePolicy {
    #[default]
    /// Default: keep running everything that is queued, report the first failure at scope exit
    Drain,
    /// Do not start queued jobs after the first failure; wait for running ones and exit
    StopSpawning,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound for how long the worker manager sleeps without a wake-up.
    pub poll_interval: Duration,
    /// Maximum number of job runners alive at the same time. `None` is unbounded.
    pub max_concurrency: Option<usize>,
    pub failure_policy: FailurePolicy,
    /// Log every enqueue/perform transition at info level instead of debug.
    pub verbose: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_concurrency: None,
            failure_policy: FailurePolicy::default(),
            verbose: false,
        }
    }
}

impl DispatcherConfig {
    /// Defaults, overridden by the `JOBMOCK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DispatcherConfig::from_env`], reading variables through `lookup`.
    /// Invalid values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_VERBOSE) {
            config.verbose = is_truthy(&value);
        }

        if let Some(value) = lookup(ENV_POLL_INTERVAL_MS) {
            match value.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.poll_interval = Duration::from_millis(ms),
                _ => log::warn!("ignoring invalid {ENV_POLL_INTERVAL_MS}={value:?}"),
            }
        }

        if let Some(value) = lookup(ENV_MAX_CONCURRENCY) {
            match value.trim().parse::<usize>() {
                Ok(0) => config.max_concurrency = None,
                Ok(n) => config.max_concurrency = Some(n),
                Err(_) => log::warn!("ignoring invalid {ENV_MAX_CONCURRENCY}={value:?}"),
            }
        }

        if let Some(value) = lookup(ENV_FAILURE_POLICY) {
            match FailurePolicy::from_str(value.trim(), true) {
                Ok(policy) => config.failure_policy = policy,
                Err(_) => log::warn!("ignoring invalid {ENV_FAILURE_POLICY}={value:?}"),
            }
        }

        config
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency.filter(|n| *n > 0);
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}
