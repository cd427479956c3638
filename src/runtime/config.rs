use crate::runtime::telemetry;
use anyhow::{bail, Context, Result};
use std::time::Duration;

const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 1;
const DEFAULT_SAMPLE_BATCH: usize = 10;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 70;
const DEFAULT_COOLDOWN_WINDOW_SECS: u64 = 15 * 60;
const DEFAULT_DEBOUNCE_QUIET_SECS: u64 = 2;
const DEFAULT_BACKFILL_PAGE: usize = 50;
const DEFAULT_NEW_ACCOUNT_AGE_DAYS: f64 = 7.0;
const DEFAULT_LOW_FOLLOWER_THRESHOLD: u64 = 15;
const DEFAULT_SOCKET_CEILING: usize = 512;

/// Runtime configuration for the connection supervisor.
///
/// All instances must be constructed via [`WardenConfig::builder`] or
/// [`WardenConfig::new`] so invariants are validated before any consumer
/// observes the values.
#[derive(Debug, Clone, PartialEq)]
pub struct WardenConfig {
    sample_interval: Duration,
    sample_batch: usize,
    idle_timeout: Duration,
    cooldown_window: Duration,
    debounce_quiet: Duration,
    backfill_page: usize,
    new_account_age_days: f64,
    low_follower_threshold: u64,
    socket_ceiling: usize,
    metrics_interval: Duration,
}

pub struct WardenConfigParams {
    pub sample_interval: Duration,
    pub sample_batch: usize,
    pub idle_timeout: Duration,
    pub cooldown_window: Duration,
    pub debounce_quiet: Duration,
    pub backfill_page: usize,
    pub new_account_age_days: f64,
    pub low_follower_threshold: u64,
    pub socket_ceiling: usize,
    pub metrics_interval: Duration,
}

impl WardenConfig {
    /// Returns a builder to incrementally construct and validate a
    /// configuration.
    pub fn builder() -> WardenConfigBuilder {
        WardenConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    pub fn new(params: WardenConfigParams) -> Result<Self> {
        let WardenConfigParams {
            sample_interval,
            sample_batch,
            idle_timeout,
            cooldown_window,
            debounce_quiet,
            backfill_page,
            new_account_age_days,
            low_follower_threshold,
            socket_ceiling,
            metrics_interval,
        } = params;

        let config = Self {
            sample_interval,
            sample_batch,
            idle_timeout,
            cooldown_window,
            debounce_quiet,
            backfill_page,
            new_account_age_days,
            low_follower_threshold,
            socket_ceiling,
            metrics_interval,
        };

        config.validate()?;
        Ok(config)
    }

    /// Interval between candidate-sampling ticks.
    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }

    /// Maximum connection attempts issued per sampling tick.
    pub fn sample_batch(&self) -> usize {
        self.sample_batch
    }

    /// Hard per-session inactivity window; roughly twice the expected
    /// heartbeat interval.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// How long a throttled account's registry slot is held before it
    /// becomes eligible for sampling again.
    pub fn cooldown_window(&self) -> Duration {
        self.cooldown_window
    }

    /// Quiet period for coalescing state-change echoes per account.
    pub fn debounce_quiet(&self) -> Duration {
        self.debounce_quiet
    }

    /// Page size of the catch-up mention query at session start.
    pub fn backfill_page(&self) -> usize {
        self.backfill_page
    }

    /// Accounts younger than this many fractional days count as new.
    pub fn new_account_age_days(&self) -> f64 {
        self.new_account_age_days
    }

    /// Accounts with fewer followers than this count as low-follower.
    pub fn low_follower_threshold(&self) -> u64 {
        self.low_follower_threshold
    }

    /// Upper bound on concurrently open streaming sockets.
    pub fn socket_ceiling(&self) -> usize {
        self.socket_ceiling
    }

    /// Interval used by the telemetry reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        if self.sample_interval.is_zero() {
            bail!("sample_interval must be greater than 0");
        }

        if self.sample_batch == 0 {
            bail!("sample_batch must be greater than 0");
        }

        if self.idle_timeout.is_zero() {
            bail!("idle_timeout must be greater than 0");
        }

        if self.cooldown_window.is_zero() {
            bail!("cooldown_window must be greater than 0");
        }

        if self.debounce_quiet.is_zero() {
            bail!("debounce_quiet must be greater than 0");
        }

        if self.backfill_page == 0 {
            bail!("backfill_page must be greater than 0");
        }

        if self.new_account_age_days <= 0.0 {
            bail!("new_account_age_days must be greater than 0");
        }

        if self.socket_ceiling == 0 {
            bail!("socket_ceiling must be greater than 0");
        }

        if self.sample_batch > self.socket_ceiling {
            bail!(
                "sample_batch ({}) must not exceed socket_ceiling ({})",
                self.sample_batch,
                self.socket_ceiling,
            );
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        Ok(())
    }
}

impl Default for WardenConfig {
    fn default() -> Self {
        WardenConfig::builder()
            .build()
            .expect("default configuration should be valid")
    }
}

#[derive(Debug, Default, Clone)]
pub struct WardenConfigBuilder {
    sample_interval: Option<Duration>,
    sample_batch: Option<usize>,
    idle_timeout: Option<Duration>,
    cooldown_window: Option<Duration>,
    debounce_quiet: Option<Duration>,
    backfill_page: Option<usize>,
    new_account_age_days: Option<f64>,
    low_follower_threshold: Option<u64>,
    socket_ceiling: Option<usize>,
    metrics_interval: Option<Duration>,
}

impl WardenConfigBuilder {
    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = Some(interval);
        self
    }

    pub fn sample_batch(mut self, batch: usize) -> Self {
        self.sample_batch = Some(batch);
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn cooldown_window(mut self, window: Duration) -> Self {
        self.cooldown_window = Some(window);
        self
    }

    pub fn debounce_quiet(mut self, quiet: Duration) -> Self {
        self.debounce_quiet = Some(quiet);
        self
    }

    pub fn backfill_page(mut self, page: usize) -> Self {
        self.backfill_page = Some(page);
        self
    }

    pub fn new_account_age_days(mut self, days: f64) -> Self {
        self.new_account_age_days = Some(days);
        self
    }

    pub fn low_follower_threshold(mut self, threshold: u64) -> Self {
        self.low_follower_threshold = Some(threshold);
        self
    }

    pub fn socket_ceiling(mut self, ceiling: usize) -> Self {
        self.socket_ceiling = Some(ceiling);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<WardenConfig> {
        let params = WardenConfigParams {
            sample_interval: self
                .sample_interval
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_SAMPLE_INTERVAL_SECS)),
            sample_batch: self.sample_batch.unwrap_or(DEFAULT_SAMPLE_BATCH),
            idle_timeout: self
                .idle_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)),
            cooldown_window: self
                .cooldown_window
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_COOLDOWN_WINDOW_SECS)),
            debounce_quiet: self
                .debounce_quiet
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_DEBOUNCE_QUIET_SECS)),
            backfill_page: self.backfill_page.unwrap_or(DEFAULT_BACKFILL_PAGE),
            new_account_age_days: self
                .new_account_age_days
                .unwrap_or(DEFAULT_NEW_ACCOUNT_AGE_DAYS),
            low_follower_threshold: self
                .low_follower_threshold
                .unwrap_or(DEFAULT_LOW_FOLLOWER_THRESHOLD),
            socket_ceiling: self.socket_ceiling.unwrap_or(DEFAULT_SOCKET_CEILING),
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
        };

        WardenConfig::new(params).context("invalid warden configuration")
    }
}
