use crate::supervisor::registry::SessionRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters used to derive runtime metrics.
#[derive(Default, Debug)]
pub struct Telemetry {
    sessions_opened: AtomicU64,
    sessions_terminated: AtomicU64,
    idle_timeouts: AtomicU64,
    cooldowns_scheduled: AtomicU64,
    events_received: AtomicU64,
    mentions_evaluated: AtomicU64,
    blocks_enqueued: AtomicU64,
    reconciliations: AtomicU64,
    backfill_failures: AtomicU64,
}

impl Telemetry {
    pub fn record_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_terminated(&self) {
        self.sessions_terminated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_idle_timeout(&self) {
        self.idle_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cooldown_scheduled(&self) {
        self.cooldowns_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mention_evaluated(&self) {
        self.mentions_evaluated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_block_enqueued(&self) {
        self.blocks_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconciliation(&self) {
        self.reconciliations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backfill_failure(&self) {
        self.backfill_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened.load(Ordering::Relaxed)
    }

    pub fn sessions_terminated(&self) -> u64 {
        self.sessions_terminated.load(Ordering::Relaxed)
    }

    pub fn idle_timeouts(&self) -> u64 {
        self.idle_timeouts.load(Ordering::Relaxed)
    }

    pub fn blocks_enqueued(&self) -> u64 {
        self.blocks_enqueued.load(Ordering::Relaxed)
    }

    pub fn reconciliations(&self) -> u64 {
        self.reconciliations.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_terminated: self.sessions_terminated.load(Ordering::Relaxed),
            idle_timeouts: self.idle_timeouts.load(Ordering::Relaxed),
            cooldowns_scheduled: self.cooldowns_scheduled.load(Ordering::Relaxed),
            events_received: self.events_received.load(Ordering::Relaxed),
            mentions_evaluated: self.mentions_evaluated.load(Ordering::Relaxed),
            blocks_enqueued: self.blocks_enqueued.load(Ordering::Relaxed),
            reconciliations: self.reconciliations.load(Ordering::Relaxed),
            backfill_failures: self.backfill_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TelemetrySnapshot {
    pub sessions_opened: u64,
    pub sessions_terminated: u64,
    pub idle_timeouts: u64,
    pub cooldowns_scheduled: u64,
    pub events_received: u64,
    pub mentions_evaluated: u64,
    pub blocks_enqueued: u64,
    pub reconciliations: u64,
    pub backfill_failures: u64,
}

/// Spawns a background task that periodically logs the active-session count
/// against the socket ceiling, event throughput, and policy counters.
pub fn spawn_metrics_reporter(
    telemetry: Arc<Telemetry>,
    registry: Arc<SessionRegistry>,
    socket_ceiling: usize,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_snapshot = telemetry.snapshot();
        let mut last_tick = Instant::now();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "streamwarden::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current_snapshot = telemetry.snapshot();
                    let events_delta = current_snapshot
                        .events_received
                        .saturating_sub(last_snapshot.events_received);
                    let elapsed = last_tick.elapsed().as_secs_f64();
                    let events_per_sec = if elapsed <= f64::EPSILON {
                        0.0
                    } else {
                        events_delta as f64 / elapsed
                    };

                    tracing::info!(
                        target: "streamwarden::metrics",
                        active_sessions = registry.len(),
                        open_sockets = registry.streaming_len(),
                        socket_ceiling,
                        events_per_sec = format!("{events_per_sec:.2}"),
                        sessions_opened = current_snapshot.sessions_opened,
                        sessions_terminated = current_snapshot.sessions_terminated,
                        idle_timeouts = current_snapshot.idle_timeouts,
                        cooldowns_scheduled = current_snapshot.cooldowns_scheduled,
                        mentions_evaluated = current_snapshot.mentions_evaluated,
                        blocks_enqueued = current_snapshot.blocks_enqueued,
                        reconciliations = current_snapshot.reconciliations,
                        backfill_failures = current_snapshot.backfill_failures,
                        "runtime metrics snapshot"
                    );

                    last_snapshot = current_snapshot;
                    last_tick = Instant::now();
                }
            }
        }
    })
}
