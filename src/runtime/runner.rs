use crate::runtime::config::WardenConfig;
use crate::runtime::telemetry::spawn_metrics_reporter;
use crate::supervisor::lifecycle::{Supervisor, SupervisorParams};
use crate::supervisor::sampler::spawn_sampler;
use anyhow::Result;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Coordinates the supervisor lifecycle and handles OS signals for graceful
/// shutdowns.
pub struct Runner {
    config: WardenConfig,
    services: SupervisorParams,
    supervisor: Supervisor,
    shutdown: CancellationToken,
    sampler: Option<JoinHandle<()>>,
    reporter: Option<JoinHandle<()>>,
    started: bool,
}

impl Runner {
    /// Creates a new runner and wires a root [`CancellationToken`] that
    /// propagates through the entire pipeline (sessions, sampler, cooldown
    /// and debounce timers, metrics reporter).
    pub fn new(config: WardenConfig, services: SupervisorParams) -> Self {
        let shutdown = CancellationToken::new();
        let supervisor = Supervisor::new(config.clone(), services.clone(), shutdown.clone());
        Self {
            config,
            services,
            supervisor,
            shutdown,
            sampler: None,
            reporter: None,
            started: false,
        }
    }

    /// Returns a clone of the root shutdown token so external callers can
    /// integrate with their own signal handlers or cancellation strategies.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The supervisor driving this runner. Note that [`Runner::stop`]
    /// replaces it, so clones taken here go stale across a restart.
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Starts the sampler and metrics reporter.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }

        tracing::info!(
            sample_batch = self.config.sample_batch(),
            socket_ceiling = self.config.socket_ceiling(),
            "starting connection supervisor"
        );

        self.reporter = Some(spawn_metrics_reporter(
            self.supervisor.telemetry(),
            self.supervisor.registry(),
            self.config.socket_ceiling(),
            self.shutdown.child_token(),
            self.config.metrics_interval(),
        ));
        self.sampler = Some(spawn_sampler(
            self.supervisor.clone(),
            self.shutdown.child_token(),
        ));
        self.started = true;
        Ok(())
    }

    /// Stops the pipeline gracefully: cancels the root token, joins the
    /// sampler and reporter, and drains every session task.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }

        tracing::info!("stopping connection supervisor");
        self.shutdown.cancel();

        if let Some(handle) = self.sampler.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "sampler task panicked");
            }
        }
        if let Some(handle) = self.reporter.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "metrics reporter task panicked");
            }
        }

        self.supervisor.drain().await;
        self.started = false;
        self.reinitialize_shutdown_token();
        Ok(())
    }

    /// Runs until a Ctrl-C (SIGINT) is received or the shutdown token is
    /// cancelled elsewhere.
    pub async fn run_until_ctrl_c(&mut self) -> Result<()> {
        self.start().await?;
        tracing::info!("runner started; waiting for Ctrl-C (SIGINT) to initiate shutdown");

        let shutdown = self.shutdown.clone();
        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Ctrl-C received; shutting down runner");
            }
            _ = shutdown.cancelled() => {
                tracing::info!("runner shutdown token cancelled");
            }
        }

        self.stop().await
    }

    fn reinitialize_shutdown_token(&mut self) {
        self.shutdown = CancellationToken::new();
        self.supervisor = Supervisor::new(
            self.config.clone(),
            self.services.clone(),
            self.shutdown.clone(),
        );
    }
}
