//! The Connection Supervisor: owns the session registry, spawns one
//! panic-isolated task per session, and applies the termination policy
//! (immediate removal, credential revalidation, or cooldown).

use crate::feed::history::MentionHistory;
use crate::feed::transport::{StreamFilter, StreamTransport};
use crate::model::{AccountId, TrackedAccount};
use crate::policy::debounce::ReconciliationDebouncer;
use crate::policy::decision::{DecisionEngine, PolicyThresholds};
use crate::runtime::config::WardenConfig;
use crate::runtime::telemetry::Telemetry;
use crate::stores::{AccountStore, ActionQueue, ReconciliationService, UserCache};
use crate::supervisor::connection::run_session;
use crate::supervisor::cooldown;
use crate::supervisor::registry::SessionRegistry;
use crate::supervisor::session::{SessionGeneration, TerminationReason};
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The external collaborators a supervisor is wired with.
#[derive(Clone)]
pub struct SupervisorParams {
    pub transport: Arc<dyn StreamTransport>,
    pub history: Arc<dyn MentionHistory>,
    pub accounts: Arc<dyn AccountStore>,
    pub actions: Arc<dyn ActionQueue>,
    pub user_cache: Option<Arc<dyn UserCache>>,
    pub reconciler: Arc<dyn ReconciliationService>,
}

pub(crate) struct SupervisorShared {
    pub(crate) config: WardenConfig,
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) transport: Arc<dyn StreamTransport>,
    pub(crate) history: Arc<dyn MentionHistory>,
    pub(crate) accounts: Arc<dyn AccountStore>,
    pub(crate) user_cache: Option<Arc<dyn UserCache>>,
    pub(crate) decisions: DecisionEngine,
    pub(crate) debouncer: ReconciliationDebouncer,
    pub(crate) telemetry: Arc<Telemetry>,
    pub(crate) filter: StreamFilter,
    pub(crate) shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct Supervisor {
    shared: Arc<SupervisorShared>,
}

impl Supervisor {
    pub fn new(
        config: WardenConfig,
        services: SupervisorParams,
        shutdown: CancellationToken,
    ) -> Self {
        let telemetry = Arc::new(Telemetry::default());
        let registry = Arc::new(SessionRegistry::new());
        let decisions = DecisionEngine::new(
            services.accounts.clone(),
            services.actions,
            PolicyThresholds {
                new_account_age_days: config.new_account_age_days(),
                low_follower_threshold: config.low_follower_threshold(),
            },
            telemetry.clone(),
        );
        let debouncer = ReconciliationDebouncer::new(
            config.debounce_quiet(),
            services.reconciler,
            telemetry.clone(),
            shutdown.child_token(),
        );

        Self {
            shared: Arc::new(SupervisorShared {
                config,
                registry,
                transport: services.transport,
                history: services.history,
                accounts: services.accounts,
                user_cache: services.user_cache,
                decisions,
                debouncer,
                telemetry,
                filter: StreamFilter {
                    mentions_only: true,
                },
                shutdown,
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Opens a streaming session for the account unless the registry already
    /// holds one (live or cooling down). Returns whether a new session task
    /// was spawned.
    pub fn open_if_absent(&self, account: TrackedAccount) -> bool {
        let shared = &self.shared;

        if account.deactivated {
            return false;
        }

        if shared.registry.streaming_len() >= shared.config.socket_ceiling() {
            tracing::debug!(
                account = %account.id,
                ceiling = shared.config.socket_ceiling(),
                "socket ceiling reached; deferring connection"
            );
            return false;
        }

        let cancel = shared.shutdown.child_token();
        let Some(generation) = shared.registry.reserve(&account.id, cancel.clone()) else {
            return false;
        };

        tracing::debug!(
            account = %account.id,
            generation = %generation,
            "opening streaming session"
        );

        let shared = Arc::clone(shared);
        let handle = tokio::spawn(async move {
            let outcome = std::panic::AssertUnwindSafe(run_session(&shared, &account, &cancel))
                .catch_unwind()
                .await;

            match outcome {
                Ok(reason) => shared.on_terminate(&account.id, generation, reason).await,
                Err(panic_payload) => {
                    let panic_msg = panic_message(panic_payload.as_ref());
                    tracing::error!(
                        account = %account.id,
                        panic = %panic_msg,
                        "session task panicked"
                    );
                    shared.telemetry.record_session_terminated();
                    shared.registry.remove_if_current(&account.id, generation);
                }
            }
        });
        self.shared.track(handle);
        true
    }

    pub fn is_connected(&self, account: &AccountId) -> bool {
        self.shared.registry.contains(account)
    }

    /// Number of registry slots in use, including cooling-down accounts.
    pub fn active_sessions(&self) -> usize {
        self.shared.registry.len()
    }

    /// Ids currently excluded from sampling.
    pub fn occupied_accounts(&self) -> HashSet<AccountId> {
        self.shared.registry.occupied_ids()
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.shared.telemetry.clone()
    }

    pub(crate) fn shared(&self) -> &Arc<SupervisorShared> {
        &self.shared
    }

    pub(crate) fn registry(&self) -> Arc<SessionRegistry> {
        self.shared.registry.clone()
    }

    /// Joins every session, cooldown, and sampler-spawned task. The shutdown
    /// token must already be cancelled; this only waits for the fan-out to
    /// finish.
    pub async fn drain(&self) {
        self.shared.registry.cancel_all();
        let handles = {
            let mut tasks = self
                .shared
                .tasks
                .lock()
                .expect("supervisor task list mutex poisoned");
            std::mem::take(&mut *tasks)
        };

        for (idx, result) in join_all(handles).await.into_iter().enumerate() {
            if let Err(err) = result {
                tracing::warn!(task = idx, error = %err, "supervised task terminated unexpectedly");
            }
        }
        self.shared.debouncer.cancel_all();
    }
}

impl SupervisorShared {
    pub(crate) fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self
            .tasks
            .lock()
            .expect("supervisor task list mutex poisoned");
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Applies the termination policy for one ended session. Called exactly
    /// once per session lifetime, from the task that owned it.
    pub(crate) async fn on_terminate(
        self: Arc<Self>,
        account: &AccountId,
        generation: SessionGeneration,
        reason: TerminationReason,
    ) {
        self.telemetry.record_session_terminated();

        if reason.is_credential_failure() {
            tracing::info!(
                account = %account,
                status = ?reason.http_status(),
                "stream rejected the credentials; revalidating"
            );
            if let Err(err) = self.accounts.revalidate_credentials(account).await {
                tracing::warn!(account = %account, error = %err, "credential revalidation failed");
            }
        }

        if reason.is_throttle() {
            if self.registry.mark_cooling_down(account, generation) {
                self.telemetry.record_cooldown_scheduled();
                tracing::warn!(
                    account = %account,
                    status = ?reason.http_status(),
                    cooldown_secs = self.config.cooldown_window().as_secs(),
                    "upstream throttled the stream; holding the slot for the cooldown window"
                );
                let window = self.config.cooldown_window();
                cooldown::schedule_removal(self, account.clone(), generation, window);
            } else {
                tracing::warn!(
                    account = %account,
                    generation = %generation,
                    "throttled session is no longer current; skipping cooldown"
                );
            }
            return;
        }

        let removed = self.registry.remove_if_current(account, generation);
        if removed {
            tracing::info!(account = %account, reason = ?reason, "session closed");
        } else {
            tracing::warn!(
                account = %account,
                generation = %generation,
                "terminated session was not current in the registry"
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
