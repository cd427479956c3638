//! The candidate sampler: a periodic tick task that asks the account store
//! for a bounded, randomly selected batch of unconnected accounts and hands
//! each one to the supervisor.

use crate::supervisor::lifecycle::Supervisor;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Spawns the sampling loop. The batch size bounds how many connection
/// attempts a single tick may issue, which is the primary lever against
/// upstream connection-rate limits.
pub(crate) fn spawn_sampler(
    supervisor: Supervisor,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let tick = supervisor.shared().config.sample_interval();
        let batch = supervisor.shared().config.sample_batch();
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("candidate sampler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let excluding = supervisor.shared().registry.occupied_ids();
                    match supervisor
                        .shared()
                        .accounts
                        .eligible_accounts(&excluding, batch)
                        .await
                    {
                        Ok(accounts) => {
                            for account in accounts {
                                supervisor.open_if_absent(account);
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "candidate sampling query failed");
                        }
                    }
                }
            }
        }
    })
}
