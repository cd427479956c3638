//! Deferred removal of throttled sessions. The slot stays in the registry
//! for the cooldown window so the sampler cannot immediately re-offer the
//! account and retrigger the upstream rate limit.

use crate::model::AccountId;
use crate::supervisor::lifecycle::SupervisorShared;
use crate::supervisor::session::SessionGeneration;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Schedules the removal of a cooling-down slot once `window` elapses. The
/// removal re-checks the generation at fire time: the slot must still belong
/// to the session it was scheduled for.
pub(crate) fn schedule_removal(
    shared: Arc<SupervisorShared>,
    account: AccountId,
    generation: SessionGeneration,
    window: Duration,
) {
    let shutdown = shared.shutdown.clone();
    let tracker = Arc::clone(&shared);
    let handle = tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = sleep(window) => {}
        }

        if shared.registry.remove_if_current(&account, generation) {
            tracing::info!(
                account = %account,
                "cooldown elapsed; account is eligible for sampling again"
            );
        } else {
            tracing::warn!(
                account = %account,
                generation = %generation,
                "cooldown removal found a different session; leaving the registry untouched"
            );
        }
    });
    tracker.track(handle);
}
