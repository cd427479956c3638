//! The per-session streaming task: opens the transport, runs the catch-up
//! fetch once, then pumps events through the classifier until the stream
//! ends, the idle watchdog fires, or shutdown cancels the session.

use crate::feed::classify::{classify, EventDisposition};
use crate::feed::events::RawFeedEvent;
use crate::feed::transport::StreamItem;
use crate::model::TrackedAccount;
use crate::supervisor::backfill;
use crate::supervisor::lifecycle::SupervisorShared;
use crate::supervisor::session::TerminationReason;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

pub(crate) async fn run_session(
    shared: &SupervisorShared,
    account: &TrackedAccount,
    cancel: &CancellationToken,
) -> TerminationReason {
    let opened = tokio::select! {
        _ = cancel.cancelled() => return TerminationReason::Cancelled,
        result = shared.transport.open(account, &shared.filter) => result,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(account = %account.id, error = %err, "failed to open stream");
            return TerminationReason::OpenFailed {
                status: err.status(),
                message: err.message().to_string(),
            };
        }
    };

    let idle_window = shared.config.idle_timeout();
    stream.set_idle_timeout(idle_window);
    shared.telemetry.record_session_opened();
    tracing::info!(account = %account.id, "streaming session established");

    // Cover the gap since the account's last connection. Best-effort: a
    // failed query must not block live streaming.
    backfill::backfill(
        shared.history.as_ref(),
        &shared.decisions,
        &shared.telemetry,
        account,
        shared.config.backfill_page(),
    )
    .await;

    loop {
        let awaited = tokio::select! {
            _ = cancel.cancelled() => None,
            result = timeout(idle_window, stream.next_event()) => Some(result),
        };

        let Some(result) = awaited else {
            stream.abort();
            return TerminationReason::Cancelled;
        };

        let item = match result {
            Ok(item) => item,
            Err(_elapsed) => {
                // Not even a heartbeat within the window: the connection is
                // silently dead. Abort so both loud and quiet deaths share
                // one recovery path.
                stream.abort();
                shared.telemetry.record_idle_timeout();
                tracing::warn!(
                    account = %account.id,
                    idle_secs = idle_window.as_secs(),
                    "no stream activity within the idle window; aborting"
                );
                return TerminationReason::IdleTimeout;
            }
        };

        match item {
            StreamItem::End(status) => {
                return TerminationReason::StreamEnd(status);
            }
            StreamItem::Event(event) => {
                handle_event(shared, account, event).await;
            }
        }
    }
}

async fn handle_event(shared: &SupervisorShared, account: &TrackedAccount, event: RawFeedEvent) {
    shared.telemetry.record_event();

    match classify(event) {
        EventDisposition::Keepalive => {
            tracing::trace!(account = %account.id, "keepalive");
        }
        EventDisposition::Disconnect(notice) => {
            tracing::info!(
                account = %account.id,
                reason = ?notice.reason,
                message = notice.message.as_deref().unwrap_or(""),
                "stream disconnect notice"
            );
            // Session removal is the transport end's job; the notice only
            // decides whether the credentials need a fresh look.
            if notice.reason.revokes_credentials() {
                if let Err(err) = shared.accounts.revalidate_credentials(&account.id).await {
                    tracing::warn!(
                        account = %account.id,
                        error = %err,
                        "credential revalidation failed"
                    );
                }
            }
        }
        EventDisposition::Warning(notice) => {
            if !notice.is_benign() {
                tracing::warn!(
                    account = %account.id,
                    code = %notice.code,
                    message = notice.message.as_deref().unwrap_or(""),
                    "stream warning"
                );
            }
        }
        EventDisposition::StateChange { kind, subject } => {
            if let (Some(actor), Some(cache)) = (subject.as_ref(), shared.user_cache.as_deref()) {
                if let Err(err) = cache.store(actor).await {
                    tracing::debug!(actor = %actor.id, error = %err, "user cache store failed");
                }
            }
            tracing::debug!(account = %account.id, kind = ?kind, "block state change echo");
            shared.debouncer.notify(&account.id);
        }
        EventDisposition::Mention(author) => {
            shared.decisions.evaluate(account, &author).await;
        }
        EventDisposition::Unrecognized => {
            tracing::trace!(account = %account.id, "unclassified event");
        }
    }
}
