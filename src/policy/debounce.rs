//! Per-account debounce timers for downstream block-list reconciliation. A
//! bulk block produces many nearly simultaneous state-change echoes; only
//! the last one within a quiet window should trigger a reconciliation call.

use crate::model::AccountId;
use crate::runtime::telemetry::Telemetry;
use crate::stores::ReconciliationService;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

struct PendingTimer {
    seq: u64,
    cancel: CancellationToken,
}

struct DebounceInner {
    quiet: Duration,
    reconciler: Arc<dyn ReconciliationService>,
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
    pending: Mutex<HashMap<AccountId, PendingTimer>>,
    next_seq: AtomicU64,
}

impl DebounceInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<AccountId, PendingTimer>> {
        self.pending.lock().expect("debounce registry mutex poisoned")
    }

    /// Removes the account's entry only when it still belongs to `seq`.
    fn clear_if_current(&self, account: &AccountId, seq: u64) -> bool {
        let mut pending = self.lock();
        match pending.get(account) {
            Some(timer) if timer.seq == seq => {
                pending.remove(account);
                true
            }
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct ReconciliationDebouncer {
    inner: Arc<DebounceInner>,
}

impl ReconciliationDebouncer {
    pub fn new(
        quiet: Duration,
        reconciler: Arc<dyn ReconciliationService>,
        telemetry: Arc<Telemetry>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(DebounceInner {
                quiet,
                reconciler,
                telemetry,
                shutdown,
                pending: Mutex::new(HashMap::new()),
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Cancels any pending timer for the account and arms a fresh one. The
    /// reconciliation call fires one quiet window after the *last* notify.
    pub fn notify(&self, account: &AccountId) {
        let inner = &self.inner;
        let seq = inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let cancel = inner.shutdown.child_token();

        {
            let mut pending = inner.lock();
            if let Some(previous) = pending.insert(
                account.clone(),
                PendingTimer {
                    seq,
                    cancel: cancel.clone(),
                },
            ) {
                previous.cancel.cancel();
            }
        }

        let inner = Arc::clone(inner);
        let account = account.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    inner.clear_if_current(&account, seq);
                    return;
                }
                _ = sleep(inner.quiet) => {}
            }

            // A replacement may have slipped in between the sleep elapsing
            // and this task reaching the registry.
            if !inner.clear_if_current(&account, seq) {
                return;
            }

            tracing::debug!(account = %account, "quiet window elapsed; reconciling block list");
            match inner.reconciler.reconcile_blocks(&account).await {
                Ok(()) => inner.telemetry.record_reconciliation(),
                Err(err) => {
                    tracing::warn!(account = %account, error = %err, "block reconciliation failed");
                }
            }
        });
    }

    /// Number of accounts with an armed timer.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().len()
    }

    /// Cancels every armed timer without firing it.
    pub(crate) fn cancel_all(&self) {
        let drained: Vec<PendingTimer> = {
            let mut pending = self.inner.lock();
            pending.drain().map(|(_, timer)| timer).collect()
        };
        for timer in drained {
            timer.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use futures::future::BoxFuture;
    use std::time::Instant;
    use tokio::time::{sleep, Duration};

    #[derive(Default)]
    struct RecordingReconciler {
        calls: Mutex<Vec<(AccountId, Instant)>>,
    }

    impl RecordingReconciler {
        fn calls(&self) -> Vec<(AccountId, Instant)> {
            self.calls.lock().expect("call log mutex poisoned").clone()
        }
    }

    impl ReconciliationService for RecordingReconciler {
        fn reconcile_blocks<'a>(&'a self, id: &'a AccountId) -> BoxFuture<'a, Result<()>> {
            self.calls
                .lock()
                .expect("call log mutex poisoned")
                .push((id.clone(), Instant::now()));
            Box::pin(async { Ok(()) })
        }
    }

    fn debouncer(
        quiet: Duration,
        reconciler: Arc<RecordingReconciler>,
        shutdown: CancellationToken,
    ) -> ReconciliationDebouncer {
        ReconciliationDebouncer::new(
            quiet,
            reconciler,
            Arc::new(Telemetry::default()),
            shutdown,
        )
    }

    #[tokio::test]
    async fn burst_collapses_into_one_call_after_quiet_window() {
        let reconciler = Arc::new(RecordingReconciler::default());
        let quiet = Duration::from_millis(100);
        let debouncer = debouncer(quiet, reconciler.clone(), CancellationToken::new());
        let account = AccountId::from("bulk-blocker");

        let mut last_notify = Instant::now();
        for _ in 0..5 {
            last_notify = Instant::now();
            debouncer.notify(&account);
            sleep(Duration::from_millis(10)).await;
        }

        sleep(quiet * 4).await;

        let calls = reconciler.calls();
        assert_eq!(calls.len(), 1);
        assert!(
            calls[0].1.duration_since(last_notify) >= quiet,
            "reconciliation fired before the quiet window elapsed"
        );
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test]
    async fn accounts_debounce_independently() {
        let reconciler = Arc::new(RecordingReconciler::default());
        let debouncer = debouncer(
            Duration::from_millis(50),
            reconciler.clone(),
            CancellationToken::new(),
        );

        debouncer.notify(&AccountId::from("first"));
        debouncer.notify(&AccountId::from("second"));
        assert_eq!(debouncer.pending_count(), 2);

        sleep(Duration::from_millis(250)).await;

        let mut reconciled: Vec<String> = reconciler
            .calls()
            .into_iter()
            .map(|(id, _)| id.as_str().to_string())
            .collect();
        reconciled.sort();
        assert_eq!(reconciled, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_timers_without_firing() {
        let reconciler = Arc::new(RecordingReconciler::default());
        let shutdown = CancellationToken::new();
        let debouncer = debouncer(
            Duration::from_millis(50),
            reconciler.clone(),
            shutdown.clone(),
        );

        debouncer.notify(&AccountId::from("doomed"));
        shutdown.cancel();

        sleep(Duration::from_millis(200)).await;
        assert!(reconciler.calls().is_empty());
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test]
    async fn cancel_all_discards_armed_timers() {
        let reconciler = Arc::new(RecordingReconciler::default());
        let debouncer = debouncer(
            Duration::from_millis(50),
            reconciler.clone(),
            CancellationToken::new(),
        );

        debouncer.notify(&AccountId::from("a"));
        debouncer.notify(&AccountId::from("b"));
        debouncer.cancel_all();

        sleep(Duration::from_millis(200)).await;
        assert!(reconciler.calls().is_empty());
    }
}
