//! Counting in-process mocks for the account store, action queue, user
//! cache, and reconciliation service.

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use streamwarden::{
    AccountId, AccountStore, ActionQueue, BlockCandidate, PolicyFlags, ReconciliationService,
    RemoteActor, TrackedAccount, UserCache,
};

#[derive(Default)]
pub struct MockAccountStore {
    accounts: Mutex<Vec<TrackedAccount>>,
    flag_overrides: Mutex<HashMap<AccountId, PolicyFlags>>,
    revalidations: Mutex<Vec<AccountId>>,
    reloads: AtomicUsize,
    fail_reloads: AtomicBool,
}

impl MockAccountStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_accounts(accounts: Vec<TrackedAccount>) -> Arc<Self> {
        let store = Self::default();
        *store.accounts.lock().expect("account list mutex poisoned") = accounts;
        Arc::new(store)
    }

    pub fn add_account(&self, account: TrackedAccount) {
        self.accounts
            .lock()
            .expect("account list mutex poisoned")
            .push(account);
    }

    /// Flags returned by subsequent reloads, overriding the snapshot the
    /// account was registered with.
    pub fn override_flags(&self, account: &AccountId, flags: PolicyFlags) {
        self.flag_overrides
            .lock()
            .expect("flag override mutex poisoned")
            .insert(account.clone(), flags);
    }

    pub fn fail_reloads(&self, fail: bool) {
        self.fail_reloads.store(fail, Ordering::SeqCst);
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn revalidations(&self) -> Vec<AccountId> {
        self.revalidations
            .lock()
            .expect("revalidation log mutex poisoned")
            .clone()
    }

    pub fn mark_deactivated(&self, account: &AccountId) {
        let mut accounts = self.accounts.lock().expect("account list mutex poisoned");
        if let Some(entry) = accounts.iter_mut().find(|entry| entry.id == *account) {
            entry.deactivated = true;
        }
    }
}

impl AccountStore for MockAccountStore {
    fn eligible_accounts<'a>(
        &'a self,
        excluding: &'a HashSet<AccountId>,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<TrackedAccount>>> {
        Box::pin(async move {
            let accounts = self.accounts.lock().expect("account list mutex poisoned");
            Ok(accounts
                .iter()
                .filter(|account| {
                    !excluding.contains(&account.id)
                        && !account.deactivated
                        && account.flags.any_enabled()
                })
                .take(limit)
                .cloned()
                .collect())
        })
    }

    fn reload_policy_flags<'a>(&'a self, id: &'a AccountId) -> BoxFuture<'a, Result<PolicyFlags>> {
        Box::pin(async move {
            self.reloads.fetch_add(1, Ordering::SeqCst);
            if self.fail_reloads.load(Ordering::SeqCst) {
                return Err(anyhow!("account store unavailable"));
            }

            if let Some(flags) = self
                .flag_overrides
                .lock()
                .expect("flag override mutex poisoned")
                .get(id)
            {
                return Ok(*flags);
            }

            let accounts = self.accounts.lock().expect("account list mutex poisoned");
            accounts
                .iter()
                .find(|account| account.id == *id)
                .map(|account| account.flags)
                .ok_or_else(|| anyhow!("unknown account {id}"))
        })
    }

    fn revalidate_credentials<'a>(&'a self, id: &'a AccountId) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.revalidations
                .lock()
                .expect("revalidation log mutex poisoned")
                .push(id.clone());
            Ok(())
        })
    }
}

#[derive(Default)]
pub struct MockActionQueue {
    candidates: Mutex<Vec<BlockCandidate>>,
}

impl MockActionQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn candidates(&self) -> Vec<BlockCandidate> {
        self.candidates
            .lock()
            .expect("candidate list mutex poisoned")
            .clone()
    }
}

impl ActionQueue for MockActionQueue {
    fn enqueue_block<'a>(&'a self, candidate: BlockCandidate) -> BoxFuture<'a, Result<()>> {
        self.candidates
            .lock()
            .expect("candidate list mutex poisoned")
            .push(candidate);
        Box::pin(async { Ok(()) })
    }
}

#[derive(Default)]
pub struct MockUserCache {
    stored: Mutex<Vec<RemoteActor>>,
}

impl MockUserCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stored(&self) -> Vec<RemoteActor> {
        self.stored.lock().expect("cache log mutex poisoned").clone()
    }
}

impl UserCache for MockUserCache {
    fn store<'a>(&'a self, actor: &'a RemoteActor) -> BoxFuture<'a, Result<()>> {
        self.stored
            .lock()
            .expect("cache log mutex poisoned")
            .push(actor.clone());
        Box::pin(async { Ok(()) })
    }
}

#[derive(Default)]
pub struct MockReconciler {
    calls: Mutex<Vec<(AccountId, Instant)>>,
}

impl MockReconciler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<(AccountId, Instant)> {
        self.calls.lock().expect("call log mutex poisoned").clone()
    }

    pub fn calls_for(&self, account: &AccountId) -> usize {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .iter()
            .filter(|(id, _)| id == account)
            .count()
    }
}

impl ReconciliationService for MockReconciler {
    fn reconcile_blocks<'a>(&'a self, id: &'a AccountId) -> BoxFuture<'a, Result<()>> {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .push((id.clone(), Instant::now()));
        Box::pin(async { Ok(()) })
    }
}
