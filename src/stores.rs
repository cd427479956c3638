//! Trait seams for the external collaborators the core orchestrates: the
//! account store, the action queue, the optional user cache, and the
//! reconciliation service. Every seam is an object-safe trait returning a
//! boxed future so implementations can be swapped for in-process mocks.

use crate::model::{AccountId, BlockCandidate, PolicyFlags, RemoteActor, TrackedAccount};
use anyhow::Result;
use futures::future::BoxFuture;
use std::collections::HashSet;

/// Read/refresh access to the authoritative account database.
pub trait AccountStore: Send + Sync {
    /// Selects up to `limit` connectable accounts uniformly at random.
    ///
    /// The store filters out ids in `excluding`, deactivated accounts, and
    /// accounts with no monitoring policy enabled. Random selection (rather
    /// than a deterministic order) spreads retry pressure across ticks
    /// instead of re-hitting the same prefix of an ordered result set.
    fn eligible_accounts<'a>(
        &'a self,
        excluding: &'a HashSet<AccountId>,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<TrackedAccount>>>;

    /// Re-reads the account's policy flags. Called at decision time because
    /// streaming evaluation may lag policy changes by the connection's
    /// lifetime.
    fn reload_policy_flags<'a>(&'a self, id: &'a AccountId) -> BoxFuture<'a, Result<PolicyFlags>>;

    /// Re-checks the account's credentials with the upstream service. May
    /// mark the account deactivated in the external store, after which the
    /// sampler no longer offers it.
    fn revalidate_credentials<'a>(&'a self, id: &'a AccountId) -> BoxFuture<'a, Result<()>>;
}

/// Sink for block decisions. Execution of the action is out of scope here.
pub trait ActionQueue: Send + Sync {
    fn enqueue_block<'a>(&'a self, candidate: BlockCandidate) -> BoxFuture<'a, Result<()>>;
}

/// Optional write-through cache for actor records seen on the stream.
pub trait UserCache: Send + Sync {
    fn store<'a>(&'a self, actor: &'a RemoteActor) -> BoxFuture<'a, Result<()>>;
}

/// Downstream service that re-derives an account's block list after the
/// debouncer's quiet period.
pub trait ReconciliationService: Send + Sync {
    fn reconcile_blocks<'a>(&'a self, id: &'a AccountId) -> BoxFuture<'a, Result<()>>;
}
